//! Structural searches over the key space.
//!
//! Every operation scans the live key set, so its cost grows with the number of
//! keys and it may or may not observe creates and deletes racing with it.

use std::collections::HashSet;

use tracing::debug;

use crate::construct::{DataRepo, KeyOptions};
use crate::datatype::{Value, ValueKind};
use crate::error::{RepoError, Result};
use crate::path::{self, ARRAY_MARKER, ARRAY_TEMPLATE, SEPARATOR};

// ------------- Wildcard -------------
/// A full-string match pattern in which `*` stands for any run of characters,
/// including none. Every other character matches itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    // literal pieces between the stars, first and last anchor the ends
    parts: Vec<String>,
}

impl Wildcard {
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(RepoError::InvalidArgument(
                "wildcard pattern cannot be empty".into(),
            ));
        }
        Ok(Self {
            parts: pattern.split('*').map(str::to_string).collect(),
        })
    }
    pub fn is_match(&self, candidate: &str) -> bool {
        let (first, rest) = match self.parts.split_first() {
            Some(split) => split,
            None => return false,
        };
        let (last, middle) = match rest.split_last() {
            Some(split) => split,
            // no star at all
            None => return candidate == first,
        };
        if candidate.len() < first.len() + last.len()
            || !candidate.starts_with(first.as_str())
            || !candidate.ends_with(last.as_str())
        {
            return false;
        }
        // the middle pieces must appear in order, leftmost placement is always safe
        let mut window = &candidate[first.len()..candidate.len() - last.len()];
        for part in middle {
            match window.find(part.as_str()) {
                Some(at) => window = &window[at + part.len()..],
                None => return false,
            }
        }
        true
    }
}

// ------------- Array templates -------------
/// A key template such as `orders.[].qty`, naming the same leaf in every
/// element of an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayTemplate {
    base: String,
    suffix: String,
}

impl ArrayTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(RepoError::InvalidArgument(
                "array key template cannot be empty".into(),
            ));
        }
        let at = template.find(ARRAY_TEMPLATE).ok_or_else(|| {
            RepoError::InvalidArgument(format!(
                "array key template '{}' must contain '{}'",
                template, ARRAY_TEMPLATE
            ))
        })?;
        let base = &template[..at];
        let suffix = &template[at + ARRAY_TEMPLATE.len()..];
        // `orders.[].qty` names the same leaves as `orders[].qty`
        let base = match base.strip_suffix(SEPARATOR) {
            Some(trimmed) if !suffix.is_empty() => trimmed,
            _ => base,
        };
        Ok(Self {
            base: base.to_string(),
            suffix: suffix.to_string(),
        })
    }
    pub fn base(&self) -> &str {
        &self.base
    }
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
    /// The concrete key of element `index`, `base.[index].suffix`.
    pub fn key(&self, index: u64) -> String {
        format!("{}.[{}].{}", self.base, index, self.suffix)
    }
    /// The element index if `key` is exactly this template with some index filled in.
    pub fn index_of(&self, key: &str) -> Option<u64> {
        let rest = key.strip_prefix(self.base.as_str())?.strip_prefix(SEPARATOR)?;
        let (index, tail) = path::leading_array_index(rest)?;
        (tail.strip_prefix(SEPARATOR) == Some(self.suffix.as_str())).then_some(index)
    }
}

fn require_non_blank(argument: &str, what: &str) -> Result<()> {
    if argument.trim().is_empty() {
        return Err(RepoError::InvalidArgument(format!("{} cannot be empty", what)));
    }
    Ok(())
}

impl DataRepo {
    /// Keys starting with `filter`, compared exactly and case-sensitively.
    pub fn find_keys(&self, filter: &str) -> Result<Vec<String>> {
        if filter.is_empty() {
            return Err(RepoError::InvalidArgument("filter cannot be empty".into()));
        }
        Ok(self.scan_keys(|key| key.starts_with(filter)))
    }

    /// Keys matching the whole of `pattern`, see [`Wildcard`].
    pub fn find_keys_with_wildcards(&self, pattern: &str) -> Result<Vec<String>> {
        let wildcard = Wildcard::compile(pattern)?;
        Ok(self.scan_keys(|key| wildcard.is_match(key)))
    }

    /// The distinct first segments below `base_key`.
    ///
    /// For keys `a.b.c` and `a.d` the children of `a` are `b` and `d`.
    pub fn child_keys(&self, base_key: &str) -> Result<HashSet<String>> {
        require_non_blank(base_key, "base key")?;
        let prefix = format!("{}{}", base_key.trim_end_matches(SEPARATOR), SEPARATOR);
        let mut children = HashSet::new();
        self.for_each_key(|key| {
            if let Some(rest) = key.strip_prefix(prefix.as_str()) {
                let child = rest.split(SEPARATOR).next().unwrap_or(rest);
                if !children.contains(child) {
                    children.insert(child.to_string());
                }
            }
        });
        Ok(children)
    }

    /// The distinct ids `x` of keys beginning with `base_key.{x}`.
    pub fn entity_ids(&self, base_key: &str) -> Result<HashSet<String>> {
        if base_key.is_empty() {
            return Err(RepoError::InvalidArgument("base key cannot be empty".into()));
        }
        let prefix = format!("{}.{{", base_key);
        let mut ids = HashSet::new();
        self.for_each_key(|key| {
            // the id ends at the first closing brace
            if let Some(id) = key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.find('}').map(|close| &rest[..close]))
            {
                if !ids.contains(id) {
                    ids.insert(id.to_string());
                }
            }
        });
        Ok(ids)
    }

    /// How many distinct indices `n` appear in keys beginning with `base.[n]`, where
    /// `array_key` is `base.[]`.
    pub fn array_index_count(&self, array_key: &str) -> Result<usize> {
        require_non_blank(array_key, "base key")?;
        let base = array_key.strip_suffix(ARRAY_MARKER).ok_or_else(|| {
            RepoError::InvalidArgument(format!(
                "base key '{}' must end with '{}'",
                array_key, ARRAY_MARKER
            ))
        })?;
        let prefix = format!("{}{}", base, SEPARATOR);
        let mut indices = HashSet::new();
        self.for_each_key(|key| {
            if let Some((index, _)) = key
                .strip_prefix(prefix.as_str())
                .and_then(path::leading_array_index)
            {
                indices.insert(index);
            }
        });
        Ok(indices.len())
    }

    /// Creates the next element of the array described by `template` and returns its key.
    ///
    /// The next index is one past the highest index currently present for the same
    /// template. Finding it and creating the key are two separate steps, so callers
    /// appending to the same array concurrently can collide and one of them gets
    /// [`RepoError::DuplicateKey`].
    pub fn add_array_element(
        &self,
        template: &str,
        kind: ValueKind,
        value: Option<Value>,
        options: &KeyOptions,
    ) -> Result<String> {
        let template = ArrayTemplate::parse(template)?;
        let mut highest: Option<u64> = None;
        self.for_each_key(|key| {
            if let Some(index) = template.index_of(key) {
                highest = highest.max(Some(index));
            }
        });
        let next = match highest {
            None => 0,
            Some(index) => index.checked_add(1).ok_or_else(|| {
                RepoError::InvalidArgument(format!(
                    "array '{}' already holds the largest possible index {}",
                    template.base(),
                    index
                ))
            })?,
        };
        let key = template.key(next);
        self.create_key(key.as_str(), kind, options)?;
        if let Some(value) = value {
            self.write(&key, value, options.pass_write.as_deref())?;
        }
        debug!(%key, "appended array element");
        Ok(key)
    }
}
