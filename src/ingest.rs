//! Turning JSON documents into keys.
//!
//! Objects contribute one segment per member, arrays one `[i]` segment per
//! element. Every leaf becomes a key:
//! * numbers are `Float`, also when they look integral
//! * strings are `String`
//! * booleans are `Bool`
//! * `null` is a `String` key without a value

use serde_json::Value as Json;
use tracing::info;

use crate::construct::{DataRepo, KeyOptions};
use crate::datatype::{Value, ValueKind};
use crate::error::Result;
use crate::path::{self, SEPARATOR};

pub type FlatEntry = (String, ValueKind, Value);

/// Flattens `document` below `base_key` (top level when empty).
pub fn flatten(document: &Json, base_key: &str) -> Vec<FlatEntry> {
    let mut entries = Vec::new();
    flatten_into(base_key, document, &mut entries);
    entries
}

fn flatten_into(prefix: &str, node: &Json, entries: &mut Vec<FlatEntry>) {
    match node {
        Json::Object(members) => {
            for (name, member) in members {
                flatten_into(&path::join(prefix, name), member, entries);
            }
        }
        Json::Array(elements) => {
            for (i, element) in elements.iter().enumerate() {
                flatten_into(&path::append_array_segment(prefix, i, false), element, entries);
            }
        }
        Json::Number(n) => {
            let x = n.as_f64().unwrap_or(0.0);
            entries.push((prefix.to_string(), ValueKind::Float, Value::Float(x)));
        }
        Json::String(s) => {
            entries.push((prefix.to_string(), ValueKind::String, Value::Text(s.clone())));
        }
        Json::Bool(b) => {
            entries.push((prefix.to_string(), ValueKind::Bool, Value::Bool(*b)));
        }
        Json::Null => {
            entries.push((prefix.to_string(), ValueKind::String, Value::Null));
        }
    }
}

impl DataRepo {
    /// Parses `json` and creates and writes one key per leaf below `base_key`.
    ///
    /// Seeded keys are protected by the options' delete password for both deleting
    /// and writing, and carry no read password. Creation stops at the first key
    /// that fails (for example one that already exists); keys created before it remain.
    pub fn create_from_json(&self, json: &str, base_key: &str, options: &KeyOptions) -> Result<usize> {
        let document: Json = serde_json::from_str(json)?;
        self.create_from_document(&document, base_key, options)
    }

    pub fn create_from_document(
        &self,
        document: &Json,
        base_key: &str,
        options: &KeyOptions,
    ) -> Result<usize> {
        let base = if base_key.trim().is_empty() {
            ""
        } else {
            base_key.trim_end_matches(SEPARATOR)
        };
        let entries = flatten(document, base);
        let count = entries.len();
        let seeded = KeyOptions {
            pass_delete: options.pass_delete.clone(),
            pass_write: options.pass_delete.clone(),
            pass_read: None,
            type_enforcement: options.type_enforcement,
        };
        self.create_and_write_batch(entries, &seeded)?;
        info!(base_key = base, count, "ingested json document");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_members_and_elements() {
        let doc = json!({"cfg": {"a": 1, "list": [true, null]}});
        let entries = flatten(&doc, "");
        assert_eq!(
            entries,
            vec![
                ("cfg.a".to_string(), ValueKind::Float, Value::Float(1.0)),
                ("cfg.list.[0]".to_string(), ValueKind::Bool, Value::Bool(true)),
                ("cfg.list.[1]".to_string(), ValueKind::String, Value::Null),
            ]
        );
    }

    #[test]
    fn base_key_prefixes_every_leaf() {
        let entries = flatten(&json!({"x": "y"}), "root");
        assert_eq!(entries[0].0, "root.x");
    }
}
