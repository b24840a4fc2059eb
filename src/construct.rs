use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

// every cell publishes its current snapshot through an atomically swappable pointer
use arc_swap::ArcSwap;
// the key space is a sharded concurrent map
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

// keys are hashed with a fast non-cryptographic hash
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;

// used to print out readable forms of a construct
use std::fmt;

// used for timestamps
use chrono::{DateTime, Utc};

use tracing::{debug, warn};

// our own stuff that we need
use crate::datatype::{coerce, TypedScalar, Value, ValueKind};
use crate::error::{RepoError, Result};

pub type KeyHasher = BuildHasherDefault<SeaHasher>;

// ------------- Access -------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    Delete,
}
impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Access::Read => write!(f, "Read"),
            Access::Write => write!(f, "Write"),
            Access::Delete => write!(f, "Delete"),
        }
    }
}

/// Shared secrets guarding a cell. An absent or empty password means no check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    read: Option<String>,
    write: Option<String>,
    delete: Option<String>,
}
impl AccessPolicy {
    pub fn new(delete: Option<String>, write: Option<String>, read: Option<String>) -> Self {
        Self { read, write, delete }
    }
    fn password(&self, access: Access) -> Option<&str> {
        let password = match access {
            Access::Read => &self.read,
            Access::Write => &self.write,
            Access::Delete => &self.delete,
        };
        password.as_deref().filter(|p| !p.is_empty())
    }
    /// Whether `access` needs a password at all.
    pub fn is_protected(&self, access: Access) -> bool {
        self.password(access).is_some()
    }
    pub fn authorize(&self, access: Access, given: Option<&str>) -> Result<()> {
        match self.password(access) {
            Some(expected) if Some(expected) != given => Err(RepoError::Unauthorized(access)),
            _ => Ok(()),
        }
    }
}

/// Everything about a key that is fixed when it is created, apart from its kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyOptions {
    pub pass_delete: Option<String>,
    pub pass_write: Option<String>,
    pub pass_read: Option<String>,
    pub type_enforcement: bool,
}
impl KeyOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn delete_pass(mut self, pass: impl Into<String>) -> Self {
        self.pass_delete = Some(pass.into());
        self
    }
    pub fn write_pass(mut self, pass: impl Into<String>) -> Self {
        self.pass_write = Some(pass.into());
        self
    }
    pub fn read_pass(mut self, pass: impl Into<String>) -> Self {
        self.pass_read = Some(pass.into());
        self
    }
    pub fn enforce_type(mut self, enforce: bool) -> Self {
        self.type_enforcement = enforce;
        self
    }
    fn policy(&self) -> AccessPolicy {
        AccessPolicy::new(
            self.pass_delete.clone(),
            self.pass_write.clone(),
            self.pass_read.clone(),
        )
    }
}

// ------------- Snapshot -------------
/// The state of a cell at one instant. Never modified once published.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    value: Option<TypedScalar>,
    written_at: DateTime<Utc>,
}
impl Snapshot {
    fn empty() -> Self {
        Self {
            value: None,
            written_at: DateTime::<Utc>::MIN_UTC,
        }
    }
    pub fn value(&self) -> Option<&TypedScalar> {
        self.value.as_ref()
    }
    pub fn written_at(&self) -> DateTime<Utc> {
        self.written_at
    }
    /// Canonical text of the value, empty when there is none.
    pub fn display(&self) -> String {
        self.value.as_ref().map(|v| v.to_string()).unwrap_or_default()
    }
}
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

// ------------- Cell -------------
/// One addressable slot. Kind and policy are immutable after creation; only the
/// snapshot changes, and only by whole replacement.
#[derive(Debug)]
pub struct Cell {
    kind: ValueKind,
    policy: AccessPolicy,
    type_enforcement: bool,
    snapshot: ArcSwap<Snapshot>,
}
impl Cell {
    pub fn new(kind: ValueKind, options: &KeyOptions) -> Self {
        Self {
            kind,
            policy: options.policy(),
            type_enforcement: options.type_enforcement,
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
        }
    }
    pub fn kind(&self) -> ValueKind {
        self.kind
    }
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }
    pub fn type_enforcement(&self) -> bool {
        self.type_enforcement
    }
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }
    pub fn get(&self) -> Option<TypedScalar> {
        self.snapshot.load().value.clone()
    }
    pub fn last_write(&self) -> DateTime<Utc> {
        self.snapshot.load().written_at
    }
    /// Coerces `value` into the cell's kind and publishes it. On any error the
    /// previous snapshot stays in place.
    pub fn set(&self, value: impl Into<Value>, write_pass: Option<&str>) -> Result<()> {
        self.policy.authorize(Access::Write, write_pass)?;
        let value = coerce(self.kind, self.type_enforcement, value.into())?;
        self.snapshot.store(Arc::new(Snapshot {
            value,
            written_at: Utc::now(),
        }));
        Ok(())
    }
}

// ------------- Repository -------------
/// The key space: a concurrent mapping from key strings to cells.
///
/// Keys are opaque to the repository itself; the dotted, `{entity}` and `[index]`
/// structure is only interpreted by the search operations in [`crate::query`].
/// Batch operations apply their elements in order and stop at the first failure,
/// leaving the elements before it applied.
#[derive(Debug)]
pub struct DataRepo {
    cells: DashMap<String, Arc<Cell>, KeyHasher>,
    // microseconds since the epoch of the last create or delete
    structure_changed: AtomicI64,
}

impl Default for DataRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl DataRepo {
    pub fn new() -> Self {
        Self {
            cells: DashMap::with_hasher(KeyHasher::default()),
            structure_changed: AtomicI64::new(Utc::now().timestamp_micros()),
        }
    }
    pub fn len(&self) -> usize {
        self.cells.len()
    }
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
    pub fn contains_key(&self, key: &str) -> bool {
        self.cells.contains_key(key)
    }
    pub fn last_structure_change(&self) -> DateTime<Utc> {
        let micros = self.structure_changed.load(Ordering::Acquire);
        DateTime::from_timestamp_micros(micros).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
    fn touch_structure(&self) {
        // fetch_max keeps the clock from ever moving backwards under racing updates
        self.structure_changed
            .fetch_max(Utc::now().timestamp_micros(), Ordering::AcqRel);
    }
    fn cell(&self, key: &str) -> Result<Arc<Cell>> {
        self.cells
            .get(key)
            .map(|c| Arc::clone(c.value()))
            .ok_or_else(|| RepoError::KeyNotFound(key.to_string()))
    }

    pub fn create_key(
        &self,
        key: impl Into<String>,
        kind: ValueKind,
        options: &KeyOptions,
    ) -> Result<()> {
        let key = key.into();
        match self.cells.entry(key) {
            Entry::Occupied(e) => Err(RepoError::DuplicateKey(e.key().clone())),
            Entry::Vacant(e) => {
                debug!(key = %e.key(), %kind, "created key");
                e.insert(Arc::new(Cell::new(kind, options)));
                self.touch_structure();
                Ok(())
            }
        }
    }
    pub fn create_key_batch<I, K>(&self, entries: I, options: &KeyOptions) -> Result<()>
    where
        I: IntoIterator<Item = (K, ValueKind)>,
        K: Into<String>,
    {
        for (key, kind) in entries {
            self.create_key(key, kind, options)?;
        }
        Ok(())
    }
    pub fn create_and_write(
        &self,
        key: impl Into<String>,
        kind: ValueKind,
        value: impl Into<Value>,
        options: &KeyOptions,
    ) -> Result<()> {
        let key = key.into();
        self.create_key(key.as_str(), kind, options)?;
        self.write(&key, value, options.pass_write.as_deref())
    }
    pub fn create_and_write_batch<I, K, V>(&self, entries: I, options: &KeyOptions) -> Result<()>
    where
        I: IntoIterator<Item = (K, ValueKind, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut count = 0usize;
        for (key, kind, value) in entries {
            self.create_and_write(key, kind, value, options)?;
            count += 1;
        }
        debug!(count, "created and wrote keys");
        Ok(())
    }

    /// Current snapshot of the key's cell.
    pub fn read(&self, key: &str, pass: Option<&str>) -> Result<Arc<Snapshot>> {
        let cell = self.cell(key)?;
        if let Err(e) = cell.policy().authorize(Access::Read, pass) {
            warn!(key, "read rejected");
            return Err(e);
        }
        Ok(cell.snapshot())
    }
    /// Canonical text of the key's value; an unset value reads as the empty string.
    pub fn read_string(&self, key: &str, pass: Option<&str>) -> Result<String> {
        Ok(self.read(key, pass)?.display())
    }

    pub fn write(&self, key: &str, value: impl Into<Value>, write_pass: Option<&str>) -> Result<()> {
        let cell = self.cell(key)?;
        cell.set(value, write_pass).inspect_err(|e| {
            warn!(key, error = %e, "write rejected");
        })
    }
    /// Writes each entry with the same password.
    pub fn write_batch<I, K, V>(&self, entries: I, write_pass: Option<&str>) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.write(key.as_ref(), value, write_pass)?;
        }
        Ok(())
    }
    pub fn set_null(&self, key: &str, write_pass: Option<&str>) -> Result<()> {
        self.write(key, Value::Null, write_pass)
    }
    pub fn set_null_batch<I, K>(&self, keys: I, write_pass: Option<&str>) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            self.set_null(key.as_ref(), write_pass)?;
        }
        Ok(())
    }

    pub fn delete_key(&self, key: &str, delete_pass: Option<&str>) -> Result<()> {
        let cell = self.cell(key)?;
        if let Err(e) = cell.policy().authorize(Access::Delete, delete_pass) {
            warn!(key, "delete rejected");
            return Err(e);
        }
        // only remove the cell that was authorized, not one created in the meantime
        match self.cells.remove_if(key, |_, current| Arc::ptr_eq(current, &cell)) {
            Some(_) => {
                debug!(key, "deleted key");
                self.touch_structure();
                Ok(())
            }
            None => Err(RepoError::KeyNotFound(key.to_string())),
        }
    }
    pub fn delete_key_batch<I, K>(&self, keys: I, delete_pass: Option<&str>) -> Result<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            self.delete_key(key.as_ref(), delete_pass)?;
        }
        Ok(())
    }

    /// Every key with its cell as of the moment of the call. Later creates and
    /// deletes are not reflected, so the repository may be modified while iterating.
    pub fn list_all(&self) -> std::vec::IntoIter<(String, Arc<Cell>)> {
        let entries: Vec<(String, Arc<Cell>)> = self
            .cells
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        entries.into_iter()
    }
    /// Collects the keys accepted by `filter`. Used by the search operations.
    pub(crate) fn scan_keys<F>(&self, mut filter: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        self.cells
            .iter()
            .filter(|e| filter(e.key()))
            .map(|e| e.key().clone())
            .collect()
    }
    pub(crate) fn for_each_key<F>(&self, mut visit: F)
    where
        F: FnMut(&str),
    {
        for e in self.cells.iter() {
            visit(e.key());
        }
    }
}
