use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::record::{StorageKey, StoredLogRecord};

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// No record existed; this write created it.
    Created,
    /// A record already existed at the key and was left untouched.
    AlreadyExists,
}

/// Keyed store for processed logs.
///
/// The only mutation is [`put_if_absent`](LogStore::put_if_absent); records
/// are never updated or deleted. The check and the write happen atomically
/// inside the backend, so concurrent writers for the same key need no
/// outside coordination.
pub trait LogStore: Send + Sync {
    /// Writes `record` under its key unless a record is already there.
    fn put_if_absent(&self, record: &StoredLogRecord) -> Result<PutOutcome, StoreError>;

    /// Point lookup of a single key.
    fn get(&self, key: &StorageKey) -> Result<Option<StoredLogRecord>, StoreError>;
}

/// Selects and builds a store backend.
///
/// ```
/// use store::StoreConfig;
///
/// let yaml = "backend: redb\npath: /var/lib/logflow/logs.redb\n";
/// let config: StoreConfig = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(config, StoreConfig::redb("/var/lib/logflow/logs.redb"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Records live in process memory and vanish on exit.
    #[default]
    InMemory,
    /// Records persist in a redb file at `path`.
    Redb { path: String },
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        StoreConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        StoreConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Arc<dyn LogStore>, StoreError> {
        match self {
            StoreConfig::InMemory => Ok(Arc::new(InMemoryStore::new())),
            StoreConfig::Redb { path } => {
                #[cfg(feature = "backend-redb")]
                {
                    Ok(Arc::new(RedbStore::open(path)?))
                }
                #[cfg(not(feature = "backend-redb"))]
                {
                    let _ = path;
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// A `RwLock<HashMap>` store for tests and single-process runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<StorageKey, StoredLogRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all tenants.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl LogStore for InMemoryStore {
    fn put_if_absent(&self, record: &StoredLogRecord) -> Result<PutOutcome, StoreError> {
        // The write lock spans the existence check and the insert.
        let mut guard = self
            .records
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        match guard.entry(record.key()) {
            std::collections::hash_map::Entry::Occupied(_) => Ok(PutOutcome::AlreadyExists),
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(PutOutcome::Created)
            }
        }
    }

    fn get(&self, key: &StorageKey) -> Result<Option<StoredLogRecord>, StoreError> {
        let guard = self
            .records
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }
}

#[cfg(feature = "backend-redb")]
pub mod redb;

#[cfg(feature = "backend-redb")]
pub use self::redb::RedbStore;
