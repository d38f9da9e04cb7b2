//! redb-backed store.
//!
//! Each record lives in one table under the tuple key
//! `(partition, sort)` with a JSON-encoded value. A conditional put runs in a
//! single write transaction: the existence check and the insert commit
//! together, or the transaction is aborted and nothing changes. redb
//! serializes write transactions, which makes the check-and-write atomic.
//!
//! ```yaml
//! store:
//!   backend: redb
//!   path: /var/lib/logflow/logs.redb
//! ```
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::backend::{LogStore, PutOutcome};
use crate::error::StoreError;
use crate::record::{StorageKey, StoredLogRecord};

const LOGS_TABLE: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("logflow_logs");

pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Opens or creates the database at `path` and makes sure the table
    /// exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(StoreError::backend)?;

        let write_txn = db.begin_write().map_err(StoreError::backend)?;
        {
            let _table = write_txn
                .open_table(LOGS_TABLE)
                .map_err(StoreError::backend)?;
        }
        write_txn.commit().map_err(StoreError::backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl LogStore for RedbStore {
    fn put_if_absent(&self, record: &StoredLogRecord) -> Result<PutOutcome, StoreError> {
        let key = record.key();
        let value = record.encode()?;

        let write_txn = self.db.begin_write().map_err(StoreError::backend)?;
        let outcome = {
            let mut table = write_txn
                .open_table(LOGS_TABLE)
                .map_err(StoreError::backend)?;
            let exists = table
                .get((key.partition.as_str(), key.sort.as_str()))
                .map_err(StoreError::backend)?
                .is_some();
            if exists {
                PutOutcome::AlreadyExists
            } else {
                table
                    .insert((key.partition.as_str(), key.sort.as_str()), value.as_slice())
                    .map_err(StoreError::backend)?;
                PutOutcome::Created
            }
        };

        match outcome {
            PutOutcome::Created => write_txn.commit().map_err(StoreError::backend)?,
            PutOutcome::AlreadyExists => write_txn.abort().map_err(StoreError::backend)?,
        }
        Ok(outcome)
    }

    fn get(&self, key: &StorageKey) -> Result<Option<StoredLogRecord>, StoreError> {
        let read_txn = self.db.begin_read().map_err(StoreError::backend)?;
        let table = read_txn
            .open_table(LOGS_TABLE)
            .map_err(StoreError::backend)?;

        match table
            .get((key.partition.as_str(), key.sort.as_str()))
            .map_err(StoreError::backend)?
        {
            Some(value) => Ok(Some(StoredLogRecord::decode(value.value())?)),
            None => Ok(None),
        }
    }
}
