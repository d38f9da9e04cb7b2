//! Write-time duplicate suppression.
use std::sync::Arc;

use tracing::debug;

use crate::backend::{LogStore, PutOutcome};
use crate::error::StoreError;
use crate::record::StoredLogRecord;

/// Outcome of [`IdempotencyGuard::try_commit`]. Both variants mean the
/// message is fully processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    AlreadyExists,
}

impl CommitOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CommitOutcome::Committed => "committed",
            CommitOutcome::AlreadyExists => "duplicate",
        }
    }
}

impl From<PutOutcome> for CommitOutcome {
    fn from(outcome: PutOutcome) -> Self {
        match outcome {
            PutOutcome::Created => CommitOutcome::Committed,
            PutOutcome::AlreadyExists => CommitOutcome::AlreadyExists,
        }
    }
}

/// Decides whether a `(tenant_id, log_id)` pair has already been durably
/// processed by attempting a conditional write.
///
/// An existing record is never overwritten; a second commit of the same key
/// reports [`CommitOutcome::AlreadyExists`] rather than an error.
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn LogStore>,
}

impl IdempotencyGuard {
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    pub fn try_commit(&self, record: &StoredLogRecord) -> Result<CommitOutcome, StoreError> {
        let outcome = CommitOutcome::from(self.store.put_if_absent(record)?);
        debug!(
            tenant_id = %record.tenant_id,
            log_id = %record.log_id,
            outcome = outcome.as_str(),
            "commit_attempt"
        );
        Ok(outcome)
    }
}

impl std::fmt::Debug for IdempotencyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ingest::{CanonicalMessage, Source};

    use super::*;
    use crate::backend::InMemoryStore;

    fn record(text: &str) -> StoredLogRecord {
        let message = CanonicalMessage {
            tenant_id: "acme_corp".into(),
            log_id: "log-42".into(),
            text: text.into(),
            source: Source::Json,
            ingested_at: Utc::now(),
        };
        StoredLogRecord::from_message(message, text.into(), Utc::now(), 0.5)
    }

    #[test]
    fn second_commit_reports_already_exists_without_overwrite() {
        let store = Arc::new(InMemoryStore::new());
        let guard = IdempotencyGuard::new(store.clone());

        assert_eq!(guard.try_commit(&record("first")).unwrap(), CommitOutcome::Committed);
        assert_eq!(
            guard.try_commit(&record("second")).unwrap(),
            CommitOutcome::AlreadyExists
        );

        let stored = store.get(&record("x").key()).unwrap().expect("present");
        assert_eq!(stored.original_text, "first");
        assert_eq!(store.len().unwrap(), 1);
    }

    struct FailingStore;

    impl LogStore for FailingStore {
        fn put_if_absent(&self, _: &StoredLogRecord) -> Result<PutOutcome, StoreError> {
            Err(StoreError::backend("store offline"))
        }

        fn get(&self, _: &crate::StorageKey) -> Result<Option<StoredLogRecord>, StoreError> {
            Err(StoreError::backend("store offline"))
        }
    }

    #[test]
    fn backend_failure_is_an_error_not_a_duplicate() {
        let guard = IdempotencyGuard::new(Arc::new(FailingStore));
        assert!(matches!(
            guard.try_commit(&record("x")),
            Err(StoreError::Backend(_))
        ));
    }
}
