//! Tenant-partitioned storage for processed logs.
//!
//! Every record is addressed by a [`StorageKey`] whose partition component
//! names the tenant (`TENANT#…`) and whose sort component names the log
//! (`LOG#…`). The store exposes a single mutation, a first-writer-wins
//! conditional put, and the [`IdempotencyGuard`] turns its outcome into the
//! commit decision the worker acts on.
//!
//! Two backends implement [`LogStore`]: [`InMemoryStore`] and, with the
//! default `backend-redb` feature, [`RedbStore`]. Pick one at runtime with
//! [`StoreConfig`].
//!
//! ```
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use ingest::{CanonicalMessage, Source};
//! use store::{CommitOutcome, IdempotencyGuard, InMemoryStore, StoredLogRecord};
//!
//! let message = CanonicalMessage {
//!     tenant_id: "acme_corp".into(),
//!     log_id: "log-1".into(),
//!     text: "call 555-0199".into(),
//!     source: Source::Json,
//!     ingested_at: Utc::now(),
//! };
//! let record = StoredLogRecord::from_message(message, "call [REDACTED]".into(), Utc::now(), 0.65);
//!
//! let guard = IdempotencyGuard::new(Arc::new(InMemoryStore::new()));
//! assert_eq!(guard.try_commit(&record).unwrap(), CommitOutcome::Committed);
//! assert_eq!(guard.try_commit(&record).unwrap(), CommitOutcome::AlreadyExists);
//! ```
mod backend;
mod error;
mod guard;
mod record;

pub use crate::backend::{InMemoryStore, LogStore, PutOutcome, StoreConfig};
#[cfg(feature = "backend-redb")]
pub use crate::backend::RedbStore;
pub use crate::error::StoreError;
pub use crate::guard::{CommitOutcome, IdempotencyGuard};
pub use crate::record::{StorageKey, StoredLogRecord, PARTITION_PREFIX, SORT_PREFIX};
