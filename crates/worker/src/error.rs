use store::StoreError;
use thiserror::Error;

/// Why a delivery could not be committed. Never reported to a client; the
/// delivery is left unacknowledged and the transport redelivers it.
#[derive(Debug, Error)]
pub enum ProcessingFailure {
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("commit task failed: {0}")]
    Join(String),

    #[error("interrupted before commit")]
    Interrupted,
}

impl ProcessingFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingFailure::Malformed(_) => "malformed",
            ProcessingFailure::Store(_) => "store",
            ProcessingFailure::Join(_) => "join",
            ProcessingFailure::Interrupted => "interrupted",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}
