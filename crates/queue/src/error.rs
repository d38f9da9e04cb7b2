use thiserror::Error;

/// Errors surfaced by a [`Transport`](crate::Transport).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueueError {
    /// The broker could not be reached or refused the operation.
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    /// The receipt handle does not name a current in-flight delivery, either
    /// because it was already acknowledged or because the message became
    /// visible again and was handed out under a new receipt.
    #[error("unknown or expired receipt handle: {0}")]
    UnknownReceipt(String),

    /// Queue configuration is inconsistent.
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    #[error("queue internal error: {0}")]
    Internal(String),
}

impl QueueError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        QueueError::Internal(message.into())
    }
}
