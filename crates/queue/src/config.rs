use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// Redelivery contract of a transport.
///
/// An unacknowledged delivery becomes visible again once
/// `visibility_timeout` has elapsed since it was handed out. Every hand-out
/// counts as one receive; a message that has already been received
/// `max_receive_count` times is moved to the dead-letter channel the next
/// time it would be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeliveryPolicy {
    pub visibility_timeout: Duration,
    pub max_receive_count: u32,
}

impl Default for RedeliveryPolicy {
    fn default() -> Self {
        QueueConfig::default().policy()
    }
}

/// Serializable queue settings.
///
/// The default visibility timeout covers the longest simulated processing
/// time of a maximum-size message (17000 characters at 50 ms each).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub visibility_timeout_secs: u64,
    pub max_receive_count: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: 900,
            max_receive_count: 3,
        }
    }
}

impl QueueConfig {
    pub fn policy(&self) -> RedeliveryPolicy {
        RedeliveryPolicy {
            visibility_timeout: Duration::from_secs(self.visibility_timeout_secs),
            max_receive_count: self.max_receive_count,
        }
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.visibility_timeout_secs == 0 {
            return Err(QueueError::InvalidConfig(
                "visibility_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.max_receive_count == 0 {
            return Err(QueueError::InvalidConfig(
                "max_receive_count must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
