use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WorkerConfigError;

/// Worker tuning.
///
/// `cost_per_char_ms` drives the simulated processing cost: a message of
/// `n` characters costs `n * cost_per_char_ms` milliseconds. With
/// `simulate_delay` off the cost is still computed and recorded, but the
/// worker does not sleep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub cost_per_char_ms: u64,
    pub simulate_delay: bool,
    /// Upper bound on deliveries requested per receive.
    pub batch_size: usize,
    /// Pause between receives when the queue is empty or erroring.
    pub poll_interval_ms: u64,
    /// Number of independent polling loops a host process runs.
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cost_per_char_ms: 50,
            simulate_delay: true,
            batch_size: 10,
            poll_interval_ms: 250,
            concurrency: 2,
        }
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), WorkerConfigError> {
        if self.batch_size == 0 {
            return Err(WorkerConfigError::Zero { field: "batch_size" });
        }
        if self.poll_interval_ms == 0 {
            return Err(WorkerConfigError::Zero {
                field: "poll_interval_ms",
            });
        }
        if self.concurrency == 0 {
            return Err(WorkerConfigError::Zero {
                field: "concurrency",
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Simulated cost of processing `text`.
    pub fn simulated_cost(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        Duration::from_millis(chars.saturating_mul(self.cost_per_char_ms))
    }
}

/// Seconds rounded to two decimal places.
pub fn round_seconds(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_linear_in_characters() {
        let cfg = WorkerConfig::default();
        assert_eq!(cfg.simulated_cost(""), Duration::ZERO);
        assert_eq!(cfg.simulated_cost("call 555-0199"), Duration::from_millis(650));
        // Characters, not bytes.
        assert_eq!(cfg.simulated_cost("€€"), Duration::from_millis(100));
        assert_eq!(
            cfg.simulated_cost(&"x".repeat(17_000)),
            Duration::from_secs(850)
        );
    }

    #[test]
    fn rounding_to_hundredths() {
        assert_eq!(round_seconds(Duration::from_millis(650)), 0.65);
        assert_eq!(round_seconds(Duration::from_millis(1234)), 1.23);
        assert_eq!(round_seconds(Duration::from_millis(1236)), 1.24);
    }

    #[test]
    fn zero_values_rejected() {
        assert!(WorkerConfig::default().validate().is_ok());
        let cfg = WorkerConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(WorkerConfigError::Zero { field: "batch_size" })
        );
    }
}
