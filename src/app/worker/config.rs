//! Worker pool configuration

use serde::{Deserialize, Serialize};

use crate::constants::workers;
use crate::errors::{ConfigError, ConfigResult};

/// Configuration for the worker pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent workers to spawn
    pub worker_count: usize,
    /// Channel buffer size for task reports
    pub report_buffer_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: workers::DEFAULT_WORKER_COUNT,
            report_buffer_size: workers::EVENT_BUFFER_SIZE,
        }
    }
}

impl WorkerConfig {
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    /// Validate configuration values and return errors for invalid settings
    pub fn validate(&self) -> ConfigResult<()> {
        if self.worker_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers".to_string(),
                value: self.worker_count.to_string(),
                reason: "Worker count cannot be zero".to_string(),
            });
        }

        if self.worker_count > workers::MAX_WORKER_COUNT {
            return Err(ConfigError::InvalidValue {
                field: "workers".to_string(),
                value: self.worker_count.to_string(),
                reason: format!("Worker count exceeds maximum ({})", workers::MAX_WORKER_COUNT),
            });
        }

        if self.report_buffer_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "report_buffer_size".to_string(),
                value: "0".to_string(),
                reason: "Report buffer must hold at least one report".to_string(),
            });
        }

        Ok(())
    }

    /// Task queue capacity: one slot per worker plus slack
    pub fn queue_capacity(&self) -> usize {
        self.worker_count + workers::QUEUE_SLACK
    }
}
