//! Tuning values consumed by the pipeline and its delivery worker.

use std::time::Duration;

use crate::batch::BatchLimits;
use crate::config::{MIN_LOG_TIMEOUT, SupervisorConfig};

/// Default number of batches that may be queued for delivery.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5;
/// Default maximum number of entries in one batch.
pub const DEFAULT_MAX_BATCH_ENTRIES: usize = 1500;
/// Default maximum payload bytes in one batch.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 150_000;
/// Default timeout for shipping one batch.
pub const DEFAULT_LOG_TIMEOUT: Duration = MIN_LOG_TIMEOUT;
/// Default timeout for the kill notification.
pub const DEFAULT_KILL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of the handoff queue. When this many batches are waiting,
    /// the producer that rotates next blocks until the worker catches up.
    pub queue_capacity: usize,
    /// Thresholds that trigger a rotation.
    pub limits: BatchLimits,
    /// Timeout applied to each `/_ah/log` call.
    pub log_timeout: Duration,
    /// Timeout applied to the `/_ah/kill` call.
    pub kill_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            limits: BatchLimits {
                max_entries: DEFAULT_MAX_BATCH_ENTRIES,
                max_bytes: DEFAULT_MAX_BATCH_BYTES,
            },
            log_timeout: DEFAULT_LOG_TIMEOUT,
            kill_timeout: DEFAULT_KILL_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.limits.max_entries = max_entries;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.limits.max_bytes = max_bytes;
        self
    }

    pub fn with_log_timeout(mut self, timeout: Duration) -> Self {
        self.log_timeout = timeout;
        self
    }

    pub fn with_kill_timeout(mut self, timeout: Duration) -> Self {
        self.kill_timeout = timeout;
        self
    }
}

impl From<&SupervisorConfig> for PipelineConfig {
    fn from(config: &SupervisorConfig) -> Self {
        Self::default().with_log_timeout(config.log_timeout())
    }
}
