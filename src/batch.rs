//! Batches of log entries awaiting delivery.
//!
//! A [`LogBatch`] is shared between the pipeline and the delivery worker via
//! `Arc`. Producers append only while the batch is the pipeline's active
//! batch and only while holding the pipeline lock; the worker reads it only
//! after it has been sealed. The inner mutex is therefore uncontended and
//! exists to make the hand-over sound rather than to arbitrate writers.

use std::time::Duration;

use parking_lot::Mutex;

use crate::delivery::{DeliveryError, LOG_PATH, SupervisorClient, post_json};
use crate::log_entry::LogEntry;
use crate::ready_gate::ReadyGate;

/// Size limits that trigger a rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum number of entries in one batch.
    pub max_entries: usize,
    /// Maximum sum of payload byte lengths in one batch.
    pub max_bytes: usize,
}

#[derive(Debug, Default)]
struct BatchContents {
    entries: Vec<LogEntry>,
    payload_length: usize,
}

#[derive(Debug, Default)]
pub struct LogBatch {
    contents: Mutex<BatchContents>,
    ready: ReadyGate,
}

impl LogBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, opening the ready gate on the first one.
    pub fn add_entry(&self, entry: LogEntry) {
        let mut contents = self.contents.lock();
        contents.payload_length += entry.payload_len();
        contents.entries.push(entry);
        if contents.entries.len() == 1 {
            self.ready.open();
        }
    }

    /// Whether adding an entry with `payload_len` bytes would push a
    /// non-empty batch past either limit.
    pub fn would_overflow(&self, payload_len: usize, limits: BatchLimits) -> bool {
        let contents = self.contents.lock();
        !contents.entries.is_empty()
            && (contents.entries.len() + 1 > limits.max_entries
                || contents.payload_length + payload_len > limits.max_bytes)
    }

    pub fn len(&self) -> usize {
        self.contents.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the payload byte lengths of all entries.
    pub fn payload_length(&self) -> usize {
        self.contents.lock().payload_length
    }

    /// Snapshot of the entries in insertion order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.contents.lock().entries.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.ready.is_open()
    }

    /// Block until the batch holds at least one entry.
    pub fn wait_ready(&self) {
        self.ready.wait();
    }

    pub fn wait_ready_timeout(&self, timeout: Duration) -> bool {
        self.ready.wait_timeout(timeout)
    }

    /// Ship the batch to the supervisor's log endpoint.
    ///
    /// An empty batch succeeds without touching the network.
    pub fn report(
        &self,
        client: &dyn SupervisorClient,
        timeout: Duration,
    ) -> Result<(), DeliveryError> {
        let contents = self.contents.lock();
        if contents.entries.is_empty() {
            return Ok(());
        }
        post_json(client, LOG_PATH, &contents.entries, timeout)
    }
}
