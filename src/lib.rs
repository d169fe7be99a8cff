//! Log batching and delivery to a local supervisor.
//!
//! Log lines written by a function runtime are collected into batches and
//! shipped over HTTP to the supervisor process that manages the instance.
//! Producers never wait on the network: a single background worker drains a
//! bounded queue of batches, and producers block only when that queue is
//! full. A delivery failure is treated as fatal to the instance, which
//! notifies the supervisor and exits with [`KILL_EXIT_CODE`].
//!
//! Without supervisor coordinates in the environment the pipeline is never
//! started and every line is written to `stderr` instead.

mod batch;
pub mod config;
mod console;
pub mod delivery;
mod escalation;
mod execution;
mod log_compat;
mod log_entry;
mod pipeline;
mod ready_gate;
mod severity;
mod writer;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use batch::{BatchLimits, LogBatch};
pub use config::{ConfigError, SupervisorConfig};
pub use console::Console;
pub use delivery::{DeliveryError, HttpSupervisorClient, SupervisorClient};
pub use escalation::{KILL_EXIT_CODE, ProcessExit, Terminate, kill_instance};
pub use execution::{
    EXECUTION_ID_HEADER, ExecutionScope, ExecutionTagger, execution_id_from_headers,
    with_execution,
};
pub use log_compat::{SupervisorLogAdapter, install_global_logger};
pub use log_entry::{LogEntry, timestamp_now};
pub use pipeline::{
    DEFAULT_KILL_TIMEOUT, DEFAULT_LOG_TIMEOUT, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_BATCH_ENTRIES,
    DEFAULT_QUEUE_CAPACITY, Pipeline, PipelineBuilder, PipelineConfig, PipelineError,
    WORKER_THREAD_NAME,
};
pub use ready_gate::ReadyGate;
pub use severity::Severity;
pub use writer::LogWriter;

/// Writer for `INFO` entries on the process-wide pipeline.
pub fn info_writer() -> LogWriter<'static> {
    Pipeline::global().info_writer()
}

/// Writer for `ERROR` entries on the process-wide pipeline.
pub fn error_writer() -> LogWriter<'static> {
    Pipeline::global().error_writer()
}
