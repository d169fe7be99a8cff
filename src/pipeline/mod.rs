//! Batching pipeline between log producers and the supervisor.
//!
//! [`Pipeline`] is the single point of serialization for every thread that
//! logs. It owns the active [`LogBatch`], rotates it when it grows past the
//! configured limits, and hands batches to a dedicated delivery worker over a
//! bounded queue.
//!
//! # Lifecycle
//!
//! A pipeline starts uninitialized; [`Pipeline::add_entry`] then returns
//! `false` and callers fall back to the console. [`Pipeline::initialize`]
//! creates the queue, the first batch and the worker exactly once, even when
//! called concurrently. The worker runs for the lifetime of the process.
//!
//! # Backpressure
//!
//! Rotation enqueues the new batch while holding the pipeline lock. When the
//! queue is full the rotating producer blocks, and every other producer
//! blocks behind it on the lock, until the worker frees a slot. A stalled
//! supervisor therefore throttles logging instead of growing memory.

mod config;
mod worker;


use std::{
    fmt, io,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crossbeam_channel::{Sender, bounded};
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    batch::LogBatch,
    config::SupervisorConfig,
    console::Console,
    delivery::{HttpSupervisorClient, SupervisorClient},
    escalation::{ProcessExit, Terminate},
    execution::ExecutionTagger,
    log_entry::LogEntry,
    severity::Severity,
    writer::LogWriter,
};

pub use config::{
    DEFAULT_KILL_TIMEOUT, DEFAULT_LOG_TIMEOUT, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_BATCH_ENTRIES,
    DEFAULT_QUEUE_CAPACITY, PipelineConfig,
};
pub use worker::WORKER_THREAD_NAME;

use worker::DeliveryWorker;

static GLOBAL: Lazy<Pipeline> = Lazy::new(Pipeline::from_env);

/// Errors raised while starting a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no supervisor client configured")]
    NoSupervisor,
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
    #[error("failed to spawn delivery worker: {0}")]
    Spawn(#[from] io::Error),
}

/// State shared by producers and the delivery worker.
pub(crate) struct Shared {
    active: Mutex<Arc<LogBatch>>,
    queue: Sender<Arc<LogBatch>>,
    stopped: AtomicBool,
}

impl Shared {
    /// Queue a fresh batch and make it the active one.
    ///
    /// Blocks while the queue is full. Once the worker has stopped the send
    /// fails immediately and the batch is never shipped.
    fn start_rotation(&self, active: &mut Arc<LogBatch>) {
        let batch = Arc::new(LogBatch::new());
        let _ = self.queue.send(Arc::clone(&batch));
        *active = batch;
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    client: Option<Arc<dyn SupervisorClient>>,
    console: Console,
    terminator: Arc<dyn Terminate>,
    tagger: ExecutionTagger,
    runtime: OnceCell<Arc<Shared>>,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The process-wide pipeline, built from the environment on first use.
    pub fn global() -> &'static Pipeline {
        &GLOBAL
    }

    /// Build a pipeline from the supervisor variables in the environment and
    /// start it when they are present.
    ///
    /// Problems are reported on `stderr` and leave the pipeline
    /// uninitialized, so logging degrades to console output.
    pub fn from_env() -> Self {
        let config = match SupervisorConfig::from_env() {
            Ok(Some(config)) => config,
            Ok(None) => return Self::builder().build(),
            Err(err) => {
                Console::stderr().write_line(&format!("funcbridge: {err}; logging to stderr"));
                return Self::builder().build();
            }
        };

        let pipeline = Self::builder()
            .with_config(PipelineConfig::from(&config))
            .with_client(HttpSupervisorClient::from_config(&config))
            .build();
        if let Err(err) = pipeline.initialize() {
            pipeline
                .console
                .write_line(&format!("funcbridge: {err}; logging to stderr"));
        }
        pipeline
    }

    /// Start the queue and delivery worker. Idempotent and race-safe.
    ///
    /// # Errors
    ///
    /// Fails if the pipeline has no client, the queue capacity is zero, or
    /// the worker thread cannot be spawned. A failed attempt may be retried.
    pub fn initialize(&self) -> Result<(), PipelineError> {
        self.runtime.get_or_try_init(|| self.start()).map(|_| ())
    }

    fn start(&self) -> Result<Arc<Shared>, PipelineError> {
        let client = self.client.clone().ok_or(PipelineError::NoSupervisor)?;
        if self.config.queue_capacity == 0 {
            return Err(PipelineError::ZeroCapacity);
        }

        let (tx, rx) = bounded(self.config.queue_capacity);
        let first = Arc::new(LogBatch::new());
        let shared = Arc::new(Shared {
            active: Mutex::new(Arc::clone(&first)),
            queue: tx,
            stopped: AtomicBool::new(false),
        });
        // The queue is empty and its receiver alive, so this cannot fail.
        let _ = shared.queue.try_send(first);

        DeliveryWorker {
            shared: Arc::clone(&shared),
            rx,
            client,
            console: self.console.clone(),
            terminator: Arc::clone(&self.terminator),
            log_timeout: self.config.log_timeout,
            kill_timeout: self.config.kill_timeout,
        }
        .spawn()?;
        Ok(shared)
    }

    pub fn is_initialized(&self) -> bool {
        self.runtime.get().is_some()
    }

    /// Whether the delivery worker has given up after a failed delivery.
    pub fn is_stopped(&self) -> bool {
        self.runtime
            .get()
            .is_some_and(|shared| shared.stopped.load(Ordering::Acquire))
    }

    /// Append `entry` to the active batch, rotating first if it would
    /// overflow.
    ///
    /// Returns `false` when the entry was not accepted because the pipeline
    /// is uninitialized or stopped; the caller must output it itself.
    pub fn add_entry(&self, entry: LogEntry) -> bool {
        self.offer(entry).is_ok()
    }

    /// Like [`Pipeline::add_entry`], but hands a rejected entry back.
    pub(crate) fn offer(&self, entry: LogEntry) -> Result<(), LogEntry> {
        let Some(shared) = self.runtime.get() else {
            return Err(entry);
        };
        if shared.stopped.load(Ordering::Acquire) {
            return Err(entry);
        }

        let mut active = shared.active.lock();
        if active.would_overflow(entry.payload_len(), self.config.limits) {
            shared.start_rotation(&mut active);
        }
        active.add_entry(entry);
        Ok(())
    }

    pub fn tagger(&self) -> &ExecutionTagger {
        &self.tagger
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Writer producing entries with `severity`.
    pub fn writer(&self, severity: Severity) -> LogWriter<'_> {
        LogWriter::new(self, severity)
    }

    pub fn info_writer(&self) -> LogWriter<'_> {
        self.writer(Severity::Info)
    }

    pub fn error_writer(&self) -> LogWriter<'_> {
        self.writer(Severity::Error)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Builder for [`Pipeline`] instances.
///
/// Defaults: [`PipelineConfig::default`], no client (the pipeline cannot be
/// initialized), console on `stderr`, and [`ProcessExit`] as terminator.
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    client: Option<Arc<dyn SupervisorClient>>,
    console: Option<Console>,
    terminator: Option<Arc<dyn Terminate>>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_client<C>(mut self, client: C) -> Self
    where
        C: SupervisorClient + 'static,
    {
        self.client = Some(Arc::new(client));
        self
    }

    pub fn with_console(mut self, console: Console) -> Self {
        self.console = Some(console);
        self
    }

    pub fn with_terminator<T>(mut self, terminator: T) -> Self
    where
        T: Terminate + 'static,
    {
        self.terminator = Some(Arc::new(terminator));
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            client: self.client,
            console: self.console.unwrap_or_default(),
            terminator: self.terminator.unwrap_or_else(|| Arc::new(ProcessExit)),
            tagger: ExecutionTagger::new(),
            runtime: OnceCell::new(),
        }
    }
}
