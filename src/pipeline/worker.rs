//! Background thread shipping sealed batches to the supervisor.
//!
//! The worker is the only consumer of the handoff queue. For each batch it
//! waits until the batch holds at least one entry, seals it by rotating the
//! pipeline if the batch is still active, and reports it. Any delivery
//! failure is terminal: the worker writes the error to the console, marks the
//! pipeline stopped, notifies the supervisor and terminates the process.

use std::{
    io,
    sync::{Arc, atomic::Ordering},
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::Receiver;

use crate::{
    batch::LogBatch,
    console::Console,
    delivery::{DeliveryError, SupervisorClient},
    escalation::{Terminate, kill_instance},
};

use super::Shared;

/// Name given to the delivery thread.
pub const WORKER_THREAD_NAME: &str = "supervisor-log-delivery";

pub(super) struct DeliveryWorker {
    pub(super) shared: Arc<Shared>,
    pub(super) rx: Receiver<Arc<LogBatch>>,
    pub(super) client: Arc<dyn SupervisorClient>,
    pub(super) console: Console,
    pub(super) terminator: Arc<dyn Terminate>,
    pub(super) log_timeout: Duration,
    pub(super) kill_timeout: Duration,
}

impl DeliveryWorker {
    /// Start the worker on a dedicated thread. The thread is never joined.
    pub(super) fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || self.run())
    }

    fn run(self) {
        for batch in self.rx.iter() {
            batch.wait_ready();
            self.seal(&batch);
            if let Err(err) = batch.report(self.client.as_ref(), self.log_timeout) {
                self.escalate(&err);
                return;
            }
        }
    }

    /// Rotate away from `batch` if producers are still writing into it.
    fn seal(&self, batch: &Arc<LogBatch>) {
        let mut active = self.shared.active.lock();
        if Arc::ptr_eq(&active, batch) {
            // `batch` was the newest queued item, so the queue is empty now
            // and this enqueue never waits on the worker itself.
            self.shared.start_rotation(&mut active);
        }
    }

    fn escalate(&self, err: &DeliveryError) {
        self.console.write_line(&err.to_string());
        self.shared.stopped.store(true, Ordering::Release);
        kill_instance(
            self.client.as_ref(),
            &self.console,
            self.terminator.as_ref(),
            self.kill_timeout,
        );
    }
}
