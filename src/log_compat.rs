//! Compatibility bridge for the Rust `log` crate.
//!
//! This module provides `SupervisorLogAdapter`, an implementation of
//! `log::Log` that turns `log` macro calls into pipeline entries. Once
//! [`install_global_logger`] has run, `log::error!` produces an `ERROR`
//! entry and every other level an `INFO` entry, tagged with the current
//! execution id like any other writer output.
//!
//! Records emitted on the delivery path are dropped: anything logged from
//! the delivery worker thread or by the HTTP client would otherwise become a
//! new entry whose delivery logs again, and so on without end.

use std::sync::OnceLock;

use log::{Metadata, Record};

use crate::pipeline::{Pipeline, WORKER_THREAD_NAME};
use crate::severity::Severity;

/// Adapter implementing the Rust `log::Log` trait on top of a pipeline.
///
/// Only the formatted message becomes the payload; target, module path and
/// source location are not forwarded.
#[derive(Debug)]
pub struct SupervisorLogAdapter {
    pipeline: &'static Pipeline,
}

impl SupervisorLogAdapter {
    pub fn new(pipeline: &'static Pipeline) -> Self {
        Self { pipeline }
    }
}

fn is_enabled_by_global_max(level: log::Level) -> bool {
    log::max_level() >= level.to_level_filter()
}

const HTTP_CLIENT_TARGET: &str = "ureq";

fn is_http_client_target(target: &str) -> bool {
    target
        .strip_prefix(HTTP_CLIENT_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn is_delivery_path(target: &str) -> bool {
    is_http_client_target(target) || std::thread::current().name() == Some(WORKER_THREAD_NAME)
}

impl log::Log for SupervisorLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        is_enabled_by_global_max(metadata.level()) && !is_delivery_path(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !log::Log::enabled(self, record.metadata()) {
            return;
        }
        self.pipeline
            .writer(Severity::from(record.level()))
            .write_line(&record.args().to_string());
    }

    // Entries are shipped by the delivery worker; there is nothing to flush
    // synchronously.
    fn flush(&self) {}
}

static INSTALL_RESULT: OnceLock<bool> = OnceLock::new();

/// Install the adapter for [`Pipeline::global`] as the global Rust logger.
///
/// Returns `true` on success. When a different global logger is already set,
/// installation fails and `false` is returned. Subsequent calls return the
/// cached outcome.
pub fn install_global_logger() -> bool {
    *INSTALL_RESULT.get_or_init(|| {
        let adapter = SupervisorLogAdapter::new(Pipeline::global());
        if log::set_boxed_logger(Box::new(adapter)).is_err() {
            return false;
        }
        log::set_max_level(log::LevelFilter::Trace);
        true
    })
}
