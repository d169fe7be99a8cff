//! Writer handles turning text into log entries.
//!
//! A [`LogWriter`] is what user code (or the `log` adapter) holds on to.
//! Each line becomes one [`LogEntry`] tagged with the current execution id.
//! When the pipeline cannot take the entry, the line goes to the console in
//! the fallback format instead, so nothing is silently dropped.

use std::io;

use crate::{log_entry::LogEntry, pipeline::Pipeline, severity::Severity};

#[derive(Clone, Copy, Debug)]
pub struct LogWriter<'a> {
    pipeline: &'a Pipeline,
    severity: Severity,
}

impl<'a> LogWriter<'a> {
    pub(crate) fn new(pipeline: &'a Pipeline, severity: Severity) -> Self {
        Self { pipeline, severity }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Record `payload` as one entry.
    pub fn write_line(&self, payload: &str) {
        let entry = LogEntry::new(payload, self.severity, &self.pipeline.tagger().current());
        if let Err(entry) = self.pipeline.offer(entry) {
            self.pipeline.console().write_str(&entry.console_line());
        }
    }
}

/// Every `write` call is one entry, whatever the buffer contains.
impl io::Write for LogWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_line(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
