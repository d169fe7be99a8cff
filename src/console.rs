//! Local console output.
//!
//! The console receives everything that cannot or must not go through the
//! supervisor: fallback log lines when no supervisor is configured and
//! diagnostics from the delivery path. It defaults to `stderr`; tests swap in
//! an in-memory writer.

use std::{
    fmt,
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;

/// Shared handle to a line-oriented output stream.
#[derive(Clone)]
pub struct Console {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Console {
    /// Console writing to the process's standard error stream.
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Console writing to an arbitrary writer.
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Write `text` verbatim. Write errors are swallowed: there is nowhere
    /// left to report them.
    pub fn write_str(&self, text: &str) {
        let mut writer = self.writer.lock();
        let _ = writer
            .write_all(text.as_bytes())
            .and_then(|()| writer.flush());
    }

    /// Write `text` followed by a newline unless it already ends with one.
    pub fn write_line(&self, text: &str) {
        if text.ends_with('\n') {
            self.write_str(text);
        } else {
            let mut line = String::with_capacity(text.len() + 1);
            line.push_str(text);
            line.push('\n');
            self.write_str(&line);
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stderr()
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Console(<dyn Write>)")
    }
}
