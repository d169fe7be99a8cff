//! In-memory writer for capturing console output.

use std::{
    io::{self, Write},
    sync::Arc,
};

use parking_lot::Mutex;

/// Thread-safe byte buffer implementing [`Write`].
///
/// Clones share the same buffer, so one clone can be handed to a
/// [`Console`](crate::Console) while the test keeps another for assertions.
#[derive(Clone, Debug, Default)]
pub struct SharedBuf {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    /// Everything written so far, decoded lossily as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Written lines, without their terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
