//! Fake supervisor recording every request it receives.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::delivery::{DeliveryError, LOG_PATH, SupervisorClient};
use crate::log_entry::LogEntry;

/// Failure injected for every request to a given path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FailureMode {
    Timeout,
    Transport(String),
    BadStatus(u16),
}

impl FailureMode {
    fn to_error(&self) -> DeliveryError {
        match self {
            Self::Timeout => DeliveryError::Timeout,
            Self::Transport(msg) => DeliveryError::Transport(msg.clone()),
            Self::BadStatus(code) => DeliveryError::BadStatus(*code),
        }
    }
}

/// A request observed by [`RecordingClient`].
#[derive(Clone, Debug)]
pub struct RecordedPost {
    pub path: String,
    pub body: Vec<u8>,
    pub timeout: Duration,
}

impl RecordedPost {
    /// Decode the body as a log batch.
    ///
    /// # Panics
    ///
    /// Panics if the body is not a JSON array of entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        serde_json::from_slice(&self.body).expect("body is a JSON array of log entries")
    }
}

#[derive(Default)]
struct State {
    posts: Vec<RecordedPost>,
    paused: bool,
    failures: HashMap<String, FailureMode>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    changed: Condvar,
}

/// [`SupervisorClient`] that records requests instead of sending them.
///
/// While paused, each request is recorded and then held until
/// [`RecordingClient::resume`] is called, simulating a stalled supervisor.
#[derive(Clone, Default)]
pub struct RecordingClient {
    inner: Arc<Inner>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every request received so far.
    pub fn posts(&self) -> Vec<RecordedPost> {
        self.inner.state.lock().posts.clone()
    }

    /// Decoded batches posted to the log endpoint, in delivery order.
    pub fn log_batches(&self) -> Vec<Vec<LogEntry>> {
        self.posts()
            .iter()
            .filter(|post| post.path == LOG_PATH)
            .map(RecordedPost::entries)
            .collect()
    }

    /// Fail every later request to `path` with `mode`.
    pub fn fail_path(&self, path: &str, mode: FailureMode) {
        self.inner
            .state
            .lock()
            .failures
            .insert(path.to_owned(), mode);
    }

    pub fn pause(&self) {
        self.inner.state.lock().paused = true;
    }

    pub fn resume(&self) {
        self.inner.state.lock().paused = false;
        self.inner.changed.notify_all();
    }

    /// Block until at least `count` requests were recorded or `timeout`
    /// elapses. Returns whether the count was reached.
    pub fn wait_for_posts(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| state.posts.len() >= count)
    }

    /// Block until the log endpoint received at least `count` entries in
    /// total or `timeout` elapses.
    pub fn wait_for_log_entries(&self, count: usize, timeout: Duration) -> bool {
        self.wait_until(timeout, |state| {
            state
                .posts
                .iter()
                .filter(|post| post.path == LOG_PATH)
                .map(|post| post.entries().len())
                .sum::<usize>()
                >= count
        })
    }

    fn wait_until(&self, timeout: Duration, done: impl Fn(&State) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        while !done(&*state) {
            if self
                .inner
                .changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return done(&*state);
            }
        }
        true
    }
}

impl SupervisorClient for RecordingClient {
    fn post(&self, path: &str, body: &[u8], timeout: Duration) -> Result<(), DeliveryError> {
        let mut state = self.inner.state.lock();
        state.posts.push(RecordedPost {
            path: path.to_owned(),
            body: body.to_vec(),
            timeout,
        });
        self.inner.changed.notify_all();
        while state.paused {
            self.inner.changed.wait(&mut state);
        }
        state
            .failures
            .get(path)
            .map_or(Ok(()), |mode| Err(mode.to_error()))
    }
}
