//! Forced termination when log delivery can no longer be trusted.
//!
//! A failed delivery means the local supervisor is misbehaving. The instance
//! is expected to be replaced rather than repaired, so the worker notifies the
//! supervisor and ends the process with a fixed exit code that the instance
//! manager recognises.

use std::time::Duration;

use crate::console::Console;
use crate::delivery::{KILL_PATH, SupervisorClient, post_json};

/// Exit code consumed by the instance manager to trigger a restart.
pub const KILL_EXIT_CODE: i32 = 16;

/// Effect invoked to end the process.
///
/// Production code uses [`ProcessExit`]. Any `Fn(i32)` closure also
/// implements the trait, letting tests observe the exit code instead of
/// exiting.
pub trait Terminate: Send + Sync {
    fn terminate(&self, code: i32);
}

/// Terminates the current process via [`std::process::exit`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessExit;

impl Terminate for ProcessExit {
    fn terminate(&self, code: i32) {
        std::process::exit(code);
    }
}

impl<F> Terminate for F
where
    F: Fn(i32) + Send + Sync,
{
    fn terminate(&self, code: i32) {
        self(code);
    }
}

/// Notify the supervisor and terminate with [`KILL_EXIT_CODE`].
///
/// A failed notification is written to `console` and does not prevent
/// termination.
pub fn kill_instance(
    client: &dyn SupervisorClient,
    console: &Console,
    terminator: &dyn Terminate,
    timeout: Duration,
) {
    if let Err(err) = post_json(client, KILL_PATH, &(), timeout) {
        console.write_line(&err.to_string());
    }
    terminator.terminate(KILL_EXIT_CODE);
}
