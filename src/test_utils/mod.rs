//! Helpers shared by unit tests and, through the `test-util` feature, by
//! integration tests.
//!
//! They stand in for the supervisor and the console so that pipeline
//! behaviour can be observed without real network peers or process exits.

mod mock_supervisor;
mod recording_client;
mod shared_buf;

pub use mock_supervisor::{CapturedRequest, MockSupervisor};
pub use recording_client::{FailureMode, RecordedPost, RecordingClient};
pub use shared_buf::SharedBuf;
