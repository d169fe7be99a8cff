//! HTTP delivery to the supervisor.
//!
//! This module defines the [`SupervisorClient`] seam used by the pipeline to
//! reach the supervisor, together with [`HttpSupervisorClient`], the ureq
//! backed implementation used in production.
//!
//! # Outcome classification
//!
//! Every call makes exactly one attempt and maps the result onto
//! [`DeliveryError`]:
//!
//! - **2xx**: success.
//! - **Deadline exceeded** (connect, write or read): `Timeout`.
//! - **Other transport failures** (refused connection, DNS): `Transport`.
//! - **Any other status**: `BadStatus(code)`.
//!
//! Nothing here retries. The caller decides what a failure means; the
//! pipeline treats every failure as fatal.

mod client;
mod error;

#[cfg(test)]
mod tests;

use std::time::Duration;

use serde::Serialize;

pub use client::HttpSupervisorClient;
pub use error::DeliveryError;

/// Endpoint receiving batches of log entries.
pub const LOG_PATH: &str = "/_ah/log";
/// Endpoint notified before the process terminates itself.
pub const KILL_PATH: &str = "/_ah/kill";

/// Transport used to reach the supervisor.
///
/// Implementations perform a single POST of an already-serialized JSON body
/// and must enforce `timeout` end to end, connection setup included.
pub trait SupervisorClient: Send + Sync {
    fn post(&self, path: &str, body: &[u8], timeout: Duration) -> Result<(), DeliveryError>;
}

impl<C: SupervisorClient + ?Sized> SupervisorClient for std::sync::Arc<C> {
    fn post(&self, path: &str, body: &[u8], timeout: Duration) -> Result<(), DeliveryError> {
        (**self).post(path, body, timeout)
    }
}

/// Serialize `value` as JSON and post it to `path`.
///
/// # Errors
///
/// Returns [`DeliveryError::Serialization`] if `value` cannot be encoded, or
/// whatever the client reports for the request itself.
pub fn post_json<T>(
    client: &dyn SupervisorClient,
    path: &str,
    value: &T,
    timeout: Duration,
) -> Result<(), DeliveryError>
where
    T: Serialize + ?Sized,
{
    let body = serde_json::to_vec(value)?;
    client.post(path, &body, timeout)
}
