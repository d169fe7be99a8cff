//! ureq-backed supervisor client.
//!
//! The agent is built once and reused so connections to the supervisor are
//! pooled. Redirects are disabled: the supervisor never issues them, and a
//! 3xx must surface as a bad status rather than be followed.

use std::{error::Error as _, io, time::Duration};

use ureq::{Agent, AgentBuilder};

use crate::config::SupervisorConfig;

use super::{DeliveryError, SupervisorClient};

pub struct HttpSupervisorClient {
    base_url: String,
    agent: Agent,
}

impl HttpSupervisorClient {
    /// Client posting to `http://{host}:{port}`.
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_base_url(format!("http://{host}:{port}"))
    }

    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self::with_base_url(config.base_url())
    }

    fn with_base_url(base_url: String) -> Self {
        let agent = AgentBuilder::new().redirects(0).build();
        Self { base_url, agent }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl SupervisorClient for HttpSupervisorClient {
    fn post(&self, path: &str, body: &[u8], timeout: Duration) -> Result<(), DeliveryError> {
        let url = format!("{}{}", self.base_url, path);
        let result = self
            .agent
            .post(&url)
            .timeout(timeout)
            .set("Content-Type", "application/json")
            .send_bytes(body);

        match result {
            Ok(response) => classify_status(response.status()),
            Err(err) => Err(classify_error(err)),
        }
    }
}

impl std::fmt::Debug for HttpSupervisorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSupervisorClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Map a response status onto a delivery outcome.
pub(crate) fn classify_status(status: u16) -> Result<(), DeliveryError> {
    match status {
        200..=299 => Ok(()),
        code => Err(DeliveryError::BadStatus(code)),
    }
}

fn classify_error(err: ureq::Error) -> DeliveryError {
    match err {
        ureq::Error::Status(code, _) => DeliveryError::BadStatus(code),
        ureq::Error::Transport(transport) if is_timeout(&transport) => DeliveryError::Timeout,
        ureq::Error::Transport(transport) => DeliveryError::Transport(transport.to_string()),
    }
}

/// Whether any I/O error in the transport's source chain is a deadline.
fn is_timeout(transport: &ureq::Transport) -> bool {
    let mut source = transport.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>()
            && matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            )
        {
            return true;
        }
        source = err.source();
    }
    false
}
