use thiserror::Error;

/// Reasons a supervisor call did not succeed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The request body could not be encoded.
    #[error("failed to encode supervisor request: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The call did not complete before its deadline.
    #[error("timeout when calling supervisor")]
    Timeout,
    /// The connection failed for a reason other than the deadline.
    #[error("error when calling supervisor: {0}")]
    Transport(String),
    /// The supervisor answered with a non-2xx status.
    #[error("incorrect response code from supervisor: {0}")]
    BadStatus(u16),
}
