//! Shared error type across census crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / unreadable request.
    BadRequest,
    /// Request body over the configured limit.
    PayloadTooLarge,
    /// Host resource sampling failed.
    SamplingFailed,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::SamplingFailed => "SAMPLING_FAILED",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, CensusError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum CensusError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("host sampling failed: {0}")]
    Sampling(String),
    #[error("metrics encoding failed: {0}")]
    Encode(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl CensusError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            CensusError::BadRequest(_) | CensusError::Config(_) => ClientCode::BadRequest,
            CensusError::PayloadTooLarge => ClientCode::PayloadTooLarge,
            CensusError::Sampling(_) => ClientCode::SamplingFailed,
            CensusError::Encode(_) | CensusError::Internal(_) => ClientCode::Internal,
        }
    }
}
