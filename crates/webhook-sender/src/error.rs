//! Webhook sender error types.

use dispatch_core::DispatchError;
use thiserror::Error;

/// Webhook sender error type.
#[derive(Error, Debug)]
pub enum SenderError {
    /// Invalid sender configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure, including client-side timeouts
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Webhook answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON
    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    /// Response had no usable message identifier
    #[error("Response is missing messageId")]
    MissingMessageId,
}

/// Result type alias using SenderError.
pub type SenderResult<T> = Result<T, SenderError>;

impl From<SenderError> for DispatchError {
    fn from(e: SenderError) -> Self {
        match e {
            SenderError::MissingMessageId => DispatchError::EmptyDeliveryId,
            other => DispatchError::Send(other.to_string()),
        }
    }
}
