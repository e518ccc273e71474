//! Dispatch error types.

use crate::MessageId;
use std::time::Duration;
use thiserror::Error;

/// Dispatch error type.
///
/// Collaborator adapters convert their own errors into this type so that the
/// dispatch unit can classify failures without knowing the transport.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Record store read or write failed
    #[error("Record store error: {0}")]
    Store(String),

    /// Delivery endpoint rejected or failed the send
    #[error("Send failed: {0}")]
    Send(String),

    /// Delivery endpoint did not answer in time
    #[error("Delivery endpoint timed out after {0:?}")]
    Timeout(Duration),

    /// Delivery endpoint reported success without an identifier
    #[error("Delivery endpoint returned an empty delivery id")]
    EmptyDeliveryId,

    /// Delivery cache write failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Message is not pending (unknown id or already delivered)
    #[error("Message {0} is not pending")]
    NotPending(MessageId),
}

/// Result type alias using DispatchError.
pub type DispatchResult<T> = Result<T, DispatchError>;
