//! Error types for the delivery cache.

use dispatch_core::DispatchError;
use thiserror::Error;

/// Delivery cache error type.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Redis connection or operation error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Unexpected reply to a command
    #[error("Unexpected reply to {command}: {reply}")]
    UnexpectedReply { command: &'static str, reply: String },
}

/// Result type for delivery cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

impl From<CacheError> for DispatchError {
    fn from(e: CacheError) -> Self {
        DispatchError::Cache(e.to_string())
    }
}
