use dispatch_config_and_utils::CoreError;
use dispatch_core::DispatchError;
use dispatch_database::DatabaseError;
use redis_delivery_cache::CacheError;
use thiserror::Error;
use webhook_sender::SenderError;

/// Errors raised while wiring or running the dispatcher.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] CoreError),

    #[error("Record store error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Webhook sender error: {0}")]
    Sender(#[from] SenderError),

    #[error("Delivery cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
