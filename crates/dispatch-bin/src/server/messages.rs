//! Delivered message listing.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dispatch_core::{DispatchError, Message};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use super::AppState;

/// Errors surfaced by the message endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Store(#[from] DispatchError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody {
            error: self.to_string(),
        }))
            .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct SentMessagesResponse {
    pub sent_messages: Vec<Message>,
}

/// `GET /api/v1/messages/sent`: delivered messages, earliest first.
pub async fn sent_messages_handler(
    State(app_state): State<AppState>,
) -> Result<Json<SentMessagesResponse>, ApiError> {
    let sent_messages = app_state.store().list_delivered().await.map_err(|e| {
        error!(error = %e, "Failed to list sent messages");
        ApiError::from(e)
    })?;
    Ok(Json(SentMessagesResponse { sent_messages }))
}
