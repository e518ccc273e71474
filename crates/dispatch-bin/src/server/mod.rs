//! HTTP control surface for the dispatcher.
//!
//! # Endpoints
//!
//! - `POST /api/v1/scheduler/start` - Start the scheduler (idempotent)
//! - `POST /api/v1/scheduler/stop` - Stop the scheduler (idempotent)
//! - `GET /api/v1/scheduler/status` - `{"running": bool}`
//! - `GET /api/v1/messages/sent` - Delivered messages, earliest first
//! - `GET /health` - Returns 200 if server is running

use std::future::Future;
use std::sync::Arc;

use dispatch_core::{RecordStoreHandle, Scheduler};
use tokio::net::TcpListener;
use tracing::info;

pub mod health;
pub mod messages;
pub mod scheduler;

pub use health::health_handler;
pub use messages::sent_messages_handler;
pub use scheduler::{start_handler, status_handler, stop_handler};

/// Shared application state passed to handlers via `State`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    scheduler: Arc<Scheduler>,
    store: RecordStoreHandle,
}

impl AppState {
    pub fn new(scheduler: Arc<Scheduler>, store: RecordStoreHandle) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { scheduler, store }),
        }
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.inner.scheduler
    }

    pub fn store(&self) -> &RecordStoreHandle {
        &self.inner.store
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router(app_state: AppState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/api/v1/scheduler/start", post(start_handler))
        .route("/api/v1/scheduler/stop", post(stop_handler))
        .route("/api/v1/scheduler/status", get(status_handler))
        .route("/api/v1/messages/sent", get(sent_messages_handler))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

/// Serve the control surface until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, app_state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Control surface listening");
    }
    axum::serve(listener, build_router(app_state))
        .with_graceful_shutdown(shutdown)
        .await
}
