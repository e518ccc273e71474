//! Component construction and the long-running server.

use super::AppResult;
use crate::server::{self, AppState};
use dispatch_config_and_utils::{Config, Paths};
use dispatch_core::{Dispatcher, RecordStoreHandle, Scheduler, SchedulerConfig};
use dispatch_database::{AsyncDatabase, SqliteRecordStore};
use redis_delivery_cache::RedisDeliveryCache;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use webhook_sender::{SenderConfig, WebhookSender};

/// Open the SQLite record store at the configured path.
pub async fn open_store(config: &Config, paths: &Paths) -> AppResult<SqliteRecordStore> {
    let db = AsyncDatabase::open(&config.database_path(paths)).await?;
    info!(path = %db.path(), "Record store ready");
    Ok(SqliteRecordStore::new(db))
}

/// Build the webhook sender and Redis cache, and bind them to `store`.
pub async fn build_dispatcher(config: &Config, store: RecordStoreHandle) -> AppResult<Dispatcher> {
    let webhook_url = config.webhook_url()?;
    let sender = WebhookSender::new(SenderConfig {
        url: webhook_url.to_string(),
        auth_key: config.webhook_auth_key.clone(),
        timeout_secs: config.webhook_timeout_secs,
    })?;
    info!(url = %webhook_url, "Webhook sender initialized");

    let cache = RedisDeliveryCache::connect(&config.redis_url).await?;

    Ok(Dispatcher::new(store, Arc::new(sender), Arc::new(cache))
        .with_send_timeout(config.webhook_timeout()))
}

pub fn scheduler_config(config: &Config) -> SchedulerConfig {
    SchedulerConfig {
        interval: config.dispatch_interval(),
        batch_size: config.dispatch_batch_size,
    }
}

/// Run the scheduler and HTTP control surface until Ctrl-C.
pub async fn run_server(config: Config, paths: Paths, autostart: bool) -> AppResult<()> {
    info!("Starting message dispatcher");
    paths.ensure_dirs()?;

    let store: RecordStoreHandle = Arc::new(open_store(&config, &paths).await?);
    let dispatcher = Arc::new(build_dispatcher(&config, store.clone()).await?);
    let scheduler = Arc::new(Scheduler::new(dispatcher, scheduler_config(&config)));

    if autostart {
        scheduler.start();
    } else {
        info!("Autostart disabled, scheduler waits for POST /api/v1/scheduler/start");
    }

    let listener = TcpListener::bind(config.bind_addr.as_str()).await?;
    let app_state = AppState::new(scheduler.clone(), store);
    server::serve(listener, app_state, shutdown_signal()).await?;

    scheduler.shutdown().await;
    info!("Message dispatcher stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
    }
}
