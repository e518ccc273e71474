//! One-shot CLI commands.

use super::{build_dispatcher, open_store, AppResult};
use dispatch_config_and_utils::{Config, Paths};
use dispatch_core::{CycleReport, Message, RecordStore, RecordStoreHandle};
use std::sync::Arc;
use tracing::info;

/// Insert a pending message and print it.
pub async fn enqueue(config: &Config, paths: &Paths, to: &str, content: &str) -> AppResult<()> {
    let store = open_store(config, paths).await?;
    let message = store.insert_message(to, content).await?;
    info!(message_id = message.id, "Message enqueued");
    println!("{}", serde_json::to_string_pretty(&message)?);
    Ok(())
}

/// Run a single dispatch cycle and print its report.
pub async fn run_once(config: &Config, paths: &Paths, batch_size: Option<usize>) -> AppResult<()> {
    let store: RecordStoreHandle = Arc::new(open_store(config, paths).await?);
    let dispatcher = build_dispatcher(config, store).await?;
    let batch_size = batch_size.unwrap_or(config.dispatch_batch_size);

    let report: CycleReport = dispatcher.process_pending(batch_size).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print delivered messages, earliest first.
pub async fn sent(config: &Config, paths: &Paths) -> AppResult<()> {
    let store = open_store(config, paths).await?;
    let delivered: Vec<Message> = store.list_delivered().await?;
    println!("{}", serde_json::to_string_pretty(&delivered)?);
    Ok(())
}
