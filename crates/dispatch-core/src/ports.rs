//! Collaborator contracts consumed by the dispatch pipeline.
//!
//! The record store, delivery endpoint, and delivery cache live in their own
//! crates; the pipeline only ever talks to them through these traits.

use crate::{DispatchResult, Message, MessageId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Durable, authoritative store of messages and their delivery state.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Up to `limit` pending messages, oldest identifier first. May be empty.
    async fn fetch_pending(&self, limit: usize) -> DispatchResult<Vec<Message>>;

    /// Move a pending message to delivered. Never overwrites an earlier delivery.
    async fn mark_delivered(
        &self,
        id: MessageId,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
    ) -> DispatchResult<()>;

    /// Delivered messages ordered by `sent_at` ascending.
    async fn list_delivered(&self) -> DispatchResult<Vec<Message>>;
}

/// External transport that accepts a message and hands back a delivery identifier.
#[async_trait]
pub trait DeliveryEndpoint: Send + Sync {
    async fn send(&self, recipient: &str, content: &str) -> DispatchResult<String>;
}

/// Best-effort lookup of delivery identifier to delivery time. Write-only here.
#[async_trait]
pub trait DeliveryCache: Send + Sync {
    async fn put(&self, delivery_id: &str, sent_at: DateTime<Utc>) -> DispatchResult<()>;
}

pub type RecordStoreHandle = Arc<dyn RecordStore>;
pub type DeliveryEndpointHandle = Arc<dyn DeliveryEndpoint>;
pub type DeliveryCacheHandle = Arc<dyn DeliveryCache>;
