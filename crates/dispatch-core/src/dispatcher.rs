//! Dispatch unit: one pass over a batch of pending messages.

use crate::{
    CycleReport, DeliveryCacheHandle, DeliveryEndpointHandle, DeliveryOutcome, DispatchError,
    DispatchResult, Message, RecordStoreHandle,
};
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on a single endpoint call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends pending messages and records the results.
///
/// Holds no state of its own between cycles; the record store is the only
/// authority on what is pending.
pub struct Dispatcher {
    store: RecordStoreHandle,
    endpoint: DeliveryEndpointHandle,
    cache: DeliveryCacheHandle,
    send_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        store: RecordStoreHandle,
        endpoint: DeliveryEndpointHandle,
        cache: DeliveryCacheHandle,
    ) -> Self {
        Self {
            store,
            endpoint,
            cache,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Override the per-send timeout.
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Fetch up to `batch_size` pending messages and attempt each one in order.
    ///
    /// Only a failed fetch is returned as an error. Per-message failures are
    /// logged and recorded in the report, and never stop the rest of the batch.
    pub async fn process_pending(&self, batch_size: usize) -> DispatchResult<CycleReport> {
        let batch = self.store.fetch_pending(batch_size).await?;
        let mut report = CycleReport::default();

        if batch.is_empty() {
            debug!("No pending messages");
            return Ok(report);
        }

        debug!(count = batch.len(), "Processing pending messages");

        for message in &batch {
            let outcome = self.dispatch_one(message).await;
            report.push(message.id, outcome);
        }

        info!(
            attempted = report.len(),
            delivered = report.delivered_count(),
            send_failed = report.send_failed_count(),
            reconcile_failed = report.reconcile_failed_count(),
            "Dispatch cycle finished"
        );

        Ok(report)
    }

    /// Delivered messages ordered by delivery time.
    pub async fn list_delivered(&self) -> DispatchResult<Vec<Message>> {
        self.store.list_delivered().await
    }

    async fn dispatch_one(&self, message: &Message) -> DeliveryOutcome {
        let content = message.outgoing_content();

        let delivery_id = match self.send(&message.recipient, content).await {
            Ok(id) => id,
            Err(e) => {
                warn!(message_id = message.id, error = %e, "Failed to send message");
                return DeliveryOutcome::SendFailed {
                    error: e.to_string(),
                };
            }
        };

        let sent_at = Utc::now();

        // Mark before cache; the two writes are independent and neither is rolled back.
        let store_result = self
            .store
            .mark_delivered(message.id, &delivery_id, sent_at)
            .await;
        if let Err(e) = &store_result {
            warn!(
                message_id = message.id,
                delivery_id = %delivery_id,
                error = %e,
                "Message sent but could not be marked delivered"
            );
        }

        let cached = match self.cache.put(&delivery_id, sent_at).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    message_id = message.id,
                    delivery_id = %delivery_id,
                    error = %e,
                    "Failed to cache delivery"
                );
                false
            }
        };

        match store_result {
            Ok(()) => {
                debug!(message_id = message.id, delivery_id = %delivery_id, "Message delivered");
                DeliveryOutcome::Sent {
                    delivery_id,
                    sent_at,
                    cached,
                }
            }
            Err(e) => DeliveryOutcome::ReconcileFailed {
                delivery_id,
                sent_at,
                cached,
                error: e.to_string(),
            },
        }
    }

    async fn send(&self, recipient: &str, content: &str) -> DispatchResult<String> {
        let delivery_id = tokio::time::timeout(
            self.send_timeout,
            self.endpoint.send(recipient, content),
        )
        .await
        .map_err(|_| DispatchError::Timeout(self.send_timeout))??;

        if delivery_id.is_empty() {
            return Err(DispatchError::EmptyDeliveryId);
        }
        Ok(delivery_id)
    }
}
