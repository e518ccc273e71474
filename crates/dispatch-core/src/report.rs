//! Per-cycle outcome reporting.

use crate::MessageId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to one message during a dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Sent and marked delivered. `cached` is false when the cache write failed.
    Sent {
        delivery_id: String,
        sent_at: DateTime<Utc>,
        cached: bool,
    },
    /// The endpoint failed, timed out, or returned no identifier. Still pending.
    SendFailed { error: String },
    /// Sent, but the store write failed; the message stays pending and may be resent.
    ReconcileFailed {
        delivery_id: String,
        sent_at: DateTime<Utc>,
        cached: bool,
        error: String,
    },
}

impl DeliveryOutcome {
    /// Whether the endpoint accepted the message, regardless of reconciliation.
    pub fn was_sent(&self) -> bool {
        !matches!(self, Self::SendFailed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageOutcome {
    pub message_id: MessageId,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

/// Outcomes of one dispatch cycle, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub outcomes: Vec<MessageOutcome>,
}

impl CycleReport {
    pub fn push(&mut self, message_id: MessageId, outcome: DeliveryOutcome) {
        self.outcomes.push(MessageOutcome {
            message_id,
            outcome,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Messages that reached the delivered state this cycle.
    pub fn delivered_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, DeliveryOutcome::Sent { .. }))
            .count()
    }

    pub fn send_failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, DeliveryOutcome::SendFailed { .. }))
            .count()
    }

    pub fn reconcile_failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, DeliveryOutcome::ReconcileFailed { .. }))
            .count()
    }

    pub fn outcome_for(&self, message_id: MessageId) -> Option<&DeliveryOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.message_id == message_id)
            .map(|o| &o.outcome)
    }
}
