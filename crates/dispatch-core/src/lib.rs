//! # Dispatch Core
//!
//! Periodically drains pending messages from a record store, pushes each one
//! to an external delivery endpoint, and records the results.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐  tick   ┌──────────────┐  fetch / mark  ┌──────────────┐
//! │  Scheduler  │────────▶│  Dispatcher  │───────────────▶│ RecordStore  │
//! │ (interval)  │         │ (one cycle)  │                └──────────────┘
//! └─────────────┘         └──────┬───────┘
//!                                │ send            ┌──────────────────┐
//!                                ├────────────────▶│ DeliveryEndpoint │
//!                                │ put             └──────────────────┘
//!                                └────────────────▶┌──────────────────┐
//!                                                  │  DeliveryCache   │
//!                                                  └──────────────────┘
//! ```
//!
//! - **[`Scheduler`]**: Stopped/Running state machine that fires one
//!   dispatch cycle per interval, never two at once.
//! - **[`Dispatcher`]**: fetches a batch, truncates content, sends with a
//!   bounded timeout, then marks the store and writes the cache.
//! - **[`CycleReport`]**: per-message [`DeliveryOutcome`]s for a cycle.
//!
//! The record store is authoritative. The cache is write-only and best
//! effort; a failed cache write never undoes a delivery.

mod dispatcher;
mod error;
mod models;
mod ports;
mod report;
mod scheduler;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use dispatcher::{Dispatcher, DEFAULT_SEND_TIMEOUT};
pub use error::{DispatchError, DispatchResult};
pub use models::{
    truncate_content, Delivery, DeliveryState, Message, MessageId, MAX_CONTENT_CHARS,
    MAX_RECIPIENT_CHARS,
};
pub use ports::{
    DeliveryCache, DeliveryCacheHandle, DeliveryEndpoint, DeliveryEndpointHandle, RecordStore,
    RecordStoreHandle,
};
pub use report::{CycleReport, DeliveryOutcome, MessageOutcome};
pub use scheduler::{Scheduler, SchedulerConfig, StartOutcome, StopOutcome, MAX_INTERVAL};
