//! HTTP delivery endpoint for the message dispatcher.
//!
//! [`WebhookSender`] POSTs `{"to", "content"}` as JSON to a configured URL and
//! expects `{"message", "messageId"}` back. Any non-2xx status, unparseable
//! body, or missing `messageId` is a send failure.

mod client;
mod error;

pub use client::{SendRequest, SendResponse, SenderConfig, WebhookSender, AUTH_HEADER};
pub use error::{SenderError, SenderResult};
