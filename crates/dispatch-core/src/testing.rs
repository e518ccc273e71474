//! In-memory recording collaborators for exercising the dispatch pipeline.
//!
//! - `MemoryStore`: record store with switchable fetch/mark failures
//! - `ScriptedEndpoint`: delivery endpoint that replays queued responses
//! - `RecordingCache`: delivery cache that remembers every write

use crate::{
    Delivery, DeliveryCache, DeliveryEndpoint, DispatchError, DispatchResult, Message, MessageId,
    RecordStore,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// A `mark_delivered` call as received by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkCall {
    pub id: MessageId,
    pub delivery_id: String,
    pub sent_at: DateTime<Utc>,
}

/// Record store backed by a vector.
#[derive(Default)]
pub struct MemoryStore {
    messages: Mutex<Vec<Message>>,
    marks: Mutex<Vec<MarkCall>>,
    fetch_calls: Mutex<Vec<usize>>,
    fail_fetch: AtomicBool,
    fail_mark: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        let store = Self::new();
        *store.messages.lock() = messages;
        store
    }

    /// Insert a pending message with the next free identifier.
    pub fn insert(&self, recipient: &str, content: &str) -> MessageId {
        let mut messages = self.messages.lock();
        let id = messages.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        messages.push(Message::pending(id, recipient, content, Utc::now()));
        id
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_mark(&self, fail: bool) {
        self.fail_mark.store(fail, Ordering::SeqCst);
    }

    pub fn message(&self, id: MessageId) -> Option<Message> {
        self.messages.lock().iter().find(|m| m.id == id).cloned()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Successful `mark_delivered` calls, in order.
    pub fn marks(&self) -> Vec<MarkCall> {
        self.marks.lock().clone()
    }

    /// Limits passed to `fetch_pending`, in order.
    pub fn fetch_calls(&self) -> Vec<usize> {
        self.fetch_calls.lock().clone()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_pending(&self, limit: usize) -> DispatchResult<Vec<Message>> {
        self.fetch_calls.lock().push(limit);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(DispatchError::Store("simulated fetch failure".to_string()));
        }

        let mut pending: Vec<Message> = self
            .messages
            .lock()
            .iter()
            .filter(|m| m.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|m| m.id);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn mark_delivered(
        &self,
        id: MessageId,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
    ) -> DispatchResult<()> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(DispatchError::Store("simulated mark failure".to_string()));
        }

        let mut messages = self.messages.lock();
        let message = messages
            .iter_mut()
            .find(|m| m.id == id && m.is_pending())
            .ok_or(DispatchError::NotPending(id))?;
        message.delivery = Some(Delivery {
            delivery_id: delivery_id.to_string(),
            sent_at,
        });
        message.updated_at = sent_at;

        self.marks.lock().push(MarkCall {
            id,
            delivery_id: delivery_id.to_string(),
            sent_at,
        });
        Ok(())
    }

    async fn list_delivered(&self) -> DispatchResult<Vec<Message>> {
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(DispatchError::Store("simulated fetch failure".to_string()));
        }

        let mut delivered: Vec<Message> = self
            .messages
            .lock()
            .iter()
            .filter(|m| !m.is_pending())
            .cloned()
            .collect();
        delivered.sort_by_key(|m| m.sent_at());
        Ok(delivered)
    }
}

/// How the scripted endpoint answers one send.
#[derive(Debug, Clone)]
pub enum EndpointResponse {
    Id(String),
    Fail(String),
    /// Never answers; relies on the caller's timeout.
    Hang,
}

/// A send as observed by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCall {
    pub recipient: String,
    pub content: String,
}

/// Delivery endpoint that answers from a queue, then from a default.
pub struct ScriptedEndpoint {
    queued: Mutex<VecDeque<EndpointResponse>>,
    default_response: Mutex<EndpointResponse>,
    calls: Mutex<Vec<SendCall>>,
}

impl ScriptedEndpoint {
    /// Endpoint that always returns `delivery_id`.
    pub fn always(delivery_id: &str) -> Self {
        Self::with_default(EndpointResponse::Id(delivery_id.to_string()))
    }

    pub fn with_default(response: EndpointResponse) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            default_response: Mutex::new(response),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for the next unanswered send.
    pub fn queue(&self, response: EndpointResponse) {
        self.queued.lock().push_back(response);
    }

    pub fn set_default(&self, response: EndpointResponse) {
        *self.default_response.lock() = response;
    }

    pub fn calls(&self) -> Vec<SendCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl DeliveryEndpoint for ScriptedEndpoint {
    async fn send(&self, recipient: &str, content: &str) -> DispatchResult<String> {
        self.calls.lock().push(SendCall {
            recipient: recipient.to_string(),
            content: content.to_string(),
        });

        let response = self
            .queued
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.default_response.lock().clone());

        match response {
            EndpointResponse::Id(id) => Ok(id),
            EndpointResponse::Fail(reason) => Err(DispatchError::Send(reason)),
            EndpointResponse::Hang => std::future::pending().await,
        }
    }
}

/// Delivery cache that keeps every entry in a map.
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    put_calls: Mutex<usize>,
    fail: AtomicBool,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn entries(&self) -> HashMap<String, DateTime<Utc>> {
        self.entries.lock().clone()
    }

    pub fn get(&self, delivery_id: &str) -> Option<DateTime<Utc>> {
        self.entries.lock().get(delivery_id).copied()
    }

    /// Number of `put` calls, including failed ones.
    pub fn put_calls(&self) -> usize {
        *self.put_calls.lock()
    }
}

#[async_trait]
impl DeliveryCache for RecordingCache {
    async fn put(&self, delivery_id: &str, sent_at: DateTime<Utc>) -> DispatchResult<()> {
        *self.put_calls.lock() += 1;
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::Cache("simulated cache failure".to_string()));
        }
        self.entries.lock().insert(delivery_id.to_string(), sent_at);
        Ok(())
    }
}
