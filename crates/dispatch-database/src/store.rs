//! [`RecordStore`] backed by the async SQLite executor.

use crate::{queries, AsyncDatabase, DatabaseResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dispatch_core::{DispatchError, DispatchResult, Message, MessageId, RecordStore};

/// SQLite record store.
#[derive(Clone)]
pub struct SqliteRecordStore {
    db: AsyncDatabase,
}

impl SqliteRecordStore {
    pub fn new(db: AsyncDatabase) -> Self {
        Self { db }
    }

    /// Create a pending message.
    pub async fn insert_message(&self, recipient: &str, content: &str) -> DatabaseResult<Message> {
        let recipient = recipient.to_string();
        let content = content.to_string();
        self.db
            .call(move |conn| queries::insert_message(conn, &recipient, &content))
            .await
    }

    pub async fn get_message(&self, id: MessageId) -> DatabaseResult<Option<Message>> {
        self.db.call(move |conn| queries::get_message(conn, id)).await
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn fetch_pending(&self, limit: usize) -> DispatchResult<Vec<Message>> {
        Ok(self
            .db
            .call(move |conn| queries::fetch_pending(conn, limit))
            .await?)
    }

    async fn mark_delivered(
        &self,
        id: MessageId,
        delivery_id: &str,
        sent_at: DateTime<Utc>,
    ) -> DispatchResult<()> {
        let delivery_id = delivery_id.to_string();
        let updated = self
            .db
            .call(move |conn| queries::mark_delivered(conn, id, &delivery_id, sent_at))
            .await?;

        if updated {
            Ok(())
        } else {
            Err(DispatchError::NotPending(id))
        }
    }

    async fn list_delivered(&self) -> DispatchResult<Vec<Message>> {
        Ok(self.db.call(queries::list_delivered).await?)
    }
}
