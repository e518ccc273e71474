//! Redis delivery cache client.

use crate::error::{CacheError, CacheResult};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use dispatch_core::{DeliveryCache, DispatchResult};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Prefix for every cache key.
pub const KEY_PREFIX: &str = "msgid:";

/// Cache key for a delivery identifier.
pub fn cache_key(delivery_id: &str) -> String {
    format!("{KEY_PREFIX}{delivery_id}")
}

/// Cache value for a delivery time: RFC 3339 at second precision, `Z` suffix.
pub fn cache_value(sent_at: DateTime<Utc>) -> String {
    sent_at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Delivery cache over a multiplexed Redis connection.
pub struct RedisDeliveryCache {
    client: Client,
    conn: RwLock<MultiplexedConnection>,
}

impl RedisDeliveryCache {
    /// Connect and verify the server answers `PING`.
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;

        let cache = Self {
            client,
            conn: RwLock::new(conn),
        };
        cache.ping().await?;

        info!("Connected to Redis delivery cache");
        Ok(cache)
    }

    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self.conn.read().await.clone();
        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err(CacheError::UnexpectedReply {
                command: "PING",
                reply,
            });
        }
        Ok(())
    }

    /// Write one delivery record, reconnecting once if the connection broke.
    pub async fn record(&self, delivery_id: &str, sent_at: DateTime<Utc>) -> CacheResult<()> {
        let key = cache_key(delivery_id);
        let value = cache_value(sent_at);

        let mut conn = self.conn.read().await.clone();
        match conn.set::<_, _, ()>(&key, &value).await {
            Ok(()) => {}
            Err(e) if is_connection_error(&e) => {
                warn!(error = %e, "Redis connection lost, reconnecting");
                let mut fresh = self.reconnect().await?;
                fresh.set::<_, _, ()>(&key, &value).await?;
            }
            Err(e) => return Err(e.into()),
        }

        debug!(key = %key, "Cached delivery");
        Ok(())
    }

    async fn reconnect(&self) -> CacheResult<MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        *self.conn.write().await = conn.clone();
        Ok(conn)
    }
}

fn is_connection_error(e: &redis::RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal()
}

#[async_trait]
impl DeliveryCache for RedisDeliveryCache {
    async fn put(&self, delivery_id: &str, sent_at: DateTime<Utc>) -> DispatchResult<()> {
        Ok(self.record(delivery_id, sent_at).await?)
    }
}
