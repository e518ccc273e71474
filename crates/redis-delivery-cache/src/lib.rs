//! Redis-backed delivery cache.
//!
//! Records `msgid:<delivery id>` → delivery time (RFC 3339, UTC) with no
//! expiry. The record store stays authoritative; this is a lookup aid.

mod cache;
mod error;

pub use cache::{cache_key, cache_value, RedisDeliveryCache, KEY_PREFIX};
pub use error::{CacheError, CacheResult};
