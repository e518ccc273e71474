//! SQLite record store for the message dispatcher.
//!
//! This crate provides:
//! - Async SQLite executor with a dedicated thread
//! - Versioned migrations for the `messages` table
//! - Query helpers for the pending scan, delivery marking and listing
//! - [`SqliteRecordStore`], the `RecordStore` implementation used by the binary
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let store = SqliteRecordStore::new(db);
//! store.insert_message("+1111111", "Hello").await?;
//! ```

mod error;
mod executor;
mod migrations;
pub mod queries;
mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use store::SqliteRecordStore;
