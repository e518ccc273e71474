//! Database migrations.
//!
//! Migrations run in order and are tracked in the `migrations` table.

use crate::{DatabaseError, DatabaseResult};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations.
pub fn run_migrations(conn: &Connection) -> DatabaseResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version > CURRENT_VERSION {
        return Err(DatabaseError::Migration(format!(
            "database schema v{current_version} is newer than supported v{CURRENT_VERSION}"
        )));
    }
    if current_version == CURRENT_VERSION {
        debug!(current_version, "Schema up to date");
        return Ok(());
    }

    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_messages(conn)?;
    }
    if current_version < 2 {
        migrate_v2_delivery_indexes(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> DatabaseResult<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: messages table.
///
/// `delivery_id` and `sent_at` are set together or not at all.
fn migrate_v1_messages(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v1: messages");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS messages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipient TEXT NOT NULL CHECK (length(recipient) BETWEEN 1 AND 20),
            content TEXT NOT NULL CHECK (length(content) <= 160),
            delivery_id TEXT,
            sent_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((delivery_id IS NULL) = (sent_at IS NULL))
        );
        ",
    )?;

    record_migration(conn, 1, "messages")
}

/// V2: partial indexes for the pending scan and the delivered listing.
fn migrate_v2_delivery_indexes(conn: &Connection) -> DatabaseResult<()> {
    info!("Applying migration v2: delivery indexes");

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_messages_pending
            ON messages(id) WHERE sent_at IS NULL;
        CREATE INDEX IF NOT EXISTS idx_messages_sent_at
            ON messages(sent_at) WHERE sent_at IS NOT NULL;
        ",
    )?;

    record_migration(conn, 2, "delivery_indexes")
}
