//! Standalone query functions over the `messages` table.
//!
//! Each function takes a `&Connection` so it can run inside
//! [`AsyncDatabase::call`](crate::AsyncDatabase::call) or against a plain
//! connection in tests.

use crate::{DatabaseError, DatabaseResult};
use chrono::{DateTime, SecondsFormat, Utc};
use dispatch_core::{Delivery, Message, MessageId, MAX_CONTENT_CHARS, MAX_RECIPIENT_CHARS};
use rusqlite::{params, Connection, Row};
use tracing::debug;

/// Insert a pending message.
pub fn insert_message(conn: &Connection, recipient: &str, content: &str) -> DatabaseResult<Message> {
    let recipient_chars = recipient.chars().count();
    if recipient_chars == 0 || recipient_chars > MAX_RECIPIENT_CHARS {
        return Err(DatabaseError::InvalidData(format!(
            "recipient must be 1..={} characters, got {}",
            MAX_RECIPIENT_CHARS, recipient_chars
        )));
    }
    let content_chars = content.chars().count();
    if content_chars > MAX_CONTENT_CHARS {
        return Err(DatabaseError::InvalidData(format!(
            "content must be at most {} characters, got {}",
            MAX_CONTENT_CHARS, content_chars
        )));
    }

    let now = format_timestamp(Utc::now());
    conn.execute(
        "INSERT INTO messages (recipient, content, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![recipient, content, now],
    )?;
    let id = conn.last_insert_rowid();
    debug!(message_id = id, "Inserted pending message");

    get_message(conn, id)?
        .ok_or_else(|| DatabaseError::InvalidData("message missing after insert".to_string()))
}

/// Get a message by ID.
pub fn get_message(conn: &Connection, id: MessageId) -> DatabaseResult<Option<Message>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, recipient, content, delivery_id, sent_at, created_at, updated_at
         FROM messages WHERE id = ?1",
    )?;

    match stmt.query_row(params![id], map_message) {
        Ok(message) => Ok(Some(message)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Up to `limit` pending messages, lowest ID first.
pub fn fetch_pending(conn: &Connection, limit: usize) -> DatabaseResult<Vec<Message>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare_cached(
        "SELECT id, recipient, content, delivery_id, sent_at, created_at, updated_at
         FROM messages WHERE sent_at IS NULL
         ORDER BY id ASC LIMIT ?1",
    )?;

    let messages = stmt
        .query_map(params![limit], map_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

/// Record a delivery on a pending message.
///
/// Returns `false` when the message does not exist or was already delivered;
/// an existing delivery is never overwritten.
pub fn mark_delivered(
    conn: &Connection,
    id: MessageId,
    delivery_id: &str,
    sent_at: DateTime<Utc>,
) -> DatabaseResult<bool> {
    let sent_at = format_timestamp(sent_at);
    let rows = conn.execute(
        "UPDATE messages SET delivery_id = ?1, sent_at = ?2, updated_at = ?2
         WHERE id = ?3 AND sent_at IS NULL",
        params![delivery_id, sent_at, id],
    )?;
    Ok(rows > 0)
}

/// Delivered messages, earliest delivery first.
pub fn list_delivered(conn: &Connection) -> DatabaseResult<Vec<Message>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, recipient, content, delivery_id, sent_at, created_at, updated_at
         FROM messages WHERE sent_at IS NOT NULL
         ORDER BY sent_at ASC, id ASC",
    )?;

    let messages = stmt
        .query_map([], map_message)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let delivery_id: Option<String> = row.get(3)?;
    let sent_at: Option<String> = row.get(4)?;

    let delivery = match (delivery_id, sent_at) {
        (Some(delivery_id), Some(sent_at)) => Some(Delivery {
            delivery_id,
            sent_at: parse_timestamp(4, &sent_at)?,
        }),
        _ => None,
    };

    Ok(Message {
        id: row.get(0)?,
        recipient: row.get(1)?,
        content: row.get(2)?,
        delivery,
        created_at: parse_timestamp(5, &row.get::<_, String>(5)?)?,
        updated_at: parse_timestamp(6, &row.get::<_, String>(6)?)?,
    })
}

// Fixed-width so that text order matches time order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_migrations;
    use chrono::Duration;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_creates_pending_message() {
        let conn = conn();
        let message = insert_message(&conn, "+1111111", "Hello").unwrap();

        assert!(message.id > 0);
        assert_eq!(message.recipient, "+1111111");
        assert_eq!(message.content, "Hello");
        assert!(message.is_pending());
        assert_eq!(message.created_at, message.updated_at);
    }

    #[test]
    fn test_insert_rejects_invalid_lengths() {
        let conn = conn();
        assert!(matches!(
            insert_message(&conn, "", "x"),
            Err(DatabaseError::InvalidData(_))
        ));
        assert!(matches!(
            insert_message(&conn, &"1".repeat(21), "x"),
            Err(DatabaseError::InvalidData(_))
        ));
        assert!(matches!(
            insert_message(&conn, "+1", &"x".repeat(161)),
            Err(DatabaseError::InvalidData(_))
        ));
        // Multi-byte content is measured in characters.
        assert!(insert_message(&conn, "+1", &"é".repeat(160)).is_ok());
    }

    #[test]
    fn test_fetch_pending_orders_by_id_and_limits() {
        let conn = conn();
        let a = insert_message(&conn, "+1", "a").unwrap();
        let b = insert_message(&conn, "+2", "b").unwrap();
        let c = insert_message(&conn, "+3", "c").unwrap();
        mark_delivered(&conn, a.id, "ext-a", Utc::now()).unwrap();

        let pending = fetch_pending(&conn, 2).unwrap();
        let ids: Vec<_> = pending.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![b.id, c.id]);

        assert_eq!(fetch_pending(&conn, 1).unwrap().len(), 1);
        assert!(fetch_pending(&conn, 0).unwrap().is_empty());
    }

    #[test]
    fn test_mark_delivered_is_one_way() {
        let conn = conn();
        let message = insert_message(&conn, "+1", "hi").unwrap();
        let first_at = Utc::now();

        assert!(mark_delivered(&conn, message.id, "ext-1", first_at).unwrap());
        assert!(!mark_delivered(&conn, message.id, "ext-2", first_at + Duration::seconds(5)).unwrap());

        let stored = get_message(&conn, message.id).unwrap().unwrap();
        assert_eq!(stored.delivery_id(), Some("ext-1"));
        assert_eq!(stored.sent_at(), Some(first_at));
        assert_eq!(stored.updated_at, first_at);
    }

    #[test]
    fn test_mark_unknown_message_returns_false() {
        let conn = conn();
        assert!(!mark_delivered(&conn, 42, "ext", Utc::now()).unwrap());
    }

    #[test]
    fn test_list_delivered_orders_by_sent_at() {
        let conn = conn();
        let a = insert_message(&conn, "+1", "a").unwrap();
        let b = insert_message(&conn, "+2", "b").unwrap();
        insert_message(&conn, "+3", "pending").unwrap();

        let base = Utc::now();
        // Delivered out of ID order.
        mark_delivered(&conn, b.id, "ext-b", base).unwrap();
        mark_delivered(&conn, a.id, "ext-a", base + Duration::milliseconds(1)).unwrap();

        let delivered = list_delivered(&conn).unwrap();
        let ids: Vec<_> = delivered.iter().filter_map(|m| m.delivery_id()).collect();
        assert_eq!(ids, vec!["ext-b", "ext-a"]);
    }

    #[test]
    fn test_get_missing_message_is_none() {
        let conn = conn();
        assert!(get_message(&conn, 7).unwrap().is_none());
    }
}
