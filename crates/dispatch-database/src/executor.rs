//! Async SQLite executor using a dedicated background thread.
//!
//! Every query is shipped to one SQLite thread over a channel and runs in
//! FIFO order, so the Tokio runtime never blocks on disk I/O and the single
//! writer never contends with itself.
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let pending = db.call(|conn| queries::fetch_pending(conn, 2)).await?;
//! ```
//!
//! Only SQL and row mapping belong inside `call()`.

use crate::{migrations, DatabaseError, DatabaseResult};
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

fn from_tokio_rusqlite(e: tokio_rusqlite::Error) -> DatabaseError {
    match e {
        tokio_rusqlite::Error::Rusqlite(e) => DatabaseError::Sqlite(e),
        tokio_rusqlite::Error::Close(_) => DatabaseError::Connection("Connection closed".to_string()),
        other => DatabaseError::Connection(other.to_string()),
    }
}

/// Async SQLite database with a dedicated executor thread.
#[derive(Clone)]
pub struct AsyncDatabase {
    conn: Connection,
    path: String,
}

impl AsyncDatabase {
    /// Open (or create) a database file, apply pragmas and pending migrations.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path_str = path.to_string_lossy().to_string();
        info!(path = %path_str, "Opening message database");

        let conn = Connection::open(path_str.clone())
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA synchronous = NORMAL;
                PRAGMA busy_timeout = 5000;
                ",
            )?;
            Ok(())
        })
        .await
        .map_err(from_tokio_rusqlite)?;

        let db = Self {
            conn,
            path: path_str,
        };
        db.migrate().await?;

        info!(path = %db.path, "Message database initialized with WAL mode");
        Ok(db)
    }

    /// Open a private in-memory database with the schema applied.
    pub async fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let db = Self {
            conn,
            path: ":memory:".to_string(),
        };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> DatabaseResult<()> {
        self.call(|conn| migrations::run_migrations(conn)).await
    }

    /// Run a closure on the SQLite thread and await its result.
    pub async fn call<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> DatabaseResult<T> + Send + 'static,
        T: Send + 'static,
    {
        // Our result rides inside tokio_rusqlite's Ok so both error types survive.
        let outer_result = self.conn.call(move |conn| Ok(f(conn))).await;

        match outer_result {
            Ok(inner) => inner,
            Err(e) => Err(from_tokio_rusqlite(e)),
        }
    }

    /// Like [`call`](Self::call) for closures that only produce rusqlite errors.
    pub async fn call_sqlite<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.conn
            .call(move |conn| Ok(f(conn)?))
            .await
            .map_err(from_tokio_rusqlite)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn health_check(&self) -> DatabaseResult<()> {
        self.call_sqlite(|conn| conn.execute_batch("SELECT 1")).await?;
        debug!("Database health check passed");
        Ok(())
    }

    /// Wait for queued operations, then stop the executor thread.
    pub async fn close(self) -> DatabaseResult<()> {
        self.conn
            .close()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to close database: {:?}", e)))?;
        info!(path = %self.path, "Database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_parent_dirs_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("messages.db");

        let db = AsyncDatabase::open(&db_path).await.unwrap();

        assert!(db_path.exists());
        assert!(db.health_check().await.is_ok());
        let count: i64 = db
            .call_sqlite(|conn| conn.query_row("SELECT COUNT(*) FROM messages", [], |r| r.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_reopen_keeps_messages() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("messages.db");

        let db = AsyncDatabase::open(&db_path).await.unwrap();
        db.call(|conn| queries::insert_message(conn, "+1111111", "Hello"))
            .await
            .unwrap();
        db.close().await.unwrap();

        let db = AsyncDatabase::open(&db_path).await.unwrap();
        let pending = db.call(|conn| queries::fetch_pending(conn, 10)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].content, "Hello");
    }

    #[tokio::test]
    async fn test_concurrent_inserts_are_serialized() {
        let db = AsyncDatabase::open_in_memory().await.unwrap();

        let mut handles = vec![];
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.call(move |conn| queries::insert_message(conn, "+1", &format!("msg {i}")))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let pending = db.call(|conn| queries::fetch_pending(conn, 100)).await.unwrap();
        assert_eq!(pending.len(), 10);
        let ids: Vec<_> = pending.iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
