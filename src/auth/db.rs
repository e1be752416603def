//! Auth Database
//! Mission: One SQLite connection shared by the user and session stores
//!
//! - WAL mode so readers are not blocked by the writer on disk
//! - Every statement runs under a single `parking_lot` mutex, so a reader can
//!   never observe a half-applied session upsert

use anyhow::{Context, Result};
use parking_lot::{Mutex, MutexGuard}; // Faster than std::sync::Mutex
use rusqlite::Connection;
use std::sync::Arc;
use tracing::info;

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fullname TEXT NOT NULL,
    email TEXT UNIQUE NOT NULL,
    secret_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- One row per email: the email is the key, upserts replace token/expiry in place.
CREATE TABLE IF NOT EXISTS sessions (
    email TEXT PRIMARY KEY,
    token TEXT UNIQUE NOT NULL,
    expires_at INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Shared handle to the auth database
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and apply the schema
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open auth database at {db_path}"))?;
        let db = Self::from_connection(conn)?;
        info!(path = %db_path, "Auth database ready");
        Ok(db)
    }

    /// Private in-memory database, used by tests
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to initialize auth schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn table_names(db: &Database) -> Vec<String> {
        let conn = db.lock();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        names
    }

    #[test]
    fn test_schema_created_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let names = table_names(&db);
        assert!(names.contains(&"users".to_string()));
        assert!(names.contains(&"sessions".to_string()));
    }

    #[test]
    fn test_reopen_on_disk_is_idempotent() {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let first = Database::open(path).unwrap();
        drop(first);
        let second = Database::open(path).unwrap();
        assert!(table_names(&second).contains(&"users".to_string()));
        assert!(table_names(&second).contains(&"sessions".to_string()));
    }
}
