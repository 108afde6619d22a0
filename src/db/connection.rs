use crate::error::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS buckets (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 100),
        size TEXT NOT NULL,
        period TEXT NOT NULL CHECK (period IN ('monthly', 'yearly')),
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS transactions (
        id TEXT PRIMARY KEY,
        date TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        amount TEXT NOT NULL,
        bucket_id TEXT REFERENCES buckets(id) ON DELETE SET NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_bucket_id ON transactions(bucket_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
";

/// Handle to the SQLite database file.
///
/// Holds only the path: each unit of work opens its own connection through
/// [`Store::with_connection`] and the connection is dropped when that work ends,
/// whether it succeeded or not.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        configure(&conn)?;
        Ok(conn)
    }

    pub fn migrate(&self) -> Result<()> {
        self.with_connection(migrate)
    }

    pub fn with_connection<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.open()?;
        log::debug!("Acquired connection to {}", self.path.display());
        let result = work(&conn);
        drop(conn);
        log::debug!("Released connection to {}", self.path.display());
        result
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

/// Create the schema if it does not exist yet.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

#[cfg(test)]
pub fn establish_test_connection() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrate(&conn)?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = establish_test_connection().unwrap();
        assert!(migrate(&conn).is_ok());
    }

    #[test]
    fn test_store_creates_schema_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("test.db"));
        store.migrate().unwrap();

        let count: i64 = store
            .with_connection(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('buckets', 'transactions')",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_foreign_keys_enabled_per_connection() {
        let conn = establish_test_connection().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
