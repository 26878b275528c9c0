//! libSQL file handle with pragmas applied and schema migrated.

use std::path::Path;

use libsql::{Builder, Connection};

use super::migrations;
use crate::error::Result;

/// Connection settings for a single-writer app database
const PRAGMAS: [&str; 3] = [
    "PRAGMA journal_mode = WAL;",
    "PRAGMA synchronous = NORMAL;",
    "PRAGMA busy_timeout = 5000;",
];

const IN_MEMORY: &str = ":memory:";

/// Migrated local database.
///
/// The libSQL handle is kept alongside the connection so the file stays open
/// for as long as the connection is in use.
pub struct Database {
    _handle: libsql::Database,
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let location = path.as_ref().to_string_lossy().into_owned();
        Self::connect(&location).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::connect(IN_MEMORY).await
    }

    async fn connect(location: &str) -> Result<Self> {
        let handle = Builder::new_local(location).build().await?;
        let conn = handle.connect()?;

        for pragma in PRAGMAS {
            // In-memory databases reject WAL; the rest are best effort too.
            if let Err(error) = conn.execute(pragma, ()).await {
                tracing::debug!("Skipping `{}` on {}: {}", pragma, location, error);
            }
        }
        migrations::run(&conn).await?;

        Ok(Self {
            _handle: handle,
            conn,
        })
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn scalar_text(db: &Database, sql: &str) -> String {
        let mut rows = db.connection().query(sql, ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        row.get(0).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fresh_database_has_every_collection_table() {
        let db = Database::open_in_memory().await.unwrap();
        for collection in crate::models::Collection::ALL {
            let sql = format!(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '{}'",
                collection.table()
            );
            assert_eq!(scalar_text(&db, &sql).await, collection.table());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn file_database_keeps_rows_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zenflow.db");

        Database::open(&path)
            .await
            .unwrap()
            .connection()
            .execute(
                "INSERT INTO settings (record_key, data) VALUES (?1, ?2)",
                libsql::params!["theme", r#"{"key":"theme","value":"dark"}"#],
            )
            .await
            .unwrap();

        let reopened = Database::open(&path).await.unwrap();
        let data = scalar_text(&reopened, "SELECT data FROM settings WHERE record_key = 'theme'").await;
        assert!(data.contains("dark"));
    }
}
