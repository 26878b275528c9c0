//! libSQL-backed local store

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{params, Connection};
use tokio::sync::Mutex;

use super::store::{LocalStore, StoreOp, WriteBatch};
use super::Database;
use crate::error::{Error, Result};
use crate::models::{Collection, Record};

/// Primary local store: one libSQL table per collection.
#[derive(Clone)]
pub struct LibSqlStore {
    db: Arc<Mutex<Database>>,
}

impl LibSqlStore {
    /// Open (or create) the store at a filesystem path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(path).await?;
        Ok(Self::from_database(db))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db))
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    fn parse_record(collection: Collection, raw: &str) -> Result<Record> {
        match serde_json::from_str(raw)? {
            serde_json::Value::Object(record) => Ok(record),
            _ => Err(Error::Database(format!(
                "stored {collection} record is not a JSON object"
            ))),
        }
    }

    fn record_key(collection: Collection, record: &Record) -> Result<String> {
        collection.primary_key(record).ok_or_else(|| {
            Error::InvalidInput(format!(
                "{collection} record is missing a '{}' string",
                collection.key_field()
            ))
        })
    }

    fn validate(batch: &WriteBatch) -> Result<()> {
        for op in batch.ops() {
            if let StoreOp::Insert(collection, records) | StoreOp::Upsert(collection, records) = op
            {
                for record in records {
                    Self::record_key(*collection, record)?;
                }
            }
        }
        Ok(())
    }

    async fn write_record(
        conn: &Connection,
        collection: Collection,
        record: &Record,
        replace: bool,
    ) -> Result<()> {
        let key = Self::record_key(collection, record)?;
        let data = serde_json::to_string(record)?;
        let verb = if replace {
            "INSERT OR REPLACE"
        } else {
            "INSERT OR IGNORE"
        };
        let written = conn
            .execute(
                &format!(
                    "{verb} INTO {} (record_key, data) VALUES (?1, ?2)",
                    collection.table()
                ),
                params![key.as_str(), data.as_str()],
            )
            .await?;

        if !replace && written == 0 {
            return Err(Error::DuplicateKey {
                collection: collection.payload_field(),
                key,
            });
        }
        Ok(())
    }

    async fn apply_op(conn: &Connection, op: &StoreOp) -> Result<()> {
        match op {
            StoreOp::Clear(collection) => {
                conn.execute(&format!("DELETE FROM {}", collection.table()), ())
                    .await?;
            }
            StoreOp::Insert(collection, records) => {
                for record in records {
                    Self::write_record(conn, *collection, record, false).await?;
                }
            }
            StoreOp::Upsert(collection, records) => {
                for record in records {
                    Self::write_record(conn, *collection, record, true).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for LibSqlStore {
    async fn read_all(&self, collection: Collection) -> Result<Vec<Record>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                &format!("SELECT data FROM {} ORDER BY rowid", collection.table()),
                (),
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let raw: String = row.get(0)?;
            records.push(Self::parse_record(collection, &raw)?);
        }
        Ok(records)
    }

    async fn primary_keys(&self, collection: Collection) -> Result<HashSet<String>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                &format!("SELECT record_key FROM {}", collection.table()),
                (),
            )
            .await?;

        let mut keys = HashSet::new();
        while let Some(row) = rows.next().await? {
            keys.insert(row.get::<String>(0)?);
        }
        Ok(keys)
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Record>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                &format!(
                    "SELECT data FROM {} WHERE record_key = ?1",
                    collection.table()
                ),
                [key],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let raw: String = row.get(0)?;
            Ok(Some(Self::parse_record(collection, &raw)?))
        } else {
            Ok(None)
        }
    }

    async fn put(&self, collection: Collection, record: Record) -> Result<()> {
        let db = self.db.lock().await;
        Self::write_record(db.connection(), collection, &record, true).await
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let removed = db
            .connection()
            .execute(
                &format!("DELETE FROM {} WHERE record_key = ?1", collection.table()),
                [key],
            )
            .await?;
        Ok(removed > 0)
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(&format!("SELECT COUNT(*) FROM {}", collection.table()), ())
            .await?;

        let count: i64 = if let Some(row) = rows.next().await? {
            row.get(0)?
        } else {
            0
        };
        usize::try_from(count).map_err(|_| Error::Database(format!("invalid count {count}")))
    }

    async fn apply(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        Self::validate(&batch)?;

        let db = self.db.lock().await;
        let conn = db.connection();

        conn.execute("BEGIN TRANSACTION", ()).await?;

        for op in batch.ops() {
            if let Err(e) = Self::apply_op(conn, op).await {
                conn.execute("ROLLBACK", ()).await.ok();
                return Err(e);
            }
        }

        if let Err(e) = conn.execute("COMMIT", ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "libsql"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn mood(id: &str, mood: &str) -> Record {
        json!({"id": id, "mood": mood, "date": "2026-01-01", "timestamp": 1})
            .as_object()
            .cloned()
            .unwrap()
    }

    async fn setup() -> LibSqlStore {
        LibSqlStore::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_get_and_delete() {
        let store = setup().await;
        store.put(Collection::Moods, mood("m1", "good")).await.unwrap();

        let fetched = store.get(Collection::Moods, "m1").await.unwrap().unwrap();
        assert_eq!(fetched.get("mood"), Some(&json!("good")));
        assert_eq!(store.count(Collection::Moods).await.unwrap(), 1);

        assert!(store.delete(Collection::Moods, "m1").await.unwrap());
        assert!(!store.delete(Collection::Moods, "m1").await.unwrap());
        assert!(store.get(Collection::Moods, "m1").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_put_rejects_record_without_key() {
        let store = setup().await;
        let record = json!({"mood": "good"}).as_object().cloned().unwrap();
        assert!(store.put(Collection::Moods, record).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_upsert_overwrites_by_key() {
        let store = setup().await;
        store.put(Collection::Moods, mood("m1", "good")).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.upsert(
            Collection::Moods,
            vec![mood("m1", "great"), mood("m2", "okay")],
        );
        store.apply(batch).await.unwrap();

        let keys = store.primary_keys(Collection::Moods).await.unwrap();
        assert_eq!(keys.len(), 2);
        let m1 = store.get(Collection::Moods, "m1").await.unwrap().unwrap();
        assert_eq!(m1.get("mood"), Some(&json!("great")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_batch_rolls_back_every_table() {
        let store = setup().await;
        store.put(Collection::Moods, mood("m1", "good")).await.unwrap();

        let habit = json!({"id": "h1", "name": "Walk", "createdAt": 1})
            .as_object()
            .cloned()
            .unwrap();
        let mut batch = WriteBatch::new();
        batch
            .clear(Collection::Habits)
            .insert(Collection::Habits, vec![habit])
            .insert(Collection::Moods, vec![mood("m1", "bad")]);

        let error = store.apply(batch).await.unwrap_err();
        assert!(matches!(error, Error::DuplicateKey { .. }));

        assert_eq!(store.count(Collection::Habits).await.unwrap(), 0);
        let m1 = store.get(Collection::Moods, "m1").await.unwrap().unwrap();
        assert_eq!(m1.get("mood"), Some(&json!("good")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_read_all_preserves_unknown_fields() {
        let store = setup().await;
        let mut record = mood("m1", "good");
        record.insert("emotion".to_string(), json!({"primary": "joy"}));
        store.put(Collection::Moods, record.clone()).await.unwrap();

        let all = store.read_all(Collection::Moods).await.unwrap();
        assert_eq!(all, vec![record]);
    }
}
