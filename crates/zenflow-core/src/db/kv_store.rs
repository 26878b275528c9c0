//! Fallback key/value store persisted as a single JSON document
//!
//! Used when the libSQL database cannot be opened (read-only media, corrupt
//! file, unsupported platform). Without a path it is purely in-memory.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::store::{LocalStore, StoreOp, WriteBatch};
use crate::error::{Error, Result};
use crate::models::{Collection, Record};

const DOCUMENT_VERSION: u32 = 1;

type Table = BTreeMap<String, Record>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct Document {
    version: u32,
    tables: BTreeMap<String, Table>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            tables: BTreeMap::new(),
        }
    }
}

impl Document {
    fn table(&self, collection: Collection) -> Option<&Table> {
        self.tables.get(collection.table())
    }

    fn table_mut(&mut self, collection: Collection) -> &mut Table {
        self.tables
            .entry(collection.table().to_string())
            .or_default()
    }

    fn apply_op(&mut self, op: StoreOp) -> Result<()> {
        match op {
            StoreOp::Clear(collection) => {
                self.tables.remove(collection.table());
            }
            StoreOp::Insert(collection, records) => {
                let table = self.table_mut(collection);
                for record in records {
                    let key = record_key(collection, &record)?;
                    if table.contains_key(&key) {
                        return Err(Error::DuplicateKey {
                            collection: collection.payload_field(),
                            key,
                        });
                    }
                    table.insert(key, record);
                }
            }
            StoreOp::Upsert(collection, records) => {
                let table = self.table_mut(collection);
                for record in records {
                    table.insert(record_key(collection, &record)?, record);
                }
            }
        }
        Ok(())
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

/// Simple key/value persistence for every collection.
pub struct KeyValueStore {
    path: Option<PathBuf>,
    document: Mutex<Document>,
}

impl KeyValueStore {
    /// Open the store at `path`, loading the existing document if present.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let document = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let document: Document = serde_json::from_str(&raw)?;
            if document.version != DOCUMENT_VERSION {
                return Err(Error::Database(format!(
                    "unsupported key/value document version {}",
                    document.version
                )));
            }
            document
        } else {
            Document::default()
        };

        Ok(Self {
            path: Some(path),
            document: Mutex::new(document),
        })
    }

    /// Create a store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: Mutex::new(Document::default()),
        }
    }

    /// Write `document` through a temp file so a crash never leaves it half written.
    async fn persist(&self, document: &Document) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let serialized = serde_json::to_vec(document)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, serialized).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }
}

#[async_trait]
impl LocalStore for KeyValueStore {
    async fn read_all(&self, collection: Collection) -> Result<Vec<Record>> {
        let document = self.document.lock().await;
        Ok(document
            .table(collection)
            .map(|table| table.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn primary_keys(&self, collection: Collection) -> Result<HashSet<String>> {
        let document = self.document.lock().await;
        Ok(document
            .table(collection)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Record>> {
        let document = self.document.lock().await;
        Ok(document
            .table(collection)
            .and_then(|table| table.get(key).cloned()))
    }

    async fn put(&self, collection: Collection, record: Record) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.upsert(collection, vec![record]);
        self.apply(batch).await
    }

    async fn delete(&self, collection: Collection, key: &str) -> Result<bool> {
        let mut document = self.document.lock().await;
        let mut next = document.clone();
        let removed = next.table_mut(collection).remove(key).is_some();
        if removed {
            self.persist(&next).await?;
            *document = next;
        }
        Ok(removed)
    }

    async fn count(&self, collection: Collection) -> Result<usize> {
        let document = self.document.lock().await;
        Ok(document.table(collection).map_or(0, BTreeMap::len))
    }

    async fn apply(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut document = self.document.lock().await;
        let mut next = document.clone();
        for op in batch {
            next.apply_op(op)?;
        }
        self.persist(&next).await?;
        *document = next;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "key-value"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    fn gratitude(id: &str, text: &str) -> Record {
        json!({"id": id, "text": text, "date": "2026-01-01", "timestamp": 1})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn mood(id: &str) -> Record {
        json!({"id": id, "mood": "good", "timestamp": 1})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_records_persist_across_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("zenflow-store.json");

        {
            let store = KeyValueStore::open(&path).unwrap();
            store
                .put(Collection::GratitudeEntries, gratitude("g1", "sunshine"))
                .await
                .unwrap();
        }

        let store = KeyValueStore::open(&path).unwrap();
        let entries = store.read_all(Collection::GratitudeEntries).await.unwrap();
        assert_eq!(entries, vec![gratitude("g1", "sunshine")]);
    }

    #[tokio::test]
    async fn test_untouched_store_reopens_after_first_write() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("zenflow-store.json");

        KeyValueStore::open(&path)
            .unwrap()
            .put(Collection::Moods, mood("m1"))
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["version"], json!(DOCUMENT_VERSION));

        let reopened = KeyValueStore::open(&path).unwrap();
        assert_eq!(reopened.count(Collection::Moods).await.unwrap(), 1);
    }

    #[test]
    fn test_future_document_version_is_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("zenflow-store.json");
        std::fs::write(&path, r#"{"version":7,"tables":{}}"#).unwrap();

        assert!(matches!(KeyValueStore::open(&path), Err(Error::Database(_))));
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_state_untouched() {
        let store = KeyValueStore::in_memory();
        store
            .put(Collection::GratitudeEntries, gratitude("g1", "tea"))
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch
            .clear(Collection::Moods)
            .insert(Collection::GratitudeEntries, vec![gratitude("g1", "coffee")]);
        assert!(store.apply(batch).await.is_err());

        let g1 = store
            .get(Collection::GratitudeEntries, "g1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(g1.get("text"), Some(&json!("tea")));
    }

    #[tokio::test]
    async fn test_clear_then_insert_replaces_collection() {
        let store = KeyValueStore::in_memory();
        store
            .put(Collection::GratitudeEntries, gratitude("old", "x"))
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch
            .clear(Collection::GratitudeEntries)
            .insert(Collection::GratitudeEntries, vec![gratitude("new", "y")]);
        store.apply(batch).await.unwrap();

        let keys = store.primary_keys(Collection::GratitudeEntries).await.unwrap();
        assert_eq!(keys, HashSet::from(["new".to_string()]));
    }
}
