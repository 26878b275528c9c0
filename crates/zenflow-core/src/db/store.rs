//! Local store abstraction shared by the libSQL store and its fallback

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Collection, Record};

/// One write inside an atomic batch
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    /// Remove every record of the collection
    Clear(Collection),
    /// Insert records; an existing primary key fails the whole batch
    Insert(Collection, Vec<Record>),
    /// Insert-or-overwrite records by primary key
    Upsert(Collection, Vec<Record>),
}

/// Ordered list of writes applied all-or-nothing across collections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<StoreOp>,
}

impl WriteBatch {
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn clear(&mut self, collection: Collection) -> &mut Self {
        self.ops.push(StoreOp::Clear(collection));
        self
    }

    /// Queue a bulk insert; empty record lists are dropped
    pub fn insert(&mut self, collection: Collection, records: Vec<Record>) -> &mut Self {
        if !records.is_empty() {
            self.ops.push(StoreOp::Insert(collection, records));
        }
        self
    }

    /// Queue a bulk upsert; empty record lists are dropped
    pub fn upsert(&mut self, collection: Collection, records: Vec<Record>) -> &mut Self {
        if !records.is_empty() {
            self.ops.push(StoreOp::Upsert(collection, records));
        }
        self
    }

    pub fn ops(&self) -> &[StoreOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl IntoIterator for WriteBatch {
    type Item = StoreOp;
    type IntoIter = std::vec::IntoIter<StoreOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

/// Persistent per-collection tables.
///
/// Records handed to `put` and to batches must carry a valid primary key
/// (see [`Collection::primary_key`]); implementations reject them otherwise.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read every record of a collection (no pagination)
    async fn read_all(&self, collection: Collection) -> Result<Vec<Record>>;

    /// Primary keys currently present in a collection
    async fn primary_keys(&self, collection: Collection) -> Result<HashSet<String>>;

    /// Get a record by primary key
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Record>>;

    /// Insert or overwrite a single record
    async fn put(&self, collection: Collection, record: Record) -> Result<()>;

    /// Delete a record; returns whether it existed
    async fn delete(&self, collection: Collection, key: &str) -> Result<bool>;

    /// Number of records in a collection
    async fn count(&self, collection: Collection) -> Result<usize>;

    /// Apply a batch in one atomic transaction spanning all touched tables
    async fn apply(&self, batch: WriteBatch) -> Result<()>;

    /// Short name for logs
    fn backend_name(&self) -> &'static str;
}
