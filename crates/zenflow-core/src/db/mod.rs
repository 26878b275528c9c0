//! Local persistence layer for ZenFlow

mod connection;
mod kv_store;
mod libsql_store;
mod migrations;
mod repository;
mod store;

use std::path::Path;
use std::sync::Arc;

pub use connection::Database;
pub use kv_store::KeyValueStore;
pub use libsql_store::LibSqlStore;
pub use repository::EntityRepository;
pub use store::{LocalStore, StoreOp, WriteBatch};

use crate::error::Result;

/// Open the primary libSQL store, falling back to the JSON key/value store
/// next to `db_path` when the database cannot be opened.
pub async fn open_local_store(db_path: impl AsRef<Path>) -> Result<Arc<dyn LocalStore>> {
    let db_path = db_path.as_ref();
    match LibSqlStore::open(db_path).await {
        Ok(store) => {
            tracing::debug!("Opened libSQL store at {}", db_path.display());
            Ok(Arc::new(store))
        }
        Err(error) => {
            let fallback_path = db_path.with_extension("json");
            tracing::warn!(
                "Failed to open libSQL store at {}: {}. Falling back to key/value store at {}",
                db_path.display(),
                error,
                fallback_path.display()
            );
            Ok(Arc::new(KeyValueStore::open(fallback_path)?))
        }
    }
}
