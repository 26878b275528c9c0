//! Typed entity access on top of any local store

use serde_json::Value;

use super::LocalStore;
use crate::error::Result;
use crate::models::{Collection, Entity, Setting};

/// Typed repository over a [`LocalStore`]
pub struct EntityRepository<'a> {
    store: &'a dyn LocalStore,
}

impl<'a> EntityRepository<'a> {
    /// Create a new repository borrowing the given store
    pub const fn new(store: &'a dyn LocalStore) -> Self {
        Self { store }
    }

    /// Insert or overwrite an entity
    pub async fn save<T: Entity>(&self, entity: &T) -> Result<()> {
        let record = entity.to_record()?;
        self.store.put(T::COLLECTION, record).await
    }

    /// Get an entity by primary key
    pub async fn get<T: Entity>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(T::COLLECTION, key).await? {
            Some(record) => Ok(Some(T::from_record(record)?)),
            None => Ok(None),
        }
    }

    /// Read a setting value
    pub async fn setting_value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self
            .get::<Setting>(key)
            .await?
            .map(|setting| setting.value)
            .filter(|value| !value.is_null()))
    }

    /// Number of records in each collection
    pub async fn counts(&self) -> Result<Vec<(Collection, usize)>> {
        let mut counts = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            counts.push((collection, self.store.count(collection).await?));
        }
        Ok(counts)
    }
}
