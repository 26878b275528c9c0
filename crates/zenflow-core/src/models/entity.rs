//! Typed view over stored records

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::{Collection, Record};
use crate::error::{Error, Result};

/// A typed record that lives in one local collection.
pub trait Entity: Serialize + DeserializeOwned {
    /// Collection this entity is stored in
    const COLLECTION: Collection;

    /// Convert into the untyped record stored locally and in backups
    fn to_record(&self) -> Result<Record> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(record) => Ok(record),
            _ => Err(Error::InvalidInput(format!(
                "{} entity did not serialize to an object",
                Self::COLLECTION
            ))),
        }
    }

    /// Decode a stored record
    fn from_record(record: Record) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(record))?)
    }
}

/// Create a new time-sortable record id
#[must_use]
pub fn new_entity_id() -> String {
    Uuid::now_v7().to_string()
}
