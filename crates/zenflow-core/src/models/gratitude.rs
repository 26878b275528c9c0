//! Gratitude journal entry model

use serde::{Deserialize, Serialize};

use super::{new_entity_id, Collection, Entity, Record};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GratitudeEntry {
    pub id: String,
    pub text: String,
    pub date: String,
    /// Unix ms
    pub timestamp: i64,
    #[serde(flatten)]
    pub extra: Record,
}

impl GratitudeEntry {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: new_entity_id(),
            text: text.into(),
            date: now.format("%Y-%m-%d").to_string(),
            timestamp: now.timestamp_millis(),
            extra: Record::new(),
        }
    }
}

impl Entity for GratitudeEntry {
    const COLLECTION: Collection = Collection::GratitudeEntries;
}
