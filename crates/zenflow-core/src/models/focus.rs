//! Focus session model

use serde::{Deserialize, Serialize};

use super::{new_entity_id, Collection, Entity, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusStatus {
    Completed,
    Aborted,
}

/// A finished (or abandoned) focus timer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: String,
    /// Minutes
    pub duration: u32,
    /// Unix ms
    pub completed_at: i64,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<FocusStatus>,
    /// Self-rated focus quality (1-5)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<u8>,
    #[serde(flatten)]
    pub extra: Record,
}

impl FocusSession {
    #[must_use]
    pub fn completed(duration: u32, label: Option<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: new_entity_id(),
            duration,
            completed_at: now.timestamp_millis(),
            date: now.format("%Y-%m-%d").to_string(),
            label,
            status: Some(FocusStatus::Completed),
            reflection: None,
            extra: Record::new(),
        }
    }
}

impl Entity for FocusSession {
    const COLLECTION: Collection = Collection::FocusSessions;
}
