//! Mood entry model

use serde::{Deserialize, Serialize};

use super::{new_entity_id, Collection, Entity, Record};

/// Five-step mood scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodType {
    Great,
    Good,
    Okay,
    Bad,
    Terrible,
}

impl std::str::FromStr for MoodType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "great" => Ok(Self::Great),
            "good" => Ok(Self::Good),
            "okay" => Ok(Self::Okay),
            "bad" => Ok(Self::Bad),
            "terrible" => Ok(Self::Terrible),
            other => Err(format!("unknown mood '{other}'")),
        }
    }
}

/// A single mood check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: String,
    pub mood: MoodType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Calendar day (`YYYY-MM-DD`)
    pub date: String,
    /// Unix ms
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Fields written by newer clients (emotion wheel etc.), kept verbatim
    #[serde(flatten)]
    pub extra: Record,
}

impl MoodEntry {
    #[must_use]
    pub fn new(mood: MoodType, note: Option<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: new_entity_id(),
            mood,
            note,
            date: now.format("%Y-%m-%d").to_string(),
            timestamp: now.timestamp_millis(),
            tags: None,
            extra: Record::new(),
        }
    }
}

impl Entity for MoodEntry {
    const COLLECTION: Collection = Collection::Moods;
}
