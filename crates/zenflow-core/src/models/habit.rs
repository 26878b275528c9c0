//! Habit model

use serde::{Deserialize, Serialize};

use super::{new_entity_id, Collection, Entity, Record};

/// A habit and the days it was completed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    /// Days (`YYYY-MM-DD`) on which the habit was completed
    #[serde(default)]
    pub completed_dates: Vec<String>,
    /// Unix ms
    pub created_at: i64,
    /// Frequency, reminders, template id and other client-specific fields
    #[serde(flatten)]
    pub extra: Record,
}

impl Habit {
    #[must_use]
    pub fn new(name: impl Into<String>, icon: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            name: name.into(),
            icon: icon.into(),
            color: color.into(),
            completed_dates: Vec::new(),
            created_at: chrono::Utc::now().timestamp_millis(),
            extra: Record::new(),
        }
    }

    #[must_use]
    pub fn is_completed_on(&self, date: &str) -> bool {
        self.completed_dates.iter().any(|day| day == date)
    }

    /// Flip completion for a day; returns the new state.
    pub fn toggle_completion(&mut self, date: &str) -> bool {
        if self.is_completed_on(date) {
            self.completed_dates.retain(|day| day != date);
            false
        } else {
            self.completed_dates.push(date.to_string());
            self.completed_dates.sort();
            true
        }
    }
}

impl Entity for Habit {
    const COLLECTION: Collection = Collection::Habits;
}
