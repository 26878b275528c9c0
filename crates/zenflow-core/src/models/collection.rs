//! Local collections and their identity rules

use std::fmt;

use serde_json::{Map, Value};

/// A stored record: an arbitrary JSON object carrying its primary key field.
pub type Record = Map<String, Value>;

/// The five independent collections kept in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Moods,
    Habits,
    FocusSessions,
    GratitudeEntries,
    Settings,
}

impl Collection {
    /// Every collection, in export order.
    pub const ALL: [Self; 5] = [
        Self::Moods,
        Self::Habits,
        Self::FocusSessions,
        Self::GratitudeEntries,
        Self::Settings,
    ];

    /// Collections holding user activity (everything except settings).
    pub const ACTIVITY: [Self; 4] = [
        Self::Moods,
        Self::Habits,
        Self::FocusSessions,
        Self::GratitudeEntries,
    ];

    /// Local table name
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Moods => "moods",
            Self::Habits => "habits",
            Self::FocusSessions => "focus_sessions",
            Self::GratitudeEntries => "gratitude_entries",
            Self::Settings => "settings",
        }
    }

    /// Field name inside a backup payload's `data` object
    #[must_use]
    pub const fn payload_field(self) -> &'static str {
        match self {
            Self::Moods => "moods",
            Self::Habits => "habits",
            Self::FocusSessions => "focusSessions",
            Self::GratitudeEntries => "gratitudeEntries",
            Self::Settings => "settings",
        }
    }

    /// Primary key field of each record
    #[must_use]
    pub const fn key_field(self) -> &'static str {
        match self {
            Self::Settings => "key",
            _ => "id",
        }
    }

    #[must_use]
    pub const fn is_activity(self) -> bool {
        !matches!(self, Self::Settings)
    }

    /// Extract the primary key of a record.
    ///
    /// Only a non-empty JSON string counts as a key; anything else means the
    /// record cannot be stored in this collection.
    #[must_use]
    pub fn primary_key(self, record: &Record) -> Option<String> {
        match record.get(self.key_field()) {
            Some(Value::String(key)) if !key.is_empty() => Some(key.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.payload_field())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn primary_key_requires_non_empty_string() {
        let moods = Collection::Moods;
        assert_eq!(
            moods.primary_key(&record(json!({"id": "m1"}))),
            Some("m1".to_string())
        );
        assert_eq!(moods.primary_key(&record(json!({"id": ""}))), None);
        assert_eq!(moods.primary_key(&record(json!({"id": 7}))), None);
        assert_eq!(moods.primary_key(&record(json!({"key": "m1"}))), None);
    }

    #[test]
    fn settings_are_keyed_by_key() {
        let settings = Collection::Settings;
        assert_eq!(
            settings.primary_key(&record(json!({"key": "theme", "value": "dark"}))),
            Some("theme".to_string())
        );
        assert!(!settings.is_activity());
    }
}
