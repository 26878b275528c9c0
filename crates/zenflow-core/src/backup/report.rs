//! Import modes and the per-collection import summary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Collection;

/// How an imported payload is combined with local data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Add new records and overwrite existing ones by primary key
    #[default]
    Merge,
    /// Clear every collection, then insert the imported records
    Replace,
}

impl ImportMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for ImportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown import mode '{other}'")),
        }
    }
}

/// Counts for one collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    /// Key not previously present locally
    pub added: usize,
    /// Key already present, value overwritten
    pub updated: usize,
    /// Invalid record dropped
    pub skipped: usize,
}

/// Transient summary of one import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub mode: ImportMode,
    pub moods: ImportCounts,
    pub habits: ImportCounts,
    pub focus_sessions: ImportCounts,
    pub gratitude_entries: ImportCounts,
    pub settings: ImportCounts,
}

impl ImportReport {
    #[must_use]
    pub fn new(mode: ImportMode) -> Self {
        Self {
            mode,
            moods: ImportCounts::default(),
            habits: ImportCounts::default(),
            focus_sessions: ImportCounts::default(),
            gratitude_entries: ImportCounts::default(),
            settings: ImportCounts::default(),
        }
    }

    #[must_use]
    pub const fn get(&self, collection: Collection) -> &ImportCounts {
        match collection {
            Collection::Moods => &self.moods,
            Collection::Habits => &self.habits,
            Collection::FocusSessions => &self.focus_sessions,
            Collection::GratitudeEntries => &self.gratitude_entries,
            Collection::Settings => &self.settings,
        }
    }

    pub fn get_mut(&mut self, collection: Collection) -> &mut ImportCounts {
        match collection {
            Collection::Moods => &mut self.moods,
            Collection::Habits => &mut self.habits,
            Collection::FocusSessions => &mut self.focus_sessions,
            Collection::GratitudeEntries => &mut self.gratitude_entries,
            Collection::Settings => &mut self.settings,
        }
    }

    /// Sum over every collection
    #[must_use]
    pub fn total(&self) -> ImportCounts {
        Collection::ALL
            .iter()
            .fold(ImportCounts::default(), |mut total, collection| {
                let counts = self.get(*collection);
                total.added += counts.added;
                total.updated += counts.updated;
                total.skipped += counts.skipped;
                total
            })
    }
}
