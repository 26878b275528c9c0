//! Backup codec
//!
//! A backup is a self-describing JSON snapshot of every local collection.
//! This module exports the local store into a [`BackupPayload`], upgrades
//! older payload versions on read, and imports payloads back into the
//! store in either merge or replace mode.
//!
//! Imports treat their input as untrusted: each collection is capped at
//! [`MAX_COLLECTION_RECORDS`], every record is deep-sanitized, and records
//! without a usable primary key are counted as skipped instead of failing
//! the import. All writes of one import land in a single atomic batch.

mod file;
mod report;
mod sanitize;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::{LocalStore, WriteBatch};
use crate::error::{Error, Result};
use crate::models::{Collection, Entity, Record, Setting};
use crate::util::iso_timestamp_now;

pub use file::{read_backup_file, render_backup_json, suggested_backup_file_name, write_backup_file};
pub use report::{ImportCounts, ImportMode, ImportReport};
pub use sanitize::{sanitize_value, FORBIDDEN_KEYS};

/// Version written by [`export_backup`]
pub const BACKUP_SCHEMA_VERSION: u32 = 2;

/// Oldest version [`BackupPayload::normalize`] can upgrade
pub const LEGACY_SCHEMA_VERSION: u32 = 1;

/// Per-collection cap on imported records
pub const MAX_COLLECTION_RECORDS: usize = 100_000;

/// Settings key holding this installation's device identifier
pub const DEVICE_ID_SETTING_KEY: &str = "zenflow-device-id";

const LEGACY_DEVICE_ID: &str = "legacy";
const UNKNOWN_DEVICE_ID: &str = "unknown";

/// Collections carried by a backup.
///
/// Items stay raw JSON until import time; payloads from files or the
/// remote are untrusted and may contain anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    #[serde(default)]
    pub moods: Vec<Value>,
    #[serde(default)]
    pub habits: Vec<Value>,
    #[serde(default)]
    pub focus_sessions: Vec<Value>,
    #[serde(default)]
    pub gratitude_entries: Vec<Value>,
    #[serde(default)]
    pub settings: Vec<Value>,
}

impl BackupData {
    #[must_use]
    pub fn collection(&self, collection: Collection) -> &[Value] {
        match collection {
            Collection::Moods => &self.moods,
            Collection::Habits => &self.habits,
            Collection::FocusSessions => &self.focus_sessions,
            Collection::GratitudeEntries => &self.gratitude_entries,
            Collection::Settings => &self.settings,
        }
    }

    fn collection_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        match collection {
            Collection::Moods => &mut self.moods,
            Collection::Habits => &mut self.habits,
            Collection::FocusSessions => &mut self.focus_sessions,
            Collection::GratitudeEntries => &mut self.gratitude_entries,
            Collection::Settings => &mut self.settings,
        }
    }

    /// Number of moods, habits, focus sessions and gratitude entries
    #[must_use]
    pub fn activity_record_count(&self) -> usize {
        Collection::ACTIVITY
            .iter()
            .map(|collection| self.collection(*collection).len())
            .sum()
    }

    /// Build from a raw `data` object; absent or null collections are empty.
    fn from_object(mut object: Map<String, Value>) -> Result<Self> {
        let mut data = Self::default();
        for collection in Collection::ALL {
            let items = match object.remove(collection.payload_field()) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(Error::InvalidBackup(format!(
                        "'{collection}' must be an array"
                    )));
                }
            };
            *data.collection_mut(collection) = items;
        }
        Ok(data)
    }
}

/// Current-version backup payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    pub schema_version: u32,
    /// ISO-8601 creation time
    pub created_at: String,
    pub device_id: String,
    pub data: BackupData,
}

impl BackupPayload {
    /// Upgrade and validate a raw payload of any supported version.
    ///
    /// Version 1 payloads carried `exportedAt` and no device id; they come
    /// out with `createdAt` taken from `exportedAt` and the device id
    /// `"legacy"`. A version 2 payload without a device id gets `"unknown"`.
    pub fn normalize(raw: Value) -> Result<Self> {
        let Value::Object(mut object) = raw else {
            return Err(Error::InvalidBackup("expected a JSON object".to_string()));
        };

        let version = match object.get("schemaVersion") {
            Some(Value::Number(number)) => number
                .as_u64()
                .and_then(|version| u32::try_from(version).ok())
                .filter(|version| (LEGACY_SCHEMA_VERSION..=BACKUP_SCHEMA_VERSION).contains(version))
                .ok_or_else(|| Error::UnsupportedBackupVersion(number.to_string()))?,
            Some(other) => return Err(Error::UnsupportedBackupVersion(other.to_string())),
            None => return Err(Error::UnsupportedBackupVersion("missing".to_string())),
        };

        let data = match object.remove("data") {
            None | Some(Value::Null) => return Err(Error::MissingBackupData),
            Some(Value::Object(data)) => BackupData::from_object(data)?,
            Some(_) => {
                return Err(Error::InvalidBackup("'data' must be an object".to_string()));
            }
        };

        let text = |key: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let (created_at, device_id) = if version == LEGACY_SCHEMA_VERSION {
            (text("exportedAt"), LEGACY_DEVICE_ID.to_string())
        } else {
            (
                text("createdAt").or_else(|| text("exportedAt")),
                text("deviceId").unwrap_or_else(|| UNKNOWN_DEVICE_ID.to_string()),
            )
        };

        Ok(Self {
            schema_version: BACKUP_SCHEMA_VERSION,
            created_at: created_at.unwrap_or_else(iso_timestamp_now),
            device_id,
            data,
        })
    }

    /// Parse and normalize a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Self::normalize(serde_json::from_str(raw)?)
    }
}

/// Read the stored device id, minting and persisting one on first use.
pub async fn resolve_device_id(store: &dyn LocalStore) -> Result<String> {
    if let Some(record) = store
        .get(Collection::Settings, DEVICE_ID_SETTING_KEY)
        .await?
    {
        match record.get("value") {
            Some(Value::String(value)) if !value.is_empty() => return Ok(value.clone()),
            Some(Value::Null | Value::String(_)) | None => {}
            Some(other) => return Ok(other.to_string()),
        }
    }

    let device_id = format!("device_{}", Uuid::new_v4().simple());
    let setting = Setting::new(DEVICE_ID_SETTING_KEY, Value::String(device_id.clone()));
    store.put(Setting::COLLECTION, setting.to_record()?).await?;
    tracing::debug!(device_id = %device_id, "Minted device id");
    Ok(device_id)
}

/// Snapshot every local collection into a current-version payload.
///
/// The collections are read before the device id is resolved, so a device
/// id minted by this call does not appear in its own settings snapshot.
pub async fn export_backup(store: &dyn LocalStore) -> Result<BackupPayload> {
    let (moods, habits, focus_sessions, gratitude_entries, settings) = tokio::try_join!(
        store.read_all(Collection::Moods),
        store.read_all(Collection::Habits),
        store.read_all(Collection::FocusSessions),
        store.read_all(Collection::GratitudeEntries),
        store.read_all(Collection::Settings),
    )?;

    let device_id = resolve_device_id(store).await?;

    let into_values = |records: Vec<Record>| records.into_iter().map(Value::Object).collect();
    Ok(BackupPayload {
        schema_version: BACKUP_SCHEMA_VERSION,
        created_at: iso_timestamp_now(),
        device_id,
        data: BackupData {
            moods: into_values(moods),
            habits: into_values(habits),
            focus_sessions: into_values(focus_sessions),
            gratitude_entries: into_values(gratitude_entries),
            settings: into_values(settings),
        },
    })
}

/// Normalize a raw payload and import it.
pub async fn import_backup(
    store: &dyn LocalStore,
    raw: Value,
    mode: ImportMode,
) -> Result<ImportReport> {
    let payload = BackupPayload::normalize(raw)?;
    apply_import(store, payload, mode).await
}

/// Validated records of one collection, ready to be written
struct PreparedCollection {
    collection: Collection,
    records: Vec<Record>,
    skipped: usize,
}

fn prepare_collection(collection: Collection, items: Vec<Value>) -> Result<PreparedCollection> {
    if items.len() > MAX_COLLECTION_RECORDS {
        return Err(Error::CollectionTooLarge {
            collection: collection.payload_field(),
            count: items.len(),
            max: MAX_COLLECTION_RECORDS,
        });
    }

    let total = items.len();
    let records: Vec<Record> = items
        .into_iter()
        .filter_map(|item| match sanitize_value(item) {
            Value::Object(record) if collection.primary_key(&record).is_some() => Some(record),
            _ => None,
        })
        .collect();

    Ok(PreparedCollection {
        collection,
        skipped: total - records.len(),
        records,
    })
}

/// Import an already-normalized payload.
///
/// Every collection is validated before anything is written, so an
/// oversized collection leaves the store untouched.
pub async fn apply_import(
    store: &dyn LocalStore,
    mut payload: BackupPayload,
    mode: ImportMode,
) -> Result<ImportReport> {
    let mut prepared = Vec::with_capacity(Collection::ALL.len());
    for collection in Collection::ALL {
        let items = std::mem::take(payload.data.collection_mut(collection));
        prepared.push(prepare_collection(collection, items)?);
    }

    let mut report = ImportReport::new(mode);
    let mut batch = WriteBatch::new();

    match mode {
        ImportMode::Replace => {
            for collection in Collection::ALL {
                batch.clear(collection);
            }
            for entry in prepared {
                let counts = report.get_mut(entry.collection);
                counts.added = entry.records.len();
                counts.skipped = entry.skipped;
                batch.insert(entry.collection, entry.records);
            }
        }
        ImportMode::Merge => {
            let existing: Vec<HashSet<String>> = tokio::try_join!(
                store.primary_keys(Collection::Moods),
                store.primary_keys(Collection::Habits),
                store.primary_keys(Collection::FocusSessions),
                store.primary_keys(Collection::GratitudeEntries),
                store.primary_keys(Collection::Settings),
            )
            .map(|(a, b, c, d, e)| vec![a, b, c, d, e])?;

            for (entry, existing) in prepared.into_iter().zip(existing) {
                let counts = report.get_mut(entry.collection);
                counts.skipped = entry.skipped;
                for record in &entry.records {
                    let is_existing = entry
                        .collection
                        .primary_key(record)
                        .is_some_and(|key| existing.contains(&key));
                    if is_existing {
                        counts.updated += 1;
                    } else {
                        counts.added += 1;
                    }
                }
                batch.upsert(entry.collection, entry.records);
            }
        }
    }

    store.apply(batch).await?;

    let total = report.total();
    tracing::info!(
        mode = %mode,
        backend = store.backend_name(),
        added = total.added,
        updated = total.updated,
        skipped = total.skipped,
        "Imported backup"
    );
    Ok(report)
}
