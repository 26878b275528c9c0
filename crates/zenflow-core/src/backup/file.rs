//! Backup files on disk

use std::path::Path;

use serde_json::Value;

use super::BackupPayload;
use crate::error::Result;

/// File name for a backup taken at `timestamp_ms`
#[must_use]
pub fn suggested_backup_file_name(timestamp_ms: i64) -> String {
    format!("zenflow-backup-{timestamp_ms}.json")
}

/// Pretty-printed JSON document for a payload
pub fn render_backup_json(payload: &BackupPayload) -> Result<String> {
    Ok(serde_json::to_string_pretty(payload)?)
}

/// Write a payload as a pretty-printed JSON file.
pub fn write_backup_file(path: impl AsRef<Path>, payload: &BackupPayload) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_backup_json(payload)?)?;
    Ok(())
}

/// Read a backup file as raw JSON, ready for normalization.
pub fn read_backup_file(path: impl AsRef<Path>) -> Result<Value> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::backup::{BackupData, BACKUP_SCHEMA_VERSION};

    #[test]
    fn file_name_uses_timestamp() {
        assert_eq!(
            suggested_backup_file_name(1_700_000_000_000),
            "zenflow-backup-1700000000000.json"
        );
    }

    #[test]
    fn written_file_normalizes_back() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("backup.json");
        let payload = BackupPayload {
            schema_version: BACKUP_SCHEMA_VERSION,
            created_at: "2026-03-01T10:00:00.000Z".to_string(),
            device_id: "device_abc".to_string(),
            data: BackupData::default(),
        };

        write_backup_file(&path, &payload).unwrap();
        let raw = read_backup_file(&path).unwrap();
        assert_eq!(raw["createdAt"], "2026-03-01T10:00:00.000Z");
        assert_eq!(BackupPayload::normalize(raw).unwrap(), payload);
    }
}
