use std::path::{Path, PathBuf};

use zenflow_core::backup::{
    export_backup, import_backup, read_backup_file, render_backup_json,
    suggested_backup_file_name, write_backup_file, ImportMode, ImportReport,
};
use zenflow_core::util::unix_timestamp_millis_now;
use zenflow_core::Collection;

use crate::commands::common::open_store;
use crate::error::CliError;

/// Write a full backup to `output_path` (a directory gets a generated file
/// name) or to stdout.
pub async fn run_export(output_path: Option<&Path>, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let payload = export_backup(store.as_ref()).await?;

    if let Some(path) = output_path {
        let path = resolve_export_path(path, unix_timestamp_millis_now());
        write_backup_file(&path, &payload)?;
        println!("{}", path.display());
    } else {
        println!("{}", render_backup_json(&payload)?);
    }

    Ok(())
}

pub fn resolve_export_path(path: &Path, timestamp_ms: i64) -> PathBuf {
    if path.is_dir() {
        path.join(suggested_backup_file_name(timestamp_ms))
    } else {
        path.to_path_buf()
    }
}

pub async fn run_import(
    path: &Path,
    mode: ImportMode,
    as_json: bool,
    db_path: &Path,
) -> Result<ImportReport, CliError> {
    let raw = read_backup_file(path)?;
    let store = open_store(db_path).await?;
    let report = import_backup(store.as_ref(), raw, mode).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_import_report(&report) {
            println!("{line}");
        }
    }
    Ok(report)
}

pub fn format_import_report(report: &ImportReport) -> Vec<String> {
    let mut lines = vec![format!("Imported backup ({} mode)", report.mode)];
    for collection in Collection::ALL {
        let counts = report.get(collection);
        lines.push(format!(
            "  {:<18} added={} updated={} skipped={}",
            collection.payload_field(),
            counts.added,
            counts.updated,
            counts.skipped
        ));
    }
    let total = report.total();
    lines.push(format!(
        "  {:<18} added={} updated={} skipped={}",
        "total", total.added, total.updated, total.skipped
    ));
    lines
}
