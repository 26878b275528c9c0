use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use zenflow_core::backup::DEVICE_ID_SETTING_KEY;
use zenflow_core::db::EntityRepository;

use crate::commands::common::open_store;
use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub backend: &'static str,
    /// Not assigned until the first export or sync
    pub device_id: Option<String>,
    pub collections: Vec<CollectionCount>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CollectionCount {
    pub name: &'static str,
    pub count: usize,
}

pub async fn collect_status(db_path: &Path) -> Result<StatusReport, CliError> {
    let store = open_store(db_path).await?;
    let repo = EntityRepository::new(store.as_ref());

    let device_id = repo
        .setting_value(DEVICE_ID_SETTING_KEY)
        .await?
        .map(|value| match value {
            Value::String(id) => id,
            other => other.to_string(),
        });
    let collections = repo
        .counts()
        .await?
        .into_iter()
        .map(|(collection, count)| CollectionCount {
            name: collection.payload_field(),
            count,
        })
        .collect();

    Ok(StatusReport {
        backend: store.backend_name(),
        device_id,
        collections,
    })
}

pub async fn run_status(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let report = collect_status(db_path).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Store:  {} ({})", db_path.display(), report.backend);
    println!(
        "Device: {}",
        report.device_id.as_deref().unwrap_or("(not assigned)")
    );
    for entry in &report.collections {
        println!("  {:<18} {}", entry.name, entry.count);
    }
    Ok(())
}
