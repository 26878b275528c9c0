use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use zenflow_core::config::{SyncConfig, SyncTimings};
use zenflow_core::db::{open_local_store, LocalStore};
use zenflow_core::sync::{CloudSyncEngine, SupabaseBackupTable, SyncOrchestrator};
use zenflow_core::util::normalize_text_option;

use crate::auth::SupabaseAuthService;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

pub const DB_PATH_ENV: &str = "ZENFLOW_DB_PATH";

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path {
        return Ok(path);
    }
    if let Some(path) = normalize_text_option(env::var(DB_PATH_ENV).ok()) {
        return Ok(PathBuf::from(path));
    }
    default_db_path()
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("zenflow").join("zenflow.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

pub async fn open_store(path: &Path) -> Result<Arc<dyn LocalStore>, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(open_local_store(path).await?)
}

/// Resolved profile name with its effective sync configuration
pub struct ProfileContext {
    pub name: String,
    pub sync: SyncConfig,
}

impl ProfileContext {
    pub fn load(explicit: Option<&str>) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load()?;
        let name = config.resolve_profile_name(explicit);
        let sync = config
            .profile(&name)
            .map(crate::config_profiles::CliProfile::sync_config)
            .unwrap_or_default();
        Ok(Self { name, sync })
    }

    pub fn auth_service(&self) -> Result<SupabaseAuthService, CliError> {
        SupabaseAuthService::new_for_profile(&self.name, &self.sync)?
            .ok_or_else(|| CliError::SyncNotConfigured(self.name.clone()))
    }
}

/// Wire the cloud sync engine for a profile.
///
/// Fails before touching the network when the profile has no endpoint or
/// has cloud sync turned off.
pub async fn build_engine(
    profile: &ProfileContext,
    db_path: &Path,
    timings: &SyncTimings,
) -> Result<Arc<CloudSyncEngine>, CliError> {
    if !profile.sync.cloud_sync_enabled {
        return Err(CliError::SyncDisabled(profile.name.clone()));
    }
    let endpoint = profile
        .sync
        .supabase()?
        .ok_or_else(|| CliError::SyncNotConfigured(profile.name.clone()))?;
    let sessions = profile.auth_service()?.session_provider();
    let remote = Arc::new(SupabaseBackupTable::new(&endpoint)?);
    let store = open_store(db_path).await?;

    let orchestrator = SyncOrchestrator::new(timings);
    orchestrator.set_enabled(true);

    tracing::info!("Cloud sync enabled via profile '{}'", profile.name);
    Ok(Arc::new(CloudSyncEngine::new(
        store,
        remote,
        sessions,
        orchestrator,
        timings,
    )))
}

/// Join free-form words and reject blank input
pub fn normalize_content(words: &[String]) -> Option<String> {
    normalize_text_option(Some(words.join(" ")))
}
