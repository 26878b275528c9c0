//! Named CLI profiles stored as JSON under the user config directory.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use zenflow_core::config::SyncConfig;
use zenflow_core::util::normalize_text_option;

use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "profiles.json";
const DEFAULT_PROFILE: &str = "default";
const CONFIG_VERSION: u32 = 1;

pub const PROFILE_ENV: &str = "ZENFLOW_PROFILE";
pub const SUPABASE_URL_ENV: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_ENV: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliProfilesConfig {
    pub version: u32,
    pub active_profile: Option<String>,
    pub profiles: BTreeMap<String, CliProfile>,
}

impl Default for CliProfilesConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            active_profile: None,
            profiles: BTreeMap::new(),
        }
    }
}

/// Supabase endpoint and sync opt-in for one profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CliProfile {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    /// Off unless explicitly enabled
    pub cloud_sync_enabled: bool,
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    let Some(base) = dirs::config_dir() else {
        return Err(CliError::Config(
            "Could not determine the user config directory".to_owned(),
        ));
    };
    Ok(base.join("zenflow").join(CONFIG_FILE_NAME))
}

fn config_error(action: &str, path: &Path, error: impl std::fmt::Display) -> CliError {
    CliError::Config(format!("Failed to {action} {}: {error}", path.display()))
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, CliError> {
        Self::load_from_path(&default_config_path()?)
    }

    /// A missing file yields the empty default configuration.
    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => return Err(config_error("read", path, error)),
        };
        let config: Self =
            serde_json::from_str(&raw).map_err(|error| config_error("parse", path, error))?;
        Ok(config.normalized())
    }

    /// Save to the default location and return where it went.
    pub fn save(&self) -> Result<PathBuf, CliError> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CliError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|error| config_error("create", dir, error))?;
        }
        let json = serde_json::to_string_pretty(&self.clone().normalized())?;
        std::fs::write(path, json).map_err(|error| config_error("write", path, error))
    }

    /// Explicit name, then `ZENFLOW_PROFILE`, then the active profile, then `default`.
    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        let from_env = std::env::var(PROFILE_ENV).ok();
        self.resolve_profile_name_with(explicit, from_env.as_deref())
    }

    fn resolve_profile_name_with(&self, explicit: Option<&str>, from_env: Option<&str>) -> String {
        [explicit, from_env, self.active_profile.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
            .unwrap_or(DEFAULT_PROFILE)
            .to_owned()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_owned()).or_default()
    }

    fn normalized(mut self) -> Self {
        self.active_profile = normalize_text_option(self.active_profile.take());
        self.profiles = self
            .profiles
            .into_iter()
            .map(|(name, profile)| (name, profile.normalized()))
            .collect();
        self
    }
}

impl CliProfile {
    pub fn supabase_url(&self) -> Option<String> {
        normalize_text_option(self.supabase_url.clone())
    }

    pub fn supabase_anon_key(&self) -> Option<String> {
        normalize_text_option(self.supabase_anon_key.clone())
    }

    /// Core sync config for this profile, with `SUPABASE_URL` and
    /// `SUPABASE_ANON_KEY` taking precedence when set.
    pub fn sync_config(&self) -> SyncConfig {
        self.sync_config_with(|name| std::env::var(name).ok())
    }

    pub fn sync_config_with(&self, env: impl Fn(&str) -> Option<String>) -> SyncConfig {
        let pick = |name: &str, stored: Option<String>| normalize_text_option(env(name)).or(stored);
        SyncConfig {
            supabase_url: pick(SUPABASE_URL_ENV, self.supabase_url()),
            supabase_anon_key: pick(SUPABASE_ANON_KEY_ENV, self.supabase_anon_key()),
            cloud_sync_enabled: self.cloud_sync_enabled,
        }
    }

    fn normalized(self) -> Self {
        Self {
            supabase_url: normalize_text_option(self.supabase_url)
                .map(|url| url.trim_end_matches('/').to_owned()),
            supabase_anon_key: normalize_text_option(self.supabase_anon_key),
            cloud_sync_enabled: self.cloud_sync_enabled,
        }
    }
}
