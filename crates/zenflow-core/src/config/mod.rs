//! Cloud sync configuration.
//!
//! `SyncConfig` carries the public Supabase endpoint and anon key plus the
//! user's cloud-sync opt-in. `SyncTimings` groups every timer used by the
//! lock, orchestrator and scheduler so tests can shrink them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

/// Client configuration for cloud sync.
///
/// The anon key is a public, safe-to-ship value. Secret credentials must
/// never be stored here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    /// Off until the user opts in
    #[serde(default)]
    pub cloud_sync_enabled: bool,
}

/// Validated Supabase endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseEndpoint {
    /// Project URL without a trailing slash
    pub url: String,
    pub anon_key: String,
}

impl SupabaseEndpoint {
    /// PostgREST base URL
    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.url)
    }
}

impl SyncConfig {
    /// Resolve the Supabase endpoint.
    ///
    /// Returns `Ok(None)` when neither value is set. Setting only one of
    /// them, or a URL without an http(s) scheme, is a configuration error.
    pub fn supabase(&self) -> Result<Option<SupabaseEndpoint>> {
        let url = normalize_text_option(self.supabase_url.clone());
        let anon_key = normalize_text_option(self.supabase_anon_key.clone());

        match (url, anon_key) {
            (None, None) => Ok(None),
            (Some(url), Some(anon_key)) => {
                if !is_http_url(&url) {
                    return Err(Error::InvalidInput(
                        "Supabase URL must include http:// or https://".to_string(),
                    ));
                }
                Ok(Some(SupabaseEndpoint {
                    url: url.trim_end_matches('/').to_string(),
                    anon_key,
                }))
            }
            _ => Err(Error::NotConfigured),
        }
    }
}

/// Timers for the sync lock, orchestrator retries and the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTimings {
    /// Force-release a held sync lock after this long
    pub lock_timeout: Duration,
    /// Period of the auto-sync timer
    pub auto_sync_interval: Duration,
    /// Minimum time since the last success before a foreground sync
    pub foreground_throttle: Duration,
    /// Quiet period collapsing a burst of edits into one sync
    pub edit_debounce: Duration,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(120),
            auto_sync_interval: Duration::from_secs(5 * 60),
            foreground_throttle: Duration::from_secs(60),
            edit_debounce: Duration::from_secs(30),
            retry_base_delay: Duration::from_secs(1),
            retry_max_delay: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supabase_requires_both_values() {
        let config = SyncConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            supabase_anon_key: None,
            cloud_sync_enabled: true,
        };
        assert!(matches!(config.supabase(), Err(Error::NotConfigured)));
        assert!(SyncConfig::default().supabase().unwrap().is_none());
    }

    #[test]
    fn supabase_trims_trailing_slash() {
        let config = SyncConfig {
            supabase_url: Some(" https://demo.supabase.co/ ".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            cloud_sync_enabled: false,
        };
        let endpoint = config.supabase().unwrap().unwrap();
        assert_eq!(endpoint.url, "https://demo.supabase.co");
        assert_eq!(endpoint.rest_url(), "https://demo.supabase.co/rest/v1");
    }

    #[test]
    fn supabase_rejects_url_without_scheme() {
        let config = SyncConfig {
            supabase_url: Some("demo.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            cloud_sync_enabled: false,
        };
        assert!(matches!(config.supabase(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn config_parses_with_sync_disabled_by_default() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"supabase_url":"https://x.supabase.co"}"#).unwrap();
        assert!(!config.cloud_sync_enabled);
    }

    #[test]
    fn default_timings() {
        let timings = SyncTimings::default();
        assert_eq!(timings.lock_timeout, Duration::from_secs(120));
        assert_eq!(timings.edit_debounce, Duration::from_secs(30));
    }
}
