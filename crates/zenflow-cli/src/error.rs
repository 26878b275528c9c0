use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] zenflow_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No entry text provided")]
    EmptyContent,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Cloud sync is not configured for profile '{0}'. Run `zenflow config init --supabase-url <URL> --supabase-anon-key <KEY>`."
    )]
    SyncNotConfigured(String),
    #[error(
        "Cloud sync is disabled for profile '{0}'. Run `zenflow config init --enable-sync` to turn it on."
    )]
    SyncDisabled(String),
    #[error("Not signed in. Run `zenflow auth login --email <email> --password <password>`.")]
    NotSignedIn,
}

impl From<zenflow_core::auth::AuthError> for CliError {
    fn from(error: zenflow_core::auth::AuthError) -> Self {
        Self::Auth(error.to_string())
    }
}
