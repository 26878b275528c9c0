//! Error types for zenflow-core

use thiserror::Error;

/// Result type alias using zenflow-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in zenflow-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backup payload is structurally invalid
    #[error("Invalid backup payload: {0}")]
    InvalidBackup(String),

    /// Backup payload declares a schema version we cannot read
    #[error("Unsupported backup version: {0}")]
    UnsupportedBackupVersion(String),

    /// Backup payload has no `data` section
    #[error("Backup payload missing data")]
    MissingBackupData,

    /// A backup collection exceeds the per-collection record cap
    #[error("Backup collection '{collection}' too large ({count} records, max {max})")]
    CollectionTooLarge {
        collection: &'static str,
        count: usize,
        max: usize,
    },

    /// Bulk insert hit a primary key that already exists
    #[error("Duplicate key '{key}' in {collection}")]
    DuplicateKey {
        collection: &'static str,
        key: String,
    },

    /// No authenticated user is available
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Backend client (Supabase) is not configured
    #[error("Cloud backend is not configured")]
    NotConfigured,

    /// Remote API answered with a non-success status
    #[error("Remote API error: {message} ({status})")]
    Remote { status: u16, message: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Session lookup failed
    #[error("Auth error: {0}")]
    Auth(#[from] crate::auth::AuthError),

    /// Queued job was cancelled before it could finish
    #[error("Sync job cancelled")]
    Cancelled,

    /// A sync ran past the lock timeout and was abandoned
    #[error("Sync timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

impl Error {
    /// Whether retrying the failed operation could plausibly succeed.
    ///
    /// Client-side failures (bad payloads, 4xx answers, missing auth or
    /// configuration) will fail the same way again.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { status, .. } => !matches!(*status, 400..=499),
            Self::Database(_)
            | Self::LibSql(_)
            | Self::Io(_)
            | Self::Http(_)
            | Self::Auth(crate::auth::AuthError::Http(_)) => true,
            Self::Auth(_) => false,
            Self::InvalidInput(_)
            | Self::Serialization(_)
            | Self::InvalidBackup(_)
            | Self::UnsupportedBackupVersion(_)
            | Self::MissingBackupData
            | Self::CollectionTooLarge { .. }
            | Self::DuplicateKey { .. }
            | Self::NotAuthenticated
            | Self::NotConfigured
            | Self::Cancelled
            | Self::TimedOut(_) => false,
        }
    }
}
