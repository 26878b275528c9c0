//! Shared sync state types observed by UI layers.

use chrono::{DateTime, Utc};

/// Status of the app-wide sync queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    Syncing,
    Success,
    Error,
}

/// Snapshot of the sync orchestrator, published on every transition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrchestratorState {
    pub status: SyncState,
    /// Channel of the job currently running.
    pub current_channel: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_sync_channel: Option<String>,
    pub last_error: Option<String>,
    pub queue_length: usize,
    pub is_online: bool,
}
