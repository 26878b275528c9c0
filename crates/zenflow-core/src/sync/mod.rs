//! Cloud sync: lock, queue, engine and background triggers.
//!
//! [`CloudSyncEngine::sync_with_cloud`] is the explicit, error-surfacing
//! path. [`CloudSyncEngine::silent_sync`] routes the same work through the
//! [`SyncOrchestrator`] and only logs failures; the [`SyncScheduler`] uses it
//! for timer, lifecycle and edit-debounce triggers.

mod engine;
mod events;
mod lock;
mod orchestrator;
mod remote;
mod scheduler;
mod session;

#[cfg(test)]
mod testing;

pub use engine::{CloudSyncEngine, SyncOutcome, BACKUP_CHANNEL};
pub use events::{DataChanged, DataEvents};
pub use lock::{LockToken, SyncLock, SyncLockGuard};
pub use orchestrator::{
    JobFuture, JobOutcome, QueuedJobInfo, SyncOptions, SyncOrchestrator, DEFAULT_MAX_RETRIES,
    DEFAULT_PRIORITY,
};
pub use remote::{RemoteBackupRow, RemoteBackupStore, SupabaseBackupTable, BACKUP_TABLE};
pub use scheduler::{Lifecycle, LifecycleEvent, SyncScheduler};
pub use session::SessionProvider;
