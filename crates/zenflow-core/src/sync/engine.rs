//! Cloud sync engine: pull the user's remote backup, merge it into the
//! local store, then push the merged local state back.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::events::DataEvents;
use super::lock::SyncLock;
use super::orchestrator::{SyncOptions, SyncOrchestrator};
use super::remote::RemoteBackupStore;
use super::session::SessionProvider;
use crate::backup::{apply_import, export_backup, BackupPayload, ImportMode};
use crate::config::SyncTimings;
use crate::db::LocalStore;
use crate::error::{Error, Result};

/// Orchestrator channel used by background backup syncs
pub const BACKUP_CHANNEL: &str = "backup";

/// Result of one `sync_with_cloud` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// Another sync held the lock; nothing was done
    Skipped,
    /// Remote data was imported into an empty local store
    Pulled,
    /// Remote data was merged into existing local data
    Merged,
    /// Nothing to pull; local state was pushed
    Pushed,
}

impl SyncOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Pulled => "pulled",
            Self::Merged => "merged",
            Self::Pushed => "pushed",
        }
    }
}

pub struct CloudSyncEngine {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteBackupStore>,
    sessions: Arc<dyn SessionProvider>,
    lock: SyncLock,
    events: DataEvents,
    orchestrator: SyncOrchestrator,
    last_success: Mutex<Option<Instant>>,
}

impl CloudSyncEngine {
    pub fn new(
        store: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteBackupStore>,
        sessions: Arc<dyn SessionProvider>,
        orchestrator: SyncOrchestrator,
        timings: &SyncTimings,
    ) -> Self {
        Self {
            store,
            remote,
            sessions,
            lock: SyncLock::new(timings.lock_timeout),
            events: DataEvents::new(),
            orchestrator,
            last_success: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    pub const fn lock(&self) -> &SyncLock {
        &self.lock
    }

    pub const fn events(&self) -> &DataEvents {
        &self.events
    }

    pub const fn orchestrator(&self) -> &SyncOrchestrator {
        &self.orchestrator
    }

    /// Time since the last successful sync, if any
    pub fn since_last_success(&self) -> Option<Duration> {
        self.last_success
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|at| at.elapsed())
    }

    /// Pull, merge and push under the sync lock.
    ///
    /// Returns `Skipped` without waiting when another sync holds the lock.
    /// Errors (no signed-in user, invalid remote payload, store or network
    /// failures) are returned after the lock has been released.
    pub async fn sync_with_cloud(&self, mode: ImportMode) -> Result<SyncOutcome> {
        let Some(guard) = self.lock.try_acquire() else {
            tracing::debug!("Sync already in progress; skipping");
            return Ok(SyncOutcome::Skipped);
        };

        let result = self.pull_merge_push(mode).await;
        guard.release();

        match &result {
            Ok(outcome) => {
                *self
                    .last_success
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
                tracing::info!(outcome = outcome.as_str(), mode = %mode, "Cloud sync finished");
            }
            Err(error) => tracing::warn!(mode = %mode, "Cloud sync failed: {}", error),
        }
        result
    }

    async fn pull_merge_push(&self, mode: ImportMode) -> Result<SyncOutcome> {
        let session = self
            .sessions
            .current_session()
            .await?
            .ok_or(Error::NotAuthenticated)?;

        let local = export_backup(self.store.as_ref()).await?;
        let local_activity = local.data.activity_record_count();

        let outcome = match self.remote.fetch(&session).await? {
            Some(row) => {
                let remote = BackupPayload::normalize(row.payload)?;
                if remote.data.activity_record_count() == 0 {
                    SyncOutcome::Pushed
                } else {
                    apply_import(self.store.as_ref(), remote, mode).await?;
                    self.events.notify();
                    if local_activity == 0 {
                        SyncOutcome::Pulled
                    } else {
                        SyncOutcome::Merged
                    }
                }
            }
            None => SyncOutcome::Pushed,
        };

        let merged = export_backup(self.store.as_ref()).await?;
        self.remote.upsert(&session, &merged).await?;
        Ok(outcome)
    }

    /// Best-effort merge sync through the orchestrator; failures are logged.
    ///
    /// The job is abandoned once it outlives the lock timeout, so a wedged
    /// network call frees the orchestrator along with the lock.
    pub async fn silent_sync(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        let limit = self.lock.timeout();
        let result = self
            .orchestrator
            .sync(
                BACKUP_CHANNEL,
                move || {
                    let engine = Arc::clone(&engine);
                    async move {
                        tokio::time::timeout(limit, engine.sync_with_cloud(ImportMode::Merge))
                            .await
                            .map_err(|_| Error::TimedOut(limit))?
                            .map(|_| ())
                    }
                },
                SyncOptions::default(),
            )
            .await;

        if let Err(error) = result {
            tracing::warn!("Background sync failed: {}", error);
        }
    }
}
