//! Background triggers for [`CloudSyncEngine::silent_sync`].
//!
//! Auto-sync runs a periodic timer plus a lifecycle listener; edits go
//! through a debounce so a burst of changes becomes one sync.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::engine::CloudSyncEngine;
use crate::config::SyncTimings;

const LIFECYCLE_CAPACITY: usize = 16;

/// App lifecycle transitions the scheduler reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// App became visible / regained focus
    Foreground,
    Background,
    /// App is shutting down
    Teardown,
}

/// App-owned hub for lifecycle events. Cloning shares the channel.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    sender: broadcast::Sender<LifecycleEvent>,
}

impl Lifecycle {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(LIFECYCLE_CAPACITY);
        Self { sender }
    }

    pub fn emit(&self, event: LifecycleEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

struct AutoSync {
    ticker: JoinHandle<()>,
    listener: JoinHandle<()>,
}

#[derive(Default)]
struct Tasks {
    auto_sync: Option<AutoSync>,
    debounce: Option<JoinHandle<()>>,
}

pub struct SyncScheduler {
    engine: Arc<CloudSyncEngine>,
    timings: SyncTimings,
    lifecycle: Lifecycle,
    tasks: Mutex<Tasks>,
}

impl SyncScheduler {
    #[must_use]
    pub fn new(engine: Arc<CloudSyncEngine>, timings: SyncTimings, lifecycle: Lifecycle) -> Self {
        Self {
            engine,
            timings,
            lifecycle,
            tasks: Mutex::new(Tasks::default()),
        }
    }

    pub fn engine(&self) -> &Arc<CloudSyncEngine> {
        &self.engine
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn tasks(&self) -> MutexGuard<'_, Tasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn is_auto_sync_running(&self) -> bool {
        self.tasks().auto_sync.is_some()
    }

    /// Start the periodic timer and lifecycle listener.
    ///
    /// Returns `false` if auto-sync was already running.
    pub fn start_auto_sync(&self) -> bool {
        let mut tasks = self.tasks();
        if tasks.auto_sync.is_some() {
            return false;
        }

        let period = self.timings.auto_sync_interval;
        let engine = Arc::clone(&self.engine);
        let ticker = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tracing::debug!("Auto-sync tick");
                engine.silent_sync().await;
            }
        });

        let listener = tokio::spawn(listen_lifecycle(
            Arc::clone(&self.engine),
            self.lifecycle.subscribe(),
            self.timings,
        ));

        tasks.auto_sync = Some(AutoSync { ticker, listener });
        tracing::info!(interval_secs = period.as_secs(), "Auto-sync started");
        true
    }

    /// Stop the timer and listener. Returns `false` if auto-sync was not running.
    pub fn stop_auto_sync(&self) -> bool {
        let Some(auto_sync) = self.tasks().auto_sync.take() else {
            return false;
        };
        auto_sync.ticker.abort();
        auto_sync.listener.abort();
        tracing::info!("Auto-sync stopped");
        true
    }

    /// Request a sync after the debounce period; each call restarts the wait.
    pub fn trigger_sync(&self) {
        let mut tasks = self.tasks();
        if let Some(pending) = tasks.debounce.take() {
            pending.abort();
        }

        let delay = self.timings.edit_debounce;
        let engine = Arc::clone(&self.engine);
        tasks.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!("Debounced sync firing");
            engine.silent_sync().await;
        }));
    }

    /// Stop every background trigger and run one final sync.
    pub async fn shutdown(&self) {
        self.stop_auto_sync();
        if let Some(pending) = self.tasks().debounce.take() {
            pending.abort();
        }
        tracing::info!("Running teardown sync");
        self.engine.silent_sync().await;
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(auto_sync) = tasks.auto_sync.take() {
            auto_sync.ticker.abort();
            auto_sync.listener.abort();
        }
        if let Some(pending) = tasks.debounce.take() {
            pending.abort();
        }
    }
}

async fn listen_lifecycle(
    engine: Arc<CloudSyncEngine>,
    mut events: broadcast::Receiver<LifecycleEvent>,
    timings: SyncTimings,
) {
    loop {
        match events.recv().await {
            Ok(LifecycleEvent::Foreground) => {
                let due = engine
                    .since_last_success()
                    .is_none_or(|elapsed| elapsed > timings.foreground_throttle);
                if due {
                    tracing::debug!("Foreground sync");
                    engine.silent_sync().await;
                } else {
                    tracing::debug!("Foreground sync throttled");
                }
            }
            Ok(LifecycleEvent::Teardown) => {
                tracing::debug!("Teardown sync");
                engine.silent_sync().await;
            }
            Ok(LifecycleEvent::Background) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Lifecycle listener lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::backup::ImportMode;
    use crate::models::Collection;
    use crate::sync::orchestrator::SyncOrchestrator;
    use crate::sync::testing::{store_with, FakeRemote, FakeSessions};

    async fn scheduler(remote: Arc<FakeRemote>) -> SyncScheduler {
        let timings = SyncTimings::default();
        let orchestrator = SyncOrchestrator::new(&timings);
        orchestrator.set_enabled(true);
        let store = store_with(Collection::Moods, &[json!({"id": "a"})]).await;
        let engine = CloudSyncEngine::new(
            store,
            remote,
            Arc::new(FakeSessions::signed_in()),
            orchestrator,
            &timings,
        );
        SyncScheduler::new(Arc::new(engine), timings, Lifecycle::new())
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_stop_are_idempotent() {
        let scheduler = scheduler(Arc::new(FakeRemote::default())).await;

        assert!(scheduler.start_auto_sync());
        assert!(!scheduler.start_auto_sync());
        assert!(scheduler.is_auto_sync_running());

        assert!(scheduler.stop_auto_sync());
        assert!(!scheduler.stop_auto_sync());
        assert!(!scheduler.is_auto_sync_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_scheduler_ignores_lifecycle_events() {
        let remote = Arc::new(FakeRemote::default());
        let scheduler = scheduler(Arc::clone(&remote)).await;
        scheduler.start_auto_sync();
        scheduler.stop_auto_sync();
        settle().await;

        scheduler.lifecycle().emit(LifecycleEvent::Foreground);
        scheduler.lifecycle().emit(LifecycleEvent::Teardown);
        settle().await;
        tokio::time::sleep(Duration::from_secs(600)).await;

        assert_eq!(remote.upserts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_syncs_every_interval_until_stopped() {
        let remote = Arc::new(FakeRemote::default());
        let scheduler = scheduler(Arc::clone(&remote)).await;
        scheduler.start_auto_sync();

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(remote.upserts(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(remote.upserts(), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(remote.upserts(), 2);

        scheduler.stop_auto_sync();
        tokio::time::sleep(Duration::from_secs(900)).await;
        assert_eq!(remote.upserts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn foreground_sync_is_throttled() {
        let remote = Arc::new(FakeRemote::default());
        let scheduler = scheduler(Arc::clone(&remote)).await;
        scheduler.start_auto_sync();

        scheduler
            .engine()
            .sync_with_cloud(ImportMode::Merge)
            .await
            .unwrap();
        assert_eq!(remote.upserts(), 1);

        scheduler.lifecycle().emit(LifecycleEvent::Foreground);
        settle().await;
        assert_eq!(remote.upserts(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        scheduler.lifecycle().emit(LifecycleEvent::Foreground);
        settle().await;
        assert_eq!(remote.upserts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_event_syncs() {
        let remote = Arc::new(FakeRemote::default());
        let scheduler = scheduler(Arc::clone(&remote)).await;
        scheduler.start_auto_sync();

        scheduler.lifecycle().emit(LifecycleEvent::Teardown);
        settle().await;
        assert_eq!(remote.upserts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn edit_burst_collapses_into_one_sync() {
        let remote = Arc::new(FakeRemote::default());
        let scheduler = scheduler(Arc::clone(&remote)).await;

        scheduler.trigger_sync();
        tokio::time::sleep(Duration::from_secs(10)).await;
        scheduler.trigger_sync();
        tokio::time::sleep(Duration::from_secs(10)).await;
        scheduler.trigger_sync();

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(remote.upserts(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(remote.upserts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_debounce_and_syncs_once() {
        let remote = Arc::new(FakeRemote::default());
        let scheduler = scheduler(Arc::clone(&remote)).await;
        scheduler.start_auto_sync();
        scheduler.trigger_sync();

        scheduler.shutdown().await;
        assert_eq!(remote.upserts(), 1);
        assert!(!scheduler.is_auto_sync_running());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(remote.upserts(), 1);
    }
}
