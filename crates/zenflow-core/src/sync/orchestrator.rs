//! App-wide sync queue.
//!
//! Every opportunistic sync caller (timer tick, foreground event, edit
//! debounce, teardown) goes through one queue drained by a single worker
//! task, so their network work never overlaps. Pending jobs run in priority
//! order (higher first, FIFO among equals). Failed jobs are retried with
//! exponential backoff unless the error says retrying is pointless.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{oneshot, watch};

use crate::config::SyncTimings;
use crate::error::{Error, Result};
use crate::state::{OrchestratorState, SyncState};

pub const DEFAULT_PRIORITY: u8 = 5;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const MAX_JITTER_MS: u64 = 1_000;
const OFFLINE_MESSAGE: &str = "Device is offline";

/// Boxed work future produced for each attempt of a job
pub type JobFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

type JobFn = Box<dyn FnMut() -> JobFuture + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Higher runs first
    pub priority: u8,
    /// Re-attempts after the first failure
    pub max_retries: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// How a queued job ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Cloud sync is disabled; the work never ran
    Skipped,
}

/// Pending job as reported by [`SyncOrchestrator::queue_info`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJobInfo {
    pub channel: String,
    pub priority: u8,
    pub retries: u32,
}

struct QueuedJob {
    channel: String,
    priority: u8,
    retries: u32,
    max_retries: u32,
    work: JobFn,
    done: oneshot::Sender<Result<()>>,
}

struct Queue {
    pending: Vec<QueuedJob>,
    processing: bool,
    online: bool,
    /// Bumped by `clear_queue` so a job sleeping before its retry is dropped.
    generation: u64,
}

impl Queue {
    fn push(&mut self, job: QueuedJob) {
        let index = self
            .pending
            .iter()
            .position(|queued| queued.priority < job.priority)
            .unwrap_or(self.pending.len());
        self.pending.insert(index, job);
    }
}

struct Shared {
    queue: Mutex<Queue>,
    state: watch::Sender<OrchestratorState>,
    enabled: AtomicBool,
    retry_base_delay: Duration,
    retry_max_delay: Duration,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut OrchestratorState)) {
        self.state.send_modify(apply);
    }

    fn retry_delay(&self, retries: u32) -> Duration {
        let backoff = self
            .retry_base_delay
            .saturating_mul(2_u32.saturating_pow(retries))
            .min(self.retry_max_delay);
        let jitter = rand::thread_rng().gen_range(0..MAX_JITTER_MS);
        backoff + Duration::from_millis(jitter)
    }
}

/// Serializes and retries named sync jobs. Cloning shares the queue.
#[derive(Clone)]
pub struct SyncOrchestrator {
    shared: Arc<Shared>,
}

impl SyncOrchestrator {
    /// New orchestrator: online, with cloud sync disabled.
    #[must_use]
    pub fn new(timings: &SyncTimings) -> Self {
        let (state, _) = watch::channel(OrchestratorState {
            is_online: true,
            ..OrchestratorState::default()
        });
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue {
                    pending: Vec::new(),
                    processing: false,
                    online: true,
                    generation: 0,
                }),
                state,
                enabled: AtomicBool::new(false),
                retry_base_delay: timings.retry_base_delay,
                retry_max_delay: timings.retry_max_delay,
            }),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "Cloud sync toggled");
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Record a connectivity change; going online resumes a paused queue.
    pub fn set_online(&self, online: bool) {
        let mut queue = self.shared.queue();
        if queue.online == online {
            return;
        }
        queue.online = online;
        tracing::info!(online, "Network status changed");
        self.shared.update(|state| state.is_online = online);

        if online && !queue.pending.is_empty() && !queue.processing {
            queue.processing = true;
            drop(queue);
            self.spawn_worker();
        }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.shared.queue().online
    }

    /// Run `work` on `channel` once every earlier, higher-priority job is done.
    ///
    /// Resolves when the job finishes: `Ok(Completed)` on success, the last
    /// error once retries are exhausted, or [`Error::Cancelled`] if the
    /// queue was cleared first. When cloud sync is disabled the work is not
    /// run and `Ok(Skipped)` is returned.
    pub async fn sync<F, Fut>(
        &self,
        channel: impl Into<String>,
        mut work: F,
        options: SyncOptions,
    ) -> Result<JobOutcome>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let channel = channel.into();
        if !self.is_enabled() {
            tracing::debug!(channel = %channel, "Cloud sync disabled; skipping");
            return Ok(JobOutcome::Skipped);
        }

        let (done, finished) = oneshot::channel();
        let job = QueuedJob {
            channel,
            priority: options.priority,
            retries: 0,
            max_retries: options.max_retries,
            work: Box::new(move || -> JobFuture { Box::pin(work()) }),
            done,
        };
        self.enqueue(job);

        match finished.await {
            Ok(Ok(())) => Ok(JobOutcome::Completed),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(Error::Cancelled),
        }
    }

    fn enqueue(&self, job: QueuedJob) {
        let mut queue = self.shared.queue();
        tracing::debug!(channel = %job.channel, priority = job.priority, "Queued sync job");
        queue.push(job);
        let queue_length = queue.pending.len();
        self.shared
            .update(|state| state.queue_length = queue_length);

        if queue.online && !queue.processing {
            queue.processing = true;
            drop(queue);
            self.spawn_worker();
        }
    }

    fn spawn_worker(&self) {
        tokio::spawn(run_worker(Arc::clone(&self.shared)));
    }

    /// Cancel every pending job.
    pub fn clear_queue(&self) {
        let mut queue = self.shared.queue();
        let cancelled = queue.pending.len();
        queue.pending.clear();
        queue.generation += 1;
        drop(queue);

        tracing::info!(cancelled, "Cleared sync queue");
        self.shared.update(|state| {
            state.queue_length = 0;
            state.status = SyncState::Idle;
            state.current_channel = None;
        });
    }

    #[must_use]
    pub fn queue_info(&self) -> Vec<QueuedJobInfo> {
        self.shared
            .queue()
            .pending
            .iter()
            .map(|job| QueuedJobInfo {
                channel: job.channel.clone(),
                priority: job.priority,
                retries: job.retries,
            })
            .collect()
    }

    #[must_use]
    pub fn state(&self) -> OrchestratorState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<OrchestratorState> {
        self.shared.state.subscribe()
    }
}

async fn run_worker(shared: Arc<Shared>) {
    loop {
        let (mut job, generation) = {
            let mut queue = shared.queue();
            if !queue.online {
                queue.processing = false;
                drop(queue);
                tracing::info!("Offline; pausing sync queue");
                shared.update(|state| {
                    state.status = SyncState::Error;
                    state.current_channel = None;
                    state.last_error = Some(OFFLINE_MESSAGE.to_string());
                });
                return;
            }
            if queue.pending.is_empty() {
                queue.processing = false;
                drop(queue);
                shared.update(|state| {
                    if state.status == SyncState::Syncing {
                        state.status = SyncState::Idle;
                    }
                    state.current_channel = None;
                });
                return;
            }
            let job = queue.pending.remove(0);
            let remaining = queue.pending.len();
            let generation = queue.generation;
            drop(queue);

            shared.update(|state| {
                state.status = SyncState::Syncing;
                state.current_channel = Some(job.channel.clone());
                state.queue_length = remaining;
            });
            (job, generation)
        };

        let started = tokio::time::Instant::now();
        tracing::debug!(channel = %job.channel, "Starting sync job");

        match (job.work)().await {
            Ok(()) => {
                tracing::info!(
                    channel = %job.channel,
                    elapsed_ms = started.elapsed().as_millis(),
                    "Sync job completed"
                );
                shared.update(|state| {
                    state.status = SyncState::Success;
                    state.last_sync_at = Some(Utc::now());
                    state.last_sync_channel = Some(job.channel.clone());
                    state.last_error = None;
                    state.current_channel = None;
                });
                let _ = job.done.send(Ok(()));
            }
            Err(error) if error.is_retryable() && job.retries < job.max_retries => {
                job.retries += 1;
                let delay = shared.retry_delay(job.retries);
                tracing::warn!(
                    channel = %job.channel,
                    attempt = job.retries,
                    max_retries = job.max_retries,
                    delay_ms = delay.as_millis(),
                    "Sync job failed, retrying: {}",
                    error
                );
                tokio::time::sleep(delay).await;

                let mut queue = shared.queue();
                if queue.generation == generation {
                    queue.push(job);
                    let queue_length = queue.pending.len();
                    drop(queue);
                    shared.update(|state| state.queue_length = queue_length);
                } else {
                    tracing::debug!(channel = %job.channel, "Queue cleared; dropping retry");
                }
            }
            Err(error) => {
                tracing::error!(
                    channel = %job.channel,
                    retries = job.retries,
                    "Sync job failed: {}",
                    error
                );
                shared.update(|state| {
                    state.status = SyncState::Error;
                    state.last_error = Some(error.to_string());
                    state.current_channel = None;
                });
                let _ = job.done.send(Err(error));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use pretty_assertions::assert_eq;
    use tokio::sync::Notify;

    use super::*;

    fn orchestrator() -> SyncOrchestrator {
        let orchestrator = SyncOrchestrator::new(&SyncTimings::default());
        orchestrator.set_enabled(true);
        orchestrator
    }

    async fn wait_for_pending(orchestrator: &SyncOrchestrator, count: usize) {
        while orchestrator.queue_info().len() < count {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn disabled_sync_skips_work() {
        let orchestrator = SyncOrchestrator::new(&SyncTimings::default());
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let outcome = orchestrator
            .sync(
                "backup",
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
                SyncOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn success_updates_state() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .sync("backup", || async { Ok(()) }, SyncOptions::default())
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Completed);
        let state = orchestrator.state();
        assert_eq!(state.last_sync_channel.as_deref(), Some("backup"));
        assert!(state.last_sync_at.is_some());
        assert_eq!(state.last_error, None);
    }

    #[tokio::test]
    async fn pending_jobs_run_by_priority_then_fifo() {
        let orchestrator = orchestrator();
        let gate = Arc::new(Notify::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let blocker = {
            let orchestrator = orchestrator.clone();
            let gate = Arc::clone(&gate);
            tokio::spawn(async move {
                orchestrator
                    .sync(
                        "blocker",
                        move || {
                            let gate = Arc::clone(&gate);
                            async move {
                                gate.notified().await;
                                Ok(())
                            }
                        },
                        SyncOptions::default(),
                    )
                    .await
            })
        };
        while orchestrator.state().current_channel.is_none() {
            tokio::task::yield_now().await;
        }

        let mut handles = Vec::new();
        for (name, priority) in [("low", 1), ("first", 5), ("high", 9), ("second", 5)] {
            let queue = orchestrator.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                queue
                    .sync(
                        name,
                        move || {
                            order.lock().unwrap().push(name);
                            async { Ok(()) }
                        },
                        SyncOptions {
                            priority,
                            ..SyncOptions::default()
                        },
                    )
                    .await
            }));
            wait_for_pending(&orchestrator, handles.len()).await;
        }

        let queued: Vec<String> = orchestrator
            .queue_info()
            .into_iter()
            .map(|job| job.channel)
            .collect();
        assert_eq!(queued, vec!["high", "first", "second", "low"]);

        gate.notify_one();
        blocker.await.unwrap().unwrap();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(
            *order.lock().unwrap(),
            vec!["high", "first", "second", "low"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_errors_are_retried() {
        let orchestrator = orchestrator();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let outcome = orchestrator
            .sync(
                "backup",
                move || {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt < 2 {
                            Err(Error::Database("busy".to_string()))
                        } else {
                            Ok(())
                        }
                    }
                },
                SyncOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, JobOutcome::Completed);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let orchestrator = orchestrator();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let error = orchestrator
            .sync(
                "backup",
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(Error::Database("down".to_string())) }
                },
                SyncOptions {
                    max_retries: 2,
                    ..SyncOptions::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Database(_)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        let state = orchestrator.state();
        assert_eq!(state.status, SyncState::Error);
        assert_eq!(state.last_error.as_deref(), Some("Database error: down"));
    }

    #[tokio::test]
    async fn client_errors_fail_without_retry() {
        let orchestrator = orchestrator();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let error = orchestrator
            .sync(
                "backup",
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                    async { Err(Error::NotAuthenticated) }
                },
                SyncOptions::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(error, Error::NotAuthenticated));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn offline_pauses_until_online() {
        let orchestrator = orchestrator();
        orchestrator.set_online(false);

        let job = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .sync("backup", || async { Ok(()) }, SyncOptions::default())
                    .await
            })
        };
        wait_for_pending(&orchestrator, 1).await;
        tokio::task::yield_now().await;
        assert_eq!(orchestrator.queue_info().len(), 1);
        assert!(!orchestrator.state().is_online);

        orchestrator.set_online(true);
        assert_eq!(job.await.unwrap().unwrap(), JobOutcome::Completed);
    }

    #[tokio::test]
    async fn clear_queue_cancels_pending_jobs() {
        let orchestrator = orchestrator();
        orchestrator.set_online(false);

        let job = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .sync("backup", || async { Ok(()) }, SyncOptions::default())
                    .await
            })
        };
        wait_for_pending(&orchestrator, 1).await;

        orchestrator.clear_queue();
        assert!(matches!(job.await.unwrap(), Err(Error::Cancelled)));
        assert!(orchestrator.queue_info().is_empty());
    }

    #[test]
    fn retry_delay_is_capped_with_jitter() {
        let orchestrator = SyncOrchestrator::new(&SyncTimings::default());
        let delay = orchestrator.shared.retry_delay(10);
        assert!(delay >= Duration::from_secs(30));
        assert!(delay < Duration::from_secs(31));

        let first = orchestrator.shared.retry_delay(1);
        assert!(first >= Duration::from_secs(2));
        assert!(first < Duration::from_secs(3));
    }
}
