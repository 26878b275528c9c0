//! Process-wide sync lock with timeout-based recovery.
//!
//! At most one cloud sync runs between acquire and release. A hung holder
//! is force-released after the configured timeout so later syncs are not
//! blocked forever; release is always conditional on the owner token, so a
//! stale timer or a late-finishing holder never frees a newer owner's lock.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::util::unix_timestamp_millis_now;

/// Identifies one holder of the lock: `{timestamp_ms}-{random}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LockToken(String);

impl LockToken {
    fn mint() -> Self {
        Self(format!(
            "{}-{}",
            unix_timestamp_millis_now(),
            Uuid::new_v4().simple()
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseReason {
    Completed,
    TimedOut,
}

#[derive(Default)]
struct LockState {
    owner: Option<LockToken>,
    timer: Option<JoinHandle<()>>,
}

fn lock_state(state: &Mutex<LockState>) -> MutexGuard<'_, LockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn release_if_owner(state: &Mutex<LockState>, token: &LockToken, reason: ReleaseReason) -> bool {
    let mut guard = lock_state(state);
    if guard.owner.as_ref() != Some(token) {
        return false;
    }
    guard.owner = None;
    let timer = guard.timer.take();
    drop(guard);

    match reason {
        ReleaseReason::Completed => {
            if let Some(timer) = timer {
                timer.abort();
            }
            tracing::debug!(owner = %token, "Sync lock released");
        }
        ReleaseReason::TimedOut => {
            tracing::warn!(owner = %token, "Sync lock timed out; force-releasing");
        }
    }
    true
}

/// Owned mutex guarding the cloud pull-merge-push sequence.
///
/// Cloning shares the same lock.
#[derive(Clone)]
pub struct SyncLock {
    state: Arc<Mutex<LockState>>,
    timeout: Duration,
}

impl SyncLock {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(LockState::default())),
            timeout,
        }
    }

    /// How long a holder may keep the lock before it is force-released
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    #[must_use]
    pub fn is_held(&self) -> bool {
        lock_state(&self.state).owner.is_some()
    }

    #[must_use]
    pub fn owner(&self) -> Option<LockToken> {
        lock_state(&self.state).owner.clone()
    }

    /// Take the lock if it is free.
    ///
    /// Returns immediately; `None` means another sync holds the lock.
    /// Must be called from within a Tokio runtime (the timeout runs as a
    /// spawned task).
    pub fn try_acquire(&self) -> Option<SyncLockGuard> {
        let mut state = lock_state(&self.state);
        if state.owner.is_some() {
            return None;
        }

        let token = LockToken::mint();
        state.owner = Some(token.clone());
        state.timer = Some(spawn_timeout(
            Arc::downgrade(&self.state),
            token.clone(),
            self.timeout,
        ));
        drop(state);

        tracing::debug!(owner = %token, "Sync lock acquired");
        Some(SyncLockGuard {
            state: Arc::clone(&self.state),
            token,
            released: false,
        })
    }
}

fn spawn_timeout(state: Weak<Mutex<LockState>>, token: LockToken, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        if let Some(state) = state.upgrade() {
            release_if_owner(&state, &token, ReleaseReason::TimedOut);
        }
    })
}

/// Held lock; dropping it releases the lock if this holder still owns it.
pub struct SyncLockGuard {
    state: Arc<Mutex<LockState>>,
    token: LockToken,
    released: bool,
}

impl SyncLockGuard {
    #[must_use]
    pub fn token(&self) -> &LockToken {
        &self.token
    }

    /// Release the lock; returns `false` if ownership was already lost to
    /// the timeout.
    pub fn release(mut self) -> bool {
        self.released = true;
        let released = release_if_owner(&self.state, &self.token, ReleaseReason::Completed);
        if !released {
            tracing::debug!(owner = %self.token, "Sync lock no longer owned; nothing to release");
        }
        released
    }
}

impl Drop for SyncLockGuard {
    fn drop(&mut self) {
        if !self.released {
            release_if_owner(&self.state, &self.token, ReleaseReason::Completed);
        }
    }
}
