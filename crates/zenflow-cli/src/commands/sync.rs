use std::path::Path;
use std::sync::Arc;

use zenflow_core::backup::ImportMode;
use zenflow_core::config::SyncTimings;
use zenflow_core::sync::{Lifecycle, LifecycleEvent, SyncOutcome, SyncScheduler};

use crate::commands::common::{build_engine, ProfileContext};
use crate::error::CliError;

pub async fn run_sync(
    mode: ImportMode,
    global_profile: Option<&str>,
    db_path: &Path,
) -> Result<SyncOutcome, CliError> {
    let profile = ProfileContext::load(global_profile)?;
    let engine = build_engine(&profile, db_path, &SyncTimings::default()).await?;

    let outcome = engine
        .sync_with_cloud(mode)
        .await
        .map_err(|error| match error {
            zenflow_core::Error::NotAuthenticated => CliError::NotSignedIn,
            other => CliError::Core(other),
        })?;
    println!("{}", describe_outcome(outcome));
    Ok(outcome)
}

pub const fn describe_outcome(outcome: SyncOutcome) -> &'static str {
    match outcome {
        SyncOutcome::Skipped => "Sync already in progress",
        SyncOutcome::Pulled => "Restored data from cloud backup",
        SyncOutcome::Merged => "Merged cloud backup and uploaded the result",
        SyncOutcome::Pushed => "Uploaded local data to cloud backup",
    }
}

/// Run auto-sync until Ctrl-C, then stop the timers and sync one last time.
pub async fn run_watch(global_profile: Option<&str>, db_path: &Path) -> Result<(), CliError> {
    let profile = ProfileContext::load(global_profile)?;
    let timings = SyncTimings::default();
    let engine = build_engine(&profile, db_path, &timings).await?;

    let lifecycle = Lifecycle::new();
    let scheduler = SyncScheduler::new(Arc::clone(&engine), timings, lifecycle.clone());
    scheduler.start_auto_sync();

    let mut state = engine.orchestrator().subscribe();
    let reporter = tokio::spawn(async move {
        while state.changed().await.is_ok() {
            let snapshot = state.borrow_and_update().clone();
            if let Some(error) = snapshot.last_error.as_deref() {
                tracing::warn!(status = ?snapshot.status, "Sync error: {}", error);
            } else {
                tracing::debug!(status = ?snapshot.status, queue = snapshot.queue_length, "Sync state");
            }
        }
    });

    println!(
        "Watching profile '{}' (syncing every {}s). Press Ctrl-C to stop.",
        profile.name,
        timings.auto_sync_interval.as_secs()
    );
    // Startup counts as coming to the foreground.
    lifecycle.emit(LifecycleEvent::Foreground);

    tokio::signal::ctrl_c().await?;
    println!("Stopping; running final sync...");
    scheduler.shutdown().await;
    reporter.abort();
    Ok(())
}
