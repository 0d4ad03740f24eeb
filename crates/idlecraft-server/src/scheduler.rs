//! Periodic sweep loops
//!
//! Each sweep runs on the blocking pool, then the loop sleeps for the full
//! interval, so runs of one sweep never overlap and a slow run delays the
//! next one instead of queueing it.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Run `job` every `interval` until `shutdown` flips to true
///
/// A failed run is logged and the loop carries on with the next one.
/// Returns the number of runs that completed, failed or not.
pub async fn run_periodic<F, T>(
    name: &'static str,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    job: F,
) -> u64
where
    F: Fn() -> idlecraft_core::Result<T> + Send + Sync + 'static,
    T: Send + 'static,
{
    let job = Arc::new(job);
    let mut runs = 0;
    info!(sweep = name, interval_ms = interval.as_millis() as u64, "sweep loop started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let run = job.clone();
        match tokio::task::spawn_blocking(move || run()).await {
            Ok(Ok(_)) => debug!(sweep = name, "sweep finished"),
            Ok(Err(e)) => error!(sweep = name, error = %e, kind = ?e.kind(), "sweep failed"),
            Err(e) => error!(sweep = name, error = %e, "sweep task panicked"),
        }
        runs += 1;

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                // sender dropped counts as shutdown
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!(sweep = name, runs, "sweep loop stopped");
    runs
}
