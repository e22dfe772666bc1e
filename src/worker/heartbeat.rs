//! Background heartbeat ticker for a held task lease.
//!
//! The original runs this as a daemon thread gated by a
//! `threading.Event`; the async equivalent is a `tokio::task` that
//! ticks on an interval and is aborted when the guard drops, which is
//! the pattern the teacher's parallel scheduler uses for cancelling
//! in-flight work.
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::db::TaskStore;

/// Floor matching the original's `max(5, interval)` clamp, applied
/// again here in case a caller constructs a `Heartbeat` directly
/// instead of going through [`crate::config::WorkerConfig`].
const MIN_INTERVAL: Duration = Duration::from_secs(5);

/// RAII guard around a background heartbeat task. Dropping it aborts
/// the ticker — callers don't need to call `stop()` explicitly, though
/// [`Heartbeat::stop`] is available for an explicit, awaited shutdown.
pub struct Heartbeat {
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Start ticking `last_heartbeat` for `task_id` every `interval`
    /// (clamped to at least 5 seconds) until stopped or dropped.
    ///
    /// The update is guarded on `locked_by = worker_id`, so a ticker
    /// whose task was already resurrected by the watchdog onto another
    /// worker stops touching the row instead of clobbering the new
    /// owner's lease.
    pub fn start(store: TaskStore, task_id: i64, worker_id: String, interval: Duration) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                if let Err(err) = store.heartbeat(task_id, &worker_id).await {
                    warn!(task_id, error = %err, "heartbeat update failed");
                }
            }
        });
        Self { handle: Some(handle) }
    }

    /// Stop the ticker and wait for the task to actually terminate.
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_interval_is_five_seconds() {
        assert_eq!(MIN_INTERVAL, Duration::from_secs(5));
    }
}
