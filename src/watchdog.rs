//! Sweeps the task store for tasks stuck in `PROCESSING` whose
//! heartbeat has gone stale — a worker that crashed or was killed
//! mid-task — and resets them to `PENDING` so another worker can pick
//! them back up.
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::config::WatchdogConfig;
use crate::db::TaskStore;
use crate::error::BookResult;

pub struct Watchdog {
    store: TaskStore,
    config: WatchdogConfig,
}

impl Watchdog {
    pub fn new(store: TaskStore, config: WatchdogConfig) -> Self {
        Self { store, config }
    }

    /// Run one sweep, returning the number of tasks resurrected.
    pub async fn sweep_once(&self) -> BookResult<u64> {
        let threshold_delta = chrono::Duration::from_std(self.config.threshold)
            .unwrap_or_else(|_| chrono::Duration::seconds(300));
        let threshold = Utc::now() - threshold_delta;
        let log_suffix = format!("\nReset by Watchdog at {}", Utc::now().to_rfc3339());
        let resurrected = self.store.resurrect_stale(threshold, &log_suffix).await?;
        if resurrected > 0 {
            info!(resurrected, "resurrected stale tasks");
        }
        Ok(resurrected)
    }

    /// Sweep repeatedly on `config.interval` until `shutdown` resolves.
    pub async fn run(self, shutdown: impl std::future::Future<Output = ()>) -> BookResult<()> {
        info!(
            threshold_secs = self.config.threshold.as_secs(),
            interval_secs = self.config.interval.as_secs(),
            "watchdog starting"
        );
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.config.interval);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown signal received, stopping watchdog");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.sweep_once().await?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_subtracted_from_now() {
        let config = WatchdogConfig {
            threshold: Duration::from_secs(300),
            interval: Duration::from_secs(60),
        };
        let now = Utc::now();
        let cutoff = now - chrono::Duration::from_std(config.threshold).unwrap();
        assert!(cutoff < now);
    }
}
