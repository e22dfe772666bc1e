//! Polls the task store for work, sleeping a randomized interval
//! between empty polls so idle workers don't hammer the database.
//! Mirrors the original `TaskFetcher.idle()`'s 0.5-2.0s jitter.
use std::time::Duration;

use rand::Rng;

use crate::db::TaskStore;
use crate::error::BookResult;
use crate::models::ChapterTask;

const IDLE_MIN_MS: u64 = 500;
const IDLE_MAX_MS: u64 = 2000;

pub struct TaskFetcher<'a> {
    store: &'a TaskStore,
    worker_id: String,
}

impl<'a> TaskFetcher<'a> {
    pub fn new(store: &'a TaskStore, worker_id: String) -> Self {
        Self { store, worker_id }
    }

    /// Attempt to lease one pending task.
    pub async fn fetch_one_task(&self) -> BookResult<Option<ChapterTask>> {
        self.store.fetch_one_pending(&self.worker_id).await
    }

    /// Sleep a random 0.5-2.0s interval before the next poll.
    pub async fn idle(&self) {
        let millis = rand::thread_rng().gen_range(IDLE_MIN_MS..=IDLE_MAX_MS);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_bounds_match_documented_range() {
        assert_eq!(IDLE_MIN_MS, 500);
        assert_eq!(IDLE_MAX_MS, 2000);
    }
}
