//! Processes one leased task end to end: synthesize, upload, mark
//! completed — or record a failure and reschedule. A `Semaphore`
//! bounds how many syntheses run at once per worker process, the async
//! analogue of the original's `threading.BoundedSemaphore` guarding a
//! shared GPU.
use std::sync::Arc;

use tracing::{error, info};

use crate::config::WorkerConfig;
use crate::db::TaskStore;
use crate::error::BookResult;
use crate::models::ChapterTask;
use crate::storage::{generate_audio_key, BlobStore};
use crate::tts::TtsClient;

use super::heartbeat::Heartbeat;

pub struct TaskProcessor {
    store: TaskStore,
    storage: Arc<dyn BlobStore>,
    tts: TtsClient,
    config: WorkerConfig,
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl TaskProcessor {
    pub fn new(
        store: TaskStore,
        storage: Arc<dyn BlobStore>,
        tts: TtsClient,
        config: WorkerConfig,
    ) -> Self {
        let permits = config.gpu_limit.max(1);
        Self {
            store,
            storage,
            tts,
            config,
            semaphore: Arc::new(tokio::sync::Semaphore::new(permits)),
        }
    }

    /// Process a single leased task. Never returns an `Err` for
    /// synthesis/upload failures — those are recorded on the task row
    /// itself via [`TaskStore::handle_failure`]; an `Err` here only
    /// means the store update that records success or failure itself
    /// failed.
    pub async fn process_task(&self, task: ChapterTask) -> BookResult<()> {
        info!(worker = %self.config.worker_id, task_id = task.task_id, "processing task");
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("semaphore is never closed");

        let heartbeat = Heartbeat::start(
            self.store.clone(),
            task.task_id,
            self.config.worker_id.clone(),
            self.config.heartbeat_interval,
        );

        let result = self.run_task(&task).await;
        heartbeat.stop().await;

        match result {
            Ok((audio_url, duration)) => {
                self.store
                    .mark_completed(task.task_id, &audio_url, duration.unwrap_or(0))
                    .await?;
                info!(task_id = task.task_id, "task completed");
            }
            Err(err) => {
                error!(task_id = task.task_id, error = %err, "task failed");
                self.store
                    .handle_failure(
                        task.task_id,
                        task.retry_count,
                        self.config.max_retries,
                        &err.to_string(),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    async fn run_task(&self, task: &ChapterTask) -> BookResult<(String, Option<i32>)> {
        let output = self.tts.synthesize(&task.content_text).await?;
        let key = generate_audio_key(task.book_id, task.chapter_index);
        self.storage.upload(&key, output.audio).await?;
        let audio_url = self.storage.presigned_url(&key).await?;
        Ok((audio_url, output.duration))
    }
}
