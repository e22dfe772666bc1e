//! The worker process: fetch a task, process it, repeat — until a
//! shutdown signal arrives.
pub mod fetcher;
pub mod heartbeat;
pub mod processor;

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::db::TaskStore;
use crate::error::BookResult;
use crate::storage::{BlobStore, S3Store};
use crate::tts::TtsClient;

use fetcher::TaskFetcher;
use processor::TaskProcessor;

/// Run the fetch/process loop until `shutdown` resolves (cooperative
/// cancellation — a task already in flight is allowed to finish its
/// current chapter before the loop exits).
pub async fn run(config: Config, store: TaskStore, shutdown: impl std::future::Future<Output = ()>) -> BookResult<()> {
    let worker_id = config.worker.worker_id.clone();
    let storage: Arc<dyn BlobStore> = Arc::new(S3Store::connect(&config.storage).await?);
    let tts = TtsClient::new(config.tts.clone())?;
    let processor = TaskProcessor::new(store.clone(), storage, tts, config.worker.clone());
    let fetcher = TaskFetcher::new(&store, worker_id.clone());

    info!(worker_id, "worker starting");
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(worker_id, "shutdown signal received, stopping");
                return Ok(());
            }
            task = fetcher.fetch_one_task() => {
                match task? {
                    Some(task) => {
                        processor.process_task(task).await?;
                    }
                    None => fetcher.idle().await,
                }
            }
        }
    }
}
