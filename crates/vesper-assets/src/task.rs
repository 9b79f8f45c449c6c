//! Background load tasks and their completion channel.
//!
//! Each load is one future spawned on the shared pool: read the file,
//! run the loader, send the outcome back. The integrator drains the channel
//! on the frame thread, so completion never mutates the cache from a worker.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::SystemTime;

use vesper_core::TaskPool;

use crate::error::AssetError;
use crate::handle::AssetId;
use crate::io;
use crate::loader::{ErasedAssetLoader, LoadContext};
use crate::record::RecordShared;

/// Payload of a finished load.
pub(crate) struct LoadedContent {
    /// The decoded, type-erased asset value.
    pub content: Arc<dyn Any + Send + Sync>,
    /// The backing file's mtime observed alongside the read.
    pub modified: Option<SystemTime>,
}

/// Result delivered by a background task to the integrator.
pub(crate) struct TaskResult {
    pub id: AssetId,
    pub outcome: Result<LoadedContent, AssetError>,
}

/// Spawns load futures on the shared pool and reports completions.
pub(crate) struct TaskRunner {
    pool: TaskPool,
    sender: Sender<TaskResult>,
}

impl TaskRunner {
    pub fn new(worker_threads: Option<usize>) -> (Self, Receiver<TaskResult>) {
        let pool = match worker_threads {
            Some(count) => TaskPool::new(count),
            None => TaskPool::with_default_threads(),
        };
        let (sender, receiver) = channel();
        (Self { pool, sender }, receiver)
    }

    /// Schedule one load for `id`.
    ///
    /// If the pool can no longer run work, the failure is reported through
    /// the same channel as a `TaskSpawn`-kind result instead of panicking.
    pub fn spawn_load(
        &self,
        id: AssetId,
        path: PathBuf,
        loader: Arc<dyn ErasedAssetLoader>,
        shared: Arc<RecordShared>,
        max_size: Option<u64>,
    ) {
        let sender = self.sender.clone();

        if self.pool.is_shut_down() {
            tracing::warn!(%id, "load requested after task pool shutdown");
            let _ = sender.send(TaskResult {
                id,
                outcome: Err(AssetError::TaskSpawn {
                    message: "task pool is shut down".to_string(),
                }),
            });
            return;
        }

        self.pool
            .spawn(async move {
                shared.mark_started();
                shared.set_progress(0.1);
                let outcome = run_load(&path, loader.as_ref(), &shared, max_size);
                let _ = sender.send(TaskResult { id, outcome });
            })
            .detach();
    }

    /// Whether the pool has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.pool.is_shut_down()
    }

    /// Stop the worker threads; see [`TaskPool::shutdown`].
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

fn run_load(
    path: &std::path::Path,
    loader: &dyn ErasedAssetLoader,
    shared: &RecordShared,
    max_size: Option<u64>,
) -> Result<LoadedContent, AssetError> {
    // Stat before the read: a write that races the load leaves the file
    // mtime newer than the recorded one, so the next scan re-triggers.
    let modified = io::modified_time(path);
    let bytes = io::read_bytes(path, max_size)?;
    shared.set_progress(0.5);

    let boxed = loader.load_erased(LoadContext::new(path, &bytes))?;
    shared.set_progress(0.9);

    Ok(LoadedContent {
        content: Arc::from(boxed),
        modified,
    })
}
