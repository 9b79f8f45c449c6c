//! Per-asset lifecycle records.

use std::any::{Any, TypeId};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::SystemTime;

use crate::handle::AssetId;

/// The lifecycle state of a cached asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Queued for loading; the background task has not started yet.
    Pending,
    /// The background task is executing.
    Loading,
    /// Content is available.
    Loaded,
    /// The load failed; the error text is retained on the record.
    Failed,
}

impl LoadState {
    /// Returns `true` for `Pending`.
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending)
    }

    /// Returns `true` for `Loading`.
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    /// Returns `true` for `Loaded`.
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded)
    }

    /// Returns `true` for `Failed`.
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadState::Failed)
    }

    /// Returns `true` while a task for this record is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, LoadState::Pending | LoadState::Loading)
    }
}

/// Counters shared between a record, its handles, and its in-flight task.
///
/// These are updated lock-free; decisions based on them (such as removing a
/// record whose refcount reached zero) are re-checked under the cache lock.
#[derive(Debug)]
pub struct RecordShared {
    /// Count of live handles pointing at the record.
    refs: AtomicU32,
    /// Load progress in `[0.0, 1.0]`, stored as f32 bits.
    progress: AtomicU32,
    /// Set by the background task once it begins executing.
    started: AtomicBool,
}

impl RecordShared {
    pub(crate) fn new() -> Self {
        Self {
            refs: AtomicU32::new(0),
            progress: AtomicU32::new(0.0f32.to_bits()),
            started: AtomicBool::new(false),
        }
    }

    /// The current number of live handles.
    pub fn ref_count(&self) -> u32 {
        self.refs.load(Ordering::Acquire)
    }

    pub(crate) fn add_ref(&self) {
        self.refs.fetch_add(1, Ordering::Acquire);
    }

    pub(crate) fn release(&self) {
        self.refs.fetch_sub(1, Ordering::Release);
    }

    /// The current load progress in `[0.0, 1.0]`.
    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Acquire))
    }

    pub(crate) fn set_progress(&self, value: f32) {
        self.progress
            .store(value.clamp(0.0, 1.0).to_bits(), Ordering::Release);
    }

    pub(crate) fn mark_started(&self) {
        self.started.store(true, Ordering::Release);
    }

    pub(crate) fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

/// One cached asset: identity, lifecycle, and the type-erased payload.
///
/// Identity fields (`id`, `path`, `type_id`) never change after creation.
/// Content is present exactly while the record is `Loaded`, except during a
/// hot-reload cycle where the previous payload stays visible until the
/// replacement integrates.
pub(crate) struct AssetRecord {
    pub id: AssetId,
    pub path: PathBuf,
    pub type_id: TypeId,
    pub state: LoadState,
    pub shared: Arc<RecordShared>,
    /// Backing-file mtime observed by the last successful load.
    pub modified: Option<SystemTime>,
    /// Type-erased payload; dropping the `Arc` is the release operation.
    pub content: Option<Arc<dyn Any + Send + Sync>>,
    /// Populated only when `state == Failed`.
    pub error: Option<String>,
    /// Per-record hot-reload opt-out.
    pub watch: bool,
}

impl AssetRecord {
    pub fn new(id: AssetId, path: PathBuf, type_id: TypeId, watch: bool) -> Self {
        Self {
            id,
            path,
            type_id,
            state: LoadState::Pending,
            shared: Arc::new(RecordShared::new()),
            modified: None,
            content: None,
            error: None,
            watch,
        }
    }
}
