//! The asset cache: path-keyed records, the load pipeline, and the frame
//! integrator.

use std::any::TypeId;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use vesper_core::collections::{HashMap, HashSet};

use crate::Asset;
use crate::error::{AssetError, AssetResult};
use crate::event::{AssetEvent, AssetEventBuffer};
use crate::handle::{AssetId, Handle};
use crate::io;
use crate::loader::{AssetLoader, LoaderRegistry};
use crate::path;
use crate::record::{AssetRecord, LoadState};
use crate::task::{TaskResult, TaskRunner};

/// Configuration for [`AssetCache::new`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory that all request paths are resolved against.
    pub root: PathBuf,
    /// Globally enables mtime-based hot reload in [`AssetCache::update`].
    pub hot_reload: bool,
    /// Upper bound on backing-file size, if any.
    pub max_file_size: Option<u64>,
    /// Worker threads for the load pool; `None` means `num_cpus - 1`.
    pub worker_threads: Option<usize>,
}

impl CacheConfig {
    /// Configuration rooted at `root`, hot reload off.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            hot_reload: false,
            max_file_size: None,
            worker_threads: None,
        }
    }
}

/// Per-load options.
#[derive(Debug, Clone)]
pub struct LoadSettings {
    /// Watch the backing file for hot reload. On by default; only effective
    /// when the cache itself has hot reload enabled.
    pub watch: bool,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self { watch: true }
    }
}

impl LoadSettings {
    /// Default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the backing file is watched for hot reload.
    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }
}

/// Everything guarded by the cache lock: the record tables, the completion
/// channel, and the events queued for the next raise step.
struct CacheInner {
    records: HashMap<AssetId, AssetRecord>,
    by_path: HashMap<(PathBuf, TypeId), AssetId>,
    /// Records with an outstanding task; results for ids not in this set
    /// are stale and discarded.
    in_flight: HashSet<AssetId>,
    results: Receiver<TaskResult>,
    queued_events: Vec<AssetEvent>,
    /// Whether any record entered an in-flight state since the last
    /// `update`; loads can start and finish entirely between frames.
    had_in_flight: bool,
    /// In-flight count observed at the end of the previous `update`.
    last_in_flight: usize,
}

/// The asset cache and loading pipeline coordinator.
///
/// One instance is constructed at application startup and shared (behind
/// `Arc`) with every system that loads assets. All methods take `&self`;
/// the record tables are guarded by a single internal lock that is held
/// only for map mutation, never while a loader runs or events are consumed.
///
/// # Example
///
/// ```ignore
/// let cache = AssetCache::with_root("assets");
/// cache.register_loader(TextLoader);
///
/// let handle: Handle<String> = cache.load_async("dialogue/intro.txt")?;
///
/// // once per frame:
/// cache.update();
/// for event in cache.drain_events() {
///     // react to AssetEvent::Loaded / AssetEvent::AllSettled
/// }
///
/// if let Some(text) = cache.get(&handle) {
///     // use the text
/// }
/// ```
pub struct AssetCache {
    root: PathBuf,
    hot_reload: bool,
    max_file_size: Option<u64>,
    loaders: RwLock<LoaderRegistry>,
    runner: TaskRunner,
    inner: Mutex<CacheInner>,
    events: Mutex<AssetEventBuffer>,
}

impl AssetCache {
    /// Create a cache from `config`.
    pub fn new(config: CacheConfig) -> Self {
        let (runner, results) = TaskRunner::new(config.worker_threads);
        Self {
            root: config.root,
            hot_reload: config.hot_reload,
            max_file_size: config.max_file_size,
            loaders: RwLock::new(LoaderRegistry::new()),
            runner,
            inner: Mutex::new(CacheInner {
                records: HashMap::new(),
                by_path: HashMap::new(),
                in_flight: HashSet::new(),
                results,
                queued_events: Vec::new(),
                had_in_flight: false,
                last_in_flight: 0,
            }),
            events: Mutex::new(AssetEventBuffer::new()),
        }
    }

    /// Create a cache rooted at `root` with default settings.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        Self::new(CacheConfig::new(root))
    }

    /// Register a loader for its asset type, replacing any previous one.
    ///
    /// Expected at startup; registering while loads for the same type are
    /// in flight is not supported.
    pub fn register_loader<L: AssetLoader>(&self, loader: L) {
        self.loaders.write().unwrap().register(loader);
    }

    /// Request an asynchronous load of `path` as `T`.
    ///
    /// Returns immediately. If a record for (path, `T`) already exists, a
    /// new handle to it is returned regardless of its current state;
    /// otherwise a record is created and a background task enqueued.
    /// Path-validation and missing-loader errors reject synchronously.
    pub fn load_async<T: Asset>(&self, path: impl AsRef<Path>) -> AssetResult<Handle<T>> {
        self.load_with(path, LoadSettings::default())
    }

    /// [`load_async`](Self::load_async) with per-load options.
    pub fn load_with<T: Asset>(
        &self,
        path: impl AsRef<Path>,
        settings: LoadSettings,
    ) -> AssetResult<Handle<T>> {
        let resolved = path::resolve(&self.root, path.as_ref())?;
        let loader = self.loaders.read().unwrap().resolve_for::<T>()?;
        let key = (resolved.clone(), TypeId::of::<T>());

        // "check cache, else create and enqueue" is atomic under the lock,
        // so concurrent first requests cannot double-spawn.
        let (id, shared) = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(&id) = inner.by_path.get(&key) {
                let shared = inner.records.get(&id).unwrap().shared.clone();
                return Ok(Handle::new(id, shared));
            }

            let id = AssetId::next();
            let record = AssetRecord::new(id, resolved.clone(), TypeId::of::<T>(), settings.watch);
            let shared = record.shared.clone();
            inner.records.insert(id, record);
            inner.by_path.insert(key, id);
            inner.in_flight.insert(id);
            inner.had_in_flight = true;
            (id, shared)
        };
        tracing::debug!(%id, path = %resolved.display(), "queueing asset load");
        self.runner
            .spawn_load(id, resolved, loader, shared.clone(), self.max_file_size);
        Ok(Handle::new(id, shared))
    }

    /// Load `path` as `T`, blocking until the record leaves the in-flight
    /// states.
    ///
    /// The wait drives the integration step itself, so this is legal from
    /// any thread — including the one that calls [`update`](Self::update).
    /// The returned handle may point at a `Failed` record; the error text
    /// stays queryable through [`error_message`](Self::error_message).
    pub fn load_sync<T: Asset>(&self, path: impl AsRef<Path>) -> AssetResult<Handle<T>> {
        let handle = self.load_async::<T>(path)?;
        self.wait_for(handle.id());
        Ok(handle)
    }

    /// Insert an already-built asset under a virtual name.
    ///
    /// The record is immediately `Loaded` and is not watched for hot reload.
    pub fn insert<T: Asset>(&self, name: impl AsRef<Path>, value: T) -> Handle<T> {
        let key = (name.as_ref().to_path_buf(), TypeId::of::<T>());
        let content: Arc<dyn std::any::Any + Send + Sync> = Arc::new(value);

        let (id, shared) = {
            let mut inner = self.inner.lock().unwrap();
            if let Some(&id) = inner.by_path.get(&key) {
                let record = inner.records.get_mut(&id).unwrap();
                record.state = LoadState::Loaded;
                record.content = Some(content);
                record.error = None;
                let shared = record.shared.clone();
                record.shared.set_progress(1.0);
                inner.in_flight.remove(&id);
                (id, shared)
            } else {
                let id = AssetId::next();
                let mut record = AssetRecord::new(id, key.0.clone(), TypeId::of::<T>(), false);
                record.state = LoadState::Loaded;
                record.content = Some(content);
                record.shared.set_progress(1.0);
                let shared = record.shared.clone();
                inner.records.insert(id, record);
                inner.by_path.insert(key, id);
                (id, shared)
            }
        };

        self.events.lock().unwrap().push(AssetEvent::Loaded {
            id,
            success: true,
            error: None,
        });
        Handle::new(id, shared)
    }

    /// A new handle to the record for (path, `T`), if one exists.
    pub fn find_by_path<T: Asset>(&self, path: impl AsRef<Path>) -> Option<Handle<T>> {
        let resolved = path::resolve(&self.root, path.as_ref()).ok()?;
        let inner = self.inner.lock().unwrap();
        let &id = inner.by_path.get(&(resolved, TypeId::of::<T>()))?;
        let shared = inner.records.get(&id)?.shared.clone();
        Some(Handle::new(id, shared))
    }

    /// The asset behind `handle`, or `None` while it is unavailable.
    ///
    /// During a hot reload the previously loaded value stays visible until
    /// the replacement integrates.
    pub fn get<T: Asset>(&self, handle: &Handle<T>) -> Option<Arc<T>> {
        let content = {
            let inner = self.inner.lock().unwrap();
            inner.records.get(&handle.id())?.content.clone()?
        };
        content.downcast::<T>().ok()
    }

    /// Whether the record for `id` is `Loaded`.
    pub fn is_loaded(&self, id: AssetId) -> bool {
        self.state(id) == Some(LoadState::Loaded)
    }

    /// The lifecycle state of the record for `id`.
    pub fn state(&self, id: AssetId) -> Option<LoadState> {
        self.inner.lock().unwrap().records.get(&id).map(|r| r.state)
    }

    /// Load progress of the record for `id`; `0.0` for unknown ids.
    pub fn progress(&self, id: AssetId) -> f32 {
        self.inner
            .lock()
            .unwrap()
            .records
            .get(&id)
            .map(|r| r.shared.progress())
            .unwrap_or(0.0)
    }

    /// The error text of the record for `id`, when it is `Failed`.
    pub fn error_message(&self, id: AssetId) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .records
            .get(&id)
            .and_then(|r| r.error.clone())
    }

    /// Mean progress over all in-flight records; `1.0` when none are.
    pub fn aggregate_progress(&self) -> f32 {
        let inner = self.inner.lock().unwrap();
        if inner.in_flight.is_empty() {
            return 1.0;
        }
        let sum: f32 = inner
            .in_flight
            .iter()
            .filter_map(|id| inner.records.get(id))
            .map(|r| r.shared.progress())
            .sum();
        sum / inner.in_flight.len() as f32
    }

    /// The number of records with an outstanding load.
    pub fn in_flight(&self) -> usize {
        self.inner.lock().unwrap().in_flight.len()
    }

    /// The number of cached records.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().records.len()
    }

    /// Whether the cache holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every record with no live handles, releasing its content.
    ///
    /// Returns the number of records removed. Results for removed records
    /// that were still in flight are discarded at integration time.
    pub fn unload_unused(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let dead: Vec<AssetId> = inner
            .records
            .values()
            .filter(|record| record.shared.ref_count() == 0)
            .map(|record| record.id)
            .collect();

        for &id in &dead {
            Self::remove_record(&mut inner, id);
        }

        if !dead.is_empty() {
            tracing::debug!("unloaded {} unused assets", dead.len());
        }
        dead.len()
    }

    /// Unconditionally remove all records, regardless of refcounts.
    ///
    /// Outstanding handles stay valid objects, but all content access
    /// through them yields `None` afterwards.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        let count = inner.records.len();
        inner.records.clear();
        inner.by_path.clear();
        inner.in_flight.clear();
        if count > 0 {
            tracing::debug!("cleared {} cached assets", count);
        }
    }

    /// Stop the background workers.
    ///
    /// Loads requested afterwards fail with a `TaskSpawn`-kind error at the
    /// next integration instead of hanging.
    pub fn shutdown(&self) {
        self.runner.shutdown();
    }

    /// The frame integration step; call once per frame from the host loop.
    ///
    /// Applies finished background loads to their records, re-checks watched
    /// files for hot reload, and raises completion events — all structure
    /// mutation happens here (or in a [`load_sync`](Self::load_sync) wait),
    /// so readers never observe half-updated records.
    pub fn update(&self) {
        let mut raised = Vec::new();
        {
            let mut inner = self.inner.lock().unwrap();
            self.integrate_locked(&mut inner);
            if self.hot_reload {
                self.scan_hot_reload_locked(&mut inner);
            }
            raised.append(&mut inner.queued_events);

            let now_in_flight = inner.in_flight.len();
            if (inner.last_in_flight > 0 || inner.had_in_flight) && now_in_flight == 0 {
                raised.push(AssetEvent::AllSettled);
            }
            inner.had_in_flight = now_in_flight > 0;
            inner.last_in_flight = now_in_flight;
        }

        // The lock is released before events become visible to consumers,
        // so an event handler is free to request new loads.
        if !raised.is_empty() {
            let mut events = self.events.lock().unwrap();
            for event in raised {
                events.push(event);
            }
        }
    }

    /// Drain the completion events raised so far.
    pub fn drain_events(&self) -> Vec<AssetEvent> {
        self.events.lock().unwrap().drain().collect()
    }

    /// Apply all finished task results and promote records whose task has
    /// started running. Caller holds the cache lock.
    fn integrate_locked(&self, inner: &mut CacheInner) {
        let started: Vec<AssetId> = inner
            .in_flight
            .iter()
            .filter(|id| {
                inner
                    .records
                    .get(*id)
                    .is_some_and(|r| r.state.is_pending() && r.shared.has_started())
            })
            .copied()
            .collect();
        for id in started {
            inner.records.get_mut(&id).unwrap().state = LoadState::Loading;
        }

        while let Ok(result) = inner.results.try_recv() {
            Self::apply_result(inner, result);
        }

        // A pool that shut down before picking a task up will never deliver
        // a result for it; surface those as infrastructure failures.
        if self.runner.is_shut_down() {
            let orphaned: Vec<AssetId> = inner
                .in_flight
                .iter()
                .filter(|id| {
                    inner
                        .records
                        .get(*id)
                        .is_some_and(|r| !r.shared.has_started())
                })
                .copied()
                .collect();
            for id in orphaned {
                Self::apply_result(
                    inner,
                    TaskResult {
                        id,
                        outcome: Err(AssetError::TaskSpawn {
                            message: "task pool shut down before the load started".to_string(),
                        }),
                    },
                );
            }
        }
    }

    fn apply_result(inner: &mut CacheInner, result: TaskResult) {
        if !inner.in_flight.remove(&result.id) {
            tracing::debug!(id = %result.id, "discarding load result for removed asset");
            return;
        }
        let Some(record) = inner.records.get_mut(&result.id) else {
            tracing::debug!(id = %result.id, "discarding load result for removed asset");
            return;
        };

        match result.outcome {
            Ok(loaded) => {
                record.state = LoadState::Loaded;
                record.content = Some(loaded.content);
                record.modified = loaded.modified;
                record.error = None;
                record.shared.set_progress(1.0);
                tracing::debug!(id = %record.id, path = %record.path.display(), "asset loaded");
                inner.queued_events.push(AssetEvent::Loaded {
                    id: record.id,
                    success: true,
                    error: None,
                });
            }
            Err(error) => {
                let message = error.to_string();
                tracing::warn!(
                    id = %record.id,
                    path = %record.path.display(),
                    error = %message,
                    "asset load failed"
                );
                record.state = LoadState::Failed;
                record.error = Some(message.clone());
                // A reload failure drops the previous content as well; the
                // record is unavailable until a caller re-requests it.
                record.content = None;
                inner.queued_events.push(AssetEvent::Loaded {
                    id: record.id,
                    success: false,
                    error: Some(message),
                });
            }
        }
    }

    /// Re-arm watched records whose backing file changed on disk.
    /// Caller holds the cache lock.
    fn scan_hot_reload_locked(&self, inner: &mut CacheInner) {
        let changed: Vec<AssetId> = inner
            .records
            .values()
            .filter(|record| record.state.is_loaded() && record.watch)
            .filter(|record| {
                io::modified_time(&record.path).is_some_and(|on_disk| {
                    record.modified.is_some_and(|seen| on_disk > seen)
                })
            })
            .map(|record| record.id)
            .collect();

        for id in changed {
            let (path, type_id, shared) = {
                let record = inner.records.get_mut(&id).unwrap();
                record.state = LoadState::Loading;
                record.shared.set_progress(0.0);
                (record.path.clone(), record.type_id, record.shared.clone())
            };
            let Some(loader) = self.loaders.read().unwrap().resolve(type_id) else {
                continue;
            };
            tracing::debug!(%id, path = %path.display(), "file changed on disk, reloading");
            inner.in_flight.insert(id);
            inner.had_in_flight = true;
            self.runner
                .spawn_load(id, path, loader, shared, self.max_file_size);
        }
    }

    /// Block until `id` is no longer in flight, driving integration so the
    /// wait cannot deadlock when called from the integrator thread.
    fn wait_for(&self, id: AssetId) {
        loop {
            {
                let mut inner = self.inner.lock().unwrap();
                self.integrate_locked(&mut inner);
                match inner.records.get(&id) {
                    None => return,
                    Some(record) if !record.state.is_in_flight() => return,
                    Some(_) => {}
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn remove_record(inner: &mut CacheInner, id: AssetId) {
        if let Some(record) = inner.records.remove(&id) {
            inner.by_path.remove(&(record.path.clone(), record.type_id));
            inner.in_flight.remove(&id);
            // Dropping the record drops the content Arc — the release
            // operation for type-erased payloads.
        }
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        self.runner.shutdown();
    }
}
