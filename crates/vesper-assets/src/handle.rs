//! Asset identity and reference-counted handles.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Asset;
use crate::record::RecordShared;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a cached asset record.
///
/// Assigned once at record creation and never reused within a run, so a
/// stale id can never silently alias a newer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    pub(crate) fn next() -> Self {
        AssetId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw integer value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed, reference-counted accessor to a cached asset.
///
/// Cloning increments the record's refcount, dropping decrements it; the
/// cache's unused-asset sweep reclaims records whose count is zero. A handle
/// never owns content — all access goes through
/// [`AssetCache::get`](crate::AssetCache::get), which yields `None` rather
/// than dangling data when the asset is not ready.
pub struct Handle<T: Asset> {
    id: AssetId,
    shared: Arc<RecordShared>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Asset> Handle<T> {
    pub(crate) fn new(id: AssetId, shared: Arc<RecordShared>) -> Self {
        shared.add_ref();
        Self {
            id,
            shared,
            _marker: PhantomData,
        }
    }

    /// The identity of the record this handle points at.
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// The record's load progress in `[0.0, 1.0]`, read lock-free.
    pub fn progress(&self) -> f32 {
        self.shared.progress()
    }

    /// The current number of live handles to the record.
    pub fn ref_count(&self) -> u32 {
        self.shared.ref_count()
    }

    /// The asset type name.
    pub fn type_name(&self) -> &'static str {
        T::type_name()
    }
}

impl<T: Asset> Clone for Handle<T> {
    fn clone(&self) -> Self {
        self.shared.add_ref();
        Self {
            id: self.id,
            shared: self.shared.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Asset> Drop for Handle<T> {
    fn drop(&mut self) {
        self.shared.release();
    }
}

impl<T: Asset> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("type", &T::type_name())
            .field("id", &self.id)
            .finish()
    }
}

impl<T: Asset> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: Asset> Eq for Handle<T> {}

impl<T: Asset> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
