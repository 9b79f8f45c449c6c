//! Vesper asset cache.
//!
//! Type-safe, reference-counted caching of file-backed content with
//! asynchronous loading, frame-driven integration, and hot reload.
//!
//! The [`AssetCache`] is the coordinator: it resolves request paths against
//! an asset root, deduplicates records per (path, type), runs registered
//! [`AssetLoader`]s on a background pool, and applies finished loads during
//! the per-frame [`AssetCache::update`] call. Callers hold typed,
//! reference-counted [`Handle`]s and observe completion through drained
//! [`AssetEvent`]s.

pub mod cache;
pub mod error;
pub mod event;
pub mod handle;
pub mod io;
pub mod loader;
pub mod path;
pub mod record;

mod task;

pub use cache::{AssetCache, CacheConfig, LoadSettings};
pub use error::{AssetError, AssetResult};
pub use event::{AssetEvent, AssetEventBuffer};
pub use handle::{AssetId, Handle};
pub use loader::{AssetLoader, BytesLoader, ErasedAssetLoader, LoadContext, LoaderRegistry, TextLoader};
pub use record::LoadState;

/// Marker trait for types that can be cached as assets.
pub trait Asset: Send + Sync + 'static {
    /// Human-readable type name used in logs and errors.
    fn type_name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl Asset for String {
    fn type_name() -> &'static str {
        "String"
    }
}

impl Asset for Vec<u8> {
    fn type_name() -> &'static str {
        "Bytes"
    }
}
