//! Asset loader traits and the per-type registry.

use std::any::{Any, TypeId};
use std::path::Path;
use std::sync::Arc;

use vesper_core::collections::HashMap;

use crate::Asset;
use crate::error::{AssetError, AssetResult};

/// Context handed to loaders: the resolved path and the raw file bytes.
///
/// The pipeline owns file I/O; the loader owns decoding.
pub struct LoadContext<'a> {
    /// The resolved, root-relative-validated path of the asset.
    pub path: &'a Path,
    /// The raw bytes of the backing file.
    pub bytes: &'a [u8],
}

impl<'a> LoadContext<'a> {
    /// Create a new load context.
    pub fn new(path: &'a Path, bytes: &'a [u8]) -> Self {
        Self { path, bytes }
    }
}

/// Trait for decoding assets from bytes.
///
/// Implementations are registered once per asset type and may be invoked
/// concurrently for different records; the cache guarantees at most one
/// concurrent invocation per record.
///
/// # Example
///
/// ```ignore
/// struct PngLoader;
///
/// impl AssetLoader for PngLoader {
///     type Asset = Texture;
///
///     fn load(&self, ctx: LoadContext<'_>) -> AssetResult<Self::Asset> {
///         // Decode PNG bytes into Texture...
///     }
/// }
/// ```
pub trait AssetLoader: Send + Sync + 'static {
    /// The asset type this loader produces.
    type Asset: Asset;

    /// Decode an asset from the provided context.
    fn load(&self, ctx: LoadContext<'_>) -> AssetResult<Self::Asset>;
}

/// Type-erased asset loader for storage in the registry table.
pub trait ErasedAssetLoader: Send + Sync {
    /// The type ID of the asset this loader produces.
    fn asset_type_id(&self) -> TypeId;

    /// Human-readable name of the asset type.
    fn asset_type_name(&self) -> &'static str;

    /// Decode an asset and return it as a boxed `Any`.
    fn load_erased(&self, ctx: LoadContext<'_>) -> AssetResult<Box<dyn Any + Send + Sync>>;
}

impl<L: AssetLoader> ErasedAssetLoader for L {
    fn asset_type_id(&self) -> TypeId {
        TypeId::of::<L::Asset>()
    }

    fn asset_type_name(&self) -> &'static str {
        L::Asset::type_name()
    }

    fn load_erased(&self, ctx: LoadContext<'_>) -> AssetResult<Box<dyn Any + Send + Sync>> {
        let asset = self.load(ctx)?;
        Ok(Box::new(asset))
    }
}

/// Registry of asset loaders, one per asset type.
///
/// Registration is expected at startup, before load requests for that type;
/// registering concurrently with loads of the same type is not supported.
#[derive(Default)]
pub struct LoaderRegistry {
    by_type: HashMap<TypeId, Arc<dyn ErasedAssetLoader>>,
}

impl LoaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `loader` for `L::Asset`, replacing any previous loader for
    /// that type.
    pub fn register<L: AssetLoader>(&mut self, loader: L) {
        let loader: Arc<dyn ErasedAssetLoader> = Arc::new(loader);
        let type_name = loader.asset_type_name();
        if self.by_type.insert(loader.asset_type_id(), loader).is_some() {
            tracing::debug!(type_name, "replacing asset loader");
        }
    }

    /// The loader for `type_id`, if one is registered.
    pub fn resolve(&self, type_id: TypeId) -> Option<Arc<dyn ErasedAssetLoader>> {
        self.by_type.get(&type_id).cloned()
    }

    /// The loader for `T`, or a `NoLoader` error.
    pub fn resolve_for<T: Asset>(&self) -> AssetResult<Arc<dyn ErasedAssetLoader>> {
        self.resolve(TypeId::of::<T>()).ok_or(AssetError::NoLoader {
            type_name: T::type_name(),
        })
    }

    /// Whether a loader is registered for `T`.
    pub fn has_loader_for<T: Asset>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// The number of registered loaders.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

/// Loads UTF-8 text files as `String`.
pub struct TextLoader;

impl AssetLoader for TextLoader {
    type Asset = String;

    fn load(&self, ctx: LoadContext<'_>) -> AssetResult<Self::Asset> {
        String::from_utf8(ctx.bytes.to_vec()).map_err(|e| AssetError::Decode {
            path: ctx.path.to_path_buf(),
            message: format!("invalid UTF-8: {}", e),
        })
    }
}

/// Loads raw bytes as `Vec<u8>`.
pub struct BytesLoader;

impl AssetLoader for BytesLoader {
    type Asset = Vec<u8>;

    fn load(&self, ctx: LoadContext<'_>) -> AssetResult<Self::Asset> {
        Ok(ctx.bytes.to_vec())
    }
}
