//! Error types for the asset cache.

use std::fmt;
use std::path::PathBuf;

/// Errors that can occur during asset operations.
///
/// Every variant is a machine-checkable kind: callers match on the variant,
/// the `Display` text is for humans.
#[derive(Debug)]
pub enum AssetError {
    /// An empty path was passed to a load operation.
    EmptyPath,

    /// The path would resolve outside the asset root.
    PathEscapesRoot {
        /// The offending request path.
        path: PathBuf,
    },

    /// The backing file does not exist.
    NotFound {
        /// The resolved path that was probed.
        path: PathBuf,
    },

    /// Reading the backing file failed.
    Io {
        /// The resolved path that failed.
        path: PathBuf,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// The backing file exceeds the configured size limit.
    TooLarge {
        /// The resolved path.
        path: PathBuf,
        /// Actual file size in bytes.
        size: u64,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// No loader is registered for the requested asset type.
    NoLoader {
        /// Human-readable asset type name.
        type_name: &'static str,
    },

    /// The loader rejected the file contents.
    Decode {
        /// The path being decoded.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// The background task could not be scheduled.
    TaskSpawn {
        /// Description of the failure.
        message: String,
    },
}

impl fmt::Display for AssetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetError::EmptyPath => {
                write!(f, "empty asset path")
            }
            AssetError::PathEscapesRoot { path } => {
                write!(f, "path escapes the asset root: {}", path.display())
            }
            AssetError::NotFound { path } => {
                write!(f, "asset not found: {}", path.display())
            }
            AssetError::Io { path, source } => {
                write!(f, "IO error reading '{}': {}", path.display(), source)
            }
            AssetError::TooLarge { path, size, limit } => {
                write!(
                    f,
                    "asset '{}' is {} bytes, above the {} byte limit",
                    path.display(),
                    size,
                    limit
                )
            }
            AssetError::NoLoader { type_name } => {
                write!(f, "no loader registered for asset type: {}", type_name)
            }
            AssetError::Decode { path, message } => {
                write!(f, "failed to decode '{}': {}", path.display(), message)
            }
            AssetError::TaskSpawn { message } => {
                write!(f, "failed to schedule load: {}", message)
            }
        }
    }
}

impl std::error::Error for AssetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssetError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for asset operations.
pub type AssetResult<T> = Result<T, AssetError>;
