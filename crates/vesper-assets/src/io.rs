//! File access for the loading pipeline.

use std::path::Path;
use std::time::SystemTime;

use crate::error::{AssetError, AssetResult};

/// Read a file fully, enforcing the optional size limit before the read.
pub fn read_bytes(path: &Path, max_size: Option<u64>) -> AssetResult<Vec<u8>> {
    let metadata = std::fs::metadata(path).map_err(|e| map_io_error(path, e))?;

    if let Some(limit) = max_size {
        let size = metadata.len();
        if size > limit {
            return Err(AssetError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit,
            });
        }
    }

    std::fs::read(path).map_err(|e| map_io_error(path, e))
}

/// The file's modification time, if the filesystem reports one.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn map_io_error(path: &Path, error: std::io::Error) -> AssetError {
    if error.kind() == std::io::ErrorKind::NotFound {
        AssetError::NotFound {
            path: path.to_path_buf(),
        }
    } else {
        AssetError::Io {
            path: path.to_path_buf(),
            source: error,
        }
    }
}
