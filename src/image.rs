//! Binary image loading.
//!
//! Images are raw byte files copied verbatim to the start of a segment and
//! zero-padded to the segment size.

use crate::cpu::{Memory, SEGMENT_SIZE};
use log::debug;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Load an image file into a fresh segment.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Memory, ImageError> {
    let path = path.as_ref();

    let meta = std::fs::metadata(path).map_err(|source| ImageError::Metadata {
        path: path.to_path_buf(),
        source,
    })?;

    if !meta.is_file() {
        return Err(ImageError::NotRegularFile(path.to_path_buf()));
    }

    if meta.len() > SEGMENT_SIZE as u64 {
        return Err(ImageError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            max: SEGMENT_SIZE,
        });
    }

    let bytes = std::fs::read(path).map_err(|source| ImageError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    // The file may have grown since the metadata check
    let mem = Memory::from_image(&bytes).map_err(|_| ImageError::TooLarge {
        path: path.to_path_buf(),
        size: bytes.len() as u64,
        max: SEGMENT_SIZE,
    })?;

    debug!("Loaded {} bytes from {}", bytes.len(), path.display());
    Ok(mem)
}

/// Errors that can occur while loading an image.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to stat {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a regular file: {}", .0.display())]
    NotRegularFile(PathBuf),

    #[error("{}: too large ({size} B > {max} B)", .path.display())]
    TooLarge { path: PathBuf, size: u64, max: usize },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
