//! Archive packaging: collect tile files into one downloadable ZIP.
//!
//! Tiles sit at the archive root under their base filenames (which
//! already encode page and grid position), no subdirectories. A path
//! that no longer exists on disk at packaging time is skipped with a
//! warning rather than failing the archive — upstream stages may have
//! dropped pages, and a partial printout beats no printout.

use crate::error::ResizeError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write `tile_paths` into a deflate ZIP at `archive_path`.
///
/// Returns the number of files actually written.
pub fn pack_tiles(tile_paths: &[PathBuf], archive_path: &Path) -> Result<usize, ResizeError> {
    let file = File::create(archive_path).map_err(|e| ResizeError::OutputWriteFailed {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written = 0usize;
    for path in tile_paths {
        if !path.exists() {
            warn!("skipping missing tile: {}", path.display());
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("skipping tile with unusable name: {}", path.display());
            continue;
        };

        writer
            .start_file(name, options)
            .map_err(|e| ResizeError::Internal(format!("zip entry '{name}': {e}")))?;
        let mut source = File::open(path).map_err(|e| ResizeError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        })?;
        std::io::copy(&mut source, &mut writer).map_err(|e| ResizeError::OutputWriteFailed {
            path: archive_path.to_path_buf(),
            source: e,
        })?;
        written += 1;
    }

    writer
        .finish()
        .map_err(|e| ResizeError::Internal(format!("zip finalisation: {e}")))?;

    info!(
        "packed {}/{} tiles into {}",
        written,
        tile_paths.len(),
        archive_path.display()
    );
    Ok(written)
}
