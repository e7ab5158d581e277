//! Per-run scratch directory management.
//!
//! Every run owns a [`RunContext`]: either a caller-supplied directory
//! that is cleared at run start (each run re-opens the original input, so
//! stale artifacts must not leak into the archive), or a uniquely-named
//! temp directory. Nothing outside the context is ever written, which is
//! what makes concurrent runs safe — two runs simply get two directories.
//!
//! Temp-backed contexts keep their `TempDir` alive for as long as the
//! context exists; dropping the context deletes everything, so the
//! returned output value holds on to it until the caller is done.

use crate::config::ResizeConfig;
use crate::error::ResizeError;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// The scratch directory layout for one run.
///
/// ```text
/// <work>/
///   pages/   per-page SVGs, OSD renders, temp single-page PDFs
///   print/   scaled SVGs, tiles, the final archive
/// ```
pub struct RunContext {
    work_dir: PathBuf,
    pages_dir: PathBuf,
    print_dir: PathBuf,
    _temp: Option<TempDir>,
}

impl RunContext {
    /// A context backed by a fresh uniquely-named temp directory.
    pub fn ephemeral() -> Result<Self, ResizeError> {
        let temp = tempfile::Builder::new()
            .prefix("seamfit-")
            .tempdir()
            .map_err(|e| ResizeError::WorkDirFailed {
                path: std::env::temp_dir(),
                source: e,
            })?;
        let mut ctx = Self::layout(temp.path().to_path_buf())?;
        ctx._temp = Some(temp);
        Ok(ctx)
    }

    /// A context in a caller-chosen directory, cleared at creation.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Result<Self, ResizeError> {
        let dir = dir.into();
        if dir.exists() {
            clear_dir(&dir).map_err(|e| ResizeError::WorkDirFailed {
                path: dir.clone(),
                source: e,
            })?;
        }
        Self::layout(dir)
    }

    pub(crate) fn for_config(config: &ResizeConfig) -> Result<Self, ResizeError> {
        match &config.work_dir {
            Some(dir) => Self::in_dir(dir),
            None => Self::ephemeral(),
        }
    }

    fn layout(work_dir: PathBuf) -> Result<Self, ResizeError> {
        let pages_dir = work_dir.join("pages");
        let print_dir = work_dir.join("print");
        for dir in [&work_dir, &pages_dir, &print_dir] {
            fs::create_dir_all(dir).map_err(|e| ResizeError::WorkDirFailed {
                path: dir.clone(),
                source: e,
            })?;
        }
        debug!("run working directory: {}", work_dir.display());
        Ok(Self {
            work_dir,
            pages_dir,
            print_dir,
            _temp: None,
        })
    }

    /// Root of the run's scratch space.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Directory for per-page SVGs and conversion temporaries.
    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    /// Directory for scaled SVGs, tiles, and the archive.
    pub fn print_dir(&self) -> &Path {
        &self.print_dir
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("work_dir", &self.work_dir)
            .field("ephemeral", &self._temp.is_some())
            .finish()
    }
}

fn clear_dir(dir: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_creates_layout() {
        let ctx = RunContext::ephemeral().unwrap();
        assert!(ctx.pages_dir().is_dir());
        assert!(ctx.print_dir().is_dir());
        assert!(ctx.pages_dir().starts_with(ctx.work_dir()));
    }

    #[test]
    fn ephemeral_dir_is_removed_on_drop() {
        let path = {
            let ctx = RunContext::ephemeral().unwrap();
            ctx.work_dir().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn in_dir_clears_previous_run_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let work = root.path().join("uploads");
        fs::create_dir_all(work.join("print")).unwrap();
        fs::write(work.join("print").join("stale_tile.png"), b"old").unwrap();
        fs::write(work.join("leftover.svg"), b"old").unwrap();

        let ctx = RunContext::in_dir(&work).unwrap();
        assert!(ctx.print_dir().is_dir());
        assert!(!work.join("leftover.svg").exists());
        assert!(!ctx.print_dir().join("stale_tile.png").exists());
    }

    #[test]
    fn two_ephemeral_contexts_never_collide() {
        let a = RunContext::ephemeral().unwrap();
        let b = RunContext::ephemeral().unwrap();
        assert_ne!(a.work_dir(), b.work_dir());
    }
}
