//! Error types for the seamfit library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ResizeError`] — **Fatal**: the run cannot proceed at all (no usable
//!   input file, unsupported extension, scratch directory cannot be
//!   created, every page failed). Returned as `Err(ResizeError)` from the
//!   top-level `resize*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (vector
//!   conversion glitch, external tool timeout, rasterisation error) but
//!   the remaining pages are fine. Stored inside
//!   [`crate::output::PageOutcome`] so callers can inspect partial success
//!   rather than losing the whole document to one bad page.
//!
//! Rotation detection and scale-factor parsing never produce errors at
//! all: a failed orientation pass means "no rotation" and an unparsable
//! estimate line is skipped (the factors fall back to identity).

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the seamfit library.
///
/// Page-level failures use [`PageError`] and are stored in
/// [`crate::output::PageOutcome`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ResizeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("pattern file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// File extension is not in the allowed set (svg, pdf).
    #[error("unsupported input type '.{extension}': upload an SVG or PDF pattern")]
    UnsupportedInput { extension: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("file is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The file exists and was read, but is not an SVG drawing.
    #[error("file is not a valid SVG drawing: '{path}'")]
    NotAnSvg { path: PathBuf },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The vector drawing could not be parsed into a usable tree.
    #[error("drawing cannot be parsed: {detail}")]
    InvalidDrawing { detail: String },

    /// Every page failed; there is nothing to tile or package.
    #[error("all {total} pages failed during processing.\nFirst error: {first_error}")]
    AllPagesFailed { total: usize, first_error: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or clear the per-run scratch directory.
    #[error("failed to prepare working directory '{path}': {source}")]
    WorkDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file (archive, scaled SVG).
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not encode or save a produced image.
    #[error("failed to write image '{path}': {detail}")]
    ImageWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored alongside [`crate::output::PageOutcome`] when a page fails.
/// The overall run continues unless ALL pages fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The external vector-conversion tool failed or produced no output.
    #[error("page {page}: vector conversion failed: {detail}")]
    ConversionFailed { page: usize, detail: String },

    /// An external tool exceeded its timeout.
    #[error("page {page}: {tool} timed out after {secs}s")]
    ToolTimeout {
        page: usize,
        tool: String,
        secs: u64,
    },

    /// Scale application failed (the page's SVG could not be rewritten).
    #[error("page {page}: scaling failed: {detail}")]
    ScaleFailed { page: usize, detail: String },

    /// Rasterisation of the scaled drawing failed.
    #[error("page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Cropping, compositing, or saving a tile failed.
    #[error("page {page}: tiling failed: {detail}")]
    TilingFailed { page: usize, detail: String },
}

impl PageError {
    /// The 1-indexed page the error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::ConversionFailed { page, .. }
            | PageError::ToolTimeout { page, .. }
            | PageError::ScaleFailed { page, .. }
            | PageError::RenderFailed { page, .. }
            | PageError::TilingFailed { page, .. } => *page,
        }
    }
}
