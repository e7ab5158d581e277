//! # seamfit
//!
//! Resize garment sewing patterns to real body measurements and tile the
//! result onto printable A4 pages.
//!
//! ## Why this crate?
//!
//! Commercial sewing patterns are drafted for chart bodies. Grading them
//! to an actual person by hand means photocopier percentages and a lot of
//! taped paper. This crate takes a pattern as a vector drawing (SVG) or a
//! scanned/paged document (PDF), derives X/Y scale factors from a size
//! chart, an external size estimate, or a vertical reference measurement,
//! applies them exactly, and cuts the result into 300 DPI A4 tiles that
//! reassemble at true physical scale. Every tile carries a 3.03 cm
//! calibration line so a ruler on the printout catches any printer-driver
//! rescaling immediately.
//!
//! ## Pipeline Overview
//!
//! ```text
//! SVG / PDF
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Rotate     best-effort upright detection on scanned pages
//!  ├─ 3. Vectorize  one SVG per page via the external converter
//!  ├─ 4. Scale      wrap drawing in a single scale(x,y) group
//!  ├─ 5. Render     rasterise (resvg) + Lanczos pre-tiling upscale
//!  ├─ 6. Tile       A4 grid, centered white padding, calibration mark
//!  └─ 7. Archive    one flat ZIP of all tiles
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use seamfit::{resize, MeasurementProfile, ResizeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let profile = MeasurementProfile {
//!         bust_cm: Some(92.0),
//!         hips_cm: Some(98.0),
//!         original_size: Some("38".into()),
//!         ..Default::default()
//!     };
//!     let config = ResizeConfig::builder()
//!         .work_dir("uploads")
//!         .build()?;
//!     let output = resize("pattern.pdf", &profile, &config).await?;
//!     println!("archive: {:?}", output.archive);
//!     eprintln!(
//!         "{}/{} pages, {} tiles",
//!         output.stats.processed_pages,
//!         output.stats.total_pages,
//!         output.stats.tile_count
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## External tools
//!
//! The PDF path shells out to `pdf2svg` (page vectorisation) and, when
//! present, `tesseract` (orientation detection — optional, detection
//! failures mean "no rotation"). Both sit behind capability traits
//! ([`PageVectorizer`], [`OrientationDetector`]) so the pipeline is
//! testable without them; the SVG path needs no external binaries at
//! all. PDF page rendering binds pdfium via `pdfium-render`.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `seamfit` binary (clap + anyhow + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! seamfit = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod chart;
pub mod config;
pub mod context;
pub mod convert;
pub mod error;
pub mod factors;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use chart::BodyMeasurements;
pub use config::{ResizeConfig, ResizeConfigBuilder};
pub use context::RunContext;
pub use convert::{inspect, preview, resize, resize_from_bytes, resize_sync};
pub use error::{PageError, ResizeError};
pub use factors::{
    derive_scale_factors, AxisOpinion, FactorProvider, MeasurementProfile, ScaleFactors,
};
pub use output::{DocumentInfo, PageOutcome, ResizeOutput, RunStats, UploadRecord};
pub use pipeline::input::InputKind;
pub use pipeline::rotate::Rotation;
pub use pipeline::tile::TileGrid;
pub use progress::{NoopProgress, ProgressHook, ResizeProgress};
pub use tools::{OrientationDetector, PageVectorizer, Pdf2SvgTool, TesseractOsd, ToolError};
