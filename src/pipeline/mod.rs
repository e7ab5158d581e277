//! Pipeline stages for pattern resizing and print tiling.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different vector-conversion backend)
//! without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ rotate ──▶ vectorize ──▶ scale_svg ──▶ render ──▶ tile ──▶ archive
//! (SVG/PDF)  (OSD)     (pdf2svg)     (<g scale>)   (resvg)    (A4)     (zip)
//! ```
//!
//! 1. [`input`]     — canonicalise the user-supplied path or URL to a
//!    validated local file and detect its kind
//! 2. [`rotate`]    — best-effort upright-orientation detection for
//!    scanned pages; every failure maps to "no rotation"
//! 3. [`vectorize`] — one SVG per PDF page via the external converter;
//!    runs pdfium work in `spawn_blocking` because the library is not
//!    async-safe; a bad page is skipped, not fatal
//! 4. [`scale_svg`] — wrap the drawing in a single scale group and strip
//!    XML namespaces
//! 5. [`render`]    — rasterise the scaled drawing (resvg) and apply the
//!    deliberate pre-tiling upscale; whole-page PDF previews via pdfium
//! 6. [`tile`]      — A4-at-print-DPI grid with centered white padding
//!    and one calibration mark per tile
//! 7. [`archive`]   — pack the tiles into one flat ZIP

pub mod archive;
pub mod input;
pub mod render;
pub mod rotate;
pub mod scale_svg;
pub mod tile;
pub mod vectorize;
