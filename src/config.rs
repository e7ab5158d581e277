//! Configuration for a pattern-resizing run.
//!
//! All run behaviour is controlled through [`ResizeConfig`], built via its
//! [`ResizeConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across threads, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely
//! on well-documented defaults for the rest.

use crate::error::ResizeError;
use crate::progress::ResizeProgress;
use crate::tools::{OrientationDetector, PageVectorizer};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A4 page width in millimetres.
pub const A4_WIDTH_MM: f64 = 210.0;

/// A4 page height in millimetres.
pub const A4_HEIGHT_MM: f64 = 297.0;

/// Configuration for a resizing run.
///
/// Built via [`ResizeConfig::builder()`] or using
/// [`ResizeConfig::default()`].
///
/// # Example
/// ```rust
/// use seamfit::ResizeConfig;
///
/// let config = ResizeConfig::builder()
///     .print_dpi(300)
///     .concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.page_size_px(), (2480, 3508));
/// ```
#[derive(Clone)]
pub struct ResizeConfig {
    /// Print resolution in DPI for tiles and the calibration mark. Default: 300.
    ///
    /// 300 DPI is the near-universal home-printer native resolution; the
    /// calibration line length, the tile pixel size, and the
    /// physical-world reassembly scale are all derived from it. Change it
    /// only together with your printer settings, or the printed
    /// calibration line will not measure what its label claims.
    pub print_dpi: u32,

    /// DPI at which a scaled SVG is rasterised. Default: 96.
    ///
    /// 96 is the CSS pixel density every SVG renderer assumes when a
    /// drawing carries no physical units. The gap between 96 and the
    /// print DPI is bridged by `upscale` below, so seam lines and the
    /// calibration mark stay legible at print resolution.
    pub render_dpi: u32,

    /// Extra raster upscale applied before tiling. Default: 3.0.
    ///
    /// Rasterising at 96 DPI and cropping into 300 DPI tiles would leave
    /// the artwork a third of its intended physical size. The Lanczos
    /// upscale compensates: 96 × 3 ≈ 288 DPI, within 4 % of print
    /// resolution, which the calibration mark lets the user verify.
    pub upscale: f32,

    /// DPI for the throwaway render fed to orientation detection. Default: 100.
    ///
    /// Orientation/script detection only needs coarse glyph shapes; a
    /// low-res render keeps the per-page detection pass under a second.
    pub osd_dpi: u32,

    /// Number of pages processed concurrently. Default: 4.
    ///
    /// Pages are independent (output files are addressed by name, not
    /// order), so vectorisation and rasterisation fan out. Raise this on
    /// wide machines; external tool processes are spawned per page, so
    /// very high values mostly burn memory.
    pub concurrency: usize,

    /// Timeout for one external tool invocation in seconds. Default: 60.
    ///
    /// A hung converter process must not wedge the whole run. Timeout is
    /// treated as a page-level failure: the page is skipped and the run
    /// continues.
    pub tool_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Working directory for the run's artifacts.
    ///
    /// `Some(dir)` — the directory is created if needed and **cleared at
    /// run start** (each run re-opens the original input, so stale
    /// artifacts would otherwise leak into the archive).
    /// `None` (default) — a uniquely-named temp directory per run, kept
    /// alive by the returned [`crate::output::ResizeOutput`]. Concurrent
    /// runs are only safe with distinct directories.
    pub work_dir: Option<PathBuf>,

    /// Vector-conversion capability. Default: the `pdf2svg` subprocess.
    ///
    /// Inject a fake here to test the pipeline without external binaries.
    pub vectorizer: Option<Arc<dyn PageVectorizer>>,

    /// Orientation-detection capability. Default: the `tesseract` OSD pass.
    pub orientation: Option<Arc<dyn OrientationDetector>>,

    /// Progress callback for per-page events. Default: none.
    pub progress: Option<Arc<dyn ResizeProgress>>,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            print_dpi: 300,
            render_dpi: 96,
            upscale: 3.0,
            osd_dpi: 100,
            concurrency: 4,
            tool_timeout_secs: 60,
            download_timeout_secs: 120,
            work_dir: None,
            vectorizer: None,
            orientation: None,
            progress: None,
        }
    }
}

impl fmt::Debug for ResizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResizeConfig")
            .field("print_dpi", &self.print_dpi)
            .field("render_dpi", &self.render_dpi)
            .field("upscale", &self.upscale)
            .field("osd_dpi", &self.osd_dpi)
            .field("concurrency", &self.concurrency)
            .field("tool_timeout_secs", &self.tool_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("work_dir", &self.work_dir)
            .field("vectorizer", &self.vectorizer.as_ref().map(|_| "<dyn PageVectorizer>"))
            .field("orientation", &self.orientation.as_ref().map(|_| "<dyn OrientationDetector>"))
            .finish()
    }
}

impl ResizeConfig {
    /// Create a new builder for `ResizeConfig`.
    pub fn builder() -> ResizeConfigBuilder {
        ResizeConfigBuilder {
            config: Self::default(),
        }
    }

    /// Tile page size in pixels: A4 at [`Self::print_dpi`].
    ///
    /// 2480 × 3508 px at the default 300 DPI.
    pub fn page_size_px(&self) -> (u32, u32) {
        let dpi = f64::from(self.print_dpi);
        let w = (A4_WIDTH_MM / 25.4 * dpi).round() as u32;
        let h = (A4_HEIGHT_MM / 25.4 * dpi).round() as u32;
        (w, h)
    }
}

/// Builder for [`ResizeConfig`].
#[derive(Debug)]
pub struct ResizeConfigBuilder {
    config: ResizeConfig,
}

impl ResizeConfigBuilder {
    pub fn print_dpi(mut self, dpi: u32) -> Self {
        self.config.print_dpi = dpi.clamp(72, 600);
        self
    }

    pub fn render_dpi(mut self, dpi: u32) -> Self {
        self.config.render_dpi = dpi.clamp(48, 600);
        self
    }

    pub fn upscale(mut self, factor: f32) -> Self {
        self.config.upscale = factor.clamp(1.0, 8.0);
        self
    }

    pub fn osd_dpi(mut self, dpi: u32) -> Self {
        self.config.osd_dpi = dpi.clamp(50, 300);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn tool_timeout_secs(mut self, secs: u64) -> Self {
        self.config.tool_timeout_secs = secs.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn vectorizer(mut self, tool: Arc<dyn PageVectorizer>) -> Self {
        self.config.vectorizer = Some(tool);
        self
    }

    pub fn orientation(mut self, tool: Arc<dyn OrientationDetector>) -> Self {
        self.config.orientation = Some(tool);
        self
    }

    pub fn progress(mut self, hook: Arc<dyn ResizeProgress>) -> Self {
        self.config.progress = Some(hook);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ResizeConfig, ResizeError> {
        let c = &self.config;
        if c.print_dpi < 72 || c.print_dpi > 600 {
            return Err(ResizeError::InvalidConfig(format!(
                "print DPI must be 72–600, got {}",
                c.print_dpi
            )));
        }
        if !(c.upscale.is_finite() && c.upscale >= 1.0) {
            return Err(ResizeError::InvalidConfig(format!(
                "upscale must be a finite factor ≥ 1.0, got {}",
                c.upscale
            )));
        }
        if c.concurrency == 0 {
            return Err(ResizeError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_page_size_is_a4_at_300dpi() {
        let config = ResizeConfig::default();
        assert_eq!(config.page_size_px(), (2480, 3508));
    }

    #[test]
    fn page_size_follows_dpi() {
        let config = ResizeConfig::builder().print_dpi(150).build().unwrap();
        assert_eq!(config.page_size_px(), (1240, 1754));
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let config = ResizeConfig::builder()
            .print_dpi(10_000)
            .upscale(0.1)
            .concurrency(0)
            .build()
            .unwrap();
        assert_eq!(config.print_dpi, 600);
        assert_eq!(config.upscale, 1.0);
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn debug_elides_trait_objects() {
        let s = format!("{:?}", ResizeConfig::default());
        assert!(s.contains("print_dpi"));
        assert!(!s.contains("Arc"));
    }
}
