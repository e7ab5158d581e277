//! External converter capabilities.
//!
//! The pipeline shells out for two jobs it cannot do in-process: turning
//! a PDF page into an SVG (`pdf2svg`) and asking which way is up on a
//! scanned page (`tesseract --psm 0`). Both sit behind small traits so
//! pipeline logic can be tested with fakes when the binaries are absent,
//! and so deployments can swap in different tools.
//!
//! Every invocation carries an explicit timeout; a tool that hangs is
//! killed and reported as [`ToolError::Timeout`], which the pipeline
//! treats as a page-level failure, never a run-level one.

use crate::pipeline::rotate::{parse_osd, Rotation};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Errors from an external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool binary is not installed or not on PATH.
    #[error("{tool} not found ({hint})")]
    NotFound { tool: &'static str, hint: &'static str },

    /// The tool ran but exited unsuccessfully.
    #[error("{tool} failed: {detail}")]
    Failed { tool: &'static str, detail: String },

    /// The tool exceeded its timeout and was killed.
    #[error("{tool} timed out after {secs}s")]
    Timeout { tool: &'static str, secs: u64 },

    /// Spawning or talking to the tool failed at the OS level.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Converts one single-page PDF into an SVG drawing.
#[async_trait]
pub trait PageVectorizer: Send + Sync {
    /// Convert `page_pdf` (a standalone single-page document) into
    /// `output_svg`. Implementations need not verify the output file —
    /// the pipeline checks existence itself before recording success.
    async fn vectorize(&self, page_pdf: &Path, output_svg: &Path) -> Result<(), ToolError>;

    /// Whether the backing tool can run on this machine.
    fn is_available(&self) -> bool {
        true
    }

    /// Human-readable install hint for when `is_available` is false.
    fn availability_hint(&self) -> String {
        String::new()
    }
}

/// Detects the upright orientation of a rendered page image.
#[async_trait]
pub trait OrientationDetector: Send + Sync {
    /// Report the clockwise rotation needed to make `page_image` upright.
    async fn detect(&self, page_image: &Path) -> Result<Rotation, ToolError>;

    /// Whether the backing tool can run on this machine.
    fn is_available(&self) -> bool {
        true
    }
}

// ── pdf2svg ──────────────────────────────────────────────────────────────

/// The `pdf2svg` subprocess backend.
pub struct Pdf2SvgTool {
    timeout: Duration,
}

impl Pdf2SvgTool {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl PageVectorizer for Pdf2SvgTool {
    async fn vectorize(&self, page_pdf: &Path, output_svg: &Path) -> Result<(), ToolError> {
        // The input is already a single-page document; page "1" selects it.
        let invocation = Command::new("pdf2svg")
            .arg(page_pdf)
            .arg(output_svg)
            .arg("1")
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, invocation).await {
            Err(_) => {
                return Err(ToolError::Timeout {
                    tool: "pdf2svg",
                    secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound {
                    tool: "pdf2svg",
                    hint: "install with: apt install pdf2svg",
                })
            }
            Ok(Err(e)) => return Err(ToolError::Io(e)),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::Failed {
                tool: "pdf2svg",
                detail: format!("exit {}: {}", output.status, stderr.trim()),
            });
        }
        debug!("pdf2svg wrote {}", output_svg.display());
        Ok(())
    }

    fn is_available(&self) -> bool {
        which::which("pdf2svg").is_ok()
    }

    fn availability_hint(&self) -> String {
        "pdf2svg not installed. Install with: apt install pdf2svg".to_string()
    }
}

// ── tesseract OSD ────────────────────────────────────────────────────────

/// The `tesseract` orientation/script-detection backend (`--psm 0`).
pub struct TesseractOsd {
    timeout: Duration,
}

impl TesseractOsd {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl OrientationDetector for TesseractOsd {
    async fn detect(&self, page_image: &Path) -> Result<Rotation, ToolError> {
        let invocation = Command::new("tesseract")
            .arg(page_image)
            .arg("stdout")
            .args(["--psm", "0"])
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, invocation).await {
            Err(_) => {
                return Err(ToolError::Timeout {
                    tool: "tesseract",
                    secs: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound {
                    tool: "tesseract",
                    hint: "install with: apt install tesseract-ocr",
                })
            }
            Ok(Err(e)) => return Err(ToolError::Io(e)),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::Failed {
                tool: "tesseract",
                detail: format!("exit {}: {}", output.status, stderr.trim()),
            });
        }
        // OSD goes to stdout on modern tesseract, stderr on some builds.
        let text = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(parse_osd(&text))
    }

    fn is_available(&self) -> bool {
        which::which("tesseract").is_ok()
    }
}
