//! Document-to-vector conversion: one SVG per PDF page.
//!
//! ## Per-page flow
//!
//! 1. Render the page at a low resolution and run orientation detection
//!    on it (best effort — see [`crate::pipeline::rotate`]).
//! 2. Apply the detected rotation and copy the page into a freshly
//!    created standalone single-page PDF. Saving through pdfium rewrites
//!    the page's resource dictionary; a missing `/Resources` entry makes
//!    the external converter fail silently, so isolation doubles as
//!    normalisation.
//! 3. Invoke the [`PageVectorizer`] capability on the isolated page.
//!    Success is recorded only if the expected SVG actually exists
//!    afterwards; the temp sub-document is deleted only after that
//!    confirmation, never before, so a failed page can be retried from
//!    its isolated input.
//!
//! ## Partial failure policy
//!
//! One bad page is skipped with a warning and processing continues; the
//! caller receives a [`PageConversion`] per page, failed ones included.
//! Only the document itself failing to open is fatal here.

use crate::config::ResizeConfig;
use crate::context::RunContext;
use crate::error::{PageError, ResizeError};
use crate::pipeline::render;
use crate::pipeline::rotate::{self, Rotation};
use crate::tools::{OrientationDetector, PageVectorizer, Pdf2SvgTool, TesseractOsd, ToolError};
use futures::stream::{self, StreamExt};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The conversion attempt for one page, in source page order.
#[derive(Debug)]
pub struct PageConversion {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// Path of the produced SVG, or why the page was dropped.
    pub result: Result<PathBuf, PageError>,
}

/// Convert every page of `pdf_path` into per-page SVGs under the run's
/// pages directory.
pub async fn convert_document(
    pdf_path: &Path,
    ctx: &RunContext,
    config: &ResizeConfig,
) -> Result<Vec<PageConversion>, ResizeError> {
    let tool_timeout = Duration::from_secs(config.tool_timeout_secs);
    let vectorizer: Arc<dyn PageVectorizer> = config
        .vectorizer
        .clone()
        .unwrap_or_else(|| Arc::new(Pdf2SvgTool::new(tool_timeout)));
    let detector: Arc<dyn OrientationDetector> = config
        .orientation
        .clone()
        .unwrap_or_else(|| Arc::new(TesseractOsd::new(tool_timeout)));

    // ── Pass 1: low-res renders for orientation detection ────────────────
    let osd_renders = {
        let path = pdf_path.to_path_buf();
        let dir = ctx.pages_dir().to_path_buf();
        let dpi = config.osd_dpi;
        tokio::task::spawn_blocking(move || osd_renders_blocking(&path, &dir, dpi))
            .await
            .map_err(|e| ResizeError::Internal(format!("OSD render task panicked: {}", e)))??
    };
    let total = osd_renders.len();
    info!("converting {} pages to vector drawings", total);

    let mut rotations = Vec::with_capacity(total);
    for (idx, maybe_png) in osd_renders.iter().enumerate() {
        let rotation = match maybe_png {
            Some(png) => rotate::detect(&detector, png, idx + 1).await,
            None => Rotation::Upright,
        };
        rotations.push(rotation);
    }
    // The low-res renders are transient; drop them before conversion.
    for png in osd_renders.into_iter().flatten() {
        let _ = std::fs::remove_file(png);
    }

    // ── Pass 2: isolate each page into a standalone sub-document ────────
    let isolated = {
        let path = pdf_path.to_path_buf();
        let dir = ctx.pages_dir().to_path_buf();
        tokio::task::spawn_blocking(move || isolate_pages_blocking(&path, &rotations, &dir))
            .await
            .map_err(|e| ResizeError::Internal(format!("isolation task panicked: {}", e)))??
    };

    // ── Pass 3: run the external converter, fanned out per page ──────────
    let mut conversions: Vec<PageConversion> =
        stream::iter(isolated.into_iter().enumerate().map(|(idx, iso)| {
            let vectorizer = Arc::clone(&vectorizer);
            let out_dir = ctx.pages_dir().to_path_buf();
            async move {
                let page_num = idx + 1;
                let result = match iso {
                    Err(detail) => Err(PageError::ConversionFailed {
                        page: page_num,
                        detail,
                    }),
                    Ok(tmp_pdf) => {
                        vectorize_page(vectorizer.as_ref(), &tmp_pdf, &out_dir, page_num).await
                    }
                };
                if let Err(e) = &result {
                    warn!("skipping page: {}", e);
                }
                PageConversion { page_num, result }
            }
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    conversions.sort_by_key(|c| c.page_num);
    Ok(conversions)
}

/// Convert one isolated page, verifying output and cleaning up the temp
/// sub-document only on confirmed success.
async fn vectorize_page(
    vectorizer: &dyn PageVectorizer,
    tmp_pdf: &Path,
    out_dir: &Path,
    page_num: usize,
) -> Result<PathBuf, PageError> {
    let output_svg = out_dir.join(format!("page_{page_num}.svg"));
    match vectorizer.vectorize(tmp_pdf, &output_svg).await {
        Ok(()) if output_svg.exists() => {
            if let Err(e) = std::fs::remove_file(tmp_pdf) {
                debug!("temp sub-document not removed: {}", e);
            }
            debug!("page {} → {}", page_num, output_svg.display());
            Ok(output_svg)
        }
        Ok(()) => Err(PageError::ConversionFailed {
            page: page_num,
            detail: "converter reported success but produced no output file".to_string(),
        }),
        Err(ToolError::Timeout { tool, secs }) => Err(PageError::ToolTimeout {
            page: page_num,
            tool: tool.to_string(),
            secs,
        }),
        Err(e) => Err(PageError::ConversionFailed {
            page: page_num,
            detail: e.to_string(),
        }),
    }
}

/// Render every page at OSD resolution; a failed page yields `None` and
/// is simply not orientation-corrected.
fn osd_renders_blocking(
    pdf_path: &Path,
    out_dir: &Path,
    dpi: u32,
) -> Result<Vec<Option<PathBuf>>, ResizeError> {
    let pdfium = Pdfium::default();
    let document = render::open_document(&pdfium, pdf_path)?;
    let total = document.pages().len() as usize;

    let mut renders = Vec::with_capacity(total);
    for idx in 0..total {
        let path = out_dir.join(format!("osd_page_{}.png", idx + 1));
        let saved = render::render_page_blocking(&document, idx, dpi)
            .and_then(|image| {
                image.save(&path).map_err(|e| ResizeError::ImageWriteFailed {
                    path: path.clone(),
                    detail: e.to_string(),
                })
            });
        match saved {
            Ok(()) => renders.push(Some(path)),
            Err(e) => {
                debug!("page {}: no OSD render ({}), skipping detection", idx + 1, e);
                renders.push(None);
            }
        }
    }
    Ok(renders)
}

/// Copy each page into its own single-page PDF, rotation applied first.
fn isolate_pages_blocking(
    pdf_path: &Path,
    rotations: &[Rotation],
    out_dir: &Path,
) -> Result<Vec<Result<PathBuf, String>>, ResizeError> {
    let pdfium = Pdfium::default();
    let document = render::open_document(&pdfium, pdf_path)?;

    let mut isolated = Vec::with_capacity(rotations.len());
    for (idx, rotation) in rotations.iter().copied().enumerate() {
        isolated.push(isolate_one(&pdfium, &document, idx, rotation, out_dir));
    }
    Ok(isolated)
}

fn isolate_one(
    pdfium: &Pdfium,
    document: &PdfDocument,
    idx: usize,
    rotation: Rotation,
    out_dir: &Path,
) -> Result<PathBuf, String> {
    if rotation != Rotation::Upright {
        let mut page = document
            .pages()
            .get(idx as u16)
            .map_err(|e| format!("page lookup: {:?}", e))?;
        let _ = page.set_rotation(rotation.to_pdfium());
    }

    let mut single = pdfium
        .create_new_pdf()
        .map_err(|e| format!("sub-document creation: {:?}", e))?;
    single
        .pages_mut()
        .copy_pages_from_document(document, &format!("{}", idx + 1), 0)
        .map_err(|e| format!("page copy: {:?}", e))?;

    let tmp_pdf = out_dir.join(format!("tmp_page_{}.pdf", idx + 1));
    single
        .save_to_file(&tmp_pdf)
        .map_err(|e| format!("sub-document save: {:?}", e))?;
    Ok(tmp_pdf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Converter fake that writes a fixed drawing.
    struct WritingVectorizer;

    #[async_trait]
    impl PageVectorizer for WritingVectorizer {
        async fn vectorize(&self, _page_pdf: &Path, output_svg: &Path) -> Result<(), ToolError> {
            std::fs::write(output_svg, "<svg width=\"10\" height=\"10\"/>")?;
            Ok(())
        }
    }

    /// Converter fake that claims success but writes nothing.
    struct SilentVectorizer;

    #[async_trait]
    impl PageVectorizer for SilentVectorizer {
        async fn vectorize(&self, _page_pdf: &Path, _output_svg: &Path) -> Result<(), ToolError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn success_requires_the_output_file_to_exist() {
        let dir = tempfile::tempdir().unwrap();
        let tmp_pdf = dir.path().join("tmp_page_1.pdf");
        std::fs::write(&tmp_pdf, b"%PDF-fake").unwrap();

        let err = vectorize_page(&SilentVectorizer, &tmp_pdf, dir.path(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::ConversionFailed { page: 1, .. }));
        // the temp sub-document survives a failed conversion
        assert!(tmp_pdf.exists());
    }

    #[tokio::test]
    async fn temp_sub_document_removed_after_confirmed_success() {
        let dir = tempfile::tempdir().unwrap();
        let tmp_pdf = dir.path().join("tmp_page_2.pdf");
        std::fs::write(&tmp_pdf, b"%PDF-fake").unwrap();

        let svg = vectorize_page(&WritingVectorizer, &tmp_pdf, dir.path(), 2)
            .await
            .unwrap();
        assert_eq!(svg, dir.path().join("page_2.svg"));
        assert!(svg.exists());
        assert!(!tmp_pdf.exists());
    }

    #[tokio::test]
    async fn timeout_maps_to_page_timeout_error() {
        struct TimingOutVectorizer;

        #[async_trait]
        impl PageVectorizer for TimingOutVectorizer {
            async fn vectorize(&self, _p: &Path, _o: &Path) -> Result<(), ToolError> {
                Err(ToolError::Timeout {
                    tool: "pdf2svg",
                    secs: 60,
                })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let err = vectorize_page(&TimingOutVectorizer, Path::new("x.pdf"), dir.path(), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, PageError::ToolTimeout { page: 3, secs: 60, .. }));
    }
}
