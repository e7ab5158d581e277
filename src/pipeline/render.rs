//! Rasterisation: scaled SVG drawings to bitmaps, and whole PDF pages to
//! preview bitmaps.
//!
//! ## Two backends
//!
//! SVG drawings are rendered in-process with resvg onto a transparent
//! pixmap — transparency matters because edge tiles are later composited
//! onto white and a baked-in background would fringe the crop edges.
//! Whole PDF pages (the preview path) go through pdfium, the same way
//! the converter stage reads them.
//!
//! ## Why spawn_blocking for pdfium?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the work onto a thread
//! designed for blocking operations. The resvg renderer is pure Rust and
//! carries no such restriction; callers wrap it in `spawn_blocking` only
//! because it is CPU-heavy.

use crate::error::ResizeError;
use image::imageops::FilterType;
use image::DynamicImage;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use resvg::{tiny_skia, usvg};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// CSS pixel density every SVG renderer assumes for unitless drawings.
const CSS_DPI: f32 = 96.0;

const SVG_XMLNS: &str = r#"xmlns="http://www.w3.org/2000/svg""#;

// Loading system fonts walks the font directories; do it once per process.
static FONTDB: Lazy<Arc<usvg::fontdb::Database>> = Lazy::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    Arc::new(db)
});

/// Rasterise an SVG string at the given DPI onto a transparent background.
pub fn rasterize_svg_str(svg: &str, dpi: u32) -> Result<DynamicImage, ResizeError> {
    // The scale stage strips namespace declarations from persisted
    // output; the strict XML parser underneath usvg wants them back.
    let svg = ensure_namespace(svg);

    let mut options = usvg::Options::default();
    options.dpi = dpi as f32;
    options.fontdb = Arc::clone(&FONTDB);

    let tree = usvg::Tree::from_str(&svg, &options).map_err(|e| ResizeError::InvalidDrawing {
        detail: e.to_string(),
    })?;

    // The scale group can push content past the declared viewport; the
    // canvas covers whichever is larger so nothing is clipped before
    // tiling.
    let size = tree.size();
    let bbox = tree.root().abs_stroke_bounding_box();
    let content_w = size.width().max(bbox.right());
    let content_h = size.height().max(bbox.bottom());

    let scale = dpi as f32 / CSS_DPI;
    let width = (content_w * scale).ceil().max(1.0) as u32;
    let height = (content_h * scale).ceil().max(1.0) as u32;

    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        ResizeError::Internal(format!("cannot allocate {width}x{height} pixmap"))
    })?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let png = pixmap
        .encode_png()
        .map_err(|e| ResizeError::Internal(format!("pixmap encode failed: {e}")))?;
    let image = image::load_from_memory(&png)
        .map_err(|e| ResizeError::Internal(format!("pixmap decode failed: {e}")))?;

    debug!("rasterised drawing → {}x{} px at {} DPI", width, height, dpi);
    Ok(image)
}

/// Rasterise an SVG file at the given DPI.
pub fn rasterize_svg_file(path: &Path, dpi: u32) -> Result<DynamicImage, ResizeError> {
    let svg = std::fs::read_to_string(path).map_err(|_| ResizeError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    rasterize_svg_str(&svg, dpi)
}

/// Resize a raster by an independent (x, y) factor pair.
///
/// Lanczos3 is the filter of choice for upscaling line art: it keeps seam
/// lines and the calibration mark crisp where bilinear smears them.
pub fn resize_raster(image: &DynamicImage, scale_x: f32, scale_y: f32) -> DynamicImage {
    let width = ((image.width() as f32 * scale_x).round() as u32).max(1);
    let height = ((image.height() as f32 * scale_y).round() as u32).max(1);
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Re-insert the SVG namespace declaration the scale stage stripped.
fn ensure_namespace(svg: &str) -> String {
    match svg.find("<svg") {
        Some(at) if !svg.contains("xmlns=") => {
            let insert_at = at + "<svg".len();
            format!("{} {}{}", &svg[..insert_at], SVG_XMLNS, &svg[insert_at..])
        }
        _ => svg.to_string(),
    }
}

/// Render every page of a PDF document to a bitmap at the given DPI.
///
/// This runs inside `spawn_blocking` since pdfium operations are
/// CPU-bound. A page that fails to render is logged and skipped, so one
/// bad page never empties the preview.
///
/// # Returns
/// A vector of `(page_index_0based, DynamicImage)` tuples.
pub async fn render_document_pages(
    pdf_path: &Path,
    dpi: u32,
) -> Result<Vec<(usize, DynamicImage)>, ResizeError> {
    let path = pdf_path.to_path_buf();
    let result = tokio::task::spawn_blocking(move || render_document_pages_blocking(&path, dpi))
        .await
        .map_err(|e| ResizeError::Internal(format!("render task panicked: {}", e)))?;
    result
}

/// Blocking implementation of whole-document page rendering.
fn render_document_pages_blocking(
    pdf_path: &Path,
    dpi: u32,
) -> Result<Vec<(usize, DynamicImage)>, ResizeError> {
    let pdfium = Pdfium::default();
    let document = open_document(&pdfium, pdf_path)?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    info!("PDF loaded: {} pages", total_pages);

    let mut results = Vec::with_capacity(total_pages);
    for idx in 0..total_pages {
        match render_page_blocking(&document, idx, dpi) {
            Ok(image) => results.push((idx, image)),
            Err(e) => warn!("skipping page {}: {}", idx + 1, e),
        }
    }
    Ok(results)
}

/// Render one page of an already-open document at the given DPI.
pub(crate) fn render_page_blocking(
    document: &PdfDocument,
    page_index: usize,
    dpi: u32,
) -> Result<DynamicImage, ResizeError> {
    let page = document
        .pages()
        .get(page_index as u16)
        .map_err(|e| ResizeError::Internal(format!("page {}: {:?}", page_index + 1, e)))?;

    // PDF points are 1/72 inch; pdfium scales height proportionally.
    let width_px = (page.width().value / 72.0 * dpi as f32).round() as i32;
    let height_px = (page.height().value / 72.0 * dpi as f32).round() as i32;
    let render_config = PdfRenderConfig::new()
        .set_target_width(width_px)
        .set_maximum_height(height_px.max(1));

    let bitmap = page
        .render_with_config(&render_config)
        .map_err(|e| ResizeError::Internal(format!("page {}: {:?}", page_index + 1, e)))?;

    let image = bitmap.as_image();
    debug!(
        "rendered page {} → {}x{} px at {} DPI",
        page_index + 1,
        image.width(),
        image.height(),
        dpi
    );
    Ok(image)
}

/// Open a PDF with pdfium, mapping failures to [`ResizeError::CorruptPdf`].
pub(crate) fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
) -> Result<PdfDocument<'a>, ResizeError> {
    pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ResizeError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{:?}", e),
        })
}
