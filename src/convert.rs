//! Top-level run entry points.
//!
//! [`resize`] is the primary API: resolve the input, derive scale
//! factors, convert pages, scale each drawing, rasterise, tile, and pack
//! the archive. [`preview`] and [`inspect`] are the two cheaper
//! companions (whole-page renders and document facts).
//!
//! The run returns `Ok` even when some pages failed — partial success is
//! the normal mode for scanned multi-page documents, and callers inspect
//! `output.pages` / `output.stats.failed_pages`. Only a run that produces
//! no page at all is an error.

use crate::config::ResizeConfig;
use crate::context::RunContext;
use crate::error::{PageError, ResizeError};
use crate::factors::{self, MeasurementProfile, ScaleFactors};
use crate::output::{DocumentInfo, PageOutcome, ResizeOutput, RunStats};
use crate::pipeline::vectorize::{self, PageConversion};
use crate::pipeline::{archive, input, render, scale_svg, tile};
use futures::stream::{self, StreamExt};
use pdfium_render::prelude::Pdfium;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Resize a pattern file (or URL) and tile it for printing.
///
/// # Arguments
/// * `input_str` — local file path or HTTP/HTTPS URL to an SVG or PDF
/// * `profile`   — user measurements, original size, estimation text
/// * `config`    — run configuration
///
/// # Returns
/// `Ok(ResizeOutput)` on success, even if some pages failed (check
/// `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(ResizeError)` only for fatal conditions:
/// - no usable input file (not found, unsupported type, not valid
///   SVG/PDF)
/// - the working directory cannot be prepared
/// - every page failed and there is nothing to package
pub async fn resize(
    input_str: impl AsRef<str>,
    profile: &MeasurementProfile,
    config: &ResizeConfig,
) -> Result<ResizeOutput, ResizeError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("starting resize run: {}", input_str);

    // ── Step 1: Resolve and validate input ───────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let kind = resolved.kind();

    // ── Step 2: Per-run scratch space ────────────────────────────────────
    let ctx = RunContext::for_config(config)?;

    // ── Step 3: Derive scale factors ─────────────────────────────────────
    let factors = factors::derive_scale_factors(profile);
    info!(
        "scale factors: x = {:.4}, y = {:.4}{}",
        factors.x,
        factors.y,
        if factors.is_identity() { " (identity)" } else { "" }
    );

    // ── Step 4: One drawing per page ─────────────────────────────────────
    let convert_start = Instant::now();
    let conversions = match kind {
        input::InputKind::Svg => stage_svg_input(resolved.path(), &ctx)?,
        input::InputKind::Pdf => vectorize::convert_document(resolved.path(), &ctx, config).await?,
    };
    let convert_duration_ms = convert_start.elapsed().as_millis() as u64;
    let total_pages = conversions.len();

    if let Some(hook) = &config.progress {
        hook.on_run_start(total_pages);
    }

    // ── Step 5: Scale, rasterise, tile each page ─────────────────────────
    let process_start = Instant::now();
    let pages = process_pages(conversions, factors, &ctx, config).await;
    let process_duration_ms = process_start.elapsed().as_millis() as u64;

    let processed = pages.iter().filter(|p| p.is_success()).count();
    let failed = pages.len() - processed;
    if processed == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "document produced no pages".to_string());
        return Err(ResizeError::AllPagesFailed {
            total: total_pages,
            first_error,
        });
    }

    // ── Step 6: Pack the archive ─────────────────────────────────────────
    let tiles: Vec<PathBuf> = pages
        .iter()
        .flat_map(|p| p.tiles.iter().cloned())
        .collect();
    let archive_path = ctx.print_dir().join(format!("print_{}.zip", input_stem(resolved.path())));
    let packed = archive::pack_tiles(&tiles, &archive_path)?;

    // ── Step 7: Assemble output ──────────────────────────────────────────
    let stats = RunStats {
        total_pages,
        processed_pages: processed,
        failed_pages: failed,
        tile_count: tiles.len(),
        convert_duration_ms,
        process_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "run complete: {}/{} pages, {} tiles, {}ms total",
        processed, total_pages, packed, stats.total_duration_ms
    );

    if let Some(hook) = &config.progress {
        hook.on_run_complete(total_pages, processed);
    }

    Ok(ResizeOutput {
        factors,
        kind,
        pages,
        archive: Some(archive_path),
        stats,
        work: ctx,
    })
}

/// Resize pattern bytes in memory.
///
/// This avoids the need for the caller to create a file: upload handlers
/// receive raw bytes plus a declared extension. Internally the bytes are
/// written to a managed [`tempfile`] and cleaned up automatically on
/// return or panic.
pub async fn resize_from_bytes(
    bytes: &[u8],
    extension: &str,
    profile: &MeasurementProfile,
    config: &ResizeConfig,
) -> Result<ResizeOutput, ResizeError> {
    // Reject unsupported kinds before touching the filesystem.
    input::InputKind::from_extension(extension)?;

    let mut tmp = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&format!(".{}", extension.to_ascii_lowercase()))
        .tempfile()
        .map_err(|e| ResizeError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| ResizeError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `resize` returns
    resize(&path, profile, config).await
}

/// Synchronous wrapper around [`resize`].
///
/// Creates a temporary tokio runtime internally.
pub fn resize_sync(
    input_str: impl AsRef<str>,
    profile: &MeasurementProfile,
    config: &ResizeConfig,
) -> Result<ResizeOutput, ResizeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ResizeError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(resize(input_str, profile, config))
}

/// Render every page of the input to `page_{n}.png` at the print DPI.
///
/// A page that fails to render is skipped with a warning; the returned
/// paths are the pages that exist.
pub async fn preview(
    input_str: impl AsRef<str>,
    output_dir: impl AsRef<Path>,
    config: &ResizeConfig,
) -> Result<Vec<PathBuf>, ResizeError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let out_dir = output_dir.as_ref();
    std::fs::create_dir_all(out_dir).map_err(|e| ResizeError::WorkDirFailed {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    let rendered = match resolved.kind() {
        input::InputKind::Pdf => {
            render::render_document_pages(resolved.path(), config.print_dpi).await?
        }
        input::InputKind::Svg => {
            let image = render::rasterize_svg_file(resolved.path(), config.print_dpi)?;
            vec![(0, image)]
        }
    };

    let mut paths = Vec::with_capacity(rendered.len());
    for (idx, image) in rendered {
        let path = out_dir.join(format!("page_{}.png", idx + 1));
        match image.save(&path) {
            Ok(()) => paths.push(path),
            Err(e) => warn!("skipping preview for page {}: {}", idx + 1, e),
        }
    }
    Ok(paths)
}

/// Document facts without running the pipeline.
///
/// Does not require the external converter binaries.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentInfo, ResizeError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    match resolved.kind() {
        input::InputKind::Svg => Ok(DocumentInfo {
            kind: input::InputKind::Svg,
            page_count: 1,
        }),
        input::InputKind::Pdf => {
            let path = resolved.path().to_path_buf();
            let page_count = tokio::task::spawn_blocking(move || {
                let pdfium = Pdfium::default();
                let document = render::open_document(&pdfium, &path)?;
                Ok::<_, ResizeError>(document.pages().len() as usize)
            })
            .await
            .map_err(|e| ResizeError::Internal(format!("inspect task panicked: {e}")))??;
            Ok(DocumentInfo {
                kind: input::InputKind::Pdf,
                page_count,
            })
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// A single vector drawing is its own one-page "document".
fn stage_svg_input(path: &Path, ctx: &RunContext) -> Result<Vec<PageConversion>, ResizeError> {
    let dest = ctx.pages_dir().join("page_1.svg");
    std::fs::copy(path, &dest).map_err(|e| ResizeError::OutputWriteFailed {
        path: dest.clone(),
        source: e,
    })?;
    Ok(vec![PageConversion {
        page_num: 1,
        result: Ok(dest),
    }])
}

fn input_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pattern".to_string())
}

/// Fan the converted pages out through scale → raster → tile.
pub(crate) async fn process_pages(
    conversions: Vec<PageConversion>,
    factors: ScaleFactors,
    ctx: &RunContext,
    config: &ResizeConfig,
) -> Vec<PageOutcome> {
    let total = conversions.len();
    let mut outcomes: Vec<PageOutcome> = stream::iter(conversions.into_iter().map(|conv| {
        let print_dir = ctx.print_dir().to_path_buf();
        let config = config.clone();
        async move {
            let page_num = conv.page_num;
            if let Some(hook) = &config.progress {
                hook.on_page_start(page_num, total);
            }
            let outcome = match conv.result {
                Err(e) => PageOutcome::failed(page_num, 0, e),
                Ok(svg_path) => {
                    process_page(page_num, &svg_path, factors, &print_dir, &config).await
                }
            };
            if let Some(hook) = &config.progress {
                match &outcome.error {
                    None => hook.on_page_complete(page_num, total, outcome.tiles.len()),
                    Some(e) => hook.on_page_error(page_num, total, &e.to_string()),
                }
            }
            outcome
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    outcomes.sort_by_key(|o| o.page_num);
    outcomes
}

/// Scale one page's drawing, rasterise it, and cut it into tiles.
///
/// Always returns a `PageOutcome` — never propagates the error upward, so
/// a single bad page doesn't abort the run.
async fn process_page(
    page_num: usize,
    svg_path: &Path,
    factors: ScaleFactors,
    print_dir: &Path,
    config: &ResizeConfig,
) -> PageOutcome {
    let start = Instant::now();
    let elapsed = |s: &Instant| s.elapsed().as_millis() as u64;

    let svg = match std::fs::read_to_string(svg_path) {
        Ok(svg) => svg,
        Err(e) => {
            return PageOutcome::failed(
                page_num,
                elapsed(&start),
                PageError::ScaleFailed {
                    page: page_num,
                    detail: format!("cannot read drawing: {e}"),
                },
            )
        }
    };

    let scaled = match scale_svg::apply_scale(&svg, factors) {
        Ok(scaled) => scaled,
        Err(e) => {
            return PageOutcome::failed(
                page_num,
                elapsed(&start),
                PageError::ScaleFailed {
                    page: page_num,
                    detail: e.to_string(),
                },
            )
        }
    };

    let scaled_path = print_dir.join(format!("page_{page_num}.svg"));
    if let Err(e) = std::fs::write(&scaled_path, &scaled) {
        return PageOutcome::failed(
            page_num,
            elapsed(&start),
            PageError::ScaleFailed {
                page: page_num,
                detail: format!("cannot persist scaled drawing: {e}"),
            },
        );
    }

    // Rasterisation and tiling are CPU-heavy; keep them off the async
    // workers.
    let base_name = format!("page_{page_num}");
    let (page_w, page_h) = config.page_size_px();
    let render_dpi = config.render_dpi;
    let upscale = config.upscale;
    let print_dpi = config.print_dpi;
    let tile_dir = print_dir.to_path_buf();
    let task = tokio::task::spawn_blocking(move || {
        let image = render::rasterize_svg_str(&scaled, render_dpi)?;
        let image = render::resize_raster(&image, upscale, upscale);
        tile::tile_image(&image, &base_name, &tile_dir, page_w, page_h, print_dpi)
    })
    .await;

    match task {
        Err(join_err) => PageOutcome::failed(
            page_num,
            elapsed(&start),
            PageError::RenderFailed {
                page: page_num,
                detail: format!("page task panicked: {join_err}"),
            },
        ),
        Ok(Err(e)) => {
            let error = match &e {
                ResizeError::ImageWriteFailed { .. } | ResizeError::OutputWriteFailed { .. } => {
                    PageError::TilingFailed {
                        page: page_num,
                        detail: e.to_string(),
                    }
                }
                _ => PageError::RenderFailed {
                    page: page_num,
                    detail: e.to_string(),
                },
            };
            PageOutcome::failed(page_num, elapsed(&start), error)
        }
        Ok(Ok(tiling)) => PageOutcome {
            page_num,
            scaled_svg: Some(scaled_path),
            tiles: tiling.paths,
            grid: Some(tiling.grid),
            duration_ms: elapsed(&start),
            error: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECT: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100" height="100"><rect x="10" y="10" width="20" height="20" fill="black"/></svg>"#;

    fn staged(ctx: &RunContext, page_num: usize, content: &str) -> PageConversion {
        let path = ctx.pages_dir().join(format!("page_{page_num}.svg"));
        std::fs::write(&path, content).unwrap();
        PageConversion {
            page_num,
            result: Ok(path),
        }
    }

    #[tokio::test]
    async fn partial_failure_keeps_surviving_pages() {
        let ctx = RunContext::ephemeral().unwrap();
        let config = ResizeConfig::default();
        // page 2's drawing is unparsable, pages 1 and 3 are fine
        let conversions = vec![
            staged(&ctx, 1, RECT),
            staged(&ctx, 2, "<svg width=\"10\" height=\"10\"><rect</svg>"),
            staged(&ctx, 3, RECT),
        ];

        let outcomes = process_pages(conversions, ScaleFactors::default(), &ctx, &config).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_success());
        assert!(!outcomes[1].is_success());
        assert!(outcomes[2].is_success());
        assert!(matches!(
            outcomes[1].error,
            Some(PageError::RenderFailed { page: 2, .. })
        ));
        // outcomes are in source order regardless of completion order
        let nums: Vec<usize> = outcomes.iter().map(|o| o.page_num).collect();
        assert_eq!(nums, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn dropped_conversion_carries_its_error_through() {
        let ctx = RunContext::ephemeral().unwrap();
        let config = ResizeConfig::default();
        let conversions = vec![PageConversion {
            page_num: 1,
            result: Err(PageError::ConversionFailed {
                page: 1,
                detail: "pdf2svg exited with status 1".into(),
            }),
        }];

        let outcomes = process_pages(conversions, ScaleFactors::default(), &ctx, &config).await;
        assert!(matches!(
            outcomes[0].error,
            Some(PageError::ConversionFailed { page: 1, .. })
        ));
    }

    #[tokio::test]
    async fn processed_page_produces_scaled_svg_and_tiles() {
        let ctx = RunContext::ephemeral().unwrap();
        let config = ResizeConfig::default();
        let conversions = vec![staged(&ctx, 1, RECT)];

        let outcomes =
            process_pages(conversions, ScaleFactors::new(1.5, 2.0), &ctx, &config).await;
        let page = &outcomes[0];
        assert!(page.is_success());

        let scaled = std::fs::read_to_string(page.scaled_svg.as_ref().unwrap()).unwrap();
        assert!(scaled.contains(r#"scale(1.5,2)"#));

        // 100 px at 96 DPI × 3 upscale = 300 px → one A4 tile
        assert_eq!(page.grid.unwrap().tile_count(), 1);
        assert_eq!(page.tiles.len(), 1);
        assert!(page.tiles[0].ends_with("page_1_tile_r0_c0.png"));
    }

    #[test]
    fn input_stem_falls_back() {
        assert_eq!(input_stem(Path::new("/a/blouse.pdf")), "blouse");
        assert_eq!(input_stem(Path::new("/")), "pattern");
    }
}
