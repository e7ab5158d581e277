//! Integration tests for the SVG resize pipeline.
//!
//! The SVG path runs fully in-process (resvg + image), so these tests
//! need no external binaries and no pdfium. The PDF path is covered by
//! the env-gated suite in `e2e.rs`.

use seamfit::{
    resize, resize_from_bytes, MeasurementProfile, ResizeConfig, ResizeError, ScaleFactors,
    TileGrid,
};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────

/// A simple opaque pattern drawing of the given logical size.
fn pattern_svg(size: u32) -> String {
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{s}" height="{s}">"#,
            r#"<rect x="0" y="0" width="{s}" height="{s}" fill="red"/>"#,
            r#"<path d="M 10 10 L {m} {m}" stroke="black" stroke-width="2" fill="none"/>"#,
            "</svg>"
        ),
        s = size,
        m = size / 2
    )
}

fn write_pattern(dir: &Path, name: &str, size: u32) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, pattern_svg(size)).unwrap();
    path
}

fn tile_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

// ── End-to-end SVG flow ──────────────────────────────────────────────────

#[tokio::test]
async fn svg_run_produces_scaled_svg_tiles_and_archive() {
    let root = tempfile::tempdir().unwrap();
    let input = write_pattern(root.path(), "blouse.svg", 100);
    let work = root.path().join("work");

    let profile = MeasurementProfile {
        bust_cm: Some(92.0),
        hips_cm: Some(98.0),
        original_size: Some("38".into()),
        ..Default::default()
    };
    let config = ResizeConfig::builder().work_dir(&work).build().unwrap();

    let output = resize(input.to_str().unwrap(), &profile, &config)
        .await
        .unwrap();

    // chart factors: 92/88 and 98/96
    assert!((output.factors.x - 92.0 / 88.0).abs() < 1e-12);
    assert!((output.factors.y - 98.0 / 96.0).abs() < 1e-12);

    assert_eq!(output.stats.total_pages, 1);
    assert_eq!(output.stats.processed_pages, 1);
    assert_eq!(output.stats.failed_pages, 0);

    let page = &output.pages[0];
    assert!(page.is_success());
    // 100 px × 3 upscale ≈ 314 px: a single A4 tile
    assert_eq!(page.grid, Some(TileGrid { rows: 1, cols: 1 }));

    let scaled = std::fs::read_to_string(page.scaled_svg.as_ref().unwrap()).unwrap();
    assert!(scaled.contains("<g transform=\"scale("));
    assert!(!scaled.contains("xmlns"));

    let archive = output.archive.as_ref().unwrap();
    assert!(archive.exists());
    assert_eq!(
        archive.file_name().unwrap().to_string_lossy(),
        "print_blouse.zip"
    );
    assert!(archive.starts_with(&work));
}

#[tokio::test]
async fn large_raster_tiles_into_two_by_two_grid() {
    let root = tempfile::tempdir().unwrap();
    // 2000 logical px at 96 DPI, upscaled 2× → a 4000×4000 px raster
    let input = write_pattern(root.path(), "coat.svg", 2000);
    let work = root.path().join("work");

    let config = ResizeConfig::builder()
        .work_dir(&work)
        .upscale(2.0)
        .build()
        .unwrap();

    let output = resize(
        input.to_str().unwrap(),
        &MeasurementProfile::default(),
        &config,
    )
    .await
    .unwrap();

    let page = &output.pages[0];
    assert_eq!(page.grid, Some(TileGrid { rows: 2, cols: 2 }));
    assert_eq!(
        tile_names(&page.tiles),
        vec![
            "page_1_tile_r0_c0.png",
            "page_1_tile_r0_c1.png",
            "page_1_tile_r1_c0.png",
            "page_1_tile_r1_c1.png",
        ]
    );

    for path in &page.tiles {
        let tile = image::open(path).unwrap().to_rgb8();
        assert_eq!(tile.dimensions(), (2480, 3508));
        // every tile carries the calibration line at the same offset
        // from the bottom-right corner
        let y = 3508 - 100;
        let x = 2480 - 357 - 100;
        assert_eq!(tile.get_pixel(x + 50, y), &image::Rgb([0, 0, 0]));
    }

    // right-edge tile: 1520 px of content centered in 2480
    let right = image::open(&page.tiles[1]).unwrap().to_rgb8();
    assert_eq!(right.get_pixel(479, 1000), &image::Rgb([255, 255, 255]));
    assert_eq!(right.get_pixel(480, 1000), &image::Rgb([255, 0, 0]));

    // bottom-edge tile: 492 px of content centered in 3508
    let bottom = image::open(&page.tiles[2]).unwrap().to_rgb8();
    assert_eq!(bottom.get_pixel(1000, 1507), &image::Rgb([255, 255, 255]));
    assert_eq!(bottom.get_pixel(1000, 1508), &image::Rgb([255, 0, 0]));
}

#[tokio::test]
async fn rerun_on_cleared_work_dir_is_deterministic() {
    let root = tempfile::tempdir().unwrap();
    let input = write_pattern(root.path(), "skirt.svg", 150);
    let work = root.path().join("work");

    let profile = MeasurementProfile {
        torso_height_cm: Some(45.0),
        ..Default::default()
    };
    let config = ResizeConfig::builder().work_dir(&work).build().unwrap();

    let first = resize(input.to_str().unwrap(), &profile, &config)
        .await
        .unwrap();
    let first_names = tile_names(&first.pages[0].tiles);
    let first_factors = first.factors;
    drop(first);

    let second = resize(input.to_str().unwrap(), &profile, &config)
        .await
        .unwrap();
    assert_eq!(tile_names(&second.pages[0].tiles), first_names);
    assert_eq!(second.factors, first_factors);
    assert_eq!(second.pages[0].grid, Some(TileGrid { rows: 1, cols: 1 }));
}

// ── Factor sources through the full run ──────────────────────────────────

#[tokio::test]
async fn vertical_fallback_applies_when_chart_cannot_determine_y() {
    let root = tempfile::tempdir().unwrap();
    let input = write_pattern(root.path(), "top.svg", 100);

    let profile = MeasurementProfile {
        torso_height_cm: Some(45.0),
        ..Default::default()
    };
    let config = ResizeConfig::builder()
        .work_dir(root.path().join("work"))
        .build()
        .unwrap();

    let output = resize(input.to_str().unwrap(), &profile, &config)
        .await
        .unwrap();
    assert_eq!(output.factors, ScaleFactors::new(1.0, 1.5));
}

#[tokio::test]
async fn estimate_text_overrides_chart_factors() {
    let root = tempfile::tempdir().unwrap();
    let input = write_pattern(root.path(), "dress.svg", 100);

    let profile = MeasurementProfile {
        bust_cm: Some(92.0),
        hips_cm: Some(98.0),
        original_size: Some("38".into()),
        estimate_text: Some(
            "estimated_bust = 88\nestimated_hips = 96\nscale_x = 1.2\nscale_y = 1.1\n".into(),
        ),
        ..Default::default()
    };
    let config = ResizeConfig::builder()
        .work_dir(root.path().join("work"))
        .build()
        .unwrap();

    let output = resize(input.to_str().unwrap(), &profile, &config)
        .await
        .unwrap();
    assert_eq!(output.factors, ScaleFactors::new(1.2, 1.1));

    let scaled = std::fs::read_to_string(output.pages[0].scaled_svg.as_ref().unwrap()).unwrap();
    assert!(scaled.contains("scale(1.2,1.1)"));
}

// ── Error policy ─────────────────────────────────────────────────────────

#[tokio::test]
async fn unsupported_extension_is_rejected_immediately() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("pattern.docx");
    std::fs::write(&path, b"not a pattern").unwrap();

    let err = resize(
        path.to_str().unwrap(),
        &MeasurementProfile::default(),
        &ResizeConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ResizeError::UnsupportedInput { .. }));
    // rejected before any partial state is created
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn unrenderable_single_drawing_fails_the_run() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("broken.svg");
    // passes the <svg sniff but cannot be parsed by the renderer
    std::fs::write(&path, "<svg width=\"10\" height=\"10\"><rect</svg>").unwrap();

    let err = resize(
        path.to_str().unwrap(),
        &MeasurementProfile::default(),
        &ResizeConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ResizeError::AllPagesFailed { total: 1, .. }));
}

// ── Byte-based entry point ───────────────────────────────────────────────

#[tokio::test]
async fn resize_from_bytes_runs_the_same_pipeline() {
    let bytes = pattern_svg(100);
    let output = resize_from_bytes(
        bytes.as_bytes(),
        "svg",
        &MeasurementProfile::default(),
        &ResizeConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(output.stats.processed_pages, 1);
    // ephemeral work dir lives as long as the output does
    assert!(output.archive.as_ref().unwrap().exists());
    assert!(output.work_dir().exists());
}

#[tokio::test]
async fn resize_from_bytes_rejects_unknown_extension() {
    let err = resize_from_bytes(
        b"data",
        "exe",
        &MeasurementProfile::default(),
        &ResizeConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ResizeError::UnsupportedInput { .. }));
}

// ── Record for the persistence sink ──────────────────────────────────────

#[tokio::test]
async fn record_captures_factors_and_artifact_names() {
    let root = tempfile::tempdir().unwrap();
    let input = write_pattern(root.path(), "blouse.svg", 100);

    let profile = MeasurementProfile {
        bust_cm: Some(92.0),
        original_size: Some("38".into()),
        estimate_text: Some("scale_x = 1.5\nscale_y = 2.0".into()),
        ..Default::default()
    };
    let config = ResizeConfig::builder()
        .work_dir(root.path().join("work"))
        .build()
        .unwrap();

    let output = resize(input.to_str().unwrap(), &profile, &config)
        .await
        .unwrap();
    let record = output.to_record("blouse.svg", &profile);

    assert_eq!(record.scale_x, 1.5);
    assert_eq!(record.scale_y, 2.0);
    assert_eq!(record.archive.as_deref(), Some("print_blouse.zip"));
    assert_eq!(record.scaled_svgs, vec!["page_1.svg"]);
    assert!(record.tiles.iter().all(|t| t.starts_with("page_1_tile_")));
    assert_eq!(
        record.profile.estimate_text.as_deref(),
        Some("scale_x = 1.5\nscale_y = 2.0")
    );

    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"scale_x\":1.5"));
}
