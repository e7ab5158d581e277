//! Print tiling: partition a raster into page-sized tiles with a
//! physical calibration mark on every tile.
//!
//! The grid is the ceiling of the image dimensions over the page
//! dimensions; interior tiles are exact crops, right- and bottom-edge
//! tiles are smaller crops composited **centered** onto an opaque white
//! page. The composite is alpha-aware (`imageops::overlay`): a naive
//! paste of a transparent-background crop leaves dark fringing at crop
//! edges once printed.
//!
//! Tile filenames encode the grid position (`{base}_tile_r{row}_c{col}`)
//! so a printed stack can be reassembled on the floor by name alone.
//!
//! ## The calibration mark
//!
//! Printer drivers silently rescale ("fit to page", borderless modes).
//! Every tile therefore carries a line of known physical length with a
//! text label; the user measures the printed line with a ruler and knows
//! immediately whether the printout is true to scale. One mark per tile,
//! at a fixed offset from the bottom-right corner, so any single page is
//! independently verifiable.

use crate::error::ResizeError;
use ab_glyph::{FontVec, PxScale};
use image::{imageops, DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Physical length of the calibration line in centimetres.
pub const CALIBRATION_CM: f64 = 3.03;

/// Distance of the line from the tile's bottom and right edges, px.
pub const CALIBRATION_MARGIN_PX: u32 = 100;

/// Stroke thickness of the calibration line, px.
const CALIBRATION_STROKE_PX: u32 = 5;

/// How far above the line the label baseline sits, px.
const LABEL_RAISE_PX: i64 = 40;

/// Label glyph height, px.
const LABEL_SCALE: f32 = 32.0;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

// The label is informative, not load-bearing; with no usable system font
// the line is still drawn and the tile remains verifiable with a ruler.
static LABEL_FONT: Lazy<Option<FontVec>> = Lazy::new(|| {
    for path in FONT_CANDIDATES {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(bytes) {
                debug!("calibration label font: {}", path);
                return Some(font);
            }
        }
    }
    warn!("no label font found; calibration lines will be drawn without a text label");
    None
});

/// Pixel length of the calibration line at the given print DPI.
///
/// 357 px at 300 DPI.
pub fn calibration_length_px(dpi: u32) -> u32 {
    (CALIBRATION_CM * f64::from(dpi) / 2.54) as u32
}

/// Tile grid dimensions over a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    pub rows: u32,
    pub cols: u32,
}

impl TileGrid {
    pub fn tile_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

/// The tiles produced for one page image.
#[derive(Debug)]
pub struct TilingOutcome {
    /// Tile files in row-major order.
    pub paths: Vec<PathBuf>,
    pub grid: TileGrid,
}

/// Grid size for an image: ceiling of image over page in each axis.
pub fn grid_for(width: u32, height: u32, page_w: u32, page_h: u32) -> TileGrid {
    TileGrid {
        cols: width.div_ceil(page_w),
        rows: height.div_ceil(page_h),
    }
}

/// Source crop rectangles `(left, top, width, height)` in row-major
/// order. Edge rectangles are clipped to the image bounds; together the
/// rectangles partition the image exactly.
pub(crate) fn tile_rects(width: u32, height: u32, page_w: u32, page_h: u32) -> Vec<(u32, u32, u32, u32)> {
    let grid = grid_for(width, height, page_w, page_h);
    let mut rects = Vec::with_capacity(grid.tile_count());
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let left = col * page_w;
            let top = row * page_h;
            let w = page_w.min(width - left);
            let h = page_h.min(height - top);
            rects.push((left, top, w, h));
        }
    }
    rects
}

/// Partition `image` into page-sized tiles, stamp each with a
/// calibration mark, and write them as PNGs into `out_dir`.
pub fn tile_image(
    image: &DynamicImage,
    base_name: &str,
    out_dir: &Path,
    page_w: u32,
    page_h: u32,
    dpi: u32,
) -> Result<TilingOutcome, ResizeError> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    let grid = grid_for(width, height, page_w, page_h);
    debug!(
        "tiling {}x{} px into {}x{} grid of {}x{} pages",
        width, height, grid.cols, grid.rows, page_w, page_h
    );

    let mut paths = Vec::with_capacity(grid.tile_count());
    for (i, (left, top, crop_w, crop_h)) in tile_rects(width, height, page_w, page_h)
        .into_iter()
        .enumerate()
    {
        let row = i as u32 / grid.cols;
        let col = i as u32 % grid.cols;

        let crop = imageops::crop_imm(&rgba, left, top, crop_w, crop_h).to_image();
        let mut page = RgbaImage::from_pixel(page_w, page_h, WHITE);
        let paste_x = i64::from((page_w - crop_w) / 2);
        let paste_y = i64::from((page_h - crop_h) / 2);
        imageops::overlay(&mut page, &crop, paste_x, paste_y);

        let mut tile = DynamicImage::ImageRgba8(page).to_rgb8();
        stamp_calibration_mark(&mut tile, dpi);

        let path = out_dir.join(format!("{base_name}_tile_r{row}_c{col}.png"));
        tile.save(&path).map_err(|e| ResizeError::ImageWriteFailed {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        paths.push(path);
    }

    Ok(TilingOutcome { paths, grid })
}

/// Draw the calibration line and its label near the bottom-right corner.
pub(crate) fn stamp_calibration_mark(tile: &mut RgbImage, dpi: u32) {
    let length = calibration_length_px(dpi);
    let (width, height) = tile.dimensions();

    let start_x = i64::from(width) - i64::from(length) - i64::from(CALIBRATION_MARGIN_PX);
    let start_y = i64::from(height) - i64::from(CALIBRATION_MARGIN_PX);
    if start_x < 0 || start_y < 0 {
        warn!("tile {}x{} too small for a calibration mark", width, height);
        return;
    }

    draw_filled_rect_mut(
        tile,
        Rect::at(start_x as i32, start_y as i32).of_size(length, CALIBRATION_STROKE_PX),
        BLACK,
    );

    if let Some(font) = &*LABEL_FONT {
        draw_text_mut(
            tile,
            BLACK,
            start_x as i32,
            (start_y - LABEL_RAISE_PX) as i32,
            PxScale::from(LABEL_SCALE),
            font,
            &format!("{CALIBRATION_CM} cm"),
        );
    }
}
