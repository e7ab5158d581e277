//! Output types: per-page outcomes, run statistics, and the record handed
//! to the persistence collaborator.

use crate::context::RunContext;
use crate::error::PageError;
use crate::factors::{MeasurementProfile, ScaleFactors};
use crate::pipeline::input::InputKind;
use crate::pipeline::tile::TileGrid;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What happened to one page of the input.
///
/// A page either produced a scaled SVG plus a full tile grid, or carries
/// the [`PageError`] that dropped it. Pages are reported in source order
/// regardless of the order they finished in.
#[derive(Debug, Serialize)]
pub struct PageOutcome {
    /// 1-indexed page number in the source document.
    pub page_num: usize,
    /// The persisted scaled SVG, when scaling succeeded.
    pub scaled_svg: Option<PathBuf>,
    /// Tile files in row-major grid order.
    pub tiles: Vec<PathBuf>,
    /// Grid dimensions of the tiling, when tiling ran.
    pub grid: Option<TileGrid>,
    /// Wall-clock time spent on this page.
    pub duration_ms: u64,
    /// Why the page was dropped, if it was.
    pub error: Option<PageError>,
}

impl PageOutcome {
    pub(crate) fn failed(page_num: usize, duration_ms: u64, error: PageError) -> Self {
        Self {
            page_num,
            scaled_svg: None,
            tiles: Vec::new(),
            grid: None,
            duration_ms,
            error: Some(error),
        }
    }

    /// True when the page made it all the way to tiles.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages that produced tiles.
    pub processed_pages: usize,
    /// Pages dropped by a page-level failure.
    pub failed_pages: usize,
    /// Tiles written across all pages.
    pub tile_count: usize,
    /// Time spent converting the document to per-page drawings.
    pub convert_duration_ms: u64,
    /// Time spent scaling, rasterising, and tiling pages.
    pub process_duration_ms: u64,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
}

/// Everything a completed run produced.
///
/// Holds the run's [`RunContext`] alive: when no explicit working
/// directory was configured the artifacts live in a temp directory that
/// is deleted as soon as this value is dropped.
#[derive(Debug)]
pub struct ResizeOutput {
    /// The scale factors that were applied.
    pub factors: ScaleFactors,
    /// Detected input kind.
    pub kind: InputKind,
    /// Per-page outcomes in source order, failures included.
    pub pages: Vec<PageOutcome>,
    /// The tile archive, when at least one tile was produced.
    pub archive: Option<PathBuf>,
    pub stats: RunStats,
    pub(crate) work: RunContext,
}

impl ResizeOutput {
    /// Root of the run's working directory.
    pub fn work_dir(&self) -> &Path {
        self.work.work_dir()
    }

    /// Build the record the persistence collaborator stores after a run.
    pub fn to_record(&self, source_name: &str, profile: &MeasurementProfile) -> UploadRecord {
        UploadRecord {
            source_name: source_name.to_string(),
            kind: self.kind,
            scale_x: self.factors.x,
            scale_y: self.factors.y,
            profile: profile.clone(),
            archive: self.archive.as_deref().map(file_name),
            scaled_svgs: self
                .pages
                .iter()
                .filter_map(|p| p.scaled_svg.as_deref())
                .map(file_name)
                .collect(),
            tiles: self
                .pages
                .iter()
                .flat_map(|p| p.tiles.iter())
                .map(|p| file_name(p))
                .collect(),
            stats: self.stats.clone(),
        }
    }
}

/// The flat, serialisable view of a run handed to the persistence sink.
///
/// Artifact paths are reduced to base filenames — the sink knows the
/// upload slot's directory, and tile names already encode their grid
/// position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub source_name: String,
    pub kind: InputKind,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Measurements and raw estimation text the factors were derived from.
    pub profile: MeasurementProfile,
    pub archive: Option<String>,
    pub scaled_svgs: Vec<String>,
    pub tiles: Vec<String>,
    pub stats: RunStats,
}

/// Cheap document facts, no pipeline run required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub kind: InputKind,
    /// Page count; always 1 for a vector drawing.
    pub page_count: usize,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunContext;

    fn sample_output() -> ResizeOutput {
        let work = RunContext::ephemeral().unwrap();
        ResizeOutput {
            factors: ScaleFactors::new(1.25, 1.4),
            kind: InputKind::Pdf,
            pages: vec![
                PageOutcome {
                    page_num: 1,
                    scaled_svg: Some(PathBuf::from("/w/print/page_1.svg")),
                    tiles: vec![
                        PathBuf::from("/w/print/page_1_tile_r0_c0.png"),
                        PathBuf::from("/w/print/page_1_tile_r0_c1.png"),
                    ],
                    grid: Some(TileGrid { rows: 1, cols: 2 }),
                    duration_ms: 12,
                    error: None,
                },
                PageOutcome::failed(
                    2,
                    3,
                    PageError::ConversionFailed {
                        page: 2,
                        detail: "exit 1".into(),
                    },
                ),
            ],
            archive: Some(PathBuf::from("/w/print/print_blouse.zip")),
            stats: RunStats {
                total_pages: 2,
                processed_pages: 1,
                failed_pages: 1,
                tile_count: 2,
                ..Default::default()
            },
            work,
        }
    }

    #[test]
    fn record_uses_base_filenames() {
        let output = sample_output();
        let record = output.to_record("blouse.pdf", &MeasurementProfile::default());
        assert_eq!(record.archive.as_deref(), Some("print_blouse.zip"));
        assert_eq!(record.scaled_svgs, vec!["page_1.svg"]);
        assert_eq!(
            record.tiles,
            vec!["page_1_tile_r0_c0.png", "page_1_tile_r0_c1.png"]
        );
        assert_eq!(record.scale_x, 1.25);
    }

    #[test]
    fn record_round_trips_through_json() {
        let output = sample_output();
        let record = output.to_record("blouse.pdf", &MeasurementProfile::default());
        let json = serde_json::to_string(&record).unwrap();
        let back: UploadRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tiles.len(), 2);
        assert_eq!(back.kind, InputKind::Pdf);
    }

    #[test]
    fn failed_outcome_has_no_artifacts() {
        let outcome = PageOutcome::failed(
            4,
            0,
            PageError::RenderFailed {
                page: 4,
                detail: "bad drawing".into(),
            },
        );
        assert!(!outcome.is_success());
        assert!(outcome.tiles.is_empty());
        assert!(outcome.grid.is_none());
    }
}
