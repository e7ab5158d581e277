//! Upright-orientation normalisation for scanned pages.
//!
//! Scanned patterns are frequently photographed or fed sideways, and a
//! sideways page survives vector conversion sideways. Before
//! converting, each page is rendered at a deliberately low resolution and
//! handed to an orientation/script-detection pass; its reported rotation
//! class maps to the three-way result {0°, +90°, −90°}.
//!
//! Normalisation is a best-effort enhancement: a missing detector binary,
//! a corrupt page, or a detector crash all map to [`Rotation::Upright`].
//! Nothing downstream ever depends on detection having worked.

use crate::tools::OrientationDetector;
use pdfium_render::prelude::PdfPageRenderRotation;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Clockwise rotation required to make a page upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// Page is already the right way up (or detection was inconclusive).
    #[default]
    Upright,
    /// Rotate 90° clockwise.
    Clockwise,
    /// Rotate 90° counter-clockwise.
    CounterClockwise,
}

impl Rotation {
    /// Signed degrees: 0, +90, or −90.
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::Upright => 0,
            Rotation::Clockwise => 90,
            Rotation::CounterClockwise => -90,
        }
    }

    pub(crate) fn to_pdfium(self) -> PdfPageRenderRotation {
        match self {
            Rotation::Upright => PdfPageRenderRotation::None,
            Rotation::Clockwise => PdfPageRenderRotation::Degrees90,
            Rotation::CounterClockwise => PdfPageRenderRotation::Degrees270,
        }
    }
}

/// Map OSD report text to a three-way rotation.
///
/// Tesseract's `--psm 0` output contains a line like `Rotate: 90`.
/// `90` means the page needs a clockwise turn, `270` a counter-clockwise
/// one. Anything else — including `180`, which the detector reports for
/// upside-down text it cannot trust — maps to upright.
pub fn parse_osd(output: &str) -> Rotation {
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() != "Rotate" {
            continue;
        }
        return match value.trim() {
            "90" => Rotation::Clockwise,
            "270" => Rotation::CounterClockwise,
            _ => Rotation::Upright,
        };
    }
    Rotation::Upright
}

/// Best-effort detection: every failure becomes [`Rotation::Upright`].
pub async fn detect(
    detector: &Arc<dyn OrientationDetector>,
    page_image: &Path,
    page_num: usize,
) -> Rotation {
    match detector.detect(page_image).await {
        Ok(rotation) => {
            if rotation != Rotation::Upright {
                info!("page {page_num}: auto-rotate {}°", rotation.degrees());
            }
            rotation
        }
        Err(e) => {
            debug!("page {page_num}: orientation detection unavailable ({e}), assuming upright");
            Rotation::Upright
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolError;
    use async_trait::async_trait;

    #[test]
    fn parse_osd_clockwise() {
        let osd = "Page number: 0\nOrientation in degrees: 270\nRotate: 90\nOrientation confidence: 9.5";
        assert_eq!(parse_osd(osd), Rotation::Clockwise);
    }

    #[test]
    fn parse_osd_counter_clockwise() {
        assert_eq!(parse_osd("Rotate: 270\n"), Rotation::CounterClockwise);
    }

    #[test]
    fn parse_osd_upright_and_half_turn() {
        assert_eq!(parse_osd("Rotate: 0"), Rotation::Upright);
        assert_eq!(parse_osd("Rotate: 180"), Rotation::Upright);
    }

    #[test]
    fn parse_osd_garbage() {
        assert_eq!(parse_osd("no rotation info here"), Rotation::Upright);
        assert_eq!(parse_osd(""), Rotation::Upright);
    }

    #[test]
    fn degrees_mapping() {
        assert_eq!(Rotation::Upright.degrees(), 0);
        assert_eq!(Rotation::Clockwise.degrees(), 90);
        assert_eq!(Rotation::CounterClockwise.degrees(), -90);
    }

    struct FailingDetector;

    #[async_trait]
    impl OrientationDetector for FailingDetector {
        async fn detect(&self, _image: &Path) -> Result<Rotation, ToolError> {
            Err(ToolError::NotFound {
                tool: "tesseract",
                hint: "not installed",
            })
        }
    }

    #[tokio::test]
    async fn detection_failure_maps_to_upright() {
        let detector: Arc<dyn OrientationDetector> = Arc::new(FailingDetector);
        let rotation = detect(&detector, Path::new("/nonexistent.png"), 1).await;
        assert_eq!(rotation, Rotation::Upright);
    }
}
