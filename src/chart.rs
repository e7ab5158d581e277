//! Static garment size chart.
//!
//! Maps European garment size labels ("32"–"48") to the body measurements
//! the size was drafted for, in centimetres. The scale engine divides the
//! user's measurements by these to obtain per-axis scale factors.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Body measurements a garment size is drafted for, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BodyMeasurements {
    pub bust: f64,
    pub waist: f64,
    pub hips: f64,
}

static SIZE_CHART: Lazy<HashMap<&'static str, BodyMeasurements>> = Lazy::new(|| {
    let rows = [
        ("32", 76.0, 60.0, 84.0),
        ("34", 80.0, 64.0, 88.0),
        ("36", 84.0, 68.0, 92.0),
        ("38", 88.0, 72.0, 96.0),
        ("40", 92.0, 76.0, 100.0),
        ("42", 96.0, 80.0, 104.0),
        ("44", 100.0, 84.0, 108.0),
        ("46", 104.0, 88.0, 112.0),
        ("48", 110.0, 94.0, 118.0),
    ];
    rows.into_iter()
        .map(|(size, bust, waist, hips)| (size, BodyMeasurements { bust, waist, hips }))
        .collect()
});

/// Look up the drafted body measurements for a size label.
///
/// Labels are matched after trimming whitespace; unknown labels return
/// `None` (the scale engine then leaves the affected axes untouched).
pub fn lookup(size: &str) -> Option<BodyMeasurements> {
    SIZE_CHART.get(size.trim()).copied()
}

/// All known size labels, ascending.
pub fn sizes() -> Vec<&'static str> {
    let mut labels: Vec<&'static str> = SIZE_CHART.keys().copied().collect();
    labels.sort_unstable();
    labels
}
