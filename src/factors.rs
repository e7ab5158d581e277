//! Scale-factor derivation.
//!
//! Three independent sources can propose scale factors for a run: the
//! static size chart, the AI estimation collaborator's response text, and
//! the user's vertical measurement. Their precedence was historically
//! implicit; here it is an explicit, ordered chain of
//! [`FactorProvider`]s, each returning a per-axis opinion or no opinion
//! at all. Later opinions override earlier ones, and the vertical
//! fallback fires only when the Y axis is still undetermined.
//!
//! A proposal that is non-finite or ≤ 0 is discarded with a warning —
//! factor derivation never fails; in the worst case the identity
//! (1.0, 1.0) is used and the pattern prints at its original size.

use crate::chart;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Nominal torso reference height in centimetres.
///
/// Denominator of the vertical fallback: a user-supplied torso height of
/// 45 cm against this base yields scale_y = 1.5.
pub const NOMINAL_TORSO_CM: f64 = 30.0;

/// The X/Y scale pair applied to a drawing.
///
/// A Y value of exactly 1.0 after the chart/estimate providers means
/// "not yet determined" and arms the vertical fallback — it is not a
/// plain default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactors {
    pub x: f64,
    pub y: f64,
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

impl ScaleFactors {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when both axes are exactly 1.0.
    pub fn is_identity(&self) -> bool {
        self.x == 1.0 && self.y == 1.0
    }
}

/// Everything a run knows about the user and the garment.
///
/// All lengths in centimetres. `estimate_text` is the raw response of the
/// external estimation collaborator; only its `scale_x = …` /
/// `scale_y = …` lines are ever consulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeasurementProfile {
    pub bust_cm: Option<f64>,
    pub waist_cm: Option<f64>,
    pub hips_cm: Option<f64>,
    pub torso_height_cm: Option<f64>,
    /// Garment size label the pattern was drafted for (e.g. "38").
    pub original_size: Option<String>,
    /// Raw estimation-collaborator response text, if any.
    pub estimate_text: Option<String>,
}

impl MeasurementProfile {
    /// Render the measurements as `bust = …, waist = …, hips = …` for
    /// prompts and records. Unset values are omitted.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(b) = self.bust_cm {
            parts.push(format!("bust = {b}"));
        }
        if let Some(w) = self.waist_cm {
            parts.push(format!("waist = {w}"));
        }
        if let Some(h) = self.hips_cm {
            parts.push(format!("hips = {h}"));
        }
        parts.join(", ")
    }
}

/// A per-axis proposal from one provider. `None` = no opinion.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisOpinion {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

/// One source of scale factors.
///
/// Providers are consulted in a fixed order; each sees the factors as
/// derived so far and may override either axis or stay silent.
pub trait FactorProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn propose(&self, profile: &MeasurementProfile, current: ScaleFactors) -> AxisOpinion;
}

/// Chart lookup: user bust/hips over the drafted bust/hips for the
/// declared original size.
pub struct SizeChartProvider;

impl FactorProvider for SizeChartProvider {
    fn name(&self) -> &'static str {
        "size-chart"
    }

    fn propose(&self, profile: &MeasurementProfile, _current: ScaleFactors) -> AxisOpinion {
        let mut opinion = AxisOpinion::default();
        let Some(drafted) = profile.original_size.as_deref().and_then(chart::lookup) else {
            return opinion;
        };
        if let Some(bust) = profile.bust_cm {
            if bust > 0.0 && drafted.bust > 0.0 {
                opinion.x = Some(bust / drafted.bust);
            }
        }
        if let Some(hips) = profile.hips_cm {
            if hips > 0.0 && drafted.hips > 0.0 {
                opinion.y = Some(hips / drafted.hips);
            }
        }
        opinion
    }
}

/// `scale_x = …` / `scale_y = …` lines from the estimation response.
///
/// Takes precedence over the chart for any axis it can parse.
pub struct EstimateProvider;

impl FactorProvider for EstimateProvider {
    fn name(&self) -> &'static str {
        "ai-estimate"
    }

    fn propose(&self, profile: &MeasurementProfile, _current: ScaleFactors) -> AxisOpinion {
        match profile.estimate_text.as_deref() {
            Some(text) => parse_estimate(text),
            None => AxisOpinion::default(),
        }
    }
}

/// Y-only fallback: torso height over [`NOMINAL_TORSO_CM`], consulted
/// only while Y is still exactly 1.0. X is never subject to it.
pub struct VerticalFallback;

impl FactorProvider for VerticalFallback {
    fn name(&self) -> &'static str {
        "vertical-fallback"
    }

    fn propose(&self, profile: &MeasurementProfile, current: ScaleFactors) -> AxisOpinion {
        let mut opinion = AxisOpinion::default();
        if current.y != 1.0 {
            return opinion;
        }
        if let Some(vertical) = profile.torso_height_cm {
            if vertical > 0.0 {
                opinion.y = Some(vertical / NOMINAL_TORSO_CM);
            }
        }
        opinion
    }
}

/// The documented provider order: chart, then estimate, then fallback.
pub fn default_providers() -> Vec<Box<dyn FactorProvider>> {
    vec![
        Box::new(SizeChartProvider),
        Box::new(EstimateProvider),
        Box::new(VerticalFallback),
    ]
}

/// Derive the run's scale factors using the default provider chain.
pub fn derive_scale_factors(profile: &MeasurementProfile) -> ScaleFactors {
    derive_with(&default_providers(), profile)
}

/// Derive scale factors with an explicit provider chain.
pub fn derive_with(
    providers: &[Box<dyn FactorProvider>],
    profile: &MeasurementProfile,
) -> ScaleFactors {
    let mut current = ScaleFactors::default();
    for provider in providers {
        let opinion = provider.propose(profile, current);
        if let Some(x) = opinion.x {
            if acceptable(x) {
                debug!(provider = provider.name(), x, "scale_x proposal accepted");
                current.x = x;
            } else {
                warn!(provider = provider.name(), x, "discarding invalid scale_x proposal");
            }
        }
        if let Some(y) = opinion.y {
            if acceptable(y) {
                debug!(provider = provider.name(), y, "scale_y proposal accepted");
                current.y = y;
            } else {
                warn!(provider = provider.name(), y, "discarding invalid scale_y proposal");
            }
        }
    }
    current
}

fn acceptable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

// ── Estimate response parsing ────────────────────────────────────────────

static RE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?(?:\d+\.?\d*|\.\d+)").unwrap());

/// Extract `scale_x` / `scale_y` values from free-form response text.
///
/// Only lines containing the literal key substrings are consulted; the
/// last parsable occurrence of each key wins. Markdown bold markers are
/// tolerated (models wrap key lines in `**…**` despite instructions).
/// Unparsable lines are skipped and never corrupt other axes.
pub(crate) fn parse_estimate(text: &str) -> AxisOpinion {
    let mut opinion = AxisOpinion::default();
    for raw in text.lines() {
        let line = raw.replace("**", "");
        if let Some(v) = parse_keyed(&line, "scale_x") {
            opinion.x = Some(v);
        }
        if let Some(v) = parse_keyed(&line, "scale_y") {
            opinion.y = Some(v);
        }
    }
    opinion
}

fn parse_keyed(line: &str, key: &str) -> Option<f64> {
    let after_key = &line[line.find(key)? + key.len()..];
    let (_, rhs) = after_key.split_once('=')?;
    RE_NUMBER.find(rhs)?.as_str().parse().ok()
}
