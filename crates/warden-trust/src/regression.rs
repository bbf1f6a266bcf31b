// regression.rs — Comparing a current score against a stored baseline.

use serde::{Deserialize, Serialize};

use crate::baseline::ConfidenceBaselineRecord;
use crate::score::ConfidenceScore;

/// Default score-drop tolerance, in points on the 0–100 scale.
pub const DEFAULT_TOLERANCE: f64 = 5.0;

/// Outcome of a baseline comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionReport {
    pub regressed: bool,
    /// Whether the regression is severe enough to require an explicit
    /// human acknowledgment before unattended operation continues.
    pub requires_ack: bool,
    /// Current score minus baseline score (negative on a drop).
    pub delta: f64,
    pub band_worsened: bool,
    pub action_worsened: bool,
    pub tolerance: f64,
    pub baseline_score: f64,
    pub current_score: f64,
}

/// Compare a current confidence assessment to its stored baseline.
///
/// Regressed when the score drop exceeds `tolerance`, or when the
/// qualitative band or recommended action worsened at all — a band
/// downgrade is a regression even inside the numeric tolerance.
pub fn compare_confidence(
    baseline: &ConfidenceBaselineRecord,
    current: &ConfidenceScore,
    tolerance: f64,
) -> RegressionReport {
    let delta = current.score - baseline.score;
    let band_worsened = current.band.rank() > baseline.band.rank();
    let action_worsened = current.action.rank() > baseline.action.rank();
    let regressed = -delta > tolerance || band_worsened || action_worsened;

    // An ack is demanded when trust has degraded to where unattended
    // operation is no longer defensible, not on every numeric wobble.
    let requires_ack = regressed
        && (action_worsened || current.band.rank() >= crate::score::ConfidenceBand::Low.rank());

    RegressionReport {
        regressed,
        requires_ack,
        delta,
        band_worsened,
        action_worsened,
        tolerance,
        baseline_score: baseline.score,
        current_score: current.score,
    }
}
