// score.rs — Confidence feature extraction and scoring.
//
// The scorer turns a plan plus its already-computed policy-simulation
// outcome into a feature vector, a numeric score on a 0–100 scale, a
// qualitative band, and a recommended action.
//
// Monotonic rule: every penalty is non-negative, so more writes,
// unresolved capabilities, or unpinned versions can never raise a score.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use warden_plan::ExecutionPlan;

/// Qualitative confidence tier. Ordering is best-to-worst.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Guarded,
    Low,
    Critical,
}

impl ConfidenceBand {
    /// Band for a 0–100 score. The Critical boundary (≤ 40) is the same
    /// threshold the evaluator's confidence gate uses.
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            ConfidenceBand::High
        } else if score >= 70.0 {
            ConfidenceBand::Guarded
        } else if score > 40.0 {
            ConfidenceBand::Low
        } else {
            ConfidenceBand::Critical
        }
    }

    /// Rank for worse-than comparison: higher is worse.
    pub fn rank(&self) -> u8 {
        match self {
            ConfidenceBand::High => 0,
            ConfidenceBand::Guarded => 1,
            ConfidenceBand::Low => 2,
            ConfidenceBand::Critical => 3,
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceBand::High => write!(f, "high"),
            ConfidenceBand::Guarded => write!(f, "guarded"),
            ConfidenceBand::Low => write!(f, "low"),
            ConfidenceBand::Critical => write!(f, "critical"),
        }
    }
}

/// Recommended next step for the command class. Ordering is best-to-worst.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Proceed,
    Review,
    RequireApproval,
    Block,
}

impl RecommendedAction {
    pub fn rank(&self) -> u8 {
        match self {
            RecommendedAction::Proceed => 0,
            RecommendedAction::Review => 1,
            RecommendedAction::RequireApproval => 2,
            RecommendedAction::Block => 3,
        }
    }

    fn for_band(band: ConfidenceBand) -> Self {
        match band {
            ConfidenceBand::High => RecommendedAction::Proceed,
            ConfidenceBand::Guarded => RecommendedAction::Review,
            ConfidenceBand::Low => RecommendedAction::RequireApproval,
            ConfidenceBand::Critical => RecommendedAction::Block,
        }
    }
}

/// The feature vector the scorer works from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceFeatures {
    pub step_count: usize,
    pub write_step_count: usize,
    /// Whether the policy simulation ended in an approval requirement.
    pub approval_required: bool,
    /// Sorted list of hosts the plan touches.
    pub domains: Vec<String>,
    /// Sorted list of capabilities the plan claims.
    pub capabilities: Vec<String>,
    /// Budgets declared on the plan or configured in the environment.
    pub budget_declared: bool,
    /// Whether the producing agent's version is pinned on the plan.
    pub versions_pinned: bool,
    /// Whether every step timeout fits under the environment cap.
    pub timeouts_within_cap: bool,
    /// Whether every claimed capability resolved against the allowlist.
    pub capabilities_resolved: bool,
}

impl ConfidenceFeatures {
    /// Extract features from a plan and its simulation outcome.
    ///
    /// `allowed_capabilities` of `None` means no allowlist is configured,
    /// which counts as resolved (nothing to resolve against).
    pub fn extract(
        plan: &ExecutionPlan,
        approval_required: bool,
        env_max_runtime_ms: Option<u64>,
        env_budget_configured: bool,
        allowed_capabilities: Option<&BTreeSet<String>>,
    ) -> Self {
        let timeouts_within_cap = match env_max_runtime_ms {
            Some(cap) => plan
                .materialize()
                .iter()
                .all(|s| s.timeout_ms.map_or(true, |t| t <= cap)),
            None => true,
        };

        let capabilities_resolved = match allowed_capabilities {
            Some(allowed) => plan
                .required_capabilities
                .iter()
                .all(|c| allowed.contains(c)),
            None => true,
        };

        Self {
            step_count: plan.step_count(),
            write_step_count: plan.write_step_count(),
            approval_required,
            domains: plan.domains(),
            capabilities: plan.required_capabilities.iter().cloned().collect(),
            budget_declared: plan.budgets.is_some() || env_budget_configured,
            versions_pinned: plan.agent_version.is_some(),
            timeouts_within_cap,
            capabilities_resolved,
        }
    }
}

/// A scored confidence assessment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceScore {
    pub score: f64,
    pub band: ConfidenceBand,
    pub action: RecommendedAction,
    pub features: ConfidenceFeatures,
}

impl ConfidenceScore {
    /// Whether this score trips the evaluator's confidence gate
    /// (normalized score ≤ 0.4).
    pub fn is_gate_low(&self) -> bool {
        self.score / 100.0 <= 0.4
    }
}

/// Soft step count above which each extra step costs a point.
const STEP_SOFT_LIMIT: usize = 10;

/// Combine features into a score, band, and recommended action.
///
/// Starts from 100 and subtracts per-feature penalties, clamped to
/// [0, 100]. All penalties are non-negative (the monotonic rule).
pub fn score_features(features: &ConfidenceFeatures) -> ConfidenceScore {
    let mut penalty = 0.0;

    // Writes are the dominant risk signal.
    penalty += (features.write_step_count as f64 * 8.0).min(40.0);

    if features.approval_required {
        penalty += 10.0;
    }
    if !features.capabilities_resolved {
        penalty += 25.0;
    }
    if !features.versions_pinned {
        penalty += 10.0;
    }
    if !features.timeouts_within_cap {
        penalty += 15.0;
    }
    if !features.budget_declared {
        penalty += 10.0;
    }
    if features.step_count > STEP_SOFT_LIMIT {
        penalty += ((features.step_count - STEP_SOFT_LIMIT) as f64).min(10.0);
    }

    let score = (100.0 - penalty).clamp(0.0, 100.0);
    let band = ConfidenceBand::from_score(score);
    ConfidenceScore {
        score,
        band,
        action: RecommendedAction::for_band(band),
        features: features.clone(),
    }
}
