// recommender.rs — Promotion recommendations from regression history.
//
// Scans historical regression-check records, groups them by literal
// command string, and judges each command class against the promotion
// bar over a rolling window of its most recent runs.
//
// Output ordering is deterministic: eligible candidates first, then by
// descending average score, then by command string.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_trust::check::RegressionCheckRecord;

use crate::ledger::PromotionLedger;

/// Tunables for the promotion bar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromotionSettings {
    /// How many recent runs form the window.
    pub window_runs: usize,
    /// Minimum average score across the window.
    pub min_avg_score: f64,
    /// The oldest run in the window must be at least this many days old.
    pub min_age_days: i64,
}

impl Default for PromotionSettings {
    fn default() -> Self {
        Self {
            window_runs: 20,
            min_avg_score: 85.0,
            min_age_days: 7,
        }
    }
}

/// Where a command class stands relative to promotion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateState {
    Eligible,
    NotEligible,
    /// Already promoted — reported with its fixed state, never re-eligible.
    Promoted,
    /// Demoted — fixed state regardless of window statistics.
    Demoted,
}

/// One command class's promotion assessment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromotionCandidate {
    pub command: String,
    pub fingerprint: String,
    pub state: CandidateState,
    pub window_size: usize,
    pub average_score: f64,
    pub regression_count: usize,
    pub all_allowed: bool,
    pub oldest_run_at: Option<DateTime<Utc>>,
}

/// Compute promotion candidates from check history.
///
/// `now` is the evaluation clock — passed in so the recommendation is
/// replayable.
pub fn recommend(
    checks: &[RegressionCheckRecord],
    ledger: &PromotionLedger,
    settings: &PromotionSettings,
    now: DateTime<Utc>,
) -> Vec<PromotionCandidate> {
    use std::collections::BTreeMap;

    // Group by literal command string. BTreeMap keeps group iteration
    // deterministic before the final sort.
    let mut groups: BTreeMap<&str, Vec<&RegressionCheckRecord>> = BTreeMap::new();
    for check in checks {
        groups.entry(check.command.as_str()).or_default().push(check);
    }

    let mut candidates = Vec::new();
    for (command, mut runs) in groups {
        // Most recent first, ordered by evaluation time then execution id.
        runs.sort_by(|a, b| {
            (b.evaluated_at, b.execution_id.as_str()).cmp(&(a.evaluated_at, a.execution_id.as_str()))
        });
        let window: Vec<&RegressionCheckRecord> =
            runs.into_iter().take(settings.window_runs).collect();

        let fingerprint = window[0].promotion_fingerprint.clone();
        let window_size = window.len();
        let average_score =
            window.iter().map(|r| r.score).sum::<f64>() / window_size as f64;
        let regression_count = window.iter().filter(|r| r.regressed).count();
        let all_allowed = window.iter().all(|r| r.allowed);
        let oldest_run_at = window.iter().map(|r| r.evaluated_at).min();

        let state = if ledger.is_demoted(&fingerprint) {
            CandidateState::Demoted
        } else if ledger.is_promoted(&fingerprint) {
            CandidateState::Promoted
        } else {
            let window_full = window_size >= settings.window_runs;
            let old_enough = oldest_run_at
                .map(|oldest| (now - oldest).num_days() >= settings.min_age_days)
                .unwrap_or(false);
            if window_full
                && old_enough
                && regression_count == 0
                && all_allowed
                && average_score >= settings.min_avg_score
            {
                CandidateState::Eligible
            } else {
                CandidateState::NotEligible
            }
        };

        candidates.push(PromotionCandidate {
            command: command.to_string(),
            fingerprint,
            state,
            window_size,
            average_score,
            regression_count,
            all_allowed,
            oldest_run_at,
        });
    }

    // Eligible first, then descending average score, then command.
    candidates.sort_by(|a, b| {
        let a_eligible = a.state == CandidateState::Eligible;
        let b_eligible = b.state == CandidateState::Eligible;
        b_eligible
            .cmp(&a_eligible)
            .then(
                b.average_score
                    .partial_cmp(&a.average_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
            .then_with(|| a.command.cmp(&b.command))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{DemotionRecord, PromotionRecord};
    use chrono::{Duration, TimeZone};
    use warden_trust::score::{ConfidenceBand, RecommendedAction};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 20, 12, 0, 0).unwrap()
    }

    fn check(
        command: &str,
        id: &str,
        days_ago: i64,
        score: f64,
        allowed: bool,
        regressed: bool,
    ) -> RegressionCheckRecord {
        RegressionCheckRecord {
            execution_id: id.to_string(),
            command: command.to_string(),
            fingerprint: format!("conf-{}", command),
            promotion_fingerprint: format!("promo-{}", command),
            score,
            band: ConfidenceBand::from_score(score),
            action: RecommendedAction::Proceed,
            allowed,
            regressed,
            evaluated_at: now() - Duration::days(days_ago),
        }
    }

    /// A full clean window: 20 runs, oldest 8 days old, avg 90.
    fn clean_window(command: &str) -> Vec<RegressionCheckRecord> {
        (0..20)
            .map(|i| {
                let days_ago = if i == 19 { 8 } else { i64::min(i, 7) };
                check(command, &format!("e{:02}", i), days_ago, 90.0, true, false)
            })
            .collect()
    }

    #[test]
    fn clean_full_window_is_eligible() {
        let checks = clean_window("notion sync");
        let candidates = recommend(
            &checks,
            &PromotionLedger::default(),
            &PromotionSettings::default(),
            now(),
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].state, CandidateState::Eligible);
        assert_eq!(candidates[0].window_size, 20);
        assert_eq!(candidates[0].average_score, 90.0);
    }

    #[test]
    fn demoted_fingerprint_is_reported_demoted_regardless_of_stats() {
        let checks = clean_window("notion sync");
        let mut ledger = PromotionLedger::default();
        ledger.demote(
            "promo-notion sync",
            DemotionRecord {
                reason: "manual".to_string(),
                demoted_at: now(),
            },
        );
        let candidates = recommend(&checks, &ledger, &PromotionSettings::default(), now());
        assert_eq!(candidates[0].state, CandidateState::Demoted);
    }

    #[test]
    fn promoted_fingerprint_is_reported_promoted() {
        let checks = clean_window("notion sync");
        let mut ledger = PromotionLedger::default();
        ledger.promote(
            "promo-notion sync",
            PromotionRecord {
                command: "notion sync".to_string(),
                adapter_type: "notion".to_string(),
                promoted_at: now(),
            },
        );
        let candidates = recommend(&checks, &ledger, &PromotionSettings::default(), now());
        assert_eq!(candidates[0].state, CandidateState::Promoted);
    }

    #[test]
    fn partial_window_is_not_eligible() {
        let checks: Vec<_> = clean_window("notion sync").into_iter().take(10).collect();
        let candidates = recommend(
            &checks,
            &PromotionLedger::default(),
            &PromotionSettings::default(),
            now(),
        );
        assert_eq!(candidates[0].state, CandidateState::NotEligible);
    }

    #[test]
    fn too_young_window_is_not_eligible() {
        // All 20 runs today — oldest is 0 days old, min_age_days is 7.
        let checks: Vec<_> = (0..20)
            .map(|i| check("cmd", &format!("e{:02}", i), 0, 90.0, true, false))
            .collect();
        let candidates = recommend(
            &checks,
            &PromotionLedger::default(),
            &PromotionSettings::default(),
            now(),
        );
        assert_eq!(candidates[0].state, CandidateState::NotEligible);
    }

    #[test]
    fn any_regression_in_window_blocks_eligibility() {
        let mut checks = clean_window("cmd");
        checks[3].regressed = true;
        let candidates = recommend(
            &checks,
            &PromotionLedger::default(),
            &PromotionSettings::default(),
            now(),
        );
        assert_eq!(candidates[0].state, CandidateState::NotEligible);
        assert_eq!(candidates[0].regression_count, 1);
    }

    #[test]
    fn denied_run_in_window_blocks_eligibility() {
        let mut checks = clean_window("cmd");
        checks[5].allowed = false;
        let candidates = recommend(
            &checks,
            &PromotionLedger::default(),
            &PromotionSettings::default(),
            now(),
        );
        assert_eq!(candidates[0].state, CandidateState::NotEligible);
        assert!(!candidates[0].all_allowed);
    }

    #[test]
    fn low_average_blocks_eligibility() {
        let checks: Vec<_> = (0..20)
            .map(|i| {
                let days_ago = if i == 19 { 8 } else { 0 };
                check("cmd", &format!("e{:02}", i), days_ago, 70.0, true, false)
            })
            .collect();
        let candidates = recommend(
            &checks,
            &PromotionLedger::default(),
            &PromotionSettings::default(),
            now(),
        );
        assert_eq!(candidates[0].state, CandidateState::NotEligible);
    }

    #[test]
    fn window_takes_most_recent_runs_only() {
        // 25 runs: the 5 oldest are terrible, the recent 20 are clean.
        let mut checks = clean_window("cmd");
        for i in 0..5 {
            checks.push(check("cmd", &format!("old{}", i), 30, 10.0, false, true));
        }
        let candidates = recommend(
            &checks,
            &PromotionLedger::default(),
            &PromotionSettings::default(),
            now(),
        );
        // Old garbage runs fall outside the window.
        assert_eq!(candidates[0].state, CandidateState::Eligible);
        assert_eq!(candidates[0].average_score, 90.0);
    }

    #[test]
    fn ordering_is_eligible_first_then_avg_then_command() {
        let mut checks = clean_window("bravo");
        checks.extend(clean_window("alpha"));
        // "zulu" has a partial window — not eligible.
        checks.extend(clean_window("zulu").into_iter().take(3));

        let candidates = recommend(
            &checks,
            &PromotionLedger::default(),
            &PromotionSettings::default(),
            now(),
        );
        let order: Vec<&str> = candidates.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(order, vec!["alpha", "bravo", "zulu"]);
        assert_eq!(candidates[2].state, CandidateState::NotEligible);
    }
}
