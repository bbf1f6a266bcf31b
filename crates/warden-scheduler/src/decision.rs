// decision.rs — The RUN/SKIP decision function.
//
// The time-axis analogue of the policy evaluator: a pure two-input
// function of (schedule, clock) plus the manual-trigger flag. A manual
// trigger always attempts to run — it bypasses both the schedule window
// and the paused flag; an unattended sweep runs only jobs due now.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_policy::codes;

use crate::schedule::Schedule;

/// RUN or SKIP, with the reason code that decided it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunDecision {
    Run { reason: String },
    Skip { reason: String },
}

impl RunDecision {
    pub fn is_run(&self) -> bool {
        matches!(self, RunDecision::Run { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            RunDecision::Run { reason } => reason,
            RunDecision::Skip { reason } => reason,
        }
    }
}

/// Decide whether one job runs in the window containing `at`.
pub fn decide(schedule: &Schedule, at: DateTime<Utc>, manual: bool, paused: bool) -> RunDecision {
    if manual {
        return RunDecision::Run {
            reason: codes::MANUAL_TRIGGER.to_string(),
        };
    }
    if paused {
        return RunDecision::Skip {
            reason: codes::JOB_PAUSED.to_string(),
        };
    }
    if schedule.is_due(at) {
        RunDecision::Run {
            reason: codes::SCHEDULE_DUE.to_string(),
        }
    } else {
        RunDecision::Skip {
            reason: codes::JOB_NOT_DUE.to_string(),
        }
    }
}

/// The idempotence key for a job's evaluation window: the job id plus
/// the clock floored to the minute. Re-running the same window produces
/// distinct receipts carrying the same window id.
pub fn window_id(job_id: &str, at: DateTime<Utc>) -> String {
    format!("{}@{}", job_id, at.format("%Y-%m-%dT%H:%MZ"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, h, mi, 0).unwrap()
    }

    #[test]
    fn due_schedule_runs() {
        let s = Schedule::parse("30 6 * * *").unwrap();
        let decision = decide(&s, at(6, 30), false, false);
        assert!(decision.is_run());
        assert_eq!(decision.reason(), codes::SCHEDULE_DUE);
    }

    #[test]
    fn not_due_schedule_skips() {
        let s = Schedule::parse("30 6 * * *").unwrap();
        let decision = decide(&s, at(6, 31), false, false);
        assert!(!decision.is_run());
        assert_eq!(decision.reason(), codes::JOB_NOT_DUE);
    }

    #[test]
    fn manual_trigger_bypasses_schedule() {
        let s = Schedule::parse("30 6 * * *").unwrap();
        let decision = decide(&s, at(23, 59), true, false);
        assert!(decision.is_run());
        assert_eq!(decision.reason(), codes::MANUAL_TRIGGER);
    }

    #[test]
    fn manual_trigger_bypasses_paused() {
        let s = Schedule::parse("* * * * *").unwrap();
        let decision = decide(&s, at(10, 0), true, true);
        assert!(decision.is_run());
    }

    #[test]
    fn paused_job_skips_in_sweep() {
        let s = Schedule::parse("* * * * *").unwrap();
        let decision = decide(&s, at(10, 0), false, true);
        assert_eq!(decision.reason(), codes::JOB_PAUSED);
    }

    #[test]
    fn window_id_floors_to_the_minute() {
        let a = Utc.with_ymd_and_hms(2025, 6, 2, 10, 15, 3).unwrap();
        let b = Utc.with_ymd_and_hms(2025, 6, 2, 10, 15, 59).unwrap();
        assert_eq!(window_id("digest", a), window_id("digest", b));
        assert_eq!(window_id("digest", a), "digest@2025-06-02T10:15Z");
    }

    #[test]
    fn window_id_differs_across_minutes_and_jobs() {
        let t = Utc.with_ymd_and_hms(2025, 6, 2, 10, 15, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 6, 2, 10, 16, 0).unwrap();
        assert_ne!(window_id("digest", t), window_id("digest", later));
        assert_ne!(window_id("digest", t), window_id("sync", t));
    }
}
