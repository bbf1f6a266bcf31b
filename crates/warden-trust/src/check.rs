// check.rs — Regression check and acknowledgment records.
//
// Every `/policy score` evaluation leaves one check record behind, keyed
// by execution id. These records are the promotion recommender's raw
// material: a rolling window of them decides whether a command class has
// earned promotion.
//
// Acks are the human counter-signature on a severe regression: an ack
// record for a fingerprint at-or-after the regression lets gated modes
// continue unattended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TrustError;
use crate::repo::{to_canonical_json, KvRepo};
use crate::score::{ConfidenceBand, RecommendedAction};

/// One confidence evaluation of one execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionCheckRecord {
    pub execution_id: String,
    pub command: String,
    /// Confidence-family fingerprint this check was evaluated under.
    pub fingerprint: String,
    /// Promotion-family fingerprint for the same command class — what the
    /// promotion recommender keys on.
    pub promotion_fingerprint: String,
    pub score: f64,
    pub band: ConfidenceBand,
    pub action: RecommendedAction,
    /// Whether the policy simulation allowed the plan.
    pub allowed: bool,
    /// Whether this evaluation regressed against its baseline.
    pub regressed: bool,
    pub evaluated_at: DateTime<Utc>,
}

/// Store of check records, one per execution id.
pub struct CheckStore<R: KvRepo> {
    repo: R,
}

impl<R: KvRepo> CheckStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Append a check record. Each execution id is written at most once;
    /// a re-run of the same execution overwrites with identical content.
    pub fn write(&self, record: &RegressionCheckRecord) -> Result<(), TrustError> {
        self.repo
            .put(&record.execution_id, &to_canonical_json(record)?)?;
        info!(
            execution_id = %record.execution_id,
            score = record.score,
            regressed = record.regressed,
            "regression check recorded"
        );
        Ok(())
    }

    /// All check records, ordered by evaluation time then execution id.
    pub fn list(&self) -> Result<Vec<RegressionCheckRecord>, TrustError> {
        let mut records = Vec::new();
        for key in self.repo.keys()? {
            let Some(json) = self.repo.get(&key)? else {
                continue;
            };
            let record: RegressionCheckRecord = serde_json::from_str(&json)?;
            records.push(record);
        }
        records.sort_by(|a, b| {
            (a.evaluated_at, a.execution_id.as_str()).cmp(&(b.evaluated_at, b.execution_id.as_str()))
        });
        Ok(records)
    }
}

/// A human acknowledgment of a severe regression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionAckRecord {
    pub fingerprint: String,
    pub score_before: f64,
    pub score_after: f64,
    pub acknowledged_at: DateTime<Utc>,
}

/// Store of ack records, keyed `<fingerprint>.<ts>`.
pub struct AckStore<R: KvRepo> {
    repo: R,
}

impl<R: KvRepo> AckStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Append an ack record under a timestamped key.
    pub fn write(&self, record: &RegressionAckRecord) -> Result<String, TrustError> {
        let key = format!(
            "{}.{}",
            record.fingerprint,
            record.acknowledged_at.format("%Y%m%dT%H%M%SZ")
        );
        self.repo.put(&key, &to_canonical_json(record)?)?;
        info!(fingerprint = %record.fingerprint, key, "regression acknowledged");
        Ok(key)
    }

    /// The most recent ack for a fingerprint, if any.
    pub fn latest(&self, fingerprint: &str) -> Result<Option<RegressionAckRecord>, TrustError> {
        let prefix = format!("{}.", fingerprint);
        let mut best: Option<RegressionAckRecord> = None;
        for key in self.repo.keys()? {
            if !key.starts_with(&prefix) {
                continue;
            }
            let Some(json) = self.repo.get(&key)? else {
                continue;
            };
            let record: RegressionAckRecord = serde_json::from_str(&json)?;
            if best
                .as_ref()
                .map_or(true, |b| record.acknowledged_at > b.acknowledged_at)
            {
                best = Some(record);
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::MemKvRepo;
    use chrono::TimeZone;

    fn at(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, min, 0).unwrap()
    }

    fn check(id: &str, min: u32) -> RegressionCheckRecord {
        RegressionCheckRecord {
            execution_id: id.to_string(),
            command: "notion sync".to_string(),
            fingerprint: "fp".to_string(),
            promotion_fingerprint: "pfp".to_string(),
            score: 90.0,
            band: ConfidenceBand::High,
            action: RecommendedAction::Proceed,
            allowed: true,
            regressed: false,
            evaluated_at: at(min),
        }
    }

    #[test]
    fn list_orders_by_time_then_execution_id() {
        let store = CheckStore::new(MemKvRepo::new());
        store.write(&check("b", 5)).unwrap();
        store.write(&check("a", 5)).unwrap();
        store.write(&check("c", 1)).unwrap();

        let ids: Vec<String> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.execution_id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn rewrite_of_same_execution_is_idempotent() {
        let store = CheckStore::new(MemKvRepo::new());
        store.write(&check("a", 1)).unwrap();
        store.write(&check("a", 1)).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn latest_ack_wins_by_timestamp() {
        let store = AckStore::new(MemKvRepo::new());
        store
            .write(&RegressionAckRecord {
                fingerprint: "fp".to_string(),
                score_before: 90.0,
                score_after: 60.0,
                acknowledged_at: at(1),
            })
            .unwrap();
        store
            .write(&RegressionAckRecord {
                fingerprint: "fp".to_string(),
                score_before: 60.0,
                score_after: 55.0,
                acknowledged_at: at(9),
            })
            .unwrap();

        let latest = store.latest("fp").unwrap().unwrap();
        assert_eq!(latest.score_after, 55.0);
    }

    #[test]
    fn ack_lookup_is_scoped_to_fingerprint() {
        let store = AckStore::new(MemKvRepo::new());
        store
            .write(&RegressionAckRecord {
                fingerprint: "other".to_string(),
                score_before: 90.0,
                score_after: 10.0,
                acknowledged_at: at(1),
            })
            .unwrap();
        assert!(store.latest("fp").unwrap().is_none());
    }
}
