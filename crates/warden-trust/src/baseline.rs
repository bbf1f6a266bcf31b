// baseline.rs — Confidence baseline records and their store.
//
// A baseline captures the confidence assessment of a command class at a
// moment an operator chose to trust it. Baselines are append-only audit
// artifacts: once written they are immutable. An explicit override does
// not edit the original — it adds a new timestamped variant under
// `<fingerprint>.<ts>`.
//
// "Latest" is resolved by captured_at, then key order. Never by mtime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TrustError;
use crate::repo::{to_canonical_json, KvRepo};
use crate::score::{ConfidenceBand, ConfidenceScore, RecommendedAction};

/// A persisted confidence snapshot for one command class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceBaselineRecord {
    pub fingerprint: String,
    pub command: String,
    pub policy_version: String,
    pub autonomy_mode: String,
    /// Sorted capability set, as hashed into the fingerprint.
    pub capability_set: Vec<String>,
    pub score: f64,
    pub band: ConfidenceBand,
    pub action: RecommendedAction,
    pub captured_at: DateTime<Utc>,
}

impl ConfidenceBaselineRecord {
    /// Build a record from a scored assessment.
    pub fn from_score(
        fingerprint: &str,
        command: &str,
        policy_version: &str,
        autonomy_mode: &str,
        capability_set: Vec<String>,
        scored: &ConfidenceScore,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.to_string(),
            command: command.to_string(),
            policy_version: policy_version.to_string(),
            autonomy_mode: autonomy_mode.to_string(),
            capability_set,
            score: scored.score,
            band: scored.band,
            action: scored.action,
            captured_at,
        }
    }
}

/// Store of baseline records, one JSON document per key.
///
/// Keys: `<fingerprint>` for the original capture, `<fingerprint>.<ts>`
/// for override variants.
pub struct BaselineStore<R: KvRepo> {
    repo: R,
}

impl<R: KvRepo> BaselineStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Write a baseline.
    ///
    /// The first capture for a fingerprint lands under the bare key.
    /// Subsequent captures fail unless `override_existing` is set, in
    /// which case a timestamped variant key is created and the original
    /// is left untouched.
    pub fn write(
        &self,
        record: &ConfidenceBaselineRecord,
        override_existing: bool,
    ) -> Result<String, TrustError> {
        let base_key = record.fingerprint.clone();
        let key = if self.repo.get(&base_key)?.is_none() {
            base_key
        } else if override_existing {
            format!(
                "{}.{}",
                base_key,
                record.captured_at.format("%Y%m%dT%H%M%SZ")
            )
        } else {
            return Err(TrustError::BaselineExists {
                fingerprint: record.fingerprint.clone(),
            });
        };

        self.repo.put(&key, &to_canonical_json(record)?)?;
        info!(fingerprint = %record.fingerprint, key, "baseline captured");
        Ok(key)
    }

    /// The most recent baseline for a fingerprint, by captured_at then
    /// key order.
    pub fn latest(
        &self,
        fingerprint: &str,
    ) -> Result<Option<ConfidenceBaselineRecord>, TrustError> {
        let variant_prefix = format!("{}.", fingerprint);
        let mut best: Option<(DateTime<Utc>, String, ConfidenceBaselineRecord)> = None;

        for key in self.repo.keys()? {
            if key != fingerprint && !key.starts_with(&variant_prefix) {
                continue;
            }
            let Some(json) = self.repo.get(&key)? else {
                continue;
            };
            let record: ConfidenceBaselineRecord = serde_json::from_str(&json)?;
            let candidate = (record.captured_at, key, record);
            match &best {
                Some((at, k, _)) if (*at, k.as_str()) >= (candidate.0, candidate.1.as_str()) => {}
                _ => best = Some(candidate),
            }
        }

        Ok(best.map(|(_, _, record)| record))
    }
}
