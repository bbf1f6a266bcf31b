// ledger.rs — The promotion/demotion ledger.
//
// One JSON file maps promotion fingerprints to their records. Promotion
// is presence-keyed: a fingerprint is promoted iff it appears in the
// `promoted` map AND does not appear in the `demoted` map — demotion is a
// separate marker that always outranks promotion, so demoting never needs
// to edit or delete the original promotion entry.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PromotionError;

/// A promotion entry for one command class.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromotionRecord {
    pub command: String,
    pub adapter_type: String,
    pub promoted_at: DateTime<Utc>,
}

/// A demotion marker. Outranks any promotion for the same fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemotionRecord {
    pub reason: String,
    pub demoted_at: DateTime<Utc>,
}

/// The on-disk promotion store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromotionLedger {
    #[serde(default)]
    promoted: BTreeMap<String, PromotionRecord>,
    #[serde(default)]
    demoted: BTreeMap<String, DemotionRecord>,
}

impl PromotionLedger {
    /// Load the ledger from a file, or return an empty ledger when the
    /// file does not exist. A present-but-malformed file is an error,
    /// not an empty ledger — silently dropping promotions would loosen
    /// nothing, but silently dropping demotions would loosen policy.
    pub fn load_or_default(path: &Path) -> Result<Self, PromotionError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).map_err(|source| PromotionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| PromotionError::Malformed {
            path: path.display().to_string(),
            source,
        })
    }

    /// Persist the ledger (2-space JSON, trailing newline).
    pub fn save(&self, path: &Path) -> Result<(), PromotionError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| PromotionError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        let mut json = serde_json::to_string_pretty(self).map_err(|source| {
            PromotionError::Malformed {
                path: path.display().to_string(),
                source,
            }
        })?;
        json.push('\n');
        fs::write(path, json).map_err(|source| PromotionError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Mark a fingerprint as promoted.
    pub fn promote(&mut self, fingerprint: &str, record: PromotionRecord) {
        info!(fingerprint, command = %record.command, "fingerprint promoted");
        self.promoted.insert(fingerprint.to_string(), record);
    }

    /// Mark a fingerprint as demoted.
    pub fn demote(&mut self, fingerprint: &str, record: DemotionRecord) {
        info!(fingerprint, reason = %record.reason, "fingerprint demoted");
        self.demoted.insert(fingerprint.to_string(), record);
    }

    /// Promoted and not demoted.
    pub fn is_promoted(&self, fingerprint: &str) -> bool {
        self.promoted.contains_key(fingerprint) && !self.demoted.contains_key(fingerprint)
    }

    /// Whether a demotion marker exists, regardless of promotion.
    pub fn is_demoted(&self, fingerprint: &str) -> bool {
        self.demoted.contains_key(fingerprint)
    }

    /// Whether any entry (promoted or demoted) exists for a fingerprint.
    pub fn has_entry(&self, fingerprint: &str) -> bool {
        self.promoted.contains_key(fingerprint) || self.demoted.contains_key(fingerprint)
    }
}
