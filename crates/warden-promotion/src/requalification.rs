// requalification.rs — Per-fingerprint requalification state.
//
// A demoted command class earns its way back through requalification.
// While in PROBATION, every step in a plan must be explicitly read-only.
// Any other non-ACTIVE state forbids write-capable steps outright.
//
// The registry is externally administered; the evaluator only reads it.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PromotionError;

/// Requalification state for one fingerprint.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequalState {
    /// Full trust — no extra restrictions.
    #[default]
    Active,
    /// Read-only probation: every step must be explicitly read-only.
    Probation,
    /// Write-capable steps are blocked outright.
    Suspended,
}

/// The on-disk requalification registry: fingerprint → state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequalificationRegistry {
    #[serde(default)]
    states: BTreeMap<String, RequalState>,
}

impl RequalificationRegistry {
    /// Load from a file, or empty when the file does not exist.
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

    /// State for a fingerprint. Unknown fingerprints are ACTIVE.
    pub fn state_of(&self, fingerprint: &str) -> RequalState {
        self.states.get(fingerprint).copied().unwrap_or_default()
    }

    /// Set a fingerprint's state (administration surface).
    pub fn set_state(&mut self, fingerprint: &str, state: RequalState) {
        self.states.insert(fingerprint.to_string(), state);
    }

    /// Persist the registry.
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
}
