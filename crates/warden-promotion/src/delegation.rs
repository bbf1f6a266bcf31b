// delegation.rs — Delegation grants.
//
// A delegation grant lets a specific command-class fingerprint bypass the
// approval gate without a full promotion — a narrower, human-issued
// instrument. Grants only take effect under APPROVAL_GATED_AUTONOMY; the
// evaluator enforces the mode check, this registry just answers whether
// an active grant exists.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PromotionError;

/// One delegation grant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DelegationGrant {
    /// Promotion-family fingerprint the grant applies to.
    pub fingerprint: String,
    /// Human label ("weekly notion digest").
    pub label: String,
    /// Inactive grants are kept for the record but have no effect.
    pub active: bool,
}

/// The on-disk delegation registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelegationRegistry {
    #[serde(default)]
    grants: Vec<DelegationGrant>,
}

impl DelegationRegistry {
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

    /// Whether an active grant exists for the fingerprint.
    pub fn is_delegated(&self, fingerprint: &str) -> bool {
        self.grants
            .iter()
            .any(|g| g.active && g.fingerprint == fingerprint)
    }

    /// Add a grant (administration surface).
    pub fn add(&mut self, grant: DelegationGrant) {
        self.grants.push(grant);
    }

    pub fn grants(&self) -> &[DelegationGrant] {
        &self.grants
    }
}
