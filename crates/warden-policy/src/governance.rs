// governance.rs — Optional mode/limb governance.
//
// When MODE_GOVERNANCE_ENABLED is set, every evaluation requires a
// declared operating mode backed by an on-disk declaration artifact.
// FROZEN denies unconditionally; write-capable plans additionally require
// the SINGLE_RUN_APPROVED mode and every claimed capability's "limb" to
// be active in the declaration.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Declared operating mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GovernanceMode {
    /// Nothing runs, read-only or not.
    Frozen,
    /// Observation only — write-capable plans are refused.
    Observe,
    /// One approved run's worth of write capability.
    SingleRunApproved,
}

/// The on-disk mode declaration artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModeDeclaration {
    pub mode: GovernanceMode,
    /// Capability limbs: capability name → active.
    #[serde(default)]
    pub limbs: BTreeMap<String, bool>,
}

impl ModeDeclaration {
    /// Load the declaration artifact, or `None` when the file is absent.
    ///
    /// Absence is a policy condition (MODE_DECLARATION_MISSING), not an
    /// error; a present-but-unreadable file is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, PolicyError> {
        if !path.exists() {
            return Ok(None);
        }
        let json =
            fs::read_to_string(path).map_err(|e| PolicyError::ModeDeclarationUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        let declaration =
            serde_json::from_str(&json).map_err(|e| PolicyError::ModeDeclarationUnreadable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Some(declaration))
    }

    /// Whether the named capability limb is declared active.
    pub fn limb_active(&self, capability: &str) -> bool {
        self.limbs.get(capability).copied().unwrap_or(false)
    }
}
