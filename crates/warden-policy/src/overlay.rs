// overlay.rs — Per-domain policy overlays.
//
// An overlay tightens base policy for one domain (a tenant, workspace,
// or business unit). Overlays can forbid writes or lower the step cap;
// there is deliberately no field that could loosen anything.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Tightening rules for one domain.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DomainOverlay {
    /// Deny every write-capable step for this domain.
    #[serde(default)]
    pub deny_write: bool,
    /// Lower the step cap. Only effective when lower than the base cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
}

/// The on-disk overlay registry: domain id → overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainOverlayRegistry {
    #[serde(default)]
    overlays: BTreeMap<String, DomainOverlay>,
}

impl DomainOverlayRegistry {
    /// Load from a file, or empty when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, PolicyError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).map_err(|e| PolicyError::RegistryUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&json).map_err(|e| PolicyError::RegistryUnreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Overlay for a domain, if one is registered.
    pub fn resolve(&self, domain_id: Option<&str>) -> Option<&DomainOverlay> {
        domain_id.and_then(|id| self.overlays.get(id))
    }

    /// Register an overlay (administration surface).
    pub fn insert(&mut self, domain_id: &str, overlay: DomainOverlay) {
        self.overlays.insert(domain_id.to_string(), overlay);
    }
}
