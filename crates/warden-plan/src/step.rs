// step.rs — ExecutionStep: one proposed agent action.
//
// A step describes a single adapter call the agent wants to make. The
// policy evaluator never executes steps; it only classifies them.
//
// Invariant: a step lacking `read_only: true` is write-capable by default.
// Write capability must be declared away, never assumed away.

use serde::{Deserialize, Serialize};

/// A single proposed action within an [`crate::ExecutionPlan`].
///
/// Unknown fields are rejected at parse time so a misspelled `read_only`
/// cannot silently turn a write step into an unclassified one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutionStep {
    /// Unique identifier within the plan (e.g., "step-1").
    pub step_id: String,

    /// What the step does, in adapter vocabulary (e.g., "update_page").
    pub action: String,

    /// Which adapter would perform the step (e.g., "notion", "http").
    pub adapter: String,

    /// HTTP method for adapters that speak HTTP.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Target URL for adapters that address remote resources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Explicit read-only marker. Absent means write-capable.
    #[serde(default)]
    pub read_only: bool,

    /// Whether this step was scoped by a prior approval (live-write lanes).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_scoped: Option<bool>,

    /// Recorded state of the target before the step would run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prestate: Option<serde_json::Value>,

    /// Fingerprint of `prestate`, for drift detection on approval resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prestate_fingerprint: Option<String>,

    /// Per-step timeout declared by the planner, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ExecutionStep {
    /// Whether this step is write-capable.
    ///
    /// Only an explicit `read_only: true` makes a step safe; everything
    /// else is treated as a write.
    pub fn is_write(&self) -> bool {
        !self.read_only
    }

    /// Whether the step carries a complete approval scope: the
    /// `approval_scoped` marker plus a recorded prestate and its
    /// fingerprint.
    pub fn has_approval_scope(&self) -> bool {
        self.approval_scoped == Some(true)
            && self.prestate.is_some()
            && self.prestate_fingerprint.is_some()
    }

    /// The host portion of `url`, if the URL is well-formed enough to
    /// have one (`scheme://host[/...]`).
    pub fn url_host(&self) -> Option<&str> {
        let url = self.url.as_deref()?;
        let rest = url.split_once("://")?.1;
        let host = rest.split(['/', '?', '#']).next()?;
        // Strip any port and userinfo.
        let host = host.rsplit('@').next()?;
        let host = host.split(':').next()?;
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }

    /// The URL scheme (e.g., "https", "file"), if present.
    pub fn url_scheme(&self) -> Option<&str> {
        let url = self.url.as_deref()?;
        let scheme = url.split_once("://")?.0;
        if scheme.is_empty() {
            None
        } else {
            Some(scheme)
        }
    }
}
