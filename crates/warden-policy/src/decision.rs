// decision.rs — The policy decision type.
//
// Exactly one variant per evaluation. A "no" is a value, never an error:
// the evaluator reserves errors for malformed input.

use serde::{Deserialize, Serialize};

/// What a human would need to see before approving an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApprovalPreview {
    /// Where the action would land (URL host, adapter name).
    pub destination: String,
    /// One-line description of the action.
    pub summary: String,
}

/// The result of a policy evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "decision", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyResult {
    /// The plan may run unattended.
    Allowed,
    /// The plan must not run.
    Denied { code: String, reason: String },
    /// The plan may run only after explicit human approval.
    ApprovalRequired {
        code: String,
        reason: String,
        /// The offending step's action.
        action: String,
        preview: ApprovalPreview,
    },
}

impl PolicyResult {
    pub fn denied(code: &str, reason: impl Into<String>) -> Self {
        PolicyResult::Denied {
            code: code.to_string(),
            reason: reason.into(),
        }
    }

    pub fn approval_required(
        code: &str,
        reason: impl Into<String>,
        action: impl Into<String>,
        destination: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        PolicyResult::ApprovalRequired {
            code: code.to_string(),
            reason: reason.into(),
            action: action.into(),
            preview: ApprovalPreview {
                destination: destination.into(),
                summary: summary.into(),
            },
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, PolicyResult::Allowed)
    }

    /// The reason code, if the decision carries one.
    pub fn code(&self) -> Option<&str> {
        match self {
            PolicyResult::Allowed => None,
            PolicyResult::Denied { code, .. } => Some(code),
            PolicyResult::ApprovalRequired { code, .. } => Some(code),
        }
    }

    /// Decision tag as persisted in traces ("ALLOWED" etc.).
    pub fn decision_tag(&self) -> &'static str {
        match self {
            PolicyResult::Allowed => "ALLOWED",
            PolicyResult::Denied { .. } => "DENIED",
            PolicyResult::ApprovalRequired { .. } => "APPROVAL_REQUIRED",
        }
    }

    /// The code, or the decision tag for Allow.
    pub fn primary_reason(&self) -> &str {
        match self {
            PolicyResult::Allowed => "ALLOWED",
            PolicyResult::Denied { code, .. } => code,
            PolicyResult::ApprovalRequired { code, .. } => code,
        }
    }
}
