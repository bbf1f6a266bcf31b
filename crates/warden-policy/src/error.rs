// error.rs — Error types for the policy subsystem.
//
// Expected policy failures are PolicyResult values, not errors. These
// errors cover genuinely broken input: unparseable environment values,
// malformed plans, unreadable registries.

use thiserror::Error;

/// Errors from policy evaluation plumbing.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The plan could not be parsed or validated.
    #[error(transparent)]
    Plan(#[from] warden_plan::PlanError),

    /// A trust store operation failed.
    #[error(transparent)]
    Trust(#[from] warden_trust::TrustError),

    /// A promotion/requalification/delegation registry failed to load.
    #[error(transparent)]
    Promotion(#[from] warden_promotion::PromotionError),

    /// An environment variable held a value that does not parse.
    #[error("invalid value '{value}' for {variable}: {expected}")]
    InvalidEnvValue {
        variable: String,
        value: String,
        expected: String,
    },

    /// A mode declaration artifact was unreadable.
    #[error("mode declaration at '{path}' is unreadable: {reason}")]
    ModeDeclarationUnreadable { path: String, reason: String },

    /// A policy registry file (overlays, delegations) was unreadable.
    #[error("policy registry at '{path}' is unreadable: {reason}")]
    RegistryUnreadable { path: String, reason: String },
}
