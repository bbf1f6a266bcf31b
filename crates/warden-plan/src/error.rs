// error.rs — Error types for plan parsing and command tokenizing.

use thiserror::Error;

/// Errors that can occur while parsing plans or command strings.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The plan JSON could not be deserialized into the plan schema.
    #[error("malformed plan JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A plan must carry exactly one of `steps` or `phases`.
    #[error("plan '{execution_id}' must have exactly one of `steps` or `phases`")]
    AmbiguousBody { execution_id: String },

    /// Two steps in the same plan share a step_id.
    #[error("plan '{execution_id}' contains duplicate step_id '{step_id}'")]
    DuplicateStepId {
        execution_id: String,
        step_id: String,
    },

    /// The command string contained no tokens.
    #[error("empty command string")]
    EmptyCommand,

    /// A double-quoted section was opened but never closed.
    #[error("unterminated quote in command string: '{input}'")]
    UnterminatedQuote { input: String },
}
