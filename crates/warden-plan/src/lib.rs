//! # warden-plan
//!
//! Execution plan data model for Warden.
//!
//! An [`ExecutionPlan`] is the unit the policy evaluator classifies: an
//! ordered list of steps (or phases of steps) an agent proposes to run.
//! Parsing is schema-validated — malformed plan JSON fails fast with a
//! typed [`PlanError`] instead of surfacing as missing-field surprises
//! deep inside evaluation.
//!
//! The crate also owns the [`CommandLine`] AST: a small tokenizer for the
//! command strings that identify a class of agent work. Its normalized
//! form is the canonical input to both fingerprint families.

pub mod command;
pub mod error;
pub mod plan;
pub mod step;

pub use command::CommandLine;
pub use error::PlanError;
pub use plan::{ExecutionPlan, PlanBudgets, PlanPhase};
pub use step::ExecutionStep;
