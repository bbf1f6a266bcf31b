//! # warden-policy
//!
//! The central decision function of Warden. Every proposed agent plan
//! passes through [`evaluate`](evaluator::evaluate), which composes the
//! budget guard, trust gates, domain overlays, autonomy-mode enforcement,
//! integration safety lanes, and the production approval gate into exactly
//! one of Allow / Denied / ApprovalRequired.
//!
//! ## Key invariants
//!
//! - **Pure and replayable**: same plan + environment snapshot + clock +
//!   stored trust state ⇒ bit-identical decision. The evaluator performs
//!   no I/O and never reads the wall clock.
//! - **Fixed precedence**: checks run in a fixed order; the first check
//!   that produces a decision wins and later checks never run.
//! - **Typed refusals**: every "no" is a value with a stable reason code
//!   present in the [`explain`](explain::explain) table — policy failures
//!   never raise.

pub mod budget;
pub mod codes;
pub mod decision;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod explain;
pub mod governance;
pub mod lanes;
pub mod overlay;
pub mod simulate;

pub use decision::{ApprovalPreview, PolicyResult};
pub use env::{AutonomyMode, PolicyEnv};
pub use error::PolicyError;
pub use evaluator::{evaluate, EvaluationOutcome, EvaluationRequest, NullTrust, TrustDirectory};
pub use explain::explain;
pub use governance::{GovernanceMode, ModeDeclaration};
pub use overlay::{DomainOverlay, DomainOverlayRegistry};
pub use simulate::{simulate, PhaseTrace, PolicySimulation};
