//! # warden-promotion
//!
//! The promotion lifecycle: which command classes have earned the right
//! to skip per-run approval, which have been demoted, which are working
//! their way back through requalification, and which carry an explicit
//! delegation grant.
//!
//! All state here is long-lived and externally administered — the policy
//! evaluator only reads it. A demotion marker always outranks promotion.

pub mod delegation;
pub mod error;
pub mod ledger;
pub mod recommender;
pub mod requalification;

pub use delegation::{DelegationGrant, DelegationRegistry};
pub use error::PromotionError;
pub use ledger::{DemotionRecord, PromotionLedger, PromotionRecord};
pub use recommender::{
    recommend, CandidateState, PromotionCandidate, PromotionSettings,
};
pub use requalification::{RequalState, RequalificationRegistry};
