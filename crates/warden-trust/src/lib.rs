//! # warden-trust
//!
//! Trust accounting for Warden: content-addressed fingerprints, the
//! confidence scoring pipeline, and the append-only baseline/regression
//! stores that track how trustworthy each class of agent command has
//! proven to be over time.
//!
//! ## Key invariants
//!
//! - **Deterministic fingerprints**: capability-set order and command
//!   whitespace never change a fingerprint; timestamps never enter one.
//! - **Monotonic scoring**: more writes, unresolved capabilities, or
//!   unpinned versions never increase a confidence score.
//! - **Append-only audit artifacts**: baseline, check, and ack records are
//!   written once and never edited; overriding a baseline creates a new
//!   timestamped variant instead of mutating the old one.

pub mod baseline;
pub mod check;
pub mod error;
pub mod fingerprint;
pub mod regression;
pub mod repo;
pub mod score;

pub use baseline::{BaselineStore, ConfidenceBaselineRecord};
pub use check::{AckStore, CheckStore, RegressionAckRecord, RegressionCheckRecord};
pub use error::TrustError;
pub use regression::{compare_confidence, RegressionReport, DEFAULT_TOLERANCE};
pub use repo::{to_canonical_json, FsKvRepo, KvRepo, MemKvRepo};
pub use score::{
    score_features, ConfidenceBand, ConfidenceFeatures, ConfidenceScore, RecommendedAction,
};
