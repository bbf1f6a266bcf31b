// config.rs — On-disk state layout.
//
// All engine state lives under one root (default: the current
// directory). The layout is part of the audit contract — paths are
// stable and every file is canonical 2-space JSON.

use std::path::{Path, PathBuf};

/// Resolved paths for all persisted engine state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub state_root: PathBuf,

    /// `runs/confidence-baseline/<fingerprint>[.<ts>].json`
    pub baseline_dir: PathBuf,
    /// `runs/confidence-checks/<execution_id>.json`
    pub checks_dir: PathBuf,
    /// `runs/confidence-acks/<fingerprint>.<ts>.json`
    pub acks_dir: PathBuf,
    /// `runs/scheduler/` run receipts.
    pub scheduler_dir: PathBuf,

    /// `jobs/registry.json` — array of job definitions.
    pub jobs_registry: PathBuf,

    /// Long-lived, externally administered policy state.
    pub promotions_file: PathBuf,
    pub requalification_file: PathBuf,
    pub delegations_file: PathBuf,
    pub overlays_file: PathBuf,
    pub mode_file: PathBuf,

    /// `plans/<slug>.json` plan artifacts consumed when --plan is absent.
    pub plans_dir: PathBuf,
}

impl EngineConfig {
    /// Standard layout under a state root.
    pub fn for_root(state_root: impl AsRef<Path>) -> Self {
        let root = state_root.as_ref().to_path_buf();
        let runs = root.join("runs");
        let policy = root.join("policy");
        Self {
            baseline_dir: runs.join("confidence-baseline"),
            checks_dir: runs.join("confidence-checks"),
            acks_dir: runs.join("confidence-acks"),
            scheduler_dir: runs.join("scheduler"),
            jobs_registry: root.join("jobs").join("registry.json"),
            promotions_file: policy.join("promotions.json"),
            requalification_file: policy.join("requalification.json"),
            delegations_file: policy.join("delegations.json"),
            overlays_file: policy.join("domain-overlays.json"),
            mode_file: policy.join("mode.json"),
            plans_dir: root.join("plans"),
            state_root: root,
        }
    }
}
