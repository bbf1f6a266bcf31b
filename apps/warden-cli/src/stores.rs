// stores.rs — Wiring the file-backed stores into the evaluator.
//
// The evaluator only sees the TrustDirectory trait. This adapter backs
// it with the real stores under the state root. Store read failures
// during evaluation are logged and treated as "no record" — a missing
// record is always the more restrictive interpretation here (no
// baseline, no promotion, no delegation).

use anyhow::Context;
use tracing::warn;

use warden_policy::TrustDirectory;
use warden_promotion::{
    DelegationRegistry, PromotionLedger, RequalState, RequalificationRegistry,
};
use warden_trust::{BaselineStore, FsKvRepo};

use crate::config::EngineConfig;

/// File-backed trust directory.
pub struct FsTrustDirectory {
    baselines: BaselineStore<FsKvRepo>,
    requalification: RequalificationRegistry,
    promotions: PromotionLedger,
    delegations: DelegationRegistry,
}

impl FsTrustDirectory {
    /// Open every store under the configured layout.
    pub fn open(config: &EngineConfig) -> anyhow::Result<Self> {
        Ok(Self {
            baselines: BaselineStore::new(
                FsKvRepo::open(&config.baseline_dir).context("opening baseline store")?,
            ),
            requalification: RequalificationRegistry::load_or_default(
                &config.requalification_file,
            )
            .context("loading requalification registry")?,
            promotions: PromotionLedger::load_or_default(&config.promotions_file)
                .context("loading promotion ledger")?,
            delegations: DelegationRegistry::load_or_default(&config.delegations_file)
                .context("loading delegation registry")?,
        })
    }
}

impl TrustDirectory for FsTrustDirectory {
    fn confidence_score(&self, fingerprint: &str) -> Option<f64> {
        match self.baselines.latest(fingerprint) {
            Ok(record) => record.map(|r| r.score),
            Err(e) => {
                warn!(fingerprint, error = %e, "baseline lookup failed; treating as absent");
                None
            }
        }
    }

    fn requalification_state(&self, fingerprint: &str) -> RequalState {
        self.requalification.state_of(fingerprint)
    }

    fn is_promoted(&self, fingerprint: &str) -> bool {
        self.promotions.is_promoted(fingerprint)
    }

    fn is_demoted(&self, fingerprint: &str) -> bool {
        self.promotions.is_demoted(fingerprint)
    }

    fn is_delegated(&self, fingerprint: &str) -> bool {
        self.delegations.is_delegated(fingerprint)
    }
}
