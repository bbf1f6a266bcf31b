// evaluator.rs — The central decision function.
//
// Every proposed plan flows through `evaluate()`, which runs a fixed
// chain of checks. First match wins; later checks never run once one
// produces a decision:
//
//   0. Plan budget guard (steps, timeouts, READ_ONLY, mode governance)
//   1. Confidence gate — low confidence cannot be rescued by approval
//   2. Requalification / probation
//   3. Domain overlay (tighten only)
//   4. Promotion & delegation resolution (metadata, allows nothing)
//   5. Autonomy-mode enforcement
//   6. Capability allowlist, URL guards, integration safety lanes
//   7. Domain/method allowlists, phase/step caps, UTC cutoff
//   8. Production write-approval gate
//
// The function is pure: no I/O, no wall clock, no randomness. All trust
// state arrives through the injected TrustDirectory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_plan::{ExecutionPlan, ExecutionStep};
use warden_promotion::RequalState;
use warden_trust::fingerprint::{confidence_fingerprint, promotion_fingerprint};

use crate::budget::{check_budget, BudgetCheck};
use crate::codes;
use crate::decision::PolicyResult;
use crate::env::{AutonomyMode, PolicyEnv};
use crate::governance::ModeDeclaration;
use crate::lanes;
use crate::overlay::DomainOverlayRegistry;

/// Read-only view of the trust stores.
///
/// Production wires this to the filesystem-backed stores; tests use an
/// in-memory implementation so evaluation stays a pure function.
pub trait TrustDirectory {
    /// Latest baseline score for a confidence fingerprint, if any.
    fn confidence_score(&self, fingerprint: &str) -> Option<f64>;
    /// Requalification state for a promotion fingerprint.
    fn requalification_state(&self, fingerprint: &str) -> RequalState;
    /// Whether a promotion entry exists.
    fn is_promoted(&self, fingerprint: &str) -> bool;
    /// Whether a demotion marker exists. Outranks promotion.
    fn is_demoted(&self, fingerprint: &str) -> bool;
    /// Whether an active delegation grant exists.
    fn is_delegated(&self, fingerprint: &str) -> bool;
}

/// A trust directory with no records — everything unknown and ACTIVE.
pub struct NullTrust;

impl TrustDirectory for NullTrust {
    fn confidence_score(&self, _: &str) -> Option<f64> {
        None
    }
    fn requalification_state(&self, _: &str) -> RequalState {
        RequalState::Active
    }
    fn is_promoted(&self, _: &str) -> bool {
        false
    }
    fn is_demoted(&self, _: &str) -> bool {
        false
    }
    fn is_delegated(&self, _: &str) -> bool {
        false
    }
}

/// One evaluation's inputs beyond the environment snapshot.
pub struct EvaluationRequest<'a> {
    pub plan: &'a ExecutionPlan,
    /// The command string the plan was derived from.
    pub command: &'a str,
    /// Evaluation clock — injected, never read from the system.
    pub now: DateTime<Utc>,
    /// Approval token: the execution id a human approved, if any.
    pub approved_execution_id: Option<&'a str>,
    /// Domain the plan runs under, for overlay resolution.
    pub domain_id: Option<&'a str>,
}

/// One entry in the decision trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckTrace {
    pub check: String,
    pub outcome: String,
    pub terminal: bool,
}

/// The full outcome: decision plus resolution metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluationOutcome {
    pub result: PolicyResult,
    /// Promoted-and-not-demoted. Metadata — never allows by itself.
    pub promoted: bool,
    /// Active delegation under APPROVAL_GATED_AUTONOMY.
    pub delegated: bool,
    pub confidence_fingerprint: String,
    pub promotion_fingerprint: String,
    pub checks: Vec<CheckTrace>,
}

/// The adapter type a plan fingerprints under: the single adapter its
/// steps use, or "mixed" when they span more than one.
pub fn plan_adapter_type(steps: &[&ExecutionStep]) -> String {
    let mut adapters: Vec<&str> = steps.iter().map(|s| s.adapter.as_str()).collect();
    adapters.sort();
    adapters.dedup();
    match adapters.as_slice() {
        [] => "none".to_string(),
        [single] => (*single).to_string(),
        _ => "mixed".to_string(),
    }
}

struct Tracer {
    checks: Vec<CheckTrace>,
}

impl Tracer {
    fn new() -> Self {
        Self { checks: Vec::new() }
    }

    fn pass(&mut self, check: &str, outcome: impl Into<String>) {
        self.checks.push(CheckTrace {
            check: check.to_string(),
            outcome: outcome.into(),
            terminal: false,
        });
    }

    fn fail(&mut self, check: &str, outcome: impl Into<String>) {
        self.checks.push(CheckTrace {
            check: check.to_string(),
            outcome: outcome.into(),
            terminal: true,
        });
    }
}

/// Evaluate a plan. Returns exactly one decision; never raises for a
/// policy "no".
pub fn evaluate(
    request: &EvaluationRequest<'_>,
    env: &PolicyEnv,
    overlays: &DomainOverlayRegistry,
    declaration: Option<&ModeDeclaration>,
    trust: &dyn TrustDirectory,
) -> EvaluationOutcome {
    let plan = request.plan;
    let steps = plan.materialize();
    let capabilities: Vec<String> = plan.required_capabilities.iter().cloned().collect();
    let has_approval = request.approved_execution_id == Some(plan.execution_id.as_str());
    let any_write = steps.iter().any(|s| s.is_write());
    let adapter_type = plan_adapter_type(&steps);

    let conf_fp = confidence_fingerprint(
        request.command,
        &env.policy_version,
        &env.autonomy_mode.to_string(),
        &capabilities,
    );
    let promo_fp = promotion_fingerprint(request.command, &capabilities, &adapter_type);

    let mut tracer = Tracer::new();
    // Promotion/delegation are resolved in stage 4 but initialized here so
    // early terminal decisions still report them unresolved (false).
    let mut promoted = false;
    let mut delegated = false;

    macro_rules! finish {
        ($result:expr) => {
            return EvaluationOutcome {
                result: $result,
                promoted,
                delegated,
                confidence_fingerprint: conf_fp,
                promotion_fingerprint: promo_fp,
                checks: tracer.checks,
            }
        };
    }

    // Stage 0: budget guard.
    let budget = check_budget(
        env,
        &BudgetCheck {
            steps: &steps,
            plan_max_steps: plan.budgets.as_ref().and_then(|b| b.max_steps),
            capabilities: &capabilities,
            declaration,
        },
    );
    if let Some(result) = budget {
        tracer.fail("budget_guard", result.primary_reason().to_string());
        finish!(result);
    }
    tracer.pass("budget_guard", "passed");

    // Stage 1: confidence gate. Runs before approval is even considered,
    // so low confidence can never be rescued by approval tokens.
    if let Some(score) = trust.confidence_score(&conf_fp) {
        if score / 100.0 <= 0.4 && any_write {
            tracer.fail("confidence_gate", format!("score {} is gate-low", score));
            finish!(PolicyResult::denied(
                codes::CONFIDENCE_TOO_LOW,
                format!(
                    "confidence score {} for this command class is too low for write-capable plans",
                    score
                ),
            ));
        }
        tracer.pass("confidence_gate", format!("score {}", score));
    } else {
        tracer.pass("confidence_gate", "no baseline");
    }

    // Stage 2: requalification.
    if env.requalification_enabled {
        match trust.requalification_state(&promo_fp) {
            RequalState::Active => tracer.pass("requalification", "ACTIVE"),
            RequalState::Probation => {
                if let Some(step) = steps.iter().find(|s| !s.read_only) {
                    tracer.fail("requalification", "PROBATION with non-read-only step");
                    finish!(PolicyResult::denied(
                        codes::PROBATION_READ_ONLY_ENFORCED,
                        format!(
                            "fingerprint is in PROBATION; step '{}' must be explicitly read-only",
                            step.step_id
                        ),
                    ));
                }
                tracer.pass("requalification", "PROBATION, all steps read-only");
            }
            other => {
                if let Some(step) = steps.iter().find(|s| s.is_write()) {
                    tracer.fail("requalification", format!("{:?} with write step", other));
                    finish!(PolicyResult::denied(
                        codes::REQUALIFICATION_BLOCKED,
                        format!(
                            "fingerprint is not ACTIVE; write-capable step '{}' is blocked",
                            step.step_id
                        ),
                    ));
                }
                tracer.pass("requalification", format!("{:?}, no write steps", other));
            }
        }
    }

    // Stage 3: domain overlay. Overlays only tighten.
    if let Some(overlay) = overlays.resolve(request.domain_id) {
        if overlay.deny_write {
            if let Some(step) = steps.iter().find(|s| s.is_write()) {
                tracer.fail("domain_overlay", "deny_write with write step");
                finish!(PolicyResult::denied(
                    codes::DOMAIN_OVERLAY_DENY_WRITE,
                    format!(
                        "domain overlay forbids writes; step '{}' is write-capable",
                        step.step_id
                    ),
                ));
            }
        }
        if let Some(cap) = overlay.max_steps {
            if steps.len() as u64 > cap {
                tracer.fail("domain_overlay", "overlay step cap exceeded");
                finish!(PolicyResult::denied(
                    env.step_budget_code(),
                    format!(
                        "domain overlay caps steps at {}, plan has {}",
                        cap,
                        steps.len()
                    ),
                ));
            }
        }
        tracer.pass("domain_overlay", "overlay present, no objection");
    } else {
        tracer.pass("domain_overlay", "no overlay");
    }

    // Stage 4: promotion & delegation resolution. Metadata only — these
    // flag whether a later approval gate may be skipped, never allow.
    promoted = trust.is_promoted(&promo_fp) && !trust.is_demoted(&promo_fp);
    delegated =
        env.autonomy_mode == AutonomyMode::ApprovalGated && trust.is_delegated(&promo_fp);
    tracer.pass(
        "promotion_resolution",
        format!("promoted={} delegated={}", promoted, delegated),
    );

    // Stage 5: autonomy-mode enforcement.
    match env.autonomy_mode {
        AutonomyMode::Off => {
            if !steps.is_empty() {
                tracer.fail("autonomy_mode", "autonomy is OFF");
                finish!(PolicyResult::denied(
                    codes::AUTONOMY_MODE_OFF,
                    "autonomy is OFF; nothing runs unattended",
                ));
            }
            tracer.pass("autonomy_mode", "OFF with empty plan");
        }
        AutonomyMode::ReadOnly => {
            if let Some(step) = steps.iter().find(|s| s.is_write()) {
                tracer.fail("autonomy_mode", "write step under READ_ONLY");
                finish!(PolicyResult::denied(
                    codes::AUTONOMY_READ_ONLY_VIOLATION,
                    format!(
                        "step '{}' is write-capable under READ_ONLY_AUTONOMY",
                        step.step_id
                    ),
                ));
            }
            tracer.pass("autonomy_mode", "all steps read-only");
        }
        AutonomyMode::ProposeOnly | AutonomyMode::ApprovalGated => {
            if let Some(step) = steps.iter().find(|s| s.is_write()) {
                if !(has_approval || promoted || delegated) {
                    tracer.fail("autonomy_mode", "write step without approval gate pass");
                    let destination = step
                        .url_host()
                        .map(str::to_string)
                        .unwrap_or_else(|| step.adapter.clone());
                    finish!(PolicyResult::approval_required(
                        codes::AUTONOMY_APPROVAL_REQUIRED,
                        format!(
                            "step '{}' is write-capable and no approval, promotion, or delegation applies",
                            step.step_id
                        ),
                        step.action.clone(),
                        destination.clone(),
                        format!("{} via {} to {}", step.action, step.adapter, destination),
                    ));
                }
            }
            tracer.pass("autonomy_mode", "approval gate satisfied or no writes");
        }
    }

    // Stage 6: capability allowlist, URL guards, safety lanes.
    if let Some(allowed) = &env.allowed_capabilities {
        if let Some(cap) = capabilities.iter().find(|c| !allowed.contains(*c)) {
            tracer.fail("capability_allowlist", format!("'{}' not allowed", cap));
            finish!(PolicyResult::denied(
                codes::CAPABILITY_NOT_ALLOWED,
                format!("capability '{}' is not in the allowlist", cap),
            ));
        }
    }
    tracer.pass("capability_allowlist", "passed");

    for step in &steps {
        if let Some(url) = step.url.as_deref() {
            let Some(scheme) = step.url_scheme() else {
                tracer.fail("url_guard", format!("invalid url on '{}'", step.step_id));
                finish!(PolicyResult::denied(
                    codes::POLICY_URL_INVALID,
                    format!("step '{}' has unparseable url '{}'", step.step_id, url),
                ));
            };
            let scheme_ok = matches!(scheme, "http" | "https")
                || (scheme == "file" && step.adapter == "browser");
            if !scheme_ok {
                tracer.fail("url_guard", format!("scheme '{}' blocked", scheme));
                finish!(PolicyResult::denied(
                    codes::POLICY_URL_PROTOCOL_BLOCK,
                    format!("step '{}' uses blocked protocol '{}'", step.step_id, scheme),
                ));
            }
        }

        let lane_result = lanes::notion_live_write(step)
            .or_else(|| lanes::docs_capture(step, env.docs_capture_allowed_hosts.as_deref()))
            .or_else(|| {
                lanes::browser_operator(
                    step,
                    env.browser_operator_allowed_hosts.as_deref(),
                    has_approval,
                )
            });
        if let Some(result) = lane_result {
            tracer.fail("safety_lane", result.primary_reason().to_string());
            finish!(result);
        }
    }
    tracer.pass("url_and_lanes", "passed");

    // Stage 7: domain/method allowlists, phase/step caps, UTC cutoff.
    if let Some(allowed) = &env.allowed_domains {
        for step in &steps {
            if let Some(host) = step.url_host() {
                if !allowed.contains(host) {
                    tracer.fail("domain_allowlist", format!("'{}' not allowed", host));
                    finish!(PolicyResult::denied(
                        codes::DOMAIN_NOT_ALLOWED,
                        format!("domain '{}' is not in the allowlist", host),
                    ));
                }
            }
        }
    }
    if let Some(allowed) = &env.allowed_methods {
        for step in &steps {
            if let Some(method) = step.method.as_deref() {
                if !allowed.contains(&method.to_uppercase()) {
                    tracer.fail("method_allowlist", format!("'{}' blocked", method));
                    finish!(PolicyResult::denied(
                        codes::POLICY_METHOD_BLOCK,
                        format!("method '{}' is not in the allowlist", method),
                    ));
                }
            }
        }
    }
    if let Some(cap) = env.max_phases {
        if plan.phase_count() as u64 > cap {
            tracer.fail("phase_cap", "exceeded");
            finish!(PolicyResult::denied(
                codes::POLICY_MAX_PHASES,
                format!("plan has {} phases, cap is {}", plan.phase_count(), cap),
            ));
        }
    }
    if let Some(cap) = env.max_total_steps {
        if steps.len() as u64 > cap {
            tracer.fail("total_step_cap", "exceeded");
            finish!(PolicyResult::denied(
                codes::POLICY_MAX_TOTAL_STEPS,
                format!("plan has {} total steps, cap is {}", steps.len(), cap),
            ));
        }
    }
    if let Some(cutoff) = env.no_exec_after_utc {
        if request.now.time() > cutoff {
            tracer.fail("time_window", "past UTC cutoff");
            finish!(PolicyResult::denied(
                codes::POLICY_TIME_WINDOW,
                format!("execution denied after {} UTC", cutoff.format("%H:%M")),
            ));
        }
    }
    tracer.pass("allowlists_and_caps", "passed");

    // Stage 8: production write-approval gate.
    if env.production && !(has_approval || promoted || delegated) {
        if let Some(step) = steps.iter().find(|s| s.is_write()) {
            tracer.fail("production_gate", "write without approval in production");
            let destination = step
                .url_host()
                .map(str::to_string)
                .unwrap_or_else(|| step.adapter.clone());
            finish!(PolicyResult::approval_required(
                codes::PRODUCTION_APPROVAL_REQUIRED,
                format!(
                    "production write requires an approval token matching execution '{}'",
                    plan.execution_id
                ),
                step.action.clone(),
                destination.clone(),
                format!("{} via {} to {}", step.action, step.adapter, destination),
            ));
        }
    }
    tracer.pass("production_gate", "passed");

    finish!(PolicyResult::Allowed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use chrono::TimeZone;
    use warden_plan::PlanBudgets;

    /// Configurable in-memory trust directory.
    #[derive(Default)]
    struct FakeTrust {
        score: Option<f64>,
        requal: Option<RequalState>,
        promoted: bool,
        demoted: bool,
        delegated: bool,
    }

    impl TrustDirectory for FakeTrust {
        fn confidence_score(&self, _: &str) -> Option<f64> {
            self.score
        }
        fn requalification_state(&self, _: &str) -> RequalState {
            self.requal.unwrap_or(RequalState::Active)
        }
        fn is_promoted(&self, _: &str) -> bool {
            self.promoted
        }
        fn is_demoted(&self, _: &str) -> bool {
            self.demoted
        }
        fn is_delegated(&self, _: &str) -> bool {
            self.delegated
        }
    }

    fn step(id: &str, read_only: bool) -> ExecutionStep {
        ExecutionStep {
            step_id: id.to_string(),
            action: "update_page".to_string(),
            adapter: "http".to_string(),
            method: Some("GET".to_string()),
            url: Some("https://api.example.com/v1".to_string()),
            read_only,
            approval_scoped: None,
            prestate: None,
            prestate_fingerprint: None,
            timeout_ms: None,
        }
    }

    fn plan(steps: Vec<ExecutionStep>) -> ExecutionPlan {
        ExecutionPlan {
            execution_id: "exec-1".to_string(),
            thread_id: None,
            dry_run: false,
            required_capabilities: BTreeSet::new(),
            agent_version: Some("1.0.0".to_string()),
            budgets: Some(PlanBudgets::default()),
            steps: Some(steps),
            phases: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn run(
        plan: &ExecutionPlan,
        env: &PolicyEnv,
        trust: &dyn TrustDirectory,
        approved: Option<&str>,
    ) -> EvaluationOutcome {
        evaluate(
            &EvaluationRequest {
                plan,
                command: "notion sync pages",
                now: now(),
                approved_execution_id: approved,
                domain_id: None,
            },
            env,
            &DomainOverlayRegistry::default(),
            None,
            trust,
        )
    }

    fn gated_env() -> PolicyEnv {
        PolicyEnv {
            autonomy_mode: AutonomyMode::ApprovalGated,
            ..PolicyEnv::default()
        }
    }

    // ── Determinism ──

    #[test]
    fn evaluation_is_deterministic() {
        let p = plan(vec![step("a", true), step("b", false)]);
        let env = gated_env();
        let first = run(&p, &env, &NullTrust, None);
        let second = run(&p, &env, &NullTrust, None);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    // ── Confidence gate (stage 1) ──

    #[test]
    fn low_confidence_denies_write_plans() {
        let p = plan(vec![step("a", false)]);
        let trust = FakeTrust {
            score: Some(35.0),
            ..FakeTrust::default()
        };
        let outcome = run(&p, &gated_env(), &trust, None);
        assert_eq!(outcome.result.code(), Some(codes::CONFIDENCE_TOO_LOW));
    }

    #[test]
    fn low_confidence_allows_read_only_plans() {
        let p = plan(vec![step("a", true)]);
        let trust = FakeTrust {
            score: Some(35.0),
            ..FakeTrust::default()
        };
        let outcome = run(&p, &gated_env(), &trust, None);
        assert!(outcome.result.is_allowed());
    }

    #[test]
    fn confidence_gate_outranks_promotion() {
        // Low confidence plus an otherwise-eligible promotion must still deny.
        let p = plan(vec![step("a", false)]);
        let trust = FakeTrust {
            score: Some(30.0),
            promoted: true,
            ..FakeTrust::default()
        };
        let outcome = run(&p, &gated_env(), &trust, None);
        assert_eq!(outcome.result.code(), Some(codes::CONFIDENCE_TOO_LOW));
    }

    #[test]
    fn confidence_gate_outranks_approval_token() {
        let p = plan(vec![step("a", false)]);
        let trust = FakeTrust {
            score: Some(30.0),
            ..FakeTrust::default()
        };
        let outcome = run(&p, &gated_env(), &trust, Some("exec-1"));
        assert_eq!(outcome.result.code(), Some(codes::CONFIDENCE_TOO_LOW));
    }

    #[test]
    fn score_just_above_gate_passes() {
        let p = plan(vec![step("a", false)]);
        let trust = FakeTrust {
            score: Some(40.5),
            ..FakeTrust::default()
        };
        let outcome = run(&p, &gated_env(), &trust, Some("exec-1"));
        assert!(outcome.result.is_allowed());
    }

    // ── Requalification (stage 2) ──

    fn requal_env() -> PolicyEnv {
        PolicyEnv {
            autonomy_mode: AutonomyMode::ApprovalGated,
            requalification_enabled: true,
            ..PolicyEnv::default()
        }
    }

    #[test]
    fn probation_forces_explicit_read_only() {
        let p = plan(vec![step("a", true), step("b", false)]);
        let trust = FakeTrust {
            requal: Some(RequalState::Probation),
            ..FakeTrust::default()
        };
        let outcome = run(&p, &requal_env(), &trust, Some("exec-1"));
        assert_eq!(
            outcome.result.code(),
            Some(codes::PROBATION_READ_ONLY_ENFORCED)
        );
    }

    #[test]
    fn probation_allows_all_read_only_plan() {
        let p = plan(vec![step("a", true), step("b", true)]);
        let trust = FakeTrust {
            requal: Some(RequalState::Probation),
            ..FakeTrust::default()
        };
        let outcome = run(&p, &requal_env(), &trust, None);
        assert!(outcome.result.is_allowed());
    }

    #[test]
    fn suspended_blocks_writes_outright() {
        let p = plan(vec![step("a", false)]);
        let trust = FakeTrust {
            requal: Some(RequalState::Suspended),
            ..FakeTrust::default()
        };
        let outcome = run(&p, &requal_env(), &trust, Some("exec-1"));
        assert_eq!(outcome.result.code(), Some(codes::REQUALIFICATION_BLOCKED));
    }

    #[test]
    fn requalification_ignored_when_disabled() {
        let p = plan(vec![step("a", false)]);
        let trust = FakeTrust {
            requal: Some(RequalState::Suspended),
            ..FakeTrust::default()
        };
        let outcome = run(&p, &gated_env(), &trust, Some("exec-1"));
        assert!(outcome.result.is_allowed());
    }

    // ── Domain overlay (stage 3) ──

    #[test]
    fn overlay_deny_write_blocks_write_steps() {
        let p = plan(vec![step("a", false)]);
        let mut overlays = DomainOverlayRegistry::default();
        overlays.insert(
            "tenant-a",
            crate::overlay::DomainOverlay {
                deny_write: true,
                max_steps: None,
            },
        );
        let outcome = evaluate(
            &EvaluationRequest {
                plan: &p,
                command: "cmd",
                now: now(),
                approved_execution_id: Some("exec-1"),
                domain_id: Some("tenant-a"),
            },
            &gated_env(),
            &overlays,
            None,
            &NullTrust,
        );
        assert_eq!(outcome.result.code(), Some(codes::DOMAIN_OVERLAY_DENY_WRITE));
    }

    #[test]
    fn overlay_for_other_domain_does_not_apply() {
        let p = plan(vec![step("a", false)]);
        let mut overlays = DomainOverlayRegistry::default();
        overlays.insert(
            "tenant-a",
            crate::overlay::DomainOverlay {
                deny_write: true,
                max_steps: None,
            },
        );
        let outcome = evaluate(
            &EvaluationRequest {
                plan: &p,
                command: "cmd",
                now: now(),
                approved_execution_id: Some("exec-1"),
                domain_id: Some("tenant-b"),
            },
            &gated_env(),
            &overlays,
            None,
            &NullTrust,
        );
        assert!(outcome.result.is_allowed());
    }

    // ── Autonomy modes (stage 5) ──

    #[test]
    fn read_only_mode_allows_iff_every_step_read_only() {
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            ..PolicyEnv::default()
        };

        let all_reads = plan(vec![step("a", true), step("b", true), step("c", true)]);
        assert!(run(&all_reads, &env, &NullTrust, None).result.is_allowed());

        let one_write = plan(vec![step("a", true), step("b", false)]);
        let outcome = run(&one_write, &env, &NullTrust, None);
        assert_eq!(
            outcome.result.code(),
            Some(codes::AUTONOMY_READ_ONLY_VIOLATION)
        );
    }

    #[test]
    fn off_mode_denies_everything() {
        let env = PolicyEnv::default();
        let p = plan(vec![step("a", true)]);
        let outcome = run(&p, &env, &NullTrust, None);
        assert_eq!(outcome.result.code(), Some(codes::AUTONOMY_MODE_OFF));
    }

    #[test]
    fn gated_write_without_approval_requires_approval() {
        let p = plan(vec![step("a", false)]);
        let outcome = run(&p, &gated_env(), &NullTrust, None);
        assert_eq!(
            outcome.result.code(),
            Some(codes::AUTONOMY_APPROVAL_REQUIRED)
        );
        match &outcome.result {
            PolicyResult::ApprovalRequired { action, preview, .. } => {
                assert_eq!(action, "update_page");
                assert_eq!(preview.destination, "api.example.com");
            }
            other => panic!("expected ApprovalRequired, got {:?}", other),
        }
    }

    #[test]
    fn matching_approval_token_passes_the_gate() {
        let p = plan(vec![step("a", false)]);
        let outcome = run(&p, &gated_env(), &NullTrust, Some("exec-1"));
        assert!(outcome.result.is_allowed());
    }

    #[test]
    fn mismatched_approval_token_does_not_pass() {
        let p = plan(vec![step("a", false)]);
        let outcome = run(&p, &gated_env(), &NullTrust, Some("exec-other"));
        assert_eq!(
            outcome.result.code(),
            Some(codes::AUTONOMY_APPROVAL_REQUIRED)
        );
    }

    #[test]
    fn promotion_passes_the_approval_gate() {
        let p = plan(vec![step("a", false)]);
        let trust = FakeTrust {
            promoted: true,
            ..FakeTrust::default()
        };
        let outcome = run(&p, &gated_env(), &trust, None);
        assert!(outcome.result.is_allowed());
        assert!(outcome.promoted);
    }

    #[test]
    fn demotion_cancels_promotion() {
        let p = plan(vec![step("a", false)]);
        let trust = FakeTrust {
            promoted: true,
            demoted: true,
            ..FakeTrust::default()
        };
        let outcome = run(&p, &gated_env(), &trust, None);
        assert!(!outcome.promoted);
        assert_eq!(
            outcome.result.code(),
            Some(codes::AUTONOMY_APPROVAL_REQUIRED)
        );
    }

    #[test]
    fn delegation_only_applies_under_approval_gated() {
        let trust = FakeTrust {
            delegated: true,
            ..FakeTrust::default()
        };

        let p = plan(vec![step("a", false)]);
        let outcome = run(&p, &gated_env(), &trust, None);
        assert!(outcome.result.is_allowed());
        assert!(outcome.delegated);

        let propose_env = PolicyEnv {
            autonomy_mode: AutonomyMode::ProposeOnly,
            ..PolicyEnv::default()
        };
        let outcome = run(&p, &propose_env, &trust, None);
        assert!(!outcome.delegated);
        assert_eq!(
            outcome.result.code(),
            Some(codes::AUTONOMY_APPROVAL_REQUIRED)
        );
    }

    // ── Stage 6/7 guards ──

    #[test]
    fn capability_allowlist_denies_unknown_capability() {
        let mut p = plan(vec![step("a", true)]);
        p.required_capabilities.insert("exotic.cap".to_string());
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            allowed_capabilities: Some(["http.get".to_string()].into_iter().collect()),
            ..PolicyEnv::default()
        };
        let outcome = run(&p, &env, &NullTrust, None);
        assert_eq!(outcome.result.code(), Some(codes::CAPABILITY_NOT_ALLOWED));
    }

    #[test]
    fn invalid_url_is_denied() {
        let mut s = step("a", true);
        s.url = Some("not a url".to_string());
        let p = plan(vec![s]);
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            ..PolicyEnv::default()
        };
        let outcome = run(&p, &env, &NullTrust, None);
        assert_eq!(outcome.result.code(), Some(codes::POLICY_URL_INVALID));
    }

    #[test]
    fn non_http_protocol_is_blocked() {
        let mut s = step("a", true);
        s.url = Some("ftp://files.example.com/x".to_string());
        let p = plan(vec![s]);
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            ..PolicyEnv::default()
        };
        let outcome = run(&p, &env, &NullTrust, None);
        assert_eq!(outcome.result.code(), Some(codes::POLICY_URL_PROTOCOL_BLOCK));
    }

    #[test]
    fn notion_lane_applies_through_evaluator() {
        let mut s = step("a", false);
        s.adapter = "notion".to_string();
        let p = plan(vec![s]);
        // Approval token passes stage 5, but the lane still blocks.
        let outcome = run(&p, &gated_env(), &NullTrust, Some("exec-1"));
        assert_eq!(outcome.result.code(), Some(codes::NOTION_LIVE_WRITE_BLOCKED));
    }

    #[test]
    fn promotion_does_not_bypass_safety_lanes() {
        let mut s = step("a", false);
        s.adapter = "notion".to_string();
        let p = plan(vec![s]);
        let trust = FakeTrust {
            promoted: true,
            ..FakeTrust::default()
        };
        let outcome = run(&p, &gated_env(), &trust, None);
        assert_eq!(outcome.result.code(), Some(codes::NOTION_LIVE_WRITE_BLOCKED));
    }

    #[test]
    fn domain_allowlist_denies_unlisted_host() {
        let p = plan(vec![step("a", true)]);
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            allowed_domains: Some(["other.example.com".to_string()].into_iter().collect()),
            ..PolicyEnv::default()
        };
        let outcome = run(&p, &env, &NullTrust, None);
        assert_eq!(outcome.result.code(), Some(codes::DOMAIN_NOT_ALLOWED));
    }

    #[test]
    fn method_allowlist_blocks_unlisted_method() {
        let mut s = step("a", true);
        s.method = Some("delete".to_string());
        let p = plan(vec![s]);
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            allowed_methods: Some(["GET".to_string()].into_iter().collect()),
            ..PolicyEnv::default()
        };
        let outcome = run(&p, &env, &NullTrust, None);
        assert_eq!(outcome.result.code(), Some(codes::POLICY_METHOD_BLOCK));
    }

    #[test]
    fn utc_cutoff_denies_late_execution() {
        let p = plan(vec![step("a", true)]);
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            no_exec_after_utc: Some(chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
            ..PolicyEnv::default()
        };
        // Evaluation clock is 10:00 UTC.
        let outcome = run(&p, &env, &NullTrust, None);
        assert_eq!(outcome.result.code(), Some(codes::POLICY_TIME_WINDOW));
    }

    #[test]
    fn phase_cap_applies_to_phased_plans() {
        let json = r#"{
            "execution_id": "exec-1",
            "phases": [
                {"phase_id": "p1", "steps": [{"step_id": "a", "action": "x", "adapter": "http", "read_only": true}]},
                {"phase_id": "p2", "steps": [{"step_id": "b", "action": "x", "adapter": "http", "read_only": true}]}
            ]
        }"#;
        let p = ExecutionPlan::parse(json).unwrap();
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            max_phases: Some(1),
            ..PolicyEnv::default()
        };
        let outcome = run(&p, &env, &NullTrust, None);
        assert_eq!(outcome.result.code(), Some(codes::POLICY_MAX_PHASES));
    }

    // ── Production gate (stage 8) ──

    #[test]
    fn production_write_requires_approval() {
        let p = plan(vec![step("a", false)]);
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ApprovalGated,
            production: true,
            ..PolicyEnv::default()
        };
        // Promotion passes stage 5 and also the production gate.
        let trust = FakeTrust {
            promoted: true,
            ..FakeTrust::default()
        };
        let outcome = run(&p, &env, &trust, None);
        assert!(outcome.result.is_allowed());

        // Without promotion or token, the production gate fires at stage 5
        // already; with a token the plan passes both gates.
        let outcome = run(&p, &env, &NullTrust, Some("exec-1"));
        assert!(outcome.result.is_allowed());
    }

    // ── Budget guard precedence ──

    #[test]
    fn budget_guard_runs_before_everything() {
        let p = plan(vec![step("a", false), step("b", false)]);
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ApprovalGated,
            max_steps: Some(1),
            ..PolicyEnv::default()
        };
        // Even a low-confidence trust state reports the budget code first.
        let trust = FakeTrust {
            score: Some(10.0),
            ..FakeTrust::default()
        };
        let outcome = run(&p, &env, &trust, None);
        assert_eq!(outcome.result.code(), Some(codes::BUDGET_MAX_STEPS_EXCEEDED));
    }

    // ── Metadata ──

    #[test]
    fn outcome_carries_both_fingerprints() {
        let p = plan(vec![step("a", true)]);
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            ..PolicyEnv::default()
        };
        let outcome = run(&p, &env, &NullTrust, None);
        assert_eq!(outcome.confidence_fingerprint.len(), 64);
        assert_eq!(outcome.promotion_fingerprint.len(), 64);
        assert_ne!(outcome.confidence_fingerprint, outcome.promotion_fingerprint);
    }

    #[test]
    fn adapter_type_is_mixed_for_multi_adapter_plans() {
        let mut s1 = step("a", true);
        s1.adapter = "http".to_string();
        let mut s2 = step("b", true);
        s2.adapter = "notion".to_string();
        let steps = vec![s1, s2];
        let refs: Vec<&ExecutionStep> = steps.iter().collect();
        assert_eq!(plan_adapter_type(&refs), "mixed");
    }

    #[test]
    fn trace_ends_with_terminal_entry() {
        let p = plan(vec![step("a", false)]);
        let outcome = run(&p, &gated_env(), &NullTrust, None);
        assert!(outcome.checks.last().unwrap().terminal);
    }
}
