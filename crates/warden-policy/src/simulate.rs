// simulate.rs — The simulation engine.
//
// Replays a (possibly multi-phase) plan through the evaluator without
// executing anything, and produces the decision trace a human reads.
//
// Phases are evaluated front-to-back as growing prefixes of the full
// plan, so a later phase is judged with every earlier phase's steps in
// scope — artifacts from earlier phases are available to later ones.
// The phase traces and artifact ledger are owned here; the evaluator
// itself never sees phase structure beyond the materialized steps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_plan::ExecutionPlan;

use crate::decision::PolicyResult;
use crate::env::PolicyEnv;
use crate::evaluator::{evaluate, CheckTrace, EvaluationRequest, TrustDirectory};
use crate::explain::explain;
use crate::governance::ModeDeclaration;
use crate::overlay::DomainOverlayRegistry;

/// Per-phase entry in the simulation trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseTrace {
    pub phase_id: String,
    pub step_count: usize,
    /// Steps evaluated including all earlier phases.
    pub cumulative_steps: usize,
    pub decision: String,
    pub primary_reason: String,
}

/// The full simulation output object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicySimulation {
    pub decision: String,
    pub primary_reason: String,
    pub policy: PolicyResult,
    pub promoted: bool,
    pub delegated: bool,
    pub confidence_fingerprint: String,
    pub promotion_fingerprint: String,
    pub phases: Vec<PhaseTrace>,
    /// Step ids whose prestates earlier phases recorded, per phase —
    /// the artifact ledger later phases may draw on.
    pub artifacts: BTreeMap<String, Vec<String>>,
    pub checks: Vec<CheckTrace>,
    /// Human-facing explanation of the primary reason, when known.
    pub explain: Option<String>,
}

/// Simulate a plan: evaluate it and assemble the human-facing trace.
pub fn simulate(
    plan: &ExecutionPlan,
    command: &str,
    env: &PolicyEnv,
    overlays: &DomainOverlayRegistry,
    declaration: Option<&ModeDeclaration>,
    trust: &dyn TrustDirectory,
    now: DateTime<Utc>,
    approved_execution_id: Option<&str>,
    domain_id: Option<&str>,
) -> PolicySimulation {
    let outcome = evaluate(
        &EvaluationRequest {
            plan,
            command,
            now,
            approved_execution_id,
            domain_id,
        },
        env,
        overlays,
        declaration,
        trust,
    );

    let mut phases = Vec::new();
    let mut artifacts: BTreeMap<String, Vec<String>> = BTreeMap::new();

    if let Some(plan_phases) = &plan.phases {
        // Evaluate each phase as a growing prefix of the plan.
        let mut prefix_steps = Vec::new();
        for phase in plan_phases {
            prefix_steps.extend(phase.steps.iter().cloned());
            let prefix_plan = ExecutionPlan {
                execution_id: plan.execution_id.clone(),
                thread_id: plan.thread_id.clone(),
                dry_run: plan.dry_run,
                required_capabilities: plan.required_capabilities.clone(),
                agent_version: plan.agent_version.clone(),
                budgets: plan.budgets.clone(),
                steps: Some(prefix_steps.clone()),
                phases: None,
            };
            let phase_outcome = evaluate(
                &EvaluationRequest {
                    plan: &prefix_plan,
                    command,
                    now,
                    approved_execution_id,
                    domain_id,
                },
                env,
                overlays,
                declaration,
                trust,
            );
            phases.push(PhaseTrace {
                phase_id: phase.phase_id.clone(),
                step_count: phase.steps.len(),
                cumulative_steps: prefix_steps.len(),
                decision: phase_outcome.result.decision_tag().to_string(),
                primary_reason: phase_outcome.result.primary_reason().to_string(),
            });

            // Record this phase's artifacts for later phases.
            let recorded: Vec<String> = phase
                .steps
                .iter()
                .filter(|s| s.prestate_fingerprint.is_some())
                .map(|s| s.step_id.clone())
                .collect();
            if !recorded.is_empty() {
                artifacts.insert(phase.phase_id.clone(), recorded);
            }
        }
    } else {
        phases.push(PhaseTrace {
            phase_id: "main".to_string(),
            step_count: plan.step_count(),
            cumulative_steps: plan.step_count(),
            decision: outcome.result.decision_tag().to_string(),
            primary_reason: outcome.result.primary_reason().to_string(),
        });
    }

    let primary_reason = outcome.result.primary_reason().to_string();
    PolicySimulation {
        decision: outcome.result.decision_tag().to_string(),
        primary_reason: primary_reason.clone(),
        policy: outcome.result,
        promoted: outcome.promoted,
        delegated: outcome.delegated,
        confidence_fingerprint: outcome.confidence_fingerprint,
        promotion_fingerprint: outcome.promotion_fingerprint,
        phases,
        artifacts,
        checks: outcome.checks,
        explain: explain(&primary_reason).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::AutonomyMode;
    use crate::evaluator::NullTrust;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap()
    }

    fn read_only_env() -> PolicyEnv {
        PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            ..PolicyEnv::default()
        }
    }

    fn run(plan: &ExecutionPlan, env: &PolicyEnv) -> PolicySimulation {
        simulate(
            plan,
            "docs capture weekly",
            env,
            &DomainOverlayRegistry::default(),
            None,
            &NullTrust,
            now(),
            None,
            None,
        )
    }

    #[test]
    fn flat_plan_yields_single_phase_trace() {
        let plan = ExecutionPlan::parse(
            r#"{
                "execution_id": "exec-1",
                "steps": [
                    {"step_id": "a", "action": "fetch", "adapter": "http", "read_only": true},
                    {"step_id": "b", "action": "fetch", "adapter": "http", "read_only": true}
                ]
            }"#,
        )
        .unwrap();

        let sim = run(&plan, &read_only_env());
        assert_eq!(sim.decision, "ALLOWED");
        assert_eq!(sim.primary_reason, "ALLOWED");
        assert_eq!(sim.phases.len(), 1);
        assert_eq!(sim.phases[0].phase_id, "main");
        assert_eq!(sim.phases[0].step_count, 2);
    }

    #[test]
    fn phased_plan_traces_each_phase() {
        let plan = ExecutionPlan::parse(
            r#"{
                "execution_id": "exec-2",
                "phases": [
                    {"phase_id": "capture", "steps": [
                        {"step_id": "a", "action": "fetch", "adapter": "http", "read_only": true,
                         "prestate": {"v": 1}, "prestate_fingerprint": "abc"}
                    ]},
                    {"phase_id": "apply", "steps": [
                        {"step_id": "b", "action": "update", "adapter": "http"}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        let sim = run(&plan, &read_only_env());
        assert_eq!(sim.phases.len(), 2);
        // First phase alone is clean.
        assert_eq!(sim.phases[0].decision, "ALLOWED");
        assert_eq!(sim.phases[0].cumulative_steps, 1);
        // Second phase includes the write step and fails under READ_ONLY.
        assert_eq!(sim.phases[1].decision, "DENIED");
        assert_eq!(sim.phases[1].cumulative_steps, 2);
        // Overall decision matches the full-plan evaluation.
        assert_eq!(sim.decision, "DENIED");
        assert_eq!(sim.primary_reason, "AUTONOMY_READ_ONLY_VIOLATION");
        // The capture phase recorded an artifact.
        assert_eq!(sim.artifacts.get("capture").unwrap(), &vec!["a".to_string()]);
    }

    #[test]
    fn explain_text_is_attached_for_known_codes() {
        let plan = ExecutionPlan::parse(
            r#"{
                "execution_id": "exec-3",
                "steps": [{"step_id": "a", "action": "update", "adapter": "http"}]
            }"#,
        )
        .unwrap();

        let sim = run(&plan, &read_only_env());
        assert_eq!(sim.primary_reason, "AUTONOMY_READ_ONLY_VIOLATION");
        assert!(sim.explain.is_some());
    }

    #[test]
    fn simulation_is_deterministic() {
        let plan = ExecutionPlan::parse(
            r#"{
                "execution_id": "exec-4",
                "steps": [{"step_id": "a", "action": "fetch", "adapter": "http", "read_only": true}]
            }"#,
        )
        .unwrap();
        let env = read_only_env();
        let a = serde_json::to_string(&run(&plan, &env)).unwrap();
        let b = serde_json::to_string(&run(&plan, &env)).unwrap();
        assert_eq!(a, b);
    }
}
