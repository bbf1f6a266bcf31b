// budget.rs — The plan budget guard.
//
// A cheap pre-check that runs before the main evaluation chain. Checks
// run in a fixed order and the first failure wins:
//
//   (a) step count over cap        → deny (label overridable via env)
//   (b) step timeout over cap      → deny
//   (c) READ_ONLY mode write step  → deny
//   (d) mode/limb governance       → deny (when enabled)
//
// Returns None (no objection) or a Denied result. Never raises.

use warden_plan::ExecutionStep;

use crate::codes;
use crate::decision::PolicyResult;
use crate::env::{AutonomyMode, PolicyEnv};
use crate::governance::{GovernanceMode, ModeDeclaration};

/// Inputs the guard needs beyond the environment snapshot.
pub struct BudgetCheck<'a> {
    pub steps: &'a [&'a ExecutionStep],
    /// Plan-declared step cap, if any. Only ever tightens the env cap.
    pub plan_max_steps: Option<u64>,
    /// Capabilities the plan claims — checked against governance limbs.
    pub capabilities: &'a [String],
    /// The loaded mode declaration, when governance is enabled.
    pub declaration: Option<&'a ModeDeclaration>,
}

/// Run the budget guard.
pub fn check_budget(env: &PolicyEnv, check: &BudgetCheck<'_>) -> Option<PolicyResult> {
    // (a) step count. The effective cap is the tighter of env and plan.
    let step_cap = match (env.max_steps, check.plan_max_steps) {
        (Some(e), Some(p)) => Some(e.min(p)),
        (cap, None) | (None, cap) => cap,
    };
    if let Some(cap) = step_cap {
        if check.steps.len() as u64 > cap {
            return Some(PolicyResult::denied(
                env.step_budget_code(),
                format!("plan has {} steps, cap is {}", check.steps.len(), cap),
            ));
        }
    }

    // (b) explicit per-step timeouts over the runtime cap.
    if let Some(cap) = env.max_runtime_ms {
        for step in check.steps {
            if let Some(timeout) = step.timeout_ms {
                if timeout > cap {
                    return Some(PolicyResult::denied(
                        codes::BUDGET_MAX_RUNTIME_EXCEEDED,
                        format!(
                            "step '{}' declares timeout {}ms, cap is {}ms",
                            step.step_id, timeout, cap
                        ),
                    ));
                }
            }
        }
    }

    // (c) READ_ONLY autonomy: every step must be explicitly read-only.
    if env.autonomy_mode == AutonomyMode::ReadOnly {
        if let Some(step) = check.steps.iter().find(|s| s.is_write()) {
            return Some(PolicyResult::denied(
                codes::AUTONOMY_READ_ONLY_VIOLATION,
                format!(
                    "step '{}' is write-capable under READ_ONLY_AUTONOMY",
                    step.step_id
                ),
            ));
        }
    }

    // (d) mode/limb governance.
    if env.mode_governance_enabled {
        let Some(declaration) = check.declaration else {
            return Some(PolicyResult::denied(
                codes::MODE_DECLARATION_MISSING,
                "mode governance is enabled but no mode declaration artifact exists",
            ));
        };

        if declaration.mode == GovernanceMode::Frozen {
            return Some(PolicyResult::denied(
                codes::MODE_FROZEN,
                "declared mode is FROZEN; nothing may run",
            ));
        }

        if check.steps.iter().any(|s| s.is_write()) {
            if declaration.mode != GovernanceMode::SingleRunApproved {
                return Some(PolicyResult::denied(
                    codes::LIMB_INACTIVE,
                    "write-capable plan requires SINGLE_RUN_APPROVED mode",
                ));
            }
            for capability in check.capabilities {
                if !declaration.limb_active(capability) {
                    return Some(PolicyResult::denied(
                        codes::LIMB_INACTIVE,
                        format!("capability limb '{}' is not active", capability),
                    ));
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn step(id: &str, read_only: bool, timeout_ms: Option<u64>) -> ExecutionStep {
        ExecutionStep {
            step_id: id.to_string(),
            action: "act".to_string(),
            adapter: "http".to_string(),
            method: None,
            url: None,
            read_only,
            approval_scoped: None,
            prestate: None,
            prestate_fingerprint: None,
            timeout_ms,
        }
    }

    fn run(env: &PolicyEnv, steps: &[ExecutionStep]) -> Option<PolicyResult> {
        let refs: Vec<&ExecutionStep> = steps.iter().collect();
        check_budget(
            env,
            &BudgetCheck {
                steps: &refs,
                plan_max_steps: None,
                capabilities: &[],
                declaration: None,
            },
        )
    }

    #[test]
    fn under_cap_passes() {
        let env = PolicyEnv {
            max_steps: Some(3),
            ..PolicyEnv::default()
        };
        let steps = vec![step("a", true, None), step("b", true, None)];
        assert_eq!(run(&env, &steps), None);
    }

    #[test]
    fn over_cap_denies_with_budget_code() {
        let env = PolicyEnv {
            max_steps: Some(1),
            ..PolicyEnv::default()
        };
        let steps = vec![step("a", true, None), step("b", true, None)];
        let result = run(&env, &steps).unwrap();
        assert_eq!(result.code(), Some(codes::BUDGET_MAX_STEPS_EXCEEDED));
    }

    #[test]
    fn budget_code_env_override_is_used() {
        let env = PolicyEnv {
            max_steps: Some(0),
            budget_deny_code: Some("CUSTOM_BUDGET_CODE".to_string()),
            ..PolicyEnv::default()
        };
        let steps = vec![step("a", true, None)];
        let result = run(&env, &steps).unwrap();
        assert_eq!(result.code(), Some("CUSTOM_BUDGET_CODE"));
    }

    #[test]
    fn plan_budget_only_tightens() {
        let env = PolicyEnv {
            max_steps: Some(10),
            ..PolicyEnv::default()
        };
        let steps = vec![step("a", true, None), step("b", true, None)];
        let refs: Vec<&ExecutionStep> = steps.iter().collect();
        let result = check_budget(
            &env,
            &BudgetCheck {
                steps: &refs,
                plan_max_steps: Some(1),
                capabilities: &[],
                declaration: None,
            },
        );
        assert!(result.is_some());
    }

    #[test]
    fn timeout_over_cap_denies() {
        let env = PolicyEnv {
            max_runtime_ms: Some(1_000),
            ..PolicyEnv::default()
        };
        let steps = vec![step("a", true, Some(5_000))];
        let result = run(&env, &steps).unwrap();
        assert_eq!(result.code(), Some(codes::BUDGET_MAX_RUNTIME_EXCEEDED));
    }

    #[test]
    fn step_without_timeout_is_fine_under_cap() {
        let env = PolicyEnv {
            max_runtime_ms: Some(1_000),
            ..PolicyEnv::default()
        };
        let steps = vec![step("a", true, None)];
        assert_eq!(run(&env, &steps), None);
    }

    #[test]
    fn read_only_mode_rejects_write_step() {
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            ..PolicyEnv::default()
        };
        let steps = vec![step("a", true, None), step("b", false, None)];
        let result = run(&env, &steps).unwrap();
        assert_eq!(result.code(), Some(codes::AUTONOMY_READ_ONLY_VIOLATION));
    }

    #[test]
    fn read_only_mode_accepts_all_read_only() {
        let env = PolicyEnv {
            autonomy_mode: AutonomyMode::ReadOnly,
            ..PolicyEnv::default()
        };
        let steps = vec![step("a", true, None), step("b", true, None)];
        assert_eq!(run(&env, &steps), None);
    }

    #[test]
    fn governance_without_declaration_denies() {
        let env = PolicyEnv {
            mode_governance_enabled: true,
            ..PolicyEnv::default()
        };
        let steps = vec![step("a", true, None)];
        let result = run(&env, &steps).unwrap();
        assert_eq!(result.code(), Some(codes::MODE_DECLARATION_MISSING));
    }

    #[test]
    fn frozen_mode_denies_even_read_only() {
        let env = PolicyEnv {
            mode_governance_enabled: true,
            ..PolicyEnv::default()
        };
        let declaration = ModeDeclaration {
            mode: GovernanceMode::Frozen,
            limbs: BTreeMap::new(),
        };
        let steps = vec![step("a", true, None)];
        let refs: Vec<&ExecutionStep> = steps.iter().collect();
        let result = check_budget(
            &env,
            &BudgetCheck {
                steps: &refs,
                plan_max_steps: None,
                capabilities: &[],
                declaration: Some(&declaration),
            },
        )
        .unwrap();
        assert_eq!(result.code(), Some(codes::MODE_FROZEN));
    }

    #[test]
    fn write_requires_single_run_approved_and_active_limb() {
        let env = PolicyEnv {
            mode_governance_enabled: true,
            ..PolicyEnv::default()
        };
        let mut limbs = BTreeMap::new();
        limbs.insert("notion.write".to_string(), true);
        let declaration = ModeDeclaration {
            mode: GovernanceMode::SingleRunApproved,
            limbs,
        };
        let steps = vec![step("a", false, None)];
        let refs: Vec<&ExecutionStep> = steps.iter().collect();

        // Active limb: passes.
        let caps = vec!["notion.write".to_string()];
        assert_eq!(
            check_budget(
                &env,
                &BudgetCheck {
                    steps: &refs,
                    plan_max_steps: None,
                    capabilities: &caps,
                    declaration: Some(&declaration),
                },
            ),
            None
        );

        // Inactive limb: denied.
        let caps = vec!["slack.post".to_string()];
        let result = check_budget(
            &env,
            &BudgetCheck {
                steps: &refs,
                plan_max_steps: None,
                capabilities: &caps,
                declaration: Some(&declaration),
            },
        )
        .unwrap();
        assert_eq!(result.code(), Some(codes::LIMB_INACTIVE));
    }

    #[test]
    fn observe_mode_denies_writes_but_allows_reads() {
        let env = PolicyEnv {
            mode_governance_enabled: true,
            ..PolicyEnv::default()
        };
        let declaration = ModeDeclaration {
            mode: GovernanceMode::Observe,
            limbs: BTreeMap::new(),
        };

        let reads = vec![step("a", true, None)];
        let refs: Vec<&ExecutionStep> = reads.iter().collect();
        assert_eq!(
            check_budget(
                &env,
                &BudgetCheck {
                    steps: &refs,
                    plan_max_steps: None,
                    capabilities: &[],
                    declaration: Some(&declaration),
                },
            ),
            None
        );

        let writes = vec![step("a", false, None)];
        let refs: Vec<&ExecutionStep> = writes.iter().collect();
        let result = check_budget(
            &env,
            &BudgetCheck {
                steps: &refs,
                plan_max_steps: None,
                capabilities: &[],
                declaration: Some(&declaration),
            },
        )
        .unwrap();
        assert_eq!(result.code(), Some(codes::LIMB_INACTIVE));
    }
}
