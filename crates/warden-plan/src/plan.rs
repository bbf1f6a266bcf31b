// plan.rs — ExecutionPlan: the unit of policy evaluation.
//
// A plan is either a flat list of steps or an ordered list of phases,
// never both. Phases materialize into a flat step list before evaluation;
// artifacts produced by earlier phases are owned by the simulation engine,
// not by the evaluator.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::step::ExecutionStep;

/// Budgets a planner may declare on the plan itself. Environment caps
/// still apply; plan budgets only ever tighten.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlanBudgets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_runtime_ms: Option<u64>,
}

/// One phase of a multi-phase plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlanPhase {
    /// Identifier for the phase (e.g., "capture", "apply").
    pub phase_id: String,
    /// Steps belonging to this phase, in order.
    pub steps: Vec<ExecutionStep>,
}

/// An execution plan proposed by an agent.
///
/// Exactly one of `steps` or `phases` must be present. [`ExecutionPlan::parse`]
/// enforces this and rejects duplicate step ids, so downstream code can
/// assume a well-formed plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecutionPlan {
    /// Identifier for this evaluation; approval tokens must match it.
    pub execution_id: String,

    /// Conversation thread that produced the plan, if any.
    #[serde(default, rename = "threadId", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Whether the plan is a dry run (no side effects intended).
    #[serde(default)]
    pub dry_run: bool,

    /// Capabilities the plan claims to need. Stored sorted and deduplicated.
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,

    /// Version of the agent that produced the plan, when pinned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,

    /// Budgets declared by the planner, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budgets: Option<PlanBudgets>,

    /// Flat step list. Mutually exclusive with `phases`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<ExecutionStep>>,

    /// Phased step list. Mutually exclusive with `steps`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phases: Option<Vec<PlanPhase>>,
}

impl ExecutionPlan {
    /// Parse and validate a plan from JSON.
    ///
    /// Fails fast with a typed [`PlanError`] on malformed JSON, on a plan
    /// carrying both or neither of `steps`/`phases`, and on duplicate
    /// step ids.
    pub fn parse(json: &str) -> Result<Self, PlanError> {
        let plan: ExecutionPlan = serde_json::from_str(json)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Validate the steps/phases invariants without reparsing.
    pub fn validate(&self) -> Result<(), PlanError> {
        match (&self.steps, &self.phases) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => {
                return Err(PlanError::AmbiguousBody {
                    execution_id: self.execution_id.clone(),
                })
            }
        }

        let mut seen = HashSet::new();
        for step in self.materialize() {
            if !seen.insert(step.step_id.clone()) {
                return Err(PlanError::DuplicateStepId {
                    execution_id: self.execution_id.clone(),
                    step_id: step.step_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// The flat, ordered step list this plan materializes to.
    ///
    /// For phased plans this is the concatenation of phase steps in phase
    /// order. Evaluation always operates on this view.
    pub fn materialize(&self) -> Vec<&ExecutionStep> {
        match (&self.steps, &self.phases) {
            (Some(steps), _) => steps.iter().collect(),
            (None, Some(phases)) => phases.iter().flat_map(|p| p.steps.iter()).collect(),
            (None, None) => Vec::new(),
        }
    }

    /// Number of phases (1 for a flat plan).
    pub fn phase_count(&self) -> usize {
        match &self.phases {
            Some(phases) => phases.len(),
            None => 1,
        }
    }

    /// Total step count across all phases.
    pub fn step_count(&self) -> usize {
        self.materialize().len()
    }

    /// Count of write-capable steps.
    pub fn write_step_count(&self) -> usize {
        self.materialize().iter().filter(|s| s.is_write()).count()
    }

    /// Sorted, deduplicated list of URL hosts touched by the plan's steps.
    pub fn domains(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .materialize()
            .iter()
            .filter_map(|s| s.url_host().map(str::to_string))
            .collect();
        hosts.sort();
        hosts.dedup();
        hosts
    }
}
