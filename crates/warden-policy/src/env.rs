// env.rs — The environment snapshot.
//
// All policy configuration arrives through environment variables. The
// snapshot is taken once per invocation and passed by reference into the
// evaluator, which never reads the process environment itself — that
// keeps evaluation pure and lets tests construct snapshots directly.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Global autonomy posture.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AutonomyMode {
    /// Autonomy disabled — nothing runs unattended.
    #[default]
    #[serde(rename = "OFF")]
    Off,
    /// Only explicitly read-only steps may run.
    #[serde(rename = "READ_ONLY_AUTONOMY")]
    ReadOnly,
    /// Write-capable steps are proposed, never run without approval.
    #[serde(rename = "PROPOSE_ONLY_AUTONOMY")]
    ProposeOnly,
    /// Write-capable steps run when an approval gate passes, including
    /// via promotion or delegation.
    #[serde(rename = "APPROVAL_GATED_AUTONOMY")]
    ApprovalGated,
}

impl FromStr for AutonomyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OFF" => Ok(AutonomyMode::Off),
            "READ_ONLY_AUTONOMY" => Ok(AutonomyMode::ReadOnly),
            "PROPOSE_ONLY_AUTONOMY" => Ok(AutonomyMode::ProposeOnly),
            "APPROVAL_GATED_AUTONOMY" => Ok(AutonomyMode::ApprovalGated),
            other => Err(format!("unknown autonomy mode '{}'", other)),
        }
    }
}

impl fmt::Display for AutonomyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AutonomyMode::Off => "OFF",
            AutonomyMode::ReadOnly => "READ_ONLY_AUTONOMY",
            AutonomyMode::ProposeOnly => "PROPOSE_ONLY_AUTONOMY",
            AutonomyMode::ApprovalGated => "APPROVAL_GATED_AUTONOMY",
        };
        write!(f, "{}", s)
    }
}

/// One immutable snapshot of the policy environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicyEnv {
    pub autonomy_mode: AutonomyMode,
    pub policy_version: String,
    pub max_steps: Option<u64>,
    pub max_runtime_ms: Option<u64>,
    /// Override label for the step-budget deny code.
    pub budget_deny_code: Option<String>,
    pub max_phases: Option<u64>,
    pub max_total_steps: Option<u64>,
    pub allowed_capabilities: Option<BTreeSet<String>>,
    pub allowed_domains: Option<BTreeSet<String>>,
    /// Uppercased HTTP methods.
    pub allowed_methods: Option<BTreeSet<String>>,
    /// UTC time of day after which execution is denied.
    pub no_exec_after_utc: Option<NaiveTime>,
    /// Glob patterns for the docs-capture lane host allowlist.
    pub docs_capture_allowed_hosts: Option<Vec<String>>,
    /// Glob patterns for the browser-operator lane host allowlist.
    pub browser_operator_allowed_hosts: Option<Vec<String>>,
    /// Production environments gate every write behind approval.
    pub production: bool,
    pub requalification_enabled: bool,
    pub mode_governance_enabled: bool,
    pub promotion_window: usize,
    pub promotion_min_avg_score: f64,
    pub promotion_min_age_days: i64,
    pub max_runs_per_day: Option<u32>,
}

impl Default for PolicyEnv {
    fn default() -> Self {
        Self {
            autonomy_mode: AutonomyMode::Off,
            policy_version: "v1".to_string(),
            max_steps: None,
            max_runtime_ms: None,
            budget_deny_code: None,
            max_phases: None,
            max_total_steps: None,
            allowed_capabilities: None,
            allowed_domains: None,
            allowed_methods: None,
            no_exec_after_utc: None,
            docs_capture_allowed_hosts: None,
            browser_operator_allowed_hosts: None,
            production: false,
            requalification_enabled: false,
            mode_governance_enabled: false,
            promotion_window: 20,
            promotion_min_avg_score: 85.0,
            promotion_min_age_days: 7,
            max_runs_per_day: None,
        }
    }
}

impl PolicyEnv {
    /// Snapshot the process environment.
    pub fn from_env() -> Result<Self, PolicyError> {
        let mut env = Self::default();

        if let Some(mode) = var("AUTONOMY_MODE") {
            env.autonomy_mode =
                mode.parse()
                    .map_err(|expected| PolicyError::InvalidEnvValue {
                        variable: "AUTONOMY_MODE".to_string(),
                        value: mode.clone(),
                        expected,
                    })?;
        }
        if let Some(version) = var("POLICY_VERSION") {
            env.policy_version = version;
        }
        env.max_steps = parse_var("POLICY_MAX_STEPS")?;
        env.max_runtime_ms = parse_var("POLICY_MAX_RUNTIME_MS")?;
        env.budget_deny_code = var("POLICY_BUDGET_DENY_CODE");
        env.max_phases = parse_var("POLICY_MAX_PHASES")?;
        env.max_total_steps = parse_var("POLICY_MAX_TOTAL_STEPS")?;
        env.allowed_capabilities = var("POLICY_ALLOWED_CAPABILITIES").map(|v| split_set(&v));
        env.allowed_domains = var("ALLOWED_DOMAINS").map(|v| split_set(&v));
        env.allowed_methods =
            var("ALLOWED_METHODS").map(|v| split_set(&v.to_uppercase()));
        if let Some(cutoff) = var("POLICY_NO_EXEC_AFTER_UTC") {
            let parsed = NaiveTime::parse_from_str(&cutoff, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(&cutoff, "%H:%M:%S"))
                .map_err(|_| PolicyError::InvalidEnvValue {
                    variable: "POLICY_NO_EXEC_AFTER_UTC".to_string(),
                    value: cutoff.clone(),
                    expected: "HH:MM or HH:MM:SS".to_string(),
                })?;
            env.no_exec_after_utc = Some(parsed);
        }
        env.docs_capture_allowed_hosts =
            var("DOCS_CAPTURE_ALLOWED_HOSTS").map(|v| split_list(&v));
        env.browser_operator_allowed_hosts =
            var("BROWSER_OPERATOR_ALLOWED_HOSTS").map(|v| split_list(&v));
        env.production = var("ENVIRONMENT")
            .or_else(|| var("NODE_ENV"))
            .is_some_and(|v| v == "production");
        env.requalification_enabled = flag("REQUALIFICATION_ENABLED");
        env.mode_governance_enabled = flag("MODE_GOVERNANCE_ENABLED");
        if let Some(window) = parse_var::<usize>("AUTONOMY_PROMOTION_WINDOW")? {
            env.promotion_window = window;
        }
        if let Some(min_avg) = parse_var::<f64>("AUTONOMY_PROMOTION_MIN_AVG_SCORE")? {
            env.promotion_min_avg_score = min_avg;
        }
        if let Some(min_age) = parse_var::<i64>("AUTONOMY_PROMOTION_MIN_AGE_DAYS")? {
            env.promotion_min_age_days = min_age;
        }
        env.max_runs_per_day = parse_var("POLICY_MAX_RUNS_PER_DAY")?;

        Ok(env)
    }

    /// The code used when the step budget denies — env override or the
    /// default label.
    pub fn step_budget_code(&self) -> &str {
        self.budget_deny_code
            .as_deref()
            .unwrap_or(crate::codes::BUDGET_MAX_STEPS_EXCEEDED)
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn flag(name: &str) -> bool {
    var(name).is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, PolicyError> {
    match var(name) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(|_| {
            PolicyError::InvalidEnvValue {
                variable: name.to_string(),
                value,
                expected: std::any::type_name::<T>().to_string(),
            }
        }),
    }
}

fn split_set(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
