// policy.rs — Policy subcommands: simulate, score, baseline, promotions, explain.

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use warden_plan::{CommandLine, ExecutionPlan};
use warden_policy::{
    explain, simulate, AutonomyMode, DomainOverlayRegistry, ModeDeclaration, PolicyEnv,
    PolicySimulation,
};
use warden_promotion::{recommend, PromotionSettings};
use warden_trust::fingerprint::command_slug;
use warden_trust::{
    compare_confidence, score_features, AckStore, BaselineStore, CheckStore,
    ConfidenceBaselineRecord, ConfidenceFeatures, FsKvRepo, RegressionAckRecord,
    RegressionCheckRecord, TrustError, DEFAULT_TOLERANCE,
};

use crate::config::EngineConfig;
use crate::output::{
    CliError, CliOutput, EXIT_ERROR, EXIT_OK, EXIT_POLICY_DENIED, EXIT_REGRESSION_UNACKED,
    EXIT_REGRESSION_UNACKED_GATED, EXIT_REGRESSION_UNACKED_PROPOSE,
};
use crate::stores::FsTrustDirectory;

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// Replay a command's plan through the policy engine without executing.
    Simulate {
        /// The command to simulate.
        command: String,
        /// Plan JSON file (defaults to the plans/ artifact for the command).
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Evaluation clock, RFC 3339 (defaults to now).
        #[arg(long)]
        at: Option<String>,
        /// Autonomy mode override.
        #[arg(long)]
        autonomy: Option<String>,
        /// Treat the plan's execution id as approved.
        #[arg(long)]
        approval: Option<bool>,
        /// Domain id for overlay resolution.
        #[arg(long)]
        domain: Option<String>,
    },
    /// Score a command's plan and record a regression check.
    Score {
        command: String,
        #[arg(long)]
        plan: Option<PathBuf>,
        #[arg(long)]
        at: Option<String>,
        /// Execution id for the check record (defaults to a fresh id).
        #[arg(long)]
        execution_id: Option<String>,
        /// Compare against the stored baseline.
        #[arg(long)]
        compare: bool,
        /// Acknowledge a severe regression.
        #[arg(long)]
        ack_regression: bool,
    },
    /// Capture a confidence baseline for a command.
    Baseline {
        command: String,
        #[arg(long)]
        plan: Option<PathBuf>,
        #[arg(long)]
        at: Option<String>,
        /// Add a timestamped variant when a baseline already exists.
        #[arg(long = "override")]
        override_existing: bool,
    },
    /// Report promotion candidates from regression-check history.
    Promotions {
        #[arg(long)]
        at: Option<String>,
    },
    /// Explain a policy reason code.
    Explain {
        /// The code to explain (e.g., CONFIDENCE_TOO_LOW).
        code: String,
    },
}

pub fn execute(cmd: &PolicyCommands, config: &EngineConfig) -> anyhow::Result<CliOutput> {
    match cmd {
        PolicyCommands::Simulate {
            command,
            plan,
            at,
            autonomy,
            approval,
            domain,
        } => {
            let now = parse_at(at.as_deref())?;
            let env = match load_env(autonomy.as_deref()) {
                Ok(env) => env,
                Err(output) => return output,
            };
            let command_line = match parse_command(command) {
                Ok(c) => c,
                Err(output) => return output,
            };
            let plan = match resolve_plan(config, &command_line, plan.as_deref()) {
                Ok(p) => p,
                Err(output) => return output,
            };

            let approved = approval
                .unwrap_or(false)
                .then(|| plan.execution_id.clone());
            let sim = run_simulation(
                config,
                &plan,
                &command_line,
                &env,
                now,
                approved.as_deref(),
                domain.as_deref(),
            )?;

            let exit_code = if sim.decision == "DENIED" {
                EXIT_POLICY_DENIED
            } else {
                EXIT_OK
            };
            CliOutput::new(&sim, exit_code)
        }

        PolicyCommands::Score {
            command,
            plan,
            at,
            execution_id,
            compare,
            ack_regression,
        } => {
            let now = parse_at(at.as_deref())?;
            let env = match load_env(None) {
                Ok(env) => env,
                Err(output) => return output,
            };
            let command_line = match parse_command(command) {
                Ok(c) => c,
                Err(output) => return output,
            };
            let mut plan = match resolve_plan(config, &command_line, plan.as_deref()) {
                Ok(p) => p,
                Err(output) => return output,
            };

            // Each score run is its own execution unless pinned.
            plan.execution_id = execution_id
                .clone()
                .unwrap_or_else(|| format!("exec-{}", Uuid::new_v4()));

            let sim = run_simulation(config, &plan, &command_line, &env, now, None, None)?;
            let approval_required = sim.decision == "APPROVAL_REQUIRED";
            let allowed = sim.decision == "ALLOWED";

            let features = ConfidenceFeatures::extract(
                &plan,
                approval_required,
                env.max_runtime_ms,
                env.max_steps.is_some() || env.max_runtime_ms.is_some(),
                env.allowed_capabilities.as_ref(),
            );
            let scored = score_features(&features);

            let baselines = BaselineStore::new(FsKvRepo::open(&config.baseline_dir)?);
            let acks = AckStore::new(FsKvRepo::open(&config.acks_dir)?);
            let baseline = if *compare || *ack_regression {
                baselines.latest(&sim.confidence_fingerprint)?
            } else {
                None
            };
            let regression = baseline
                .as_ref()
                .map(|b| compare_confidence(b, &scored, DEFAULT_TOLERANCE));

            // The check record is this evaluation's audit artifact.
            let checks = CheckStore::new(FsKvRepo::open(&config.checks_dir)?);
            let check = RegressionCheckRecord {
                execution_id: plan.execution_id.clone(),
                command: command_line.normalized(),
                fingerprint: sim.confidence_fingerprint.clone(),
                promotion_fingerprint: sim.promotion_fingerprint.clone(),
                score: scored.score,
                band: scored.band,
                action: scored.action,
                allowed,
                regressed: regression.as_ref().is_some_and(|r| r.regressed),
                evaluated_at: now,
            };
            checks.write(&check)?;

            let mut acknowledged = false;
            if *ack_regression {
                if let (Some(baseline), Some(report)) = (&baseline, &regression) {
                    if report.regressed {
                        acks.write(&RegressionAckRecord {
                            fingerprint: sim.confidence_fingerprint.clone(),
                            score_before: baseline.score,
                            score_after: scored.score,
                            acknowledged_at: now,
                        })?;
                        acknowledged = true;
                    }
                }
            }

            let exit_code = regression_exit_code(
                &env,
                &baseline,
                &regression,
                &acks,
                &sim.confidence_fingerprint,
                acknowledged,
            )?;

            CliOutput::new(
                &json!({
                    "execution_id": plan.execution_id,
                    "command": command_line.normalized(),
                    "fingerprint": sim.confidence_fingerprint,
                    "score": scored,
                    "decision": sim.decision,
                    "regression": regression,
                    "acknowledged": acknowledged,
                }),
                exit_code,
            )
        }

        PolicyCommands::Baseline {
            command,
            plan,
            at,
            override_existing,
        } => {
            let now = parse_at(at.as_deref())?;
            let env = match load_env(None) {
                Ok(env) => env,
                Err(output) => return output,
            };
            let command_line = match parse_command(command) {
                Ok(c) => c,
                Err(output) => return output,
            };
            let plan = match resolve_plan(config, &command_line, plan.as_deref()) {
                Ok(p) => p,
                Err(output) => return output,
            };

            let sim = run_simulation(config, &plan, &command_line, &env, now, None, None)?;
            let features = ConfidenceFeatures::extract(
                &plan,
                sim.decision == "APPROVAL_REQUIRED",
                env.max_runtime_ms,
                env.max_steps.is_some() || env.max_runtime_ms.is_some(),
                env.allowed_capabilities.as_ref(),
            );
            let scored = score_features(&features);

            let record = ConfidenceBaselineRecord::from_score(
                &sim.confidence_fingerprint,
                &command_line.normalized(),
                &env.policy_version,
                &env.autonomy_mode.to_string(),
                plan.required_capabilities.iter().cloned().collect(),
                &scored,
                now,
            );

            let baselines = BaselineStore::new(FsKvRepo::open(&config.baseline_dir)?);
            match baselines.write(&record, *override_existing) {
                Ok(key) => CliOutput::new(
                    &json!({"wrote": true, "key": key, "baseline": record}),
                    EXIT_OK,
                ),
                Err(TrustError::BaselineExists { fingerprint }) => CliOutput::new(
                    &json!({
                        "wrote": false,
                        "baseline": baselines.latest(&fingerprint)?,
                        "message": "baseline already exists; pass --override to add a variant",
                    }),
                    EXIT_ERROR,
                ),
                Err(e) => Err(e.into()),
            }
        }

        PolicyCommands::Promotions { at } => {
            let now = parse_at(at.as_deref())?;
            let env = match load_env(None) {
                Ok(env) => env,
                Err(output) => return output,
            };
            let checks = CheckStore::new(FsKvRepo::open(&config.checks_dir)?);
            let ledger =
                warden_promotion::PromotionLedger::load_or_default(&config.promotions_file)?;
            let settings = PromotionSettings {
                window_runs: env.promotion_window,
                min_avg_score: env.promotion_min_avg_score,
                min_age_days: env.promotion_min_age_days,
            };

            let candidates = recommend(&checks.list()?, &ledger, &settings, now);
            CliOutput::new(&json!({"candidates": candidates}), EXIT_OK)
        }

        PolicyCommands::Explain { code } => match explain(code) {
            Some(text) => CliOutput::new(&json!({"code": code, "explanation": text}), EXIT_OK),
            None => {
                let (err, exit) = CliError::bad_args(format!("unknown policy code '{}'", code));
                CliOutput::new(&err, exit)
            }
        },
    }
}

/// Parse the --at flag, defaulting to the current instant.
fn parse_at(at: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match at {
        None => Ok(Utc::now()),
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map(|t| t.with_timezone(&Utc))
            .with_context(|| format!("--at '{}' is not an RFC 3339 timestamp", ts)),
    }
}

/// Snapshot the environment, applying a CLI autonomy-mode override.
fn load_env(autonomy: Option<&str>) -> Result<PolicyEnv, anyhow::Result<CliOutput>> {
    let mut env = match PolicyEnv::from_env() {
        Ok(env) => env,
        Err(e) => {
            let (err, exit) = CliError::bad_args(e.to_string());
            return Err(CliOutput::new(&err, exit));
        }
    };
    if let Some(mode) = autonomy {
        match mode.parse::<AutonomyMode>() {
            Ok(mode) => env.autonomy_mode = mode,
            Err(reason) => {
                let (err, exit) = CliError::bad_args(reason);
                return Err(CliOutput::new(&err, exit));
            }
        }
    }
    Ok(env)
}

fn parse_command(command: &str) -> Result<CommandLine, anyhow::Result<CliOutput>> {
    CommandLine::parse(command).map_err(|e| {
        let (err, exit) = CliError::bad_args(e.to_string());
        CliOutput::new(&err, exit)
    })
}

/// Load the plan: an explicit --plan file, or the plans/ artifact keyed
/// by the normalized command.
fn resolve_plan(
    config: &EngineConfig,
    command: &CommandLine,
    plan_path: Option<&std::path::Path>,
) -> Result<ExecutionPlan, anyhow::Result<CliOutput>> {
    let path = match plan_path {
        Some(path) => path.to_path_buf(),
        None => config
            .plans_dir
            .join(format!("{}.json", command_slug(&command.normalized()))),
    };

    let bad_args = |message: String| {
        let (err, exit) = CliError::bad_args(message);
        CliOutput::new(&err, exit)
    };

    if !path.exists() {
        return Err(bad_args(format!(
            "no plan found at '{}'; pass --plan or store a plan artifact for the command",
            path.display()
        )));
    }
    let json = match std::fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) => return Err(bad_args(format!("cannot read '{}': {}", path.display(), e))),
    };
    ExecutionPlan::parse(&json)
        .map_err(|e| bad_args(format!("malformed plan '{}': {}", path.display(), e)))
}

/// Evaluate the plan with the full file-backed trust directory.
fn run_simulation(
    config: &EngineConfig,
    plan: &ExecutionPlan,
    command: &CommandLine,
    env: &PolicyEnv,
    now: DateTime<Utc>,
    approved_execution_id: Option<&str>,
    domain_id: Option<&str>,
) -> anyhow::Result<PolicySimulation> {
    let trust = FsTrustDirectory::open(config)?;
    let overlays = DomainOverlayRegistry::load_or_default(&config.overlays_file)?;
    let declaration = if env.mode_governance_enabled {
        ModeDeclaration::load(&config.mode_file)?
    } else {
        None
    };

    Ok(simulate(
        plan,
        &command.normalized(),
        env,
        &overlays,
        declaration.as_ref(),
        &trust,
        now,
        approved_execution_id,
        domain_id,
    ))
}

/// Exit code for `score --compare`: unacknowledged severe regressions
/// block by mode (10 generic/CI, 11 propose-only, 12 approval-gated).
fn regression_exit_code(
    env: &PolicyEnv,
    baseline: &Option<ConfidenceBaselineRecord>,
    regression: &Option<warden_trust::RegressionReport>,
    acks: &AckStore<FsKvRepo>,
    fingerprint: &str,
    just_acknowledged: bool,
) -> anyhow::Result<i32> {
    let Some(report) = regression else {
        return Ok(EXIT_OK);
    };
    if !report.requires_ack || just_acknowledged {
        return Ok(EXIT_OK);
    }

    // A standing ack newer than the baseline capture also satisfies it.
    if let (Some(baseline), Some(ack)) = (baseline, acks.latest(fingerprint)?) {
        if ack.acknowledged_at >= baseline.captured_at {
            return Ok(EXIT_OK);
        }
    }

    Ok(match env.autonomy_mode {
        AutonomyMode::ProposeOnly => EXIT_REGRESSION_UNACKED_PROPOSE,
        AutonomyMode::ApprovalGated => EXIT_REGRESSION_UNACKED_GATED,
        _ => EXIT_REGRESSION_UNACKED,
    })
}
