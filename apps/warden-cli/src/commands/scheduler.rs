// scheduler.rs — Scheduler subcommands: run, explain, history.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use serde_json::json;

use warden_policy::PolicyEnv;
use warden_scheduler::{
    explain_job, run_jobs, HistoryStore, JobRegistry, RunnerConfig, SchedulerError,
};

use crate::config::EngineConfig;
use crate::output::{CliError, CliOutput, EXIT_OK, EXIT_POLICY_DENIED};

/// Runner defaults from the policy environment: POLICY_MAX_RUNTIME_MS
/// and POLICY_MAX_RUNS_PER_DAY apply to jobs that declare no budget of
/// their own.
fn runner_config() -> anyhow::Result<RunnerConfig> {
    let env = PolicyEnv::from_env()?;
    let mut config = RunnerConfig::default();
    if let Some(cap) = env.max_runtime_ms {
        config.default_timeout_ms = cap;
    }
    config.default_max_runs_per_day = env.max_runs_per_day;
    Ok(config)
}

#[derive(Subcommand)]
pub enum SchedulerCommands {
    /// Run due jobs, or one job by id (manual trigger).
    Run {
        /// Job id for a manual trigger; omit to sweep all due jobs.
        job_id: Option<String>,
        /// Evaluation clock, RFC 3339 (defaults to now).
        #[arg(long)]
        at: Option<String>,
    },
    /// Reproduce a job's RUN/SKIP trace without executing anything.
    Explain {
        job_id: String,
        #[arg(long)]
        at: Option<String>,
    },
    /// Show recorded run receipts.
    History {
        /// Restrict to one job.
        job_id: Option<String>,
        /// Maximum receipts to show.
        #[arg(long)]
        limit: Option<usize>,
        /// Only receipts at or after this RFC 3339 timestamp.
        #[arg(long)]
        since: Option<String>,
    },
}

pub fn execute(cmd: &SchedulerCommands, config: &EngineConfig) -> anyhow::Result<CliOutput> {
    let registry = JobRegistry::load_or_default(&config.jobs_registry)?;
    let history = HistoryStore::open(&config.scheduler_dir)?;

    match cmd {
        SchedulerCommands::Run { job_id, at } => {
            let at = parse_at(at.as_deref())?;
            let outcome = match run_jobs(
                &registry,
                &history,
                &runner_config()?,
                job_id.as_deref(),
                at,
            ) {
                Ok(outcome) => outcome,
                Err(SchedulerError::UnknownJob { job_id }) => {
                    let (err, exit) =
                        CliError::bad_args(format!("unknown job '{}'", job_id));
                    return CliOutput::new(&err, exit);
                }
                Err(e) => return Err(e.into()),
            };

            // Any policy/budget denial in the sweep surfaces as exit 3.
            let denied = outcome
                .receipts
                .iter()
                .any(|r| r.policy.is_some() || (r.action == "RUN" && r.exit_code != Some(0)));
            let exit_code = if denied { EXIT_POLICY_DENIED } else { EXIT_OK };

            CliOutput::new(
                &json!({"ran": outcome.ran, "receipts": outcome.receipts}),
                exit_code,
            )
        }

        SchedulerCommands::Explain { job_id, at } => {
            let at = parse_at(at.as_deref())?;
            match explain_job(&registry, &history, &runner_config()?, job_id, at) {
                Ok(explain) => CliOutput::new(&explain, EXIT_OK),
                Err(SchedulerError::UnknownJob { job_id }) => {
                    let (err, exit) =
                        CliError::bad_args(format!("unknown job '{}'", job_id));
                    CliOutput::new(&err, exit)
                }
                Err(e) => Err(e.into()),
            }
        }

        SchedulerCommands::History {
            job_id,
            limit,
            since,
        } => {
            let since = match since {
                None => None,
                Some(ts) => Some(
                    DateTime::parse_from_rfc3339(ts)
                        .map(|t| t.with_timezone(&Utc))
                        .with_context(|| {
                            format!("--since '{}' is not an RFC 3339 timestamp", ts)
                        })?,
                ),
            };
            let receipts = history.list(job_id.as_deref(), since, *limit)?;
            CliOutput::new(&json!({"receipts": receipts}), EXIT_OK)
        }
    }
}

fn parse_at(at: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match at {
        None => Ok(Utc::now()),
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map(|t| t.with_timezone(&Utc))
            .with_context(|| format!("--at '{}' is not an RFC 3339 timestamp", ts)),
    }
}
