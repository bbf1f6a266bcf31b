// runner.rs — Sequential execution of due jobs.
//
// Each runnable job becomes one subprocess with a hard wall-clock
// timeout. Budgets are handed to the subprocess as policy environment
// overrides (POLICY_MAX_STEPS / POLICY_MAX_RUNTIME_MS), so the same
// engine that evaluates interactive commands enforces them — the runner
// never re-implements a budget check. A timeout is translated into a
// deterministic BUDGET_EXCEEDED denial receipt, not a crash.

use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use warden_policy::{codes, PolicyResult};

use crate::decision::{decide, window_id, RunDecision};
use crate::error::SchedulerError;
use crate::history::{HistoryStore, RunReceipt};
use crate::job::{JobRegistry, SchedulerJobDefinition};

/// Default wall-clock timeout when neither the job nor the environment
/// sets one: five minutes.
const DEFAULT_TIMEOUT_MS: u64 = 300_000;

/// How often the runner polls a child process.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runner configuration.
pub struct RunnerConfig {
    /// Shell used to execute job commands.
    pub shell: String,
    /// Fallback runtime cap when a job declares none
    /// (POLICY_MAX_RUNTIME_MS, else five minutes).
    pub default_timeout_ms: u64,
    /// Fallback daily run cap when a job declares none
    /// (POLICY_MAX_RUNS_PER_DAY).
    pub default_max_runs_per_day: Option<u32>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_max_runs_per_day: None,
        }
    }
}

/// Result of one scheduler sweep or manual trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunOutcome {
    /// How many jobs actually ran.
    pub ran: usize,
    pub receipts: Vec<RunReceipt>,
}

/// The dry trace `scheduler explain` serves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerExplain {
    pub job_id: String,
    pub window_id: String,
    pub action: String,
    pub primary_reason: String,
    pub schedule: String,
    pub due: bool,
    pub paused: bool,
    pub runs_today: usize,
    pub max_runs_per_day: Option<u32>,
}

/// Run due jobs (or one manually-triggered job) sequentially.
///
/// `manual_job` is the explicit job id from the command line; when set,
/// only that job is considered and its schedule window is bypassed.
pub fn run_jobs(
    registry: &JobRegistry,
    history: &HistoryStore,
    config: &RunnerConfig,
    manual_job: Option<&str>,
    at: DateTime<Utc>,
) -> Result<RunOutcome, SchedulerError> {
    let jobs: Vec<&SchedulerJobDefinition> = match manual_job {
        Some(job_id) => vec![registry.get(job_id)?],
        None => registry.jobs().iter().collect(),
    };

    let mut receipts = Vec::new();
    let mut ran = 0;

    for job in jobs {
        let window = window_id(&job.job_id, at);
        let decision = decide(&job.schedule, at, manual_job.is_some(), job.paused);

        let receipt = match decision {
            RunDecision::Skip { reason } => {
                // Unattended skips for not-due jobs are not receipted —
                // only decisions about due or paused windows are.
                if reason == codes::JOB_NOT_DUE {
                    continue;
                }
                RunReceipt {
                    job_id: job.job_id.clone(),
                    window_id: window,
                    action: "SKIP".to_string(),
                    primary_reason: reason,
                    exit_code: None,
                    started_at: Utc::now(),
                    finished_at: None,
                    policy: None,
                }
            }
            RunDecision::Run { reason } => {
                // Daily run budget is enforced from history before spawning.
                if let Some(cap) = job
                    .budgets
                    .max_runs_per_day
                    .or(config.default_max_runs_per_day)
                {
                    let today = history.runs_on_day(&job.job_id, at)?;
                    if today as u32 >= cap {
                        let receipt = RunReceipt {
                            job_id: job.job_id.clone(),
                            window_id: window,
                            action: "SKIP".to_string(),
                            primary_reason: codes::BUDGET_MAX_RUNS_PER_DAY.to_string(),
                            exit_code: None,
                            started_at: Utc::now(),
                            finished_at: None,
                            policy: Some(PolicyResult::denied(
                                codes::BUDGET_MAX_RUNS_PER_DAY,
                                format!("job already ran {} time(s) today, cap is {}", today, cap),
                            )),
                        };
                        history.append(&receipt)?;
                        receipts.push(receipt);
                        continue;
                    }
                }

                ran += 1;
                execute_job(job, config, &window, reason)?
            }
        };

        history.append(&receipt)?;
        receipts.push(receipt);
    }

    Ok(RunOutcome { ran, receipts })
}

/// Spawn one job subprocess and wait with a hard wall-clock timeout.
fn execute_job(
    job: &SchedulerJobDefinition,
    config: &RunnerConfig,
    window: &str,
    reason: String,
) -> Result<RunReceipt, SchedulerError> {
    let timeout_ms = job
        .budgets
        .max_runtime_ms
        .unwrap_or(config.default_timeout_ms);
    let started_at = Utc::now();

    info!(job_id = %job.job_id, window, timeout_ms, "spawning job");

    let mut command = Command::new(&config.shell);
    command
        .arg("-c")
        .arg(&job.command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    // Budgets flow down as policy environment overrides.
    if let Some(max_steps) = job.budgets.max_steps {
        command.env("POLICY_MAX_STEPS", max_steps.to_string());
    }
    command.env("POLICY_MAX_RUNTIME_MS", timeout_ms.to_string());
    if let Some(mode) = &job.mode {
        command.env("AUTONOMY_MODE", mode);
    }

    let mut child = command.spawn().map_err(|source| SchedulerError::SpawnFailed {
        job_id: job.job_id.clone(),
        source,
    })?;

    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let exit_code = status.code();
                return Ok(RunReceipt {
                    job_id: job.job_id.clone(),
                    window_id: window.to_string(),
                    action: "RUN".to_string(),
                    primary_reason: reason,
                    exit_code,
                    started_at,
                    finished_at: Some(Utc::now()),
                    policy: None,
                });
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    warn!(job_id = %job.job_id, timeout_ms, "job timed out; killing");
                    // Best effort: the child may have exited in the meantime.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Ok(RunReceipt {
                        job_id: job.job_id.clone(),
                        window_id: window.to_string(),
                        action: "RUN".to_string(),
                        primary_reason: codes::BUDGET_EXCEEDED.to_string(),
                        exit_code: None,
                        started_at,
                        finished_at: Some(Utc::now()),
                        policy: Some(PolicyResult::denied(
                            codes::BUDGET_EXCEEDED,
                            format!("job exceeded its {}ms runtime budget", timeout_ms),
                        )),
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                return Err(SchedulerError::SpawnFailed {
                    job_id: job.job_id.clone(),
                    source,
                })
            }
        }
    }
}

/// Reproduce the decision trace for one job without executing anything.
pub fn explain_job(
    registry: &JobRegistry,
    history: &HistoryStore,
    config: &RunnerConfig,
    job_id: &str,
    at: DateTime<Utc>,
) -> Result<SchedulerExplain, SchedulerError> {
    let job = registry.get(job_id)?;
    let due = job.schedule.is_due(at);
    let runs_today = history.runs_on_day(job_id, at)?;

    // The explain trace mirrors an unattended sweep's decision, including
    // the daily budget.
    let decision = decide(&job.schedule, at, false, job.paused);
    let (action, primary_reason) = match &decision {
        RunDecision::Run { reason } => {
            if let Some(cap) = job
                .budgets
                .max_runs_per_day
                .or(config.default_max_runs_per_day)
            {
                if runs_today as u32 >= cap {
                    (
                        "SKIP".to_string(),
                        codes::BUDGET_MAX_RUNS_PER_DAY.to_string(),
                    )
                } else {
                    ("RUN".to_string(), reason.clone())
                }
            } else {
                ("RUN".to_string(), reason.clone())
            }
        }
        RunDecision::Skip { reason } => ("SKIP".to_string(), reason.clone()),
    };

    Ok(SchedulerExplain {
        job_id: job.job_id.clone(),
        window_id: window_id(job_id, at),
        action,
        primary_reason,
        schedule: job.schedule.expr().to_string(),
        due,
        paused: job.paused,
        runs_today,
        max_runs_per_day: job.budgets.max_runs_per_day.or(config.default_max_runs_per_day),
    })
}
