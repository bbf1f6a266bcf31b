// job.rs — Scheduled job definitions and the registry.
//
// `jobs/registry.json` is a plain array of job definitions: static
// per-deployment configuration that the engine never mutates.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::schedule::Schedule;

/// Budgets one job may consume per run or per day.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobBudgets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_runtime_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_runs_per_day: Option<u32>,
}

/// One scheduled job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerJobDefinition {
    pub job_id: String,
    pub schedule: Schedule,
    /// The command the job runs, evaluated by the same policy engine as
    /// interactive commands.
    pub command: String,
    /// Autonomy mode override for the run, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub budgets: JobBudgets,
    #[serde(default)]
    pub paused: bool,
}

/// The loaded job registry.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    jobs: Vec<SchedulerJobDefinition>,
}

impl JobRegistry {
    /// Load a registry file. A missing file is an empty registry.
    pub fn load_or_default(path: &Path) -> Result<Self, SchedulerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).map_err(|source| SchedulerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let jobs: Vec<SchedulerJobDefinition> =
            serde_json::from_str(&json).map_err(|source| SchedulerError::Malformed {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self { jobs })
    }

    /// All jobs, in registry order.
    pub fn jobs(&self) -> &[SchedulerJobDefinition] {
        &self.jobs
    }

    /// Look up one job by id.
    pub fn get(&self, job_id: &str) -> Result<&SchedulerJobDefinition, SchedulerError> {
        self.jobs
            .iter()
            .find(|j| j.job_id == job_id)
            .ok_or_else(|| SchedulerError::UnknownJob {
                job_id: job_id.to_string(),
            })
    }
}
