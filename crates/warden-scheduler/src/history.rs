// history.rs — Run receipts and their store.
//
// Every run or skip leaves one receipt file behind. Receipts are audit
// artifacts: written once, never edited. Two runs of the same window are
// two distinct receipts sharing one window_id — that is what makes
// re-running a window auditable instead of destructive.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use warden_policy::PolicyResult;

use crate::error::SchedulerError;

/// One recorded run or skip.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReceipt {
    pub job_id: String,
    pub window_id: String,
    /// "RUN" or "SKIP".
    pub action: String,
    pub primary_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// A policy denial synthesized from the run (e.g., a timeout).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyResult>,
}

/// File-backed receipt store under `runs/scheduler/`.
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    /// Open the store, creating its directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| SchedulerError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Append a receipt. Each receipt gets its own uniquely-named file.
    pub fn append(&self, receipt: &RunReceipt) -> Result<PathBuf, SchedulerError> {
        let name = format!(
            "{}.{}.{}.json",
            receipt.job_id,
            receipt.started_at.format("%Y%m%dT%H%M%S%3fZ"),
            Uuid::new_v4()
        );
        let path = self.dir.join(name);
        let mut json = serde_json::to_string_pretty(receipt).map_err(|source| {
            SchedulerError::Malformed {
                path: path.display().to_string(),
                source,
            }
        })?;
        json.push('\n');
        fs::write(&path, json).map_err(|source| SchedulerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(
            job_id = %receipt.job_id,
            window_id = %receipt.window_id,
            action = %receipt.action,
            "receipt recorded"
        );
        Ok(path)
    }

    /// List receipts, newest first, optionally filtered.
    pub fn list(
        &self,
        job_id: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<RunReceipt>, SchedulerError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| SchedulerError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;

        let mut receipts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SchedulerError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "json") {
                continue;
            }
            let json = fs::read_to_string(&path).map_err(|source| SchedulerError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let receipt: RunReceipt =
                serde_json::from_str(&json).map_err(|source| SchedulerError::Malformed {
                    path: path.display().to_string(),
                    source,
                })?;

            if let Some(id) = job_id {
                if receipt.job_id != id {
                    continue;
                }
            }
            if let Some(since) = since {
                if receipt.started_at < since {
                    continue;
                }
            }
            receipts.push(receipt);
        }

        receipts.sort_by(|a, b| {
            (b.started_at, b.window_id.as_str()).cmp(&(a.started_at, a.window_id.as_str()))
        });
        if let Some(limit) = limit {
            receipts.truncate(limit);
        }
        Ok(receipts)
    }

    /// How many times a job actually ran on the UTC date of `at`.
    pub fn runs_on_day(&self, job_id: &str, at: DateTime<Utc>) -> Result<usize, SchedulerError> {
        let receipts = self.list(Some(job_id), None, None)?;
        Ok(receipts
            .iter()
            .filter(|r| r.action == "RUN")
            .filter(|r| {
                let d = r.started_at;
                (d.year(), d.ordinal()) == (at.year(), at.ordinal())
            })
            .count())
    }
}
