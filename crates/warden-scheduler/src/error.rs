// error.rs — Error types for the scheduler.

use thiserror::Error;

/// Errors from schedule parsing, the job registry, and the runner.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A schedule expression did not have exactly five fields.
    #[error("schedule '{expr}' must have 5 fields (minute hour day-of-month month day-of-week), found {found}")]
    WrongFieldCount { expr: String, found: usize },

    /// One field of a schedule expression did not parse.
    #[error("invalid {field} field '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// The job registry file could not be read.
    #[error("job registry I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The job registry file held malformed JSON.
    #[error("malformed job registry '{path}': {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// No job with the requested id exists.
    #[error("unknown job '{job_id}'")]
    UnknownJob { job_id: String },

    /// Spawning a job subprocess failed.
    #[error("failed to spawn job '{job_id}': {source}")]
    SpawnFailed {
        job_id: String,
        #[source]
        source: std::io::Error,
    },
}
