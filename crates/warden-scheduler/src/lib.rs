//! # warden-scheduler
//!
//! The time axis of Warden: decides RUN or SKIP for each scheduled job,
//! runs due jobs sequentially as subprocesses with hard wall-clock
//! timeouts, and records a receipt for every decision.
//!
//! Budgets are never re-implemented here — they are passed down to the
//! subprocess as policy environment overrides, and a timed-out subprocess
//! is translated into a deterministic budget denial rather than a crash.

pub mod decision;
pub mod error;
pub mod history;
pub mod job;
pub mod runner;
pub mod schedule;

pub use decision::{decide, window_id, RunDecision};
pub use error::SchedulerError;
pub use history::{HistoryStore, RunReceipt};
pub use job::{JobBudgets, JobRegistry, SchedulerJobDefinition};
pub use runner::{explain_job, run_jobs, RunOutcome, RunnerConfig, SchedulerExplain};
pub use schedule::Schedule;
