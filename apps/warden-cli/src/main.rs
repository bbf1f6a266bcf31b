//! # warden-cli
//!
//! Command-line interface for the Warden authorization engine:
//! - `warden policy simulate/score/baseline/promotions/explain` — evaluate
//!   and trust-track command plans without executing them
//! - `warden scheduler run/explain/history` — the time-axis engine
//!
//! Contract: every invocation prints exactly one JSON object to stdout
//! and exits with a code mirroring the outcome. Logs go to stderr.

mod commands;
mod config;
mod output;
mod stores;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::EngineConfig;
use output::{print_json, CliError, CliOutput};

/// Warden — deterministic authorization for agent actions.
#[derive(Parser)]
#[command(name = "warden", version, about)]
struct Cli {
    /// Root directory for engine state (runs/, jobs/, policy/, plans/).
    #[arg(long, default_value = ".")]
    state_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate and trust-track command plans.
    Policy {
        #[command(subcommand)]
        command: commands::policy::PolicyCommands,
    },
    /// Decide and run scheduled jobs.
    Scheduler {
        #[command(subcommand)]
        command: commands::scheduler::SchedulerCommands,
    },
}

fn main() {
    // Logs to stderr so stdout stays a single JSON object.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::for_root(&cli.state_root);

    let result = match &cli.command {
        Commands::Policy { command } => commands::policy::execute(command, &config),
        Commands::Scheduler { command } => commands::scheduler::execute(command, &config),
    };

    // Uncaught errors are downgraded to a structured object — never a
    // stack trace, never partial output.
    let CliOutput { json, exit_code } = result.unwrap_or_else(|e| {
        let (err, exit) = CliError::internal(format!("{:#}", e));
        CliOutput {
            json: serde_json::to_value(&err)
                .unwrap_or_else(|_| serde_json::json!({"error": "CLI_ERROR"})),
            exit_code: exit,
        }
    });

    print_json(&json);
    std::process::exit(exit_code);
}
