// output.rs — CLI output contract.
//
// Every invocation prints exactly one JSON object to stdout and sets a
// matching process exit code. Logs go to stderr. A policy "no" is normal
// output; only broken input and I/O failures become CliError objects —
// and even those are a single JSON object, never a stack trace.

use serde::Serialize;

/// Exit codes. 0 is allow/success; 3 is a policy-denied or budget
/// outcome; 10–12 are unacknowledged-regression enforcement.
pub const EXIT_OK: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_BAD_ARGS: i32 = 2;
pub const EXIT_POLICY_DENIED: i32 = 3;
pub const EXIT_REGRESSION_UNACKED: i32 = 10;
pub const EXIT_REGRESSION_UNACKED_PROPOSE: i32 = 11;
pub const EXIT_REGRESSION_UNACKED_GATED: i32 = 12;

/// A command's output object plus the exit code it implies.
pub struct CliOutput {
    pub json: serde_json::Value,
    pub exit_code: i32,
}

impl CliOutput {
    pub fn new<T: Serialize>(value: &T, exit_code: i32) -> anyhow::Result<Self> {
        Ok(Self {
            json: serde_json::to_value(value)?,
            exit_code,
        })
    }
}

/// Structured error object emitted when a command fails.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub error: String,
    pub message: String,
}

impl CliError {
    pub fn bad_args(message: impl Into<String>) -> (Self, i32) {
        (
            Self {
                error: "BAD_ARGS".to_string(),
                message: message.into(),
            },
            EXIT_BAD_ARGS,
        )
    }

    pub fn internal(message: impl Into<String>) -> (Self, i32) {
        (
            Self {
                error: "CLI_ERROR".to_string(),
                message: message.into(),
            },
            EXIT_ERROR,
        )
    }
}

/// Print one JSON object (2-space indented, trailing newline) to stdout.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        // Serialization of an already-built Value cannot realistically
        // fail; emit a minimal object rather than nothing.
        Err(_) => println!("{{\"error\": \"CLI_ERROR\"}}"),
    }
}
