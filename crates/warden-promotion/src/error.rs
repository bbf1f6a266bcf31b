// error.rs — Error types for the promotion subsystem.

use thiserror::Error;

/// Errors from promotion/requalification/delegation persistence.
#[derive(Debug, Error)]
pub enum PromotionError {
    /// Reading or writing a registry file failed.
    #[error("registry I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A registry file held malformed JSON.
    #[error("malformed registry file '{path}': {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
