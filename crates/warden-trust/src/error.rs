// error.rs — Error types for the trust subsystem.

use thiserror::Error;

/// Errors from fingerprint stores and confidence persistence.
#[derive(Debug, Error)]
pub enum TrustError {
    /// Filesystem access failed.
    #[error("store I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored record could not be serialized or deserialized.
    #[error("record serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    /// A baseline already exists for this fingerprint and no override
    /// was requested.
    #[error("baseline already exists for fingerprint '{fingerprint}' (use override to add a variant)")]
    BaselineExists { fingerprint: String },

    /// A store key contained characters that cannot form a file name.
    #[error("invalid store key '{key}'")]
    InvalidKey { key: String },
}
