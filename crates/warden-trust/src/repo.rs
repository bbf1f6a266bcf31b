// repo.rs — Injected key-value repository for trust state.
//
// Every store in the trust subsystem is keyed by fingerprint (or
// execution id) and persists one JSON document per key. The repository
// interface keeps the policy evaluator a pure function in tests: the
// production implementation backs it with the filesystem, tests back it
// with an in-memory map.
//
// No file locking — at-most-one writer per key under normal operation is
// an acknowledged assumption, not an enforced guarantee.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use tracing::debug;

use crate::error::TrustError;

/// Serialize a record in the repository's canonical form: 2-space
/// indented JSON with a trailing newline, for reproducible diffs.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, TrustError> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// A key-value repository holding one JSON document per key.
pub trait KvRepo {
    /// Fetch the document stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, TrustError>;

    /// Store `value` under `key` (creates or overwrites).
    fn put(&self, key: &str, value: &str) -> Result<(), TrustError>;

    /// All keys present, sorted ascending.
    fn keys(&self) -> Result<Vec<String>, TrustError>;
}

/// Filesystem-backed repository: `<dir>/<key>.json` per key.
pub struct FsKvRepo {
    dir: PathBuf,
}

impl FsKvRepo {
    /// Open a repository rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, TrustError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| TrustError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, TrustError> {
        // Keys become file names; path separators would escape the store.
        if key.is_empty() || key.contains('/') || key.contains('\\') || key.contains("..") {
            return Err(TrustError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KvRepo for FsKvRepo {
    fn get(&self, key: &str) -> Result<Option<String>, TrustError> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|source| TrustError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(content))
    }

    fn put(&self, key: &str, value: &str) -> Result<(), TrustError> {
        let path = self.key_path(key)?;
        fs::write(&path, value).map_err(|source| TrustError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(key, path = %path.display(), "repo write");
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, TrustError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| TrustError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| TrustError::Io {
                path: self.dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory repository for tests and pure evaluation.
#[derive(Default)]
pub struct MemKvRepo {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemKvRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvRepo for MemKvRepo {
    fn get(&self, key: &str) -> Result<Option<String>, TrustError> {
        Ok(self.entries.lock().expect("repo lock").get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), TrustError> {
        self.entries
            .lock()
            .expect("repo lock")
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, TrustError> {
        Ok(self.entries.lock().expect("repo lock").keys().cloned().collect())
    }
}
