use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::signal::ActionKey;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to write history file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable record of already-executed action keys. The idempotency gate for
/// the whole daemon: once a key is here, no evaluator cycle selects it
/// again, across restarts. Stored as a JSON array of key strings.
#[derive(Debug)]
pub struct HistoryStore {
    path: Option<PathBuf>,
    keys: HashSet<String>,
}

impl HistoryStore {
    /// Load from `path`, starting empty if the file does not exist yet. A
    /// corrupt file is treated as empty with a warning rather than refusing
    /// to start; the old file is overwritten on the next save.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let keys = match fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<HashSet<String>>(&data) {
                Ok(keys) => {
                    info!("Loaded history: {} executed action(s) from {}", keys.len(), path.display());
                    keys
                }
                Err(e) => {
                    warn!("History file {} is corrupt ({}), starting empty", path.display(), e);
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No history file at {}, starting empty", path.display());
                HashSet::new()
            }
            Err(e) => {
                warn!("Could not read history file {} ({}), starting empty", path.display(), e);
                HashSet::new()
            }
        };

        Self {
            path: Some(path),
            keys,
        }
    }

    /// Volatile store for tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            keys: HashSet::new(),
        }
    }

    pub fn has(&self, key: &ActionKey) -> bool {
        self.keys.contains(key.as_str())
    }

    pub fn add(&mut self, key: &ActionKey) {
        self.keys.insert(key.as_str().to_string());
    }

    /// Roll back an `add` whose durable save failed, so the key stays
    /// eligible for re-evaluation.
    pub fn remove(&mut self, key: &ActionKey) {
        self.keys.remove(key.as_str());
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Persist to disk. Writes a sibling temp file and renames it over the
    /// target so a crash mid-write never truncates existing history.
    pub fn save(&self) -> Result<(), HistoryError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let data = serde_json::to_string_pretty(&self.keys)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, data).map_err(|source| HistoryError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| HistoryError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{ActionKey, ActionKind};

    fn key(version: &str) -> ActionKey {
        ActionKey::new(&ActionKind::Upgrade, version)
    }

    #[test]
    fn test_in_memory_add_has() {
        let mut history = HistoryStore::in_memory();
        assert!(!history.has(&key("v1.0.0")));
        history.add(&key("v1.0.0"));
        assert!(history.has(&key("v1.0.0")));
        assert!(!history.has(&key("v2.0.0")));
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = HistoryStore::load(&path);
        assert!(history.is_empty());
        history.add(&key("v1.0.0"));
        history.add(&key("v2.0.0"));
        history.save().unwrap();

        let reloaded = HistoryStore::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.has(&key("v1.0.0")));
        assert!(reloaded.has(&key("v2.0.0")));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();

        let history = HistoryStore::load(&path);
        assert!(history.is_empty());
    }

    #[test]
    fn test_save_fails_on_unwritable_path() {
        let mut history = HistoryStore::load("/nonexistent-dir/history.json");
        history.add(&key("v1.0.0"));
        assert!(history.save().is_err());
    }
}
