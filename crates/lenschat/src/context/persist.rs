//! JSON snapshot of the tracked set and lenses.
//!
//! The snapshot is rewritten in full after every mutating store operation
//! and read once at startup. There is deliberately no incremental diffing
//! and no partial-write protection: a single `fs::write` replaces the file,
//! and the process is the only writer. The running token total is never
//! stored — it is recomputed from the loaded counts so the sum invariant
//! holds immediately after load.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ContextError;

/// Serializable snapshot of `{tracked files, lenses, active lens}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Tracked path → cached token count, in tracking order.
    pub tracked_files: IndexMap<String, usize>,
    /// Lens name → (path → snapshot token count).
    pub lenses: IndexMap<String, IndexMap<String, usize>>,
    /// Name of the active lens, if any.
    #[serde(default)]
    pub active_lens: Option<String>,
}

impl PersistedState {
    /// Overwrite the snapshot file with this state.
    pub fn save(&self, path: &Path) -> Result<(), ContextError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ContextError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        std::fs::write(path, json).map_err(|source| ContextError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("persisted tracking state to {}", path.display());
        Ok(())
    }

    /// Load a snapshot. Returns `Ok(None)` when the file does not exist;
    /// an unreadable or malformed file is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, ContextError> {
        if !path.is_file() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path).map_err(|source| ContextError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let state = serde_json::from_str(&json).map_err(|e| ContextError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        Ok(Some(state))
    }

    /// Sum of the tracked files' cached counts.
    pub fn total_tokens(&self) -> usize {
        self.tracked_files.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> PersistedState {
        let mut tracked = IndexMap::new();
        tracked.insert("src/main.rs".to_string(), 120);
        tracked.insert("README.md".to_string(), 45);

        let mut lens = IndexMap::new();
        lens.insert("src/main.rs".to_string(), 120);
        let mut lenses = IndexMap::new();
        lenses.insert("code".to_string(), lens);

        PersistedState {
            tracked_files: tracked,
            lenses,
            active_lens: Some("code".to_string()),
        }
    }

    #[test]
    fn save_load_roundtrip_is_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".lenschat-tracking.json");

        let state = sample_state();
        state.save(&path).unwrap();

        let loaded = PersistedState::load(&path).unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn load_missing_file_is_none() {
        let loaded = PersistedState::load(Path::new("/nonexistent/state.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(PersistedState::load(&path).is_err());
    }

    #[test]
    fn total_tokens_sums_tracked_counts() {
        assert_eq!(sample_state().total_tokens(), 165);
    }

    #[test]
    fn missing_active_lens_field_defaults_to_none() {
        let state: PersistedState =
            serde_json::from_str(r#"{"tracked_files":{},"lenses":{}}"#).unwrap();
        assert_eq!(state.active_lens, None);
    }

    #[test]
    fn save_preserves_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let state = sample_state();
        state.save(&path).unwrap();

        let loaded = PersistedState::load(&path).unwrap().unwrap();
        let keys: Vec<&String> = loaded.tracked_files.keys().collect();
        assert_eq!(keys, vec!["src/main.rs", "README.md"]);
    }
}
