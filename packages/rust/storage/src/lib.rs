//! Persisted run state: the record of identifiers already turned into posts.
//!
//! The [`StateStore`] owns a single JSON file. A run loads it once, mutates the
//! [`RunState`] in memory, and saves it once at the end.
//!
//! **Access rules:**
//! - one writer at a time; concurrent pipeline runs race on the file
//! - writes go to a temp file first and are renamed into place

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use autoniche_shared::{AutoNicheError, Result};

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Identifiers processed during the current rotation, in processing order.
///
/// Fields this version does not know about are kept and written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default)]
    processed_qids: Vec<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl RunState {
    /// Empty state, as on a first run.
    pub fn new() -> Self {
        Self::default()
    }

    /// State seeded with already-processed identifiers.
    pub fn with_processed<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            processed_qids: ids.into_iter().map(Into::into).collect(),
            extra: serde_json::Map::new(),
        }
    }

    /// Processed identifiers in the order they were recorded.
    pub fn processed(&self) -> &[String] {
        &self.processed_qids
    }

    /// Whether `qid` was already processed in this rotation.
    pub fn contains(&self, qid: &str) -> bool {
        self.processed_qids.iter().any(|q| q == qid)
    }

    /// Record `qid` as processed. Returns `false` if it was already recorded.
    pub fn mark_processed(&mut self, qid: impl Into<String>) -> bool {
        let qid = qid.into();
        if self.contains(&qid) {
            return false;
        }
        self.processed_qids.push(qid);
        true
    }

    /// Forget all processed identifiers; a new rotation begins.
    pub fn reset(&mut self) {
        self.processed_qids.clear();
    }

    pub fn len(&self) -> usize {
        self.processed_qids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processed_qids.is_empty()
    }

    /// Number of distinct identifiers (older files may contain duplicates).
    pub fn distinct_len(&self) -> usize {
        self.processed_qids.iter().collect::<HashSet<_>>().len()
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// File-backed storage for [`RunState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// A store backed by the JSON file at `path`. Nothing is touched until
    /// [`load`](Self::load) or [`save`](Self::save).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, or an empty state if the file does not exist yet.
    pub fn load(&self) -> Result<RunState> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "state file not found, starting empty");
            return Ok(RunState::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AutoNicheError::io(&self.path, e))?;

        let state: RunState = serde_json::from_str(&content).map_err(|e| {
            AutoNicheError::State(format!("invalid state file {}: {e}", self.path.display()))
        })?;

        debug!(
            path = %self.path.display(),
            processed = state.len(),
            "loaded run state"
        );
        Ok(state)
    }

    /// Write the state atomically (temp file, then rename).
    pub fn save(&self, state: &RunState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| AutoNicheError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| AutoNicheError::State(format!("state serialization failed: {e}")))?;

        let temp = self.temp_path();
        std::fs::write(&temp, json).map_err(|e| AutoNicheError::io(&temp, e))?;
        std::fs::rename(&temp, &self.path).map_err(|e| AutoNicheError::io(&self.path, e))?;

        info!(
            path = %self.path.display(),
            processed = state.len(),
            "run state saved"
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state.json".into());
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (PathBuf, StateStore) {
        let dir = std::env::temp_dir().join(format!("an-storage-test-{}", uuid::Uuid::now_v7()));
        let store = StateStore::new(dir.join("data").join("state.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_loads_empty() {
        let (dir, store) = temp_store();
        let state = store.load().unwrap();
        assert!(state.is_empty());
        assert!(!store.path().exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn save_then_load_preserves_order() {
        let (dir, store) = temp_store();
        let state = RunState::with_processed(["Q3", "Q1", "Q2"]);

        store.save(&state).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.processed(), ["Q3", "Q1", "Q2"]);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_uses_processed_qids_field() {
        let (dir, store) = temp_store();
        store.save(&RunState::with_processed(["Q7"])).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["processed_qids"][0], "Q7");
        assert!(!store.path().with_file_name(".state.json.tmp").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn loads_file_with_extra_fields() {
        let (dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"processed_qids": ["Q1", "Q1"], "last_run": "2024-05-01"}"#,
        )
        .unwrap();

        let state = store.load().unwrap();
        assert_eq!(state.len(), 2);
        assert_eq!(state.distinct_len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn extra_fields_survive_a_save() {
        let (dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"processed_qids": ["Q1"], "last_run": "2024-05-01", "notes": {"by": "cron"}}"#,
        )
        .unwrap();

        let mut state = store.load().unwrap();
        assert!(state.mark_processed("Q2"));
        store.save(&state).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["processed_qids"], serde_json::json!(["Q1", "Q2"]));
        assert_eq!(value["last_run"], "2024-05-01");
        assert_eq!(value["notes"]["by"], "cron");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_file_is_a_state_error() {
        let (dir, store) = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, AutoNicheError::State(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn mark_processed_guards_duplicates() {
        let mut state = RunState::new();
        assert!(state.mark_processed("Q1"));
        assert!(!state.mark_processed("Q1"));
        assert!(state.mark_processed("Q2"));
        assert_eq!(state.processed(), ["Q1", "Q2"]);

        state.reset();
        assert!(state.is_empty());
        assert!(state.mark_processed("Q1"));
    }
}
