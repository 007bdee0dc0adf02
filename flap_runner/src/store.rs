//! Threshold / high-score persistence.
//!
//! The session never assumes a save worked: every failure is logged and
//! swallowed, and anything unreadable loads as "nothing stored".

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use gesture_engine::{CalibrationStats, PoseThresholds};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o on {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed store {path}: {source}")]
    Format {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key/value shape shared by every backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoredState {
    pub thresholds:        Option<PoseThresholds>,
    pub calibration_stats: Option<CalibrationStats>,
    pub high_score:        u32,
}

pub trait ScoreStore {
    fn load_thresholds(&self) -> Option<PoseThresholds>;
    fn save_thresholds(&mut self, thresholds: &PoseThresholds);
    fn clear_thresholds(&mut self);
    fn load_high_score(&self) -> u32;
    fn save_high_score(&mut self, score: u32);
    fn save_stats(&mut self, stats: &CalibrationStats);
}

// ════════════════════════════════════════════════════════════════════════════
// MemoryStore
// ════════════════════════════════════════════════════════════════════════════

/// In-process store. Clones share the same state, so a test can keep a
/// handle after giving one to the session.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoredState>>,
}

impl MemoryStore {
    pub fn new() -> Self { MemoryStore::default() }

    pub fn with_state(state: StoredState) -> Self {
        MemoryStore { inner: Arc::new(Mutex::new(state)) }
    }

    pub fn state(&self) -> StoredState { self.lock().clone() }

    fn lock(&self) -> MutexGuard<'_, StoredState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ScoreStore for MemoryStore {
    fn load_thresholds(&self) -> Option<PoseThresholds> { self.lock().thresholds }
    fn save_thresholds(&mut self, thresholds: &PoseThresholds) {
        self.lock().thresholds = Some(*thresholds);
    }
    fn clear_thresholds(&mut self) {
        let mut s = self.lock();
        s.thresholds = None;
        s.calibration_stats = None;
    }
    fn load_high_score(&self) -> u32 { self.lock().high_score }
    fn save_high_score(&mut self, score: u32) { self.lock().high_score = score; }
    fn save_stats(&mut self, stats: &CalibrationStats) {
        self.lock().calibration_stats = Some(*stats);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// JsonFileStore
// ════════════════════════════════════════════════════════════════════════════

/// Single JSON object on disk, rewritten on every save.
#[derive(Debug)]
pub struct JsonFileStore {
    path:  PathBuf,
    state: StoredState,
}

impl JsonFileStore {
    /// Open `path`. A missing or corrupt file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match read_state(&path) {
            Ok(Some(state)) => state,
            Ok(None) => StoredState::default(),
            Err(e) => {
                log::warn!("ignoring stored progress: {e}");
                StoredState::default()
            }
        };
        JsonFileStore { path, state }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn persist(&self) {
        if let Err(e) = write_state(&self.path, &self.state) {
            log::warn!("could not save progress: {e}");
        }
    }
}

fn read_state(path: &Path) -> Result<Option<StoredState>, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(StoreError::Io { path: path.to_path_buf(), source }),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|source| StoreError::Format { path: path.to_path_buf(), source })
}

fn write_state(path: &Path, state: &StoredState) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(state)
        .map_err(|source| StoreError::Format { path: path.to_path_buf(), source })?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|source| StoreError::Io { path: dir.to_path_buf(), source })?;
    }
    fs::write(path, text).map_err(|source| StoreError::Io { path: path.to_path_buf(), source })
}

impl ScoreStore for JsonFileStore {
    fn load_thresholds(&self) -> Option<PoseThresholds> {
        // a hand-edited pair that breaks ordering is treated as absent
        self.state.thresholds.filter(PoseThresholds::is_ordered)
    }
    fn save_thresholds(&mut self, thresholds: &PoseThresholds) {
        self.state.thresholds = Some(*thresholds);
        self.persist();
    }
    fn clear_thresholds(&mut self) {
        self.state.thresholds = None;
        self.state.calibration_stats = None;
        self.persist();
    }
    fn load_high_score(&self) -> u32 { self.state.high_score }
    fn save_high_score(&mut self, score: u32) {
        self.state.high_score = score;
        self.persist();
    }
    fn save_stats(&mut self, stats: &CalibrationStats) {
        self.state.calibration_stats = Some(*stats);
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clones_share_state() {
        let handle = MemoryStore::new();
        let mut store = handle.clone();
        store.save_high_score(12);
        store.save_thresholds(&PoseThresholds::DEFAULT);
        assert_eq!(handle.load_high_score(), 12);
        store.clear_thresholds();
        assert_eq!(handle.load_thresholds(), None);
        assert_eq!(handle.state().high_score, 12);
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.json");
        {
            let mut store = JsonFileStore::open(&path);
            assert_eq!(store.load_thresholds(), None);
            store.save_thresholds(&PoseThresholds::new(0.8, 0.3));
            store.save_high_score(7);
        }
        let store = JsonFileStore::open(&path);
        assert_eq!(store.load_thresholds(), Some(PoseThresholds::new(0.8, 0.3)));
        assert_eq!(store.load_high_score(), 7);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"idleThreshold\""));
        assert!(text.contains("\"highScore\""));
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::open(&path);
        assert_eq!(store.load_high_score(), 0);
        assert_eq!(store.load_thresholds(), None);
    }

    #[test]
    fn unordered_thresholds_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        fs::write(&path, r#"{"thresholds":{"idleThreshold":0.2,"jumpThreshold":0.5}}"#).unwrap();
        assert_eq!(JsonFileStore::open(&path).load_thresholds(), None);
    }
}
