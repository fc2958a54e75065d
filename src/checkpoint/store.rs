use crate::state::CrawlState;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Checkpoints older than this are treated as absent
const VALIDITY_HOURS: i64 = 24;

/// A durable snapshot of one run's progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// The crawl state at the moment of the snapshot
    pub state: CrawlState,

    /// Number of records in the in-memory dataset when saved
    pub dataset_len: usize,

    /// Hash of the configuration the run was started with
    pub config_hash: String,

    /// Wall-clock time of the snapshot
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Builds a checkpoint for the given state
    pub fn new(state: CrawlState, dataset_len: usize, config_hash: &str) -> Self {
        Self {
            state,
            dataset_len,
            config_hash: config_hash.to_string(),
            saved_at: Utc::now(),
        }
    }

    /// Returns true if the snapshot is older than the validity horizon
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.saved_at > Duration::hours(VALIDITY_HOURS)
    }
}

/// Durable store for the crawl checkpoint
///
/// The store is the only component that touches the checkpoint file. Saving
/// is best-effort: a failed write is logged and swallowed because
/// checkpointing provides durability, not correctness. Loading discards
/// anything absent, unreadable, stale, or written under a different
/// configuration.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    config_hash: String,
}

impl CheckpointStore {
    /// Creates a store bound to the given file path and config hash
    pub fn new(path: impl Into<PathBuf>, config_hash: &str) -> Self {
        Self {
            path: path.into(),
            config_hash: config_hash.to_string(),
        }
    }

    /// Persists a snapshot of the given state
    ///
    /// Writes to a temporary file next to the target and renames it into
    /// place, so a crash mid-write never leaves a truncated checkpoint.
    /// Never returns an error.
    pub fn save(&self, state: &CrawlState, dataset_len: usize) {
        let checkpoint = Checkpoint::new(state.clone(), dataset_len, &self.config_hash);

        if let Err(e) = self.write_atomic(&checkpoint) {
            tracing::warn!("Failed to save checkpoint to {:?}: {}", self.path, e);
        } else {
            tracing::debug!(
                "Checkpoint saved: page {}, {} records",
                checkpoint.state.current_page,
                dataset_len
            );
        }
    }

    fn write_atomic(&self, checkpoint: &Checkpoint) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(checkpoint)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Loads the checkpoint, if one is present and still valid
    ///
    /// A missing, corrupt, stale, or configuration-mismatched checkpoint is
    /// discarded with a log line; none of these conditions is fatal.
    pub fn load(&self) -> Option<Checkpoint> {
        if !self.path.exists() {
            return None;
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to read checkpoint {:?}: {}", self.path, e);
                return None;
            }
        };

        let checkpoint: Checkpoint = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Discarding corrupt checkpoint {:?}: {}", self.path, e);
                return None;
            }
        };

        if checkpoint.is_stale(Utc::now()) {
            tracing::info!(
                "Discarding stale checkpoint from {} (older than {}h)",
                checkpoint.saved_at,
                VALIDITY_HOURS
            );
            return None;
        }

        if checkpoint.config_hash != self.config_hash {
            tracing::info!("Discarding checkpoint saved under a different configuration");
            return None;
        }

        Some(checkpoint)
    }

    /// Removes the checkpoint after a successful run
    ///
    /// Prevents a completed run from being "resumed" by the next invocation.
    pub fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove checkpoint {:?}: {}", self.path, e);
            }
        }
    }

    /// Path of the underlying checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_store(dir: &TempDir) -> CheckpointStore {
        CheckpointStore::new(dir.path().join("checkpoint.json"), "hash-1")
    }

    fn create_test_state() -> CrawlState {
        let mut state = CrawlState::new(50);
        state.record_page(7, 84, 80);
        state
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);

        store.save(&create_test_state(), 84);

        let checkpoint = store.load().expect("checkpoint should load");
        assert_eq!(checkpoint.state.current_page, 7);
        assert_eq!(checkpoint.state.items_found, 84);
        assert_eq!(checkpoint.dataset_len, 84);
        assert_eq!(checkpoint.config_hash, "hash-1");
    }

    #[test]
    fn test_load_absent_checkpoint() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_corrupt_checkpoint() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);

        std::fs::write(store.path(), "not json at all {{{").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_stale_checkpoint_discarded() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);

        // Write a checkpoint dated 25 hours in the past
        let mut checkpoint = Checkpoint::new(create_test_state(), 84, "hash-1");
        checkpoint.saved_at = Utc::now() - Duration::hours(25);
        let json = serde_json::to_string(&checkpoint).unwrap();
        std::fs::write(store.path(), json).unwrap();

        assert!(store.load().is_none());
    }

    #[test]
    fn test_fresh_checkpoint_within_horizon() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);

        let mut checkpoint = Checkpoint::new(create_test_state(), 84, "hash-1");
        checkpoint.saved_at = Utc::now() - Duration::hours(23);
        let json = serde_json::to_string(&checkpoint).unwrap();
        std::fs::write(store.path(), json).unwrap();

        assert!(store.load().is_some());
    }

    #[test]
    fn test_config_mismatch_discarded() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);
        store.save(&create_test_state(), 84);

        let other = CheckpointStore::new(store.path().to_path_buf(), "hash-2");
        assert!(other.load().is_none());
    }

    #[test]
    fn test_clear_removes_checkpoint() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);

        store.save(&create_test_state(), 84);
        assert!(store.load().is_some());

        store.clear();
        assert!(store.load().is_none());

        // Clearing again is harmless
        store.clear();
    }

    #[test]
    fn test_save_overwrites_previous() {
        let dir = TempDir::new().unwrap();
        let store = create_store(&dir);

        store.save(&create_test_state(), 84);

        let mut newer = create_test_state();
        newer.record_page(8, 10, 9);
        store.save(&newer, 94);

        let checkpoint = store.load().unwrap();
        assert_eq!(checkpoint.state.current_page, 8);
        assert_eq!(checkpoint.dataset_len, 94);
    }

    #[test]
    fn test_save_into_missing_directory_is_swallowed() {
        let store = CheckpointStore::new("/nonexistent/dir/checkpoint.json", "hash-1");
        // Must not panic or propagate
        store.save(&create_test_state(), 84);
        assert!(store.load().is_none());
    }
}
