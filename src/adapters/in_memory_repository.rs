//! In-memory checkpoint repository for testing.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{Result, error::Error, ports::CheckpointRepository, types::Checkpoint};

/// In-memory repository keyed by the path string.
///
/// All clones share the same storage, so a test can keep one handle while the
/// pipeline owns another.
///
/// # Examples
///
/// ```
/// use levelk::adapters::InMemoryCheckpointRepository;
/// use levelk::ports::CheckpointRepository;
/// use levelk::types::Checkpoint;
/// use std::path::Path;
///
/// let repo = InMemoryCheckpointRepository::new();
/// repo.save(&Checkpoint::new(), Path::new("run_10"))?;
/// assert!(repo.contains(Path::new("run_10")));
/// # Ok::<(), levelk::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct InMemoryCheckpointRepository {
    storage: Arc<Mutex<HashMap<String, Checkpoint>>>,
}

impl InMemoryCheckpointRepository {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn storage(&self) -> MutexGuard<'_, HashMap<String, Checkpoint>> {
        // A panic while holding the lock leaves the map itself intact.
        self.storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of stored checkpoints.
    pub fn count(&self) -> usize {
        self.storage().len()
    }

    /// Whether a checkpoint is stored under `path`.
    pub fn contains(&self, path: &Path) -> bool {
        self.storage().contains_key(&key(path))
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.storage().keys().cloned().collect();
        keys.sort();
        keys
    }
}

fn key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl CheckpointRepository for InMemoryCheckpointRepository {
    fn save(&self, checkpoint: &Checkpoint, path: &Path) -> Result<()> {
        self.storage().insert(key(path), checkpoint.clone());
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<Checkpoint> {
        self.storage().get(&key(path)).cloned().ok_or_else(|| {
            Error::io(
                format!("load checkpoint {path:?}"),
                std::io::Error::new(std::io::ErrorKind::NotFound, "checkpoint not found"),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.contains(path)
    }
}
