//! Repository port for checkpoint persistence.

use std::path::Path;

use crate::{Result, types::Checkpoint};

/// Port for persisting and loading network checkpoints.
///
/// # Examples
///
/// ```no_run
/// use levelk::ports::CheckpointRepository;
/// use levelk::types::Checkpoint;
/// use std::path::Path;
///
/// fn persist<R: CheckpointRepository>(repo: &R, checkpoint: &Checkpoint) -> levelk::Result<()> {
///     repo.save(checkpoint, Path::new("/tmp/run_1000"))
/// }
/// ```
pub trait CheckpointRepository {
    /// Save a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the location cannot be written or serialization fails.
    fn save(&self, checkpoint: &Checkpoint, path: &Path) -> Result<()>;

    /// Load a checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint does not exist or cannot be decoded.
    fn load(&self, path: &Path) -> Result<Checkpoint>;

    /// Whether a checkpoint exists at `path`.
    fn exists(&self, path: &Path) -> bool;
}
