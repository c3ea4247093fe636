//! MessagePack implementation of the checkpoint repository.
//!
//! Checkpoint paths are passed around as stems (`/runs/level_0_attacker`);
//! this adapter stores them as `<stem>.msgpack`.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use crate::{Result, error::Error, ports::CheckpointRepository, types::Checkpoint};

/// File extension used for every MessagePack artifact written by the crate
pub const MSGPACK_EXTENSION: &str = "msgpack";

/// MessagePack-based checkpoint repository.
///
/// # Examples
///
/// ```no_run
/// use levelk::adapters::MsgPackCheckpointRepository;
/// use levelk::ports::CheckpointRepository;
/// use levelk::types::Checkpoint;
/// use std::path::Path;
///
/// let repo = MsgPackCheckpointRepository::new();
/// repo.save(&Checkpoint::new(), Path::new("/tmp/debug/run_1000"))?;
/// let loaded = repo.load(Path::new("/tmp/debug/run_1000"))?;
/// # Ok::<(), levelk::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCheckpointRepository;

impl MsgPackCheckpointRepository {
    /// Create a new MessagePack repository.
    pub fn new() -> Self {
        Self
    }

    /// On-disk location for a checkpoint stem.
    pub fn file_path(path: &Path) -> PathBuf {
        with_msgpack_extension(path)
    }
}

/// Append `.msgpack` to `path` unless it already ends with it.
pub fn with_msgpack_extension(path: &Path) -> PathBuf {
    if path.extension().and_then(|ext| ext.to_str()) == Some(MSGPACK_EXTENSION) {
        return path.to_path_buf();
    }
    let mut raw = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(MSGPACK_EXTENSION);
    PathBuf::from(raw)
}

impl CheckpointRepository for MsgPackCheckpointRepository {
    fn save(&self, checkpoint: &Checkpoint, path: &Path) -> Result<()> {
        let file_path = Self::file_path(path);
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| Error::io(format!("create directory {parent:?}"), source))?;
        }
        let file = File::create(&file_path)
            .map_err(|source| Error::io(format!("create file {file_path:?}"), source))?;
        let mut writer = BufWriter::new(file);

        rmp_serde::encode::write_named(&mut writer, checkpoint).map_err(|e| {
            Error::SerializationContext {
                operation: "serialize checkpoint to MessagePack".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(())
    }

    fn load(&self, path: &Path) -> Result<Checkpoint> {
        let file_path = Self::file_path(path);
        let file = File::open(&file_path)
            .map_err(|source| Error::io(format!("open file {file_path:?}"), source))?;

        let checkpoint =
            rmp_serde::decode::from_read(file).map_err(|e| Error::SerializationContext {
                operation: "deserialize checkpoint from MessagePack".to_string(),
                message: e.to_string(),
            })?;

        Ok(checkpoint)
    }

    fn exists(&self, path: &Path) -> bool {
        Self::file_path(path).is_file()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_msgpack_roundtrip() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let stem = temp_dir.path().join("nested").join("debug_1000");

        let mut checkpoint = Checkpoint::new();
        checkpoint.extend([("super_defender_1/actor/weights".to_string(), vec![0.5, -1.5])]);

        let repo = MsgPackCheckpointRepository::new();
        repo.save(&checkpoint, &stem).expect("Failed to save");
        assert!(repo.exists(&stem));
        assert!(temp_dir.path().join("nested/debug_1000.msgpack").is_file());

        let loaded = repo.load(&stem).expect("Failed to load");
        assert_eq!(loaded, checkpoint);
    }

    #[test]
    fn test_extension_not_doubled() {
        assert_eq!(
            with_msgpack_extension(Path::new("a/run.v2")),
            PathBuf::from("a/run.v2.msgpack")
        );
        assert_eq!(
            with_msgpack_extension(Path::new("a/run.msgpack")),
            PathBuf::from("a/run.msgpack")
        );
    }

    #[test]
    fn test_load_nonexistent_returns_error() {
        let repo = MsgPackCheckpointRepository::new();
        let result = repo.load(Path::new("/tmp/nonexistent_levelk_12345"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }
}
