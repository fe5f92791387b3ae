//! JSON file backed checkpoint store

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use super::{Checkpoint, CheckpointRecord, CheckpointStore, StoreLock};
use crate::error::{ProcessError, Result};

/// Checkpoint persisted as a small JSON document
///
/// Writes go to `<path>.tmp` and are renamed into place. Cross-process
/// exclusion uses an advisory lock on `<path>.lock`.
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ProcessError::storage(parent, e))?;
            }
        }
        Ok(())
    }

    fn persist(&self, record: &CheckpointRecord) -> Result<()> {
        self.ensure_parent()?;
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| ProcessError::storage(&self.path, e))?;

        let tmp = self.sibling(".tmp");
        fs::write(&tmp, json).map_err(|e| ProcessError::storage(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| ProcessError::storage(&self.path, e))?;
        Ok(())
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn lock(&self) -> Result<StoreLock> {
        self.ensure_parent()?;
        let lock_path = self.sibling(".lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| ProcessError::storage(&lock_path, e))?;

        log::debug!("Waiting for checkpoint lock {}", lock_path.display());
        StoreLock::exclusive(file).map_err(|e| ProcessError::storage(&lock_path, e))
    }

    fn read(&self) -> Result<Checkpoint> {
        if !self.path.exists() {
            log::info!(
                "No checkpoint at {}, initialising with defaults",
                self.path.display()
            );
            let checkpoint = Checkpoint::default();
            self.persist(&checkpoint.to_record())?;
            return Ok(checkpoint);
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| ProcessError::storage(&self.path, e))?;
        let record: CheckpointRecord =
            serde_json::from_str(&raw).map_err(|e| ProcessError::storage(&self.path, e))?;
        let checkpoint = Checkpoint::from_record(&record)?;

        log::debug!(
            "Read checkpoint: next folio {}, cutoff {:?}",
            checkpoint.next_folio,
            checkpoint.last_cutoff
        );
        Ok(checkpoint)
    }

    fn write(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.persist(&checkpoint.to_record())?;
        log::debug!("Wrote checkpoint to {}", self.path.display());
        Ok(())
    }
}
