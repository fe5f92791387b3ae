//! In-memory checkpoint store for tests

use std::sync::Mutex;

use super::{Checkpoint, CheckpointStore, StoreLock};
use crate::error::{ProcessError, Result};

#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    state: Mutex<Option<Checkpoint>>,
    writes: Mutex<usize>,
    fail_writes: bool,
}

impl MemoryCheckpointStore {
    pub fn with(checkpoint: Checkpoint) -> Self {
        Self {
            state: Mutex::new(Some(checkpoint)),
            ..Default::default()
        }
    }

    /// A store whose writes always fail
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn lock(&self) -> Result<StoreLock> {
        Ok(StoreLock::unlocked())
    }

    fn read(&self) -> Result<Checkpoint> {
        let mut state = self.state.lock().unwrap();
        Ok(state.get_or_insert_with(Checkpoint::default).clone())
    }

    fn write(&self, checkpoint: &Checkpoint) -> Result<()> {
        if self.fail_writes {
            return Err(ProcessError::storage(
                std::path::Path::new("memory"),
                "store is read-only",
            ));
        }
        *self.state.lock().unwrap() = Some(checkpoint.clone());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}
