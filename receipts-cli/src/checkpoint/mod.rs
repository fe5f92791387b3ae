//! Persisted run checkpoint: last processed cutoff and next folio
//!
//! The on-disk record keeps the field names the ERP operators already use
//! (`ultimo_folio`, `ultimo_registro`, `ultima_hora`). The cutoff is stored as
//! a separate date and time string; legacy records that carry a full
//! `YYYY-MM-DD HH:MM:SS` timestamp in `ultimo_registro` are still accepted.

mod store;
#[cfg(test)]
mod memory;

pub use store::JsonCheckpointStore;
#[cfg(test)]
pub use memory::MemoryCheckpointStore;

use std::fs::File;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{ProcessError, Result};

/// Folio assigned on a fresh store
pub const INITIAL_FOLIO: u64 = 1000;

/// Date format of `ultimo_registro`
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Time format of `ultima_hora`
pub const TIME_FORMAT: &str = "%H:%M:%S";

const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_TIME: &str = "00:00:00";

/// Typed checkpoint state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Latest receipt time already incorporated into output
    pub last_cutoff: Option<NaiveDateTime>,
    /// Folio to assign to the next output row
    pub next_folio: u64,
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self {
            last_cutoff: None,
            next_folio: INITIAL_FOLIO,
        }
    }
}

/// Persisted key-value form of the checkpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub ultimo_folio: u64,
    #[serde(default)]
    pub ultimo_registro: String,
    #[serde(default = "default_time")]
    pub ultima_hora: String,
}

fn default_time() -> String {
    DEFAULT_TIME.to_string()
}

impl Default for CheckpointRecord {
    fn default() -> Self {
        Checkpoint::default().to_record()
    }
}

impl Checkpoint {
    /// Decode a persisted record
    pub fn from_record(record: &CheckpointRecord) -> Result<Self> {
        let registro = record.ultimo_registro.trim();
        let last_cutoff = if registro.is_empty() {
            None
        } else if let Ok(ts) = NaiveDateTime::parse_from_str(registro, LEGACY_TIMESTAMP_FORMAT) {
            Some(ts)
        } else {
            let date = parse_date(registro)?;
            let time = parse_time_or_midnight(&record.ultima_hora)?;
            Some(date.and_time(time))
        };

        Ok(Self {
            last_cutoff,
            next_folio: record.ultimo_folio,
        })
    }

    /// Encode into the persisted record
    pub fn to_record(&self) -> CheckpointRecord {
        match self.last_cutoff {
            Some(cutoff) => CheckpointRecord {
                ultimo_folio: self.next_folio,
                ultimo_registro: cutoff.format(DATE_FORMAT).to_string(),
                ultima_hora: cutoff.format(TIME_FORMAT).to_string(),
            },
            None => CheckpointRecord {
                ultimo_folio: self.next_folio,
                ultimo_registro: String::new(),
                ultima_hora: default_time(),
            },
        }
    }
}

/// Parse a cutoff date as `DD/MM/YYYY` or `YYYY-MM-DD`
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .map_err(|_| ProcessError::parse("ultimo_registro", value))
}

/// Parse a cutoff time as `HH:MM:SS`
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|_| ProcessError::parse("ultima_hora", value))
}

fn parse_time_or_midnight(value: &str) -> Result<NaiveTime> {
    if value.trim().is_empty() {
        Ok(NaiveTime::MIN)
    } else {
        parse_time(value)
    }
}

/// Exclusive hold on a checkpoint store, released on drop
pub struct StoreLock {
    file: Option<File>,
}

impl StoreLock {
    /// A lock for stores that need no cross-process exclusion
    #[cfg(test)]
    pub fn unlocked() -> Self {
        Self { file: None }
    }

    /// Block until an exclusive advisory lock on `file` is held
    pub fn exclusive(file: File) -> std::io::Result<Self> {
        FileExt::lock_exclusive(&file)?;
        Ok(Self { file: Some(file) })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            if let Err(e) = FileExt::unlock(file) {
                log::warn!("Failed to release checkpoint lock: {}", e);
            }
        }
    }
}

/// Single-writer persisted checkpoint
///
/// Callers hold the [`StoreLock`] from [`CheckpointStore::lock`] across the
/// whole read-modify-write so overlapping runs cannot interleave.
pub trait CheckpointStore {
    fn lock(&self) -> Result<StoreLock>;

    /// Current state; a missing store is initialised with defaults and persisted
    fn read(&self) -> Result<Checkpoint>;

    /// Replace both fields at once
    fn write(&self, checkpoint: &Checkpoint) -> Result<()>;
}

/// Operator edit of the checkpoint; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct CheckpointUpdate {
    pub folio: Option<u64>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub clear_cutoff: bool,
}

/// Read the persisted record as exposed to operators
pub fn get_config(store: &dyn CheckpointStore) -> Result<CheckpointRecord> {
    let _lock = store.lock()?;
    Ok(store.read()?.to_record())
}

/// Apply an operator edit and persist it
pub fn set_config(store: &dyn CheckpointStore, update: &CheckpointUpdate) -> Result<Checkpoint> {
    let _lock = store.lock()?;
    let current = store.read()?;
    let updated = apply_update(&current, update)?;

    store.write(&updated)?;
    log::info!(
        "Checkpoint updated: folio {} -> {}, cutoff {:?} -> {:?}",
        current.next_folio,
        updated.next_folio,
        current.last_cutoff,
        updated.last_cutoff
    );
    Ok(updated)
}

fn apply_update(current: &Checkpoint, update: &CheckpointUpdate) -> Result<Checkpoint> {
    let mut next = current.clone();

    if let Some(folio) = update.folio {
        if folio < INITIAL_FOLIO {
            return Err(ProcessError::parse("ultimo_folio", &folio.to_string()));
        }
        next.next_folio = folio;
    }

    if update.clear_cutoff {
        next.last_cutoff = None;
        return Ok(next);
    }

    let time = update.time.as_deref().map(parse_time).transpose()?;
    match (update.date.as_deref(), time) {
        (Some(date), time) => {
            let date = parse_date(date)?;
            let time = time
                .or_else(|| current.last_cutoff.map(|c| c.time()))
                .unwrap_or(NaiveTime::MIN);
            next.last_cutoff = Some(date.and_time(time));
        }
        (None, Some(time)) => match current.last_cutoff {
            Some(cutoff) => next.last_cutoff = Some(cutoff.date().and_time(time)),
            None => return Err(ProcessError::parse("ultimo_registro", "")),
        },
        (None, None) => {}
    }

    Ok(next)
}
