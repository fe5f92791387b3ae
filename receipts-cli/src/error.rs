//! Error taxonomy for a processing run

use std::path::{Path, PathBuf};

/// Error raised by the loader, checkpoint store, template writer or orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Required input columns are absent
    Schema { missing: Vec<String> },
    /// A checkpoint value could not be parsed
    Parse { field: String, value: String },
    /// The input file could not be opened or decoded
    Input { path: PathBuf, message: String },
    /// Checkpoint read/write failure
    Storage { path: PathBuf, message: String },
    /// Template load or output save failure
    Template { path: PathBuf, message: String },
}

impl ProcessError {
    pub fn input(path: &Path, err: impl std::fmt::Display) -> Self {
        ProcessError::Input {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn storage(path: &Path, err: impl std::fmt::Display) -> Self {
        ProcessError::Storage {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn template(path: &Path, err: impl std::fmt::Display) -> Self {
        ProcessError::Template {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn parse(field: &str, value: &str) -> Self {
        ProcessError::Parse {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::Schema { missing } => write!(
                f,
                "input is missing required columns: {}",
                missing.join(", ")
            ),
            ProcessError::Parse { field, value } => {
                write!(f, "invalid value for {}: '{}'", field, value)
            }
            ProcessError::Input { path, message } => {
                write!(f, "failed to read input {}: {}", path.display(), message)
            }
            ProcessError::Storage { path, message } => {
                write!(f, "checkpoint storage error at {}: {}", path.display(), message)
            }
            ProcessError::Template { path, message } => {
                write!(f, "template error at {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for ProcessError {}

pub type Result<T, E = ProcessError> = std::result::Result<T, E>;
