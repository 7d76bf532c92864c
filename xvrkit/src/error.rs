use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoseError>;

/// Failures of loading a displayable pose from a parameter record.
///
/// None of these are fatal to the caller: the display goes back to zero and
/// the user may pick another file.
#[derive(Debug, Error)]
pub enum PoseError {
    #[error("no pose data found (expected 'final_pose' or 'rotations'/'translations')")]
    NotFound,

    #[error("invalid {entry} shape: {shape:?} (expected {expected:?})")]
    Shape {
        entry: &'static str,
        shape: Vec<usize>,
        expected: Vec<usize>,
    },

    #[error("could not read parameters file {path}: {reason}")]
    Read { path: PathBuf, reason: ReadFailure },
}

/// What went wrong while reading a parameter record from disk.
#[derive(Debug, Error)]
pub enum ReadFailure {
    #[error("file not found")]
    Missing,

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("not a valid parameter record: {0}")]
    Malformed(String),
}

impl PoseError {
    pub(crate) fn read(path: impl Into<PathBuf>, reason: ReadFailure) -> Self {
        PoseError::Read {
            path: path.into(),
            reason,
        }
    }
}

pub type RunResult<T> = std::result::Result<T, RunError>;

/// Failures of preparing or running an external `xvr` command.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("`{program}` command not found. Make sure xvr is installed and your environment is activated")]
    NotInstalled { program: String },

    #[error("invalid {field}: {reason}")]
    InvalidOption { field: &'static str, reason: String },

    #[error("{what} not found at {path}")]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("process error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of loading front-end settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
