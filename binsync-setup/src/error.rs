use std::path::PathBuf;

use thiserror::Error;

use crate::step::StepKind;

/// Error surface for setup steps.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("{step} failed: {reason}")]
    StepFailed { step: StepKind, reason: String },

    #[error("cannot start {tool}: {source}")]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SetupError {
    SetupError::Io {
        path: path.into(),
        source,
    }
}
