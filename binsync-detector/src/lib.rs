//! Workspace and host inspection for `binsync-detector`.
//!
//! - [`process`] answers "is the protected application running right now?"
//!   by exact executable-path comparison against the live process table.
//! - [`targets`] discovers launchable project files inside a workspace.

pub mod process;
pub mod targets;

use std::path::PathBuf;

use thiserror::Error;

pub use process::{
    is_running, is_running_in, ProcessTable, SystemProcessTable, DEFAULT_GUARDED_EXECUTABLE,
};
pub use targets::{
    discover_launch_targets, LaunchTarget, DEFAULT_TARGET_EXTENSION, LAUNCH_TARGET_DEPTH,
};

/// Errors from workspace inspection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("workspace root '{path}' is not a directory")]
    NotADirectory { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DetectError {
    DetectError::Io {
        path: path.into(),
        source,
    }
}
