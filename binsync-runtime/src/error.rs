use std::path::PathBuf;

use thiserror::Error;

use binsync_core::Stage;

/// Error surface for one sync session, folding every stage's errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sync(#[from] binsync_sync::SyncError),

    #[error(transparent)]
    Setup(#[from] binsync_setup::SetupError),

    #[error(transparent)]
    Launch(#[from] crate::launch::LaunchError),

    #[error("{} is running; close it before syncing", executable.display())]
    ProcessBusy { executable: PathBuf },

    #[error("{task} task join failure: {message}")]
    Join { task: &'static str, message: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SessionError {
    SessionError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn join_err(task: &'static str, err: tokio::task::JoinError) -> SessionError {
    SessionError::Join {
        task,
        message: err.to_string(),
    }
}

/// A fatal error tagged with the stage that raised it.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: SessionError,
}

pub(crate) trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, StageFailure>;
}

impl<T, E: Into<SessionError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: Stage) -> Result<T, StageFailure> {
        self.map_err(|e| StageFailure {
            stage,
            error: e.into(),
        })
    }
}
