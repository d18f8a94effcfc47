//! Error types for binsync-sync.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while locating and applying an archive.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The revision history could not be read.
    #[error("cannot read revision history at {path}: {source}")]
    RepositoryQuery {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },

    /// No revision within the scan bound satisfied the selection criterion.
    #[error("no revision within the last {depth} matches {criterion}")]
    NoMatchingRevision { criterion: String, depth: usize },

    /// The source directory does not contain the expected archive.
    #[error("archive {file_name} not found in {dir}")]
    ArchiveNotFound { dir: PathBuf, file_name: String },

    /// The source directory itself could not be listed.
    #[error("cannot list archive directory {dir}: {source}")]
    SourceUnavailable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive could not be opened or read.
    #[error("unreadable archive {path}: {source}")]
    UnreadableArchive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// An archive entry would escape the workspace root.
    #[error("archive entry '{name}' has an unsafe path")]
    UnsafeEntry { name: String },

    /// An I/O error while deleting, extracting or recording files.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::RepositoryQuery`].
pub(crate) fn query_err(path: impl Into<PathBuf>, source: git2::Error) -> SyncError {
    SyncError::RepositoryQuery {
        path: path.into(),
        source,
    }
}
