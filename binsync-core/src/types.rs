//! Domain types for binary sync.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Extension (without the dot) every revision archive carries.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Number of history entries inspected when the caller gives no bound.
pub const DEFAULT_SCAN_DEPTH: usize = 50;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// An immutable revision identifier (a full commit hash for git histories).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RevisionId(pub String);

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RevisionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RevisionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// History and archives
// ---------------------------------------------------------------------------

/// One entry of a read-only history snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionEntry {
    pub id: RevisionId,
    /// Decorations attached to the revision, in the order the history reported them.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl RevisionEntry {
    pub fn new(id: impl Into<RevisionId>, labels: &[&str]) -> Self {
        Self {
            id: id.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    /// `true` when any label contains `pattern` (case-sensitive substring).
    pub fn has_label_containing(&self, pattern: &str) -> bool {
        self.labels.iter().any(|label| label.contains(pattern))
    }
}

/// A revision archive known to exist in the source directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveDescriptor {
    pub path: PathBuf,
    pub revision: RevisionId,
}

impl ArchiveDescriptor {
    /// Expected archive file name for `revision`: `<revision>.zip`.
    pub fn file_name_for(revision: &RevisionId) -> String {
        format!("{}.{ARCHIVE_EXTENSION}", revision.0)
    }

    /// File name of the archive on disk, used in the manifest header.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| Self::file_name_for(&self.revision))
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Everything one sync invocation needs. Built per run and passed through
/// every stage; nothing here is global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSession {
    /// Directory holding `<revision>.zip` archives.
    pub source_dir: PathBuf,
    /// Root of the version-controlled workspace that receives the files.
    pub workspace_root: PathBuf,
    /// Run the dependency setup pipeline before extraction.
    pub apply_setup: bool,
    /// Report what would happen without touching the workspace.
    pub dry_run: bool,
    /// Entry point to start after a successful sync, relative to the workspace
    /// root unless absolute.
    pub launch_target: Option<PathBuf>,
    /// Label substring selecting the revision. `None` selects the most recent
    /// revision that has an archive.
    pub tag_pattern: Option<String>,
    /// Maximum number of history entries inspected.
    pub max_depth: usize,
    /// Executable that must not be running while files are replaced.
    pub guarded_executable: Option<PathBuf>,
}

impl SyncSession {
    pub fn new(source_dir: impl Into<PathBuf>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            workspace_root: workspace_root.into(),
            apply_setup: false,
            dry_run: false,
            launch_target: None,
            tag_pattern: None,
            max_depth: DEFAULT_SCAN_DEPTH,
            guarded_executable: None,
        }
    }

    /// Resolve a workspace-relative path; absolute paths pass through.
    pub fn workspace_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}

// ---------------------------------------------------------------------------
// Result contract
// ---------------------------------------------------------------------------

/// Pipeline stage tag carried by progress events and failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Guard,
    History,
    Match,
    Resolve,
    Setup,
    Extraction,
    Launch,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Guard => write!(f, "guard"),
            Stage::History => write!(f, "history"),
            Stage::Match => write!(f, "match"),
            Stage::Resolve => write!(f, "resolve"),
            Stage::Setup => write!(f, "setup"),
            Stage::Extraction => write!(f, "extraction"),
            Stage::Launch => write!(f, "launch"),
        }
    }
}

/// Terminal status of a sync session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Canceled,
    Busy { reason: String },
    Failed { stage: Stage, message: String },
}

impl SyncStatus {
    pub fn failed(stage: Stage, message: impl fmt::Display) -> Self {
        SyncStatus::Failed {
            stage,
            message: message.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncStatus::Success)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Canceled => write!(f, "canceled"),
            SyncStatus::Busy { reason } => write!(f, "busy: {reason}"),
            SyncStatus::Failed { stage, message } => write!(f, "{stage} failed: {message}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
