//! binsync core library: domain types, progress reporting, remembered
//! preferences, errors.
//!
//! - [`types`]: revisions, archives, sessions and the terminal status contract
//! - [`progress`]: stage-tagged progress events and sinks
//! - [`preferences`]: per-workspace remembered settings
//! - [`error`]: [`PreferencesError`]

pub mod error;
pub mod preferences;
pub mod progress;
pub mod types;

pub use error::PreferencesError;
pub use progress::{Progress, ProgressEvent, ProgressSink};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    ArchiveDescriptor, RevisionEntry, RevisionId, Stage, SyncSession, SyncStatus,
    ARCHIVE_EXTENSION, DEFAULT_SCAN_DEPTH,
};
