//! # binsync-sync
//!
//! Revision selection and manifest-tracked archive extraction.
//!
//! [`history`] reads the workspace's revision history, [`matcher`] picks the
//! revision, [`resolver`] finds its archive and [`extractor`] applies it,
//! using [`manifest`] to remove whatever the previous sync wrote.

pub mod error;
pub mod extractor;
pub mod history;
pub mod manifest;
pub mod matcher;
pub mod resolver;
pub mod status;

pub use error::SyncError;
pub use extractor::{apply, AppliedArchive, ExtractOutcome, ExtractPlan};
pub use history::{GitHistory, RevisionSource};
pub use manifest::Manifest;
pub use matcher::{find_first_available, find_match};
pub use resolver::resolve;
pub use status::{check as check_status, ManifestStatus};
