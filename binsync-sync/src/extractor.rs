//! Manifest-tracked archive extraction.
//!
//! ## `apply` protocol
//!
//! 1. Open the archive and validate every entry name. An unreadable archive
//!    or an entry escaping the workspace fails here, before anything in the
//!    workspace is touched.
//! 2. Delete every file listed in the previous manifest that still exists.
//! 3. Extract entries in archive order, checking the cancellation token before
//!    each one. Cancellation returns immediately and leaves the manifest as it was.
//! 4. Replace the manifest with the sorted set of extracted file paths.
//!
//! The manifest acts as a single-entry cache keyed by workspace: the new one
//! replaces the old one, never merges with it.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use serde::Serialize;
use zip::read::ZipFile;
use zip::ZipArchive;

use binsync_core::{
    ArchiveDescriptor, CancellationToken, Progress, ProgressEvent, ProgressSink, Stage,
};

use crate::error::{io_err, SyncError};
use crate::manifest::{self, safe_relative, to_manifest_path, Manifest};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Files touched by a completed extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedArchive {
    pub archive_name: String,
    /// Sorted workspace-relative paths now recorded in the manifest.
    pub written: Vec<String>,
    /// Previous-manifest paths that existed and were deleted.
    pub removed: Vec<String>,
}

/// What a dry run would do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractPlan {
    pub archive_name: String,
    /// Sorted workspace-relative file paths the archive would write.
    pub would_write: Vec<String>,
    /// Previous-manifest paths that exist and are not rewritten by the archive.
    pub would_remove: Vec<String>,
}

/// Outcome of [`apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractOutcome {
    Applied(AppliedArchive),
    /// Dry run: nothing was touched.
    Planned(ExtractPlan),
    /// The token fired between entries. The manifest was not written.
    Canceled,
}

// ---------------------------------------------------------------------------
// apply
// ---------------------------------------------------------------------------

/// Apply `archive` to `workspace`, replacing the files recorded by the
/// previous sync.
pub fn apply(
    archive: &ArchiveDescriptor,
    workspace: &Path,
    dry_run: bool,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<ExtractOutcome, SyncError> {
    let archive_name = archive.file_name();
    let mut zip = open_archive(&archive.path)?;
    let previous = manifest::load(workspace)?;

    // Every entry is validated here, before the previous files are removed.
    let planned = plan(&mut zip, archive, workspace, previous.as_ref())?;
    if dry_run {
        tracing::info!("[dry-run] would apply {archive_name}");
        return Ok(ExtractOutcome::Planned(planned));
    }

    if cancel.is_cancelled() {
        return Ok(ExtractOutcome::Canceled);
    }

    let removed = match &previous {
        Some(previous) => remove_previous(workspace, previous)?,
        None => Vec::new(),
    };

    let total = zip.len();
    let mut written = Vec::with_capacity(total);
    for index in 0..total {
        if cancel.is_cancelled() {
            tracing::info!(
                archive = %archive_name,
                extracted = index,
                total,
                "extraction canceled; manifest left unchanged",
            );
            return Ok(ExtractOutcome::Canceled);
        }

        if let Some(relative) = extract_entry(&mut zip, index, workspace, &archive.path)? {
            written.push(to_manifest_path(&relative));
        }
        progress.report(ProgressEvent::new(
            Stage::Extraction,
            Progress::ratio(index + 1, total),
        ));
    }

    let manifest = Manifest::new(archive_name.clone(), written);
    manifest::save(workspace, &manifest)?;

    tracing::info!(
        archive = %archive_name,
        written = manifest.paths.len(),
        removed = removed.len(),
        "archive applied",
    );
    Ok(ExtractOutcome::Applied(AppliedArchive {
        archive_name,
        written: manifest.paths,
        removed,
    }))
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, SyncError> {
    let file = File::open(path).map_err(|e| io_err(path, e))?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| SyncError::UnreadableArchive {
        path: path.to_path_buf(),
        source,
    })
}

/// Delete the files `previous` recorded. Missing files are skipped; unsafe
/// lines are logged and ignored.
fn remove_previous(workspace: &Path, previous: &Manifest) -> Result<Vec<String>, SyncError> {
    let mut removed = Vec::new();
    for entry in &previous.paths {
        let Some(relative) = safe_relative(entry) else {
            tracing::warn!(entry = %entry, "ignoring unsafe manifest entry");
            continue;
        };
        let path = workspace.join(relative);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("removed: {}", path.display());
                removed.push(entry.clone());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&path, e)),
        }
    }
    Ok(removed)
}

/// Extract entry `index`. Returns the relative path of a written file, or
/// `None` for a directory entry.
fn extract_entry(
    zip: &mut ZipArchive<BufReader<File>>,
    index: usize,
    workspace: &Path,
    archive_path: &Path,
) -> Result<Option<PathBuf>, SyncError> {
    let mut entry = zip
        .by_index(index)
        .map_err(|source| SyncError::UnreadableArchive {
            path: archive_path.to_path_buf(),
            source,
        })?;
    let relative = entry_path(&entry)?;
    let dest = workspace.join(&relative);

    if entry.is_dir() {
        std::fs::create_dir_all(&dest).map_err(|e| io_err(&dest, e))?;
        return Ok(None);
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    // Replace rather than truncate so read-only files from an earlier sync
    // do not block the write.
    match std::fs::remove_file(&dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(&dest, e)),
    }
    let mut out = File::create(&dest).map_err(|e| io_err(&dest, e))?;
    io::copy(&mut entry, &mut out).map_err(|e| io_err(&dest, e))?;

    #[cfg(unix)]
    if let Some(mode) = entry.unix_mode() {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(mode & 0o7777))
            .map_err(|e| io_err(&dest, e))?;
    }

    tracing::debug!("wrote: {}", dest.display());
    Ok(Some(relative))
}

/// Workspace-relative destination of an archive entry, directories included.
/// Any `..` component is rejected, even one that stays inside the workspace,
/// so recorded manifest lines always load back as the same path.
fn entry_path(entry: &ZipFile<'_>) -> Result<PathBuf, SyncError> {
    entry
        .enclosed_name()
        .and(safe_relative(entry.name()))
        .ok_or_else(|| SyncError::UnsafeEntry {
            name: entry.name().to_string(),
        })
}

fn plan(
    zip: &mut ZipArchive<BufReader<File>>,
    archive: &ArchiveDescriptor,
    workspace: &Path,
    previous: Option<&Manifest>,
) -> Result<ExtractPlan, SyncError> {
    let archive_name = archive.file_name();
    let mut would_write = BTreeSet::new();
    for index in 0..zip.len() {
        let entry = zip.by_index_raw(index).map_err(|source| SyncError::UnreadableArchive {
            path: archive.path.clone(),
            source,
        })?;
        let relative = entry_path(&entry)?;
        if entry.is_dir() {
            continue;
        }
        would_write.insert(to_manifest_path(&relative));
    }

    let would_remove = previous
        .map(|m| {
            m.paths
                .iter()
                .filter(|p| !would_write.contains(*p))
                .filter(|p| safe_relative(p).is_some_and(|rel| workspace.join(rel).exists()))
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    Ok(ExtractPlan {
        archive_name,
        would_write: would_write.into_iter().collect(),
        would_remove,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
