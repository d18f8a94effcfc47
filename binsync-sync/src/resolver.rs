//! Map revisions to archive files in the source directory.
//!
//! Presence is decided from a directory listing; the archive is never opened
//! here, so a miss costs one `read_dir`.

use std::collections::BTreeSet;
use std::path::Path;

use binsync_core::{ArchiveDescriptor, RevisionId, ARCHIVE_EXTENSION};

use crate::error::SyncError;

/// File names of every `*.zip` directly inside `source_dir`. Anything else is ignored.
pub fn list_archives(source_dir: &Path) -> Result<BTreeSet<String>, SyncError> {
    let unavailable = |source| SyncError::SourceUnavailable {
        dir: source_dir.to_path_buf(),
        source,
    };
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(source_dir).map_err(unavailable)? {
        let entry = entry.map_err(unavailable)?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ARCHIVE_EXTENSION) {
            continue;
        }
        names.insert(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

/// Descriptor for `revision` if `listing` contains its archive.
pub(crate) fn lookup(
    source_dir: &Path,
    listing: &BTreeSet<String>,
    revision: &RevisionId,
) -> Option<ArchiveDescriptor> {
    let file_name = ArchiveDescriptor::file_name_for(revision);
    listing.contains(&file_name).then(|| ArchiveDescriptor {
        path: source_dir.join(&file_name),
        revision: revision.clone(),
    })
}

/// Resolve the archive for `revision` inside `source_dir`.
///
/// Fails with [`SyncError::ArchiveNotFound`] when `<revision>.zip` is absent.
pub fn resolve(source_dir: &Path, revision: &RevisionId) -> Result<ArchiveDescriptor, SyncError> {
    let listing = list_archives(source_dir)?;
    lookup(source_dir, &listing, revision).ok_or_else(|| SyncError::ArchiveNotFound {
        dir: source_dir.to_path_buf(),
        file_name: ArchiveDescriptor::file_name_for(revision),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn resolves_present_archive() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("C2.zip"), b"PK").unwrap();
        let desc = resolve(tmp.path(), &RevisionId::from("C2")).unwrap();
        assert_eq!(desc.path, tmp.path().join("C2.zip"));
        assert_eq!(desc.revision.0, "C2");
    }

    #[test]
    fn missing_archive_is_not_found() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("C1.zip"), b"PK").unwrap();
        let err = resolve(tmp.path(), &RevisionId::from("C2")).unwrap_err();
        match err {
            SyncError::ArchiveNotFound { file_name, .. } => assert_eq!(file_name, "C2.zip"),
            other => panic!("expected ArchiveNotFound, got {other:?}"),
        }
    }

    #[test]
    fn listing_ignores_other_files_and_directories() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("C1.zip"), b"PK").unwrap();
        fs::write(tmp.path().join("C1.txt"), b"notes").unwrap();
        fs::create_dir(tmp.path().join("C3.zip")).unwrap();
        let names = list_archives(tmp.path()).unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["C1.zip"]);
    }

    #[test]
    fn missing_source_dir_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let err = resolve(&tmp.path().join("nope"), &RevisionId::from("C2")).unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable { .. }), "got: {err}");
    }
}
