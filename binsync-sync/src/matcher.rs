//! Revision selection over a bounded, most-recent-first history.

use std::path::Path;

use binsync_core::{ArchiveDescriptor, RevisionEntry};

use crate::error::SyncError;
use crate::resolver::{list_archives, lookup};

/// First entry among the first `max_depth` of `history` carrying a label that
/// contains `pattern`.
///
/// Entries past `max_depth` are never inspected.
pub fn find_match<'a>(
    history: &'a [RevisionEntry],
    pattern: &str,
    max_depth: usize,
) -> Result<&'a RevisionEntry, SyncError> {
    find_match_in(history, pattern, max_depth)
}

/// [`find_match`] over any in-order sequence of entries.
pub fn find_match_in<'a, I>(
    entries: I,
    pattern: &str,
    max_depth: usize,
) -> Result<&'a RevisionEntry, SyncError>
where
    I: IntoIterator<Item = &'a RevisionEntry>,
{
    entries
        .into_iter()
        .take(max_depth)
        .find(|entry| entry.has_label_containing(pattern))
        .ok_or_else(|| SyncError::NoMatchingRevision {
            criterion: format!("a label containing '{pattern}'"),
            depth: max_depth,
        })
}

/// Most recent revision among the first `max_depth` that has an archive in
/// `source_dir`. The directory is listed once.
pub fn find_first_available(
    history: &[RevisionEntry],
    source_dir: &Path,
    max_depth: usize,
) -> Result<ArchiveDescriptor, SyncError> {
    let listing = list_archives(source_dir)?;
    history
        .iter()
        .take(max_depth)
        .find_map(|entry| lookup(source_dir, &listing, &entry.id))
        .ok_or_else(|| SyncError::NoMatchingRevision {
            criterion: format!("an archive in {}", source_dir.display()),
            depth: max_depth,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;
    use std::fs;
    use tempfile::TempDir;

    fn sample() -> Vec<RevisionEntry> {
        vec![
            RevisionEntry::new("C3", &[]),
            RevisionEntry::new("C2", &["v2-Editor"]),
            RevisionEntry::new("C1", &[]),
        ]
    }

    #[test]
    fn finds_most_recent_labelled_entry() {
        let history = sample();
        let found = find_match(&history, "Editor", 50).unwrap();
        assert_eq!(found.id.0, "C2");
    }

    #[test]
    fn earliest_match_wins() {
        let history = vec![
            RevisionEntry::new("C4", &["nightly"]),
            RevisionEntry::new("C3", &["v3-Editor"]),
            RevisionEntry::new("C2", &["v2-Editor"]),
        ];
        assert_eq!(find_match(&history, "Editor", 50).unwrap().id.0, "C3");
    }

    #[rstest]
    #[case("editor", 50)]
    #[case("Editor", 1)]
    #[case("Editor", 0)]
    fn no_match_cases(#[case] pattern: &str, #[case] depth: usize) {
        let history = sample();
        let err = find_match(&history, pattern, depth).unwrap_err();
        assert!(matches!(err, SyncError::NoMatchingRevision { .. }), "got: {err}");
    }

    #[test]
    fn empty_history_is_no_match() {
        let err = find_match(&[], "Editor", 50).unwrap_err();
        assert!(matches!(err, SyncError::NoMatchingRevision { depth: 50, .. }));
    }

    #[test]
    fn entries_beyond_depth_are_never_inspected() {
        let history = vec![
            RevisionEntry::new("C4", &[]),
            RevisionEntry::new("C3", &[]),
            RevisionEntry::new("C2", &["v2-Editor"]),
            RevisionEntry::new("C1", &["v1-Editor"]),
        ];
        let inspected = Cell::new(0usize);
        let counted = history.iter().inspect(|_| inspected.set(inspected.get() + 1));
        assert!(find_match_in(counted, "Editor", 2).is_err());
        assert_eq!(inspected.get(), 2);
    }

    #[test]
    fn first_available_picks_most_recent_archive() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("C2.zip"), b"PK").unwrap();
        fs::write(tmp.path().join("C1.zip"), b"PK").unwrap();
        let found = find_first_available(&sample(), tmp.path(), 50).unwrap();
        assert_eq!(found.revision.0, "C2");
    }

    #[test]
    fn first_available_respects_depth() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("C1.zip"), b"PK").unwrap();
        let err = find_first_available(&sample(), tmp.path(), 2).unwrap_err();
        assert!(matches!(err, SyncError::NoMatchingRevision { .. }), "got: {err}");
    }
}
