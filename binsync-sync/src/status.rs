//! Workspace sync status derived from the manifest.
//!
//! Signal precedence:
//! 1. `NeverSynced` (no manifest)
//! 2. `Incomplete` (manifest lists files that are gone from the workspace)
//! 3. `Current`

use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::error::{io_err, SyncError};
use crate::manifest::{self, safe_relative};

/// Classification of a workspace against its manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ManifestStatus {
    NeverSynced,
    Current {
        archive_name: String,
        files: usize,
        /// Age of the manifest file, e.g. `3h`.
        synced_ago: String,
    },
    Incomplete {
        archive_name: String,
        files: usize,
        missing: Vec<String>,
    },
}

/// Check `workspace` against the manifest of its last sync.
pub fn check(workspace: &Path) -> Result<ManifestStatus, SyncError> {
    let Some(manifest) = manifest::load(workspace)? else {
        return Ok(ManifestStatus::NeverSynced);
    };

    let mut missing = Vec::new();
    for entry in &manifest.paths {
        let Some(relative) = safe_relative(entry) else {
            continue;
        };
        let path = workspace.join(relative);
        match std::fs::metadata(&path) {
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => missing.push(entry.clone()),
            Err(err) => return Err(io_err(&path, err)),
        }
    }

    if !missing.is_empty() {
        return Ok(ManifestStatus::Incomplete {
            archive_name: manifest.archive_name,
            files: manifest.paths.len(),
            missing,
        });
    }

    let manifest_path = manifest::manifest_path(workspace);
    let modified = std::fs::metadata(&manifest_path)
        .and_then(|m| m.modified())
        .map_err(|e| io_err(&manifest_path, e))?;
    Ok(ManifestStatus::Current {
        archive_name: manifest.archive_name,
        files: manifest.paths.len(),
        synced_ago: format_system_time_age(modified),
    })
}

/// Format age from a filesystem timestamp.
pub fn format_system_time_age(timestamp: SystemTime) -> String {
    let age = SystemTime::now()
        .duration_since(timestamp)
        .unwrap_or_default();
    format_duration(age)
}

fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Manifest;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn never_synced_without_manifest() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(check(tmp.path()).unwrap(), ManifestStatus::NeverSynced);
    }

    #[test]
    fn incomplete_lists_missing_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("present"), "x").unwrap();
        let manifest = Manifest::new(
            "C2.zip",
            vec!["present".to_string(), "gone/file".to_string()],
        );
        manifest::save(tmp.path(), &manifest).unwrap();

        match check(tmp.path()).unwrap() {
            ManifestStatus::Incomplete { missing, files, .. } => {
                assert_eq!(missing, vec!["gone/file"]);
                assert_eq!(files, 2);
            }
            other => panic!("expected incomplete, got {other:?}"),
        }
    }

    #[test]
    fn current_when_all_files_present() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("present"), "x").unwrap();
        manifest::save(tmp.path(), &Manifest::new("C2.zip", vec!["present".to_string()]))
            .unwrap();

        match check(tmp.path()).unwrap() {
            ManifestStatus::Current { archive_name, files, synced_ago } => {
                assert_eq!(archive_name, "C2.zip");
                assert_eq!(files, 1);
                assert!(synced_ago.ends_with('s'), "fresh manifest, got {synced_ago}");
            }
            other => panic!("expected current, got {other:?}"),
        }
    }

    #[test]
    fn durations_are_compact() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(180)), "3m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_secs(3 * 86400)), "3d");
    }
}
