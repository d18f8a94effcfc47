//! Launch target discovery.
//!
//! Walks a workspace a few directory levels deep looking for project files
//! (`*.uproject` by default). `Engine` and `Templates` directories are never
//! entered: they hold engine samples, not the user's projects.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{io_err, DetectError};

pub const DEFAULT_TARGET_EXTENSION: &str = "uproject";

/// Separators allowed in the path of a searched directory: with 3,
/// `a/b/c/d/Game.uproject` is found and `a/b/c/d/e/Game.uproject` is not.
pub const LAUNCH_TARGET_DEPTH: usize = 3;

const SKIPPED_DIRS: &[&str] = &["Engine", "Templates"];

/// A project file the user can choose to open after a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchTarget {
    /// Workspace-relative path.
    pub path: PathBuf,
    /// File stem shown to the user.
    pub display_name: String,
}

impl LaunchTarget {
    fn new(path: PathBuf) -> Self {
        let display_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, display_name }
    }
}

/// Find every file with `extension` under `root`, in directories whose
/// relative path has at most `max_depth` separators. Results are sorted by relative path.
pub fn discover_launch_targets(
    root: &Path,
    extension: &str,
    max_depth: usize,
) -> Result<Vec<LaunchTarget>, DetectError> {
    if !root.is_dir() {
        return Err(DetectError::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let mut found = Vec::new();
    walk(root, Path::new(""), 0, extension, max_depth, &mut found)?;
    found.sort();
    Ok(found.into_iter().map(LaunchTarget::new).collect())
}

fn walk(
    dir: &Path,
    relative: &Path,
    depth: usize,
    extension: &str,
    max_depth: usize,
    found: &mut Vec<PathBuf>,
) -> Result<(), DetectError> {
    let entries = fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let name = entry.file_name();
        let file_type = entry.file_type().map_err(|e| io_err(entry.path(), e))?;

        if file_type.is_dir() {
            if depth > max_depth || SKIPPED_DIRS.iter().any(|s| name == *s) {
                continue;
            }
            walk(
                &entry.path(),
                &relative.join(&name),
                depth + 1,
                extension,
                max_depth,
                found,
            )?;
        } else if file_type.is_file()
            && Path::new(&name).extension().and_then(|e| e.to_str()) == Some(extension)
        {
            found.push(relative.join(&name));
        }
    }
    Ok(())
}
