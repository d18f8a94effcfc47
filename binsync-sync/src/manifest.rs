//! Manifest: the record of which workspace files the last sync wrote.
//!
//! One manifest per workspace, at `<workspace>/extracted_binaries.txt`:
//!
//! ```text
//! Binary sync from <archive name>
//! ==================================================
//! Engine/Binaries/Win64/UnrealEditor.exe
//! Game/Binaries/Win64/Game.dll
//! ```
//!
//! Paths are workspace-relative with `/` separators and sorted, so the file is
//! byte-stable for a given archive. Each successful sync replaces it wholesale;
//! writes use the `.tmp` + rename pattern.

use std::path::{Component, Path, PathBuf};

use crate::error::{io_err, SyncError};

pub const MANIFEST_FILE_NAME: &str = "extracted_binaries.txt";
const HEADER_PREFIX: &str = "Binary sync from ";
const SEPARATOR: &str = "==================================================";

/// Parsed manifest contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// File name of the archive that produced this manifest.
    pub archive_name: String,
    /// Sorted, de-duplicated workspace-relative paths.
    pub paths: Vec<String>,
}

impl Manifest {
    pub fn new(archive_name: impl Into<String>, paths: impl IntoIterator<Item = String>) -> Self {
        let mut paths: Vec<String> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();
        Self {
            archive_name: archive_name.into(),
            paths,
        }
    }

    /// On-disk text form.
    pub fn render(&self) -> String {
        let mut out = format!("{HEADER_PREFIX}{}\n{SEPARATOR}\n", self.archive_name);
        for path in &self.paths {
            out.push_str(path);
            out.push('\n');
        }
        out
    }

    /// Parse the on-disk text form. The two header lines are skipped; the
    /// archive name is recovered from the first when it has the expected shape.
    pub fn parse(contents: &str) -> Self {
        let mut lines = contents.lines().map(|l| l.trim_end_matches('\r'));
        let header = lines.next().unwrap_or_default();
        let _separator = lines.next();
        let archive_name = header
            .strip_prefix(HEADER_PREFIX)
            .unwrap_or_default()
            .to_string();
        let paths = lines
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();
        Self::new(archive_name, paths)
    }
}

/// `<workspace>/extracted_binaries.txt`
pub fn manifest_path(workspace: &Path) -> PathBuf {
    workspace.join(MANIFEST_FILE_NAME)
}

/// Load the manifest for `workspace`, or `None` if no sync has completed yet.
pub fn load(workspace: &Path) -> Result<Option<Manifest>, SyncError> {
    let path = manifest_path(workspace);
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(Some(Manifest::parse(&contents))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(path, e)),
    }
}

/// Replace the manifest for `workspace` atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save(workspace: &Path, manifest: &Manifest) -> Result<(), SyncError> {
    let path = manifest_path(workspace);
    let tmp = path.with_extension("txt.tmp");
    std::fs::write(&tmp, manifest.render()).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    Ok(())
}

/// Workspace-relative manifest form of `relative` (`/`-separated).
pub fn to_manifest_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Interpret a manifest line as a path under the workspace.
///
/// Returns `None` for absolute paths or anything climbing out with `..`;
/// those lines are never acted upon.
pub fn safe_relative(entry: &str) -> Option<PathBuf> {
    let path = Path::new(entry);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!out.as_os_str().is_empty()).then_some(out)
}
