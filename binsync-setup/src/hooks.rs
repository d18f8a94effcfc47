//! Git hooks that re-run the dependency fetch after checkout and merge.

use std::fs;
use std::path::{Path, PathBuf};

use git2::Repository;

use crate::error::{io_err, SetupError};

pub const HOOK_NAMES: [&str; 2] = ["post-checkout", "post-merge"];

/// Where git runs hooks from for `workspace`: `core.hooksPath` when set,
/// otherwise `hooks` under the common git directory. Linked worktrees and
/// submodules (a `.git` file instead of a directory) resolve the same way.
/// `None` when `workspace` is not a repository root.
pub fn hooks_dir(workspace: &Path) -> Option<PathBuf> {
    let repo = Repository::open(workspace).ok()?;
    let configured = repo
        .config()
        .ok()
        .and_then(|config| config.get_path("core.hooksPath").ok());
    Some(match configured {
        Some(path) if path.is_absolute() => path,
        Some(path) => repo.workdir().unwrap_or(workspace).join(path),
        None => repo.commondir().join("hooks"),
    })
}

/// Two-line POSIX shell script running `command`.
pub fn hook_script(command: &str) -> String {
    format!("#!/bin/sh\n{command}\n")
}

/// Overwrite every hook in [`HOOK_NAMES`] under `hooks_dir`.
pub fn write_hooks(hooks_dir: &Path, command: &str) -> Result<Vec<PathBuf>, SetupError> {
    fs::create_dir_all(hooks_dir).map_err(|e| io_err(hooks_dir, e))?;
    let script = hook_script(command);

    let mut written = Vec::with_capacity(HOOK_NAMES.len());
    for name in HOOK_NAMES {
        let path = hooks_dir.join(name);
        fs::write(&path, &script).map_err(|e| io_err(&path, e))?;
        set_executable(&path)?;
        tracing::debug!(hook = %path.display(), "wrote git hook");
        written.push(path);
    }
    Ok(written)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), SetupError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), SetupError> {
    Ok(())
}
