//! Start the chosen workspace entry point after a sync.
//!
//! Executables are started directly; anything else (a `.uproject`, say) goes
//! through the platform opener. The child is detached: binsync never waits
//! for it.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("launch target {} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot start {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `target` joined onto `workspace` unless already absolute; must exist.
pub fn resolve_target(workspace: &Path, target: &Path) -> Result<PathBuf, LaunchError> {
    let path = if target.is_absolute() {
        target.to_path_buf()
    } else {
        workspace.join(target)
    };
    if !path.exists() {
        return Err(LaunchError::NotFound { path });
    }
    Ok(path)
}

/// Start `target` detached. Returns the resolved path.
pub fn launch(workspace: &Path, target: &Path) -> Result<PathBuf, LaunchError> {
    let path = resolve_target(workspace, target)?;
    let mut command = opener_command(&path);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if let Some(parent) = path.parent() {
        command.current_dir(parent);
    }

    let child = command.spawn().map_err(|source| LaunchError::Spawn {
        path: path.clone(),
        source,
    })?;
    tracing::info!(target = %path.display(), pid = child.id(), "launched");
    Ok(path)
}

pub(crate) fn opener_command(path: &Path) -> Command {
    if is_executable(path) {
        return Command::new(path);
    }
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]).arg(path);
        command
    } else if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(path);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ["exe", "bat", "cmd"].contains(&e.to_ascii_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn relative_target_resolves_against_workspace() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Game")).unwrap();
        fs::write(tmp.path().join("Game/Game.uproject"), "{}").unwrap();
        let path = resolve_target(tmp.path(), Path::new("Game/Game.uproject")).unwrap();
        assert_eq!(path, tmp.path().join("Game/Game.uproject"));
    }

    #[test]
    fn missing_target_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = launch(tmp.path(), Path::new("Nope.uproject")).unwrap_err();
        assert!(matches!(err, LaunchError::NotFound { .. }), "got: {err}");
    }

    #[test]
    #[cfg(unix)]
    fn documents_go_through_the_opener() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("Game.uproject");
        fs::write(&doc, "{}").unwrap();
        let command = opener_command(&doc);
        assert_ne!(command.get_program(), doc.as_os_str());
        assert_eq!(command.get_args().last(), Some(doc.as_os_str()));
    }

    #[test]
    #[cfg(unix)]
    fn executables_start_directly() {
        let exe = Path::new("/bin/sh");
        let command = opener_command(exe);
        assert_eq!(command.get_program(), exe.as_os_str());
    }

    #[test]
    #[cfg(unix)]
    fn absolute_executable_launches() {
        let tmp = TempDir::new().unwrap();
        let launched = launch(tmp.path(), Path::new("/bin/true")).unwrap();
        assert_eq!(launched, PathBuf::from("/bin/true"));
    }
}
