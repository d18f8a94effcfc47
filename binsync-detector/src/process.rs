//! Is the protected application running?
//!
//! Comparison is by canonicalized executable path, never by process name:
//! two installs of the same editor must not block each other.

use std::path::{Path, PathBuf};

use sysinfo::{ProcessRefreshKind, System, UpdateKind};

/// Editor binary guarded by default, relative to the workspace root.
pub const DEFAULT_GUARDED_EXECUTABLE: &str = "Engine/Binaries/Win64/UnrealEditor.exe";

/// Source of executable paths for the live processes on this host.
pub trait ProcessTable: Send + Sync {
    fn executables(&self) -> Vec<PathBuf>;
}

/// The host's process table, read through `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn executables(&self) -> Vec<PathBuf> {
        let mut system = System::new();
        system.refresh_processes_specifics(
            ProcessRefreshKind::new().with_exe(UpdateKind::OnlyIfNotSet),
        );
        system
            .processes()
            .values()
            .filter_map(|process| process.exe().map(Path::to_path_buf))
            .collect()
    }
}

/// `true` if a process started from `executable` is running on this host.
pub fn is_running(executable: &Path) -> bool {
    is_running_in(&SystemProcessTable, executable)
}

/// [`is_running`] against an explicit process table.
///
/// A target that cannot be canonicalized (it does not exist) is never running.
pub fn is_running_in(table: &dyn ProcessTable, executable: &Path) -> bool {
    let Ok(target) = executable.canonicalize() else {
        tracing::debug!(
            executable = %executable.display(),
            "guarded executable does not exist; treating as not running",
        );
        return false;
    };

    let running = table
        .executables()
        .iter()
        .any(|exe| exe.canonicalize().unwrap_or_else(|_| exe.clone()) == target);
    if running {
        tracing::info!(executable = %target.display(), "guarded executable is running");
    }
    running
}
