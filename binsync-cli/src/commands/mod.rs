pub mod config;
pub mod status;
pub mod sync;
pub mod targets;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub(crate) fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Canonical workspace root: `arg`, or the current directory.
pub(crate) fn resolve_workspace(arg: Option<&Path>) -> Result<PathBuf> {
    let path = match arg {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir().context("could not determine current directory")?,
    };
    path.canonicalize()
        .with_context(|| format!("workspace '{}' does not exist", path.display()))
}

/// At most two entries, then `+N more`.
pub(crate) fn summarize(items: &[String]) -> String {
    if items.is_empty() {
        return "none".to_string();
    }
    let mut shown: Vec<String> = items.iter().take(2).cloned().collect();
    if items.len() > shown.len() {
        shown.push(format!("+{} more", items.len() - shown.len()));
    }
    shown.join(", ")
}
