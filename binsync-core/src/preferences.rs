//! Remembered per-workspace preferences.
//!
//! # Storage layout
//!
//! ```text
//! ~/.binsync/
//!   preferences.yaml   (mode 0600, directory 0700)
//! ```
//!
//! One document holds every workspace, keyed by the workspace root path.
//!
//! # API pattern
//!
//! Every function has two forms:
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PreferencesError;

pub const PREFERENCES_VERSION: u32 = 1;
const PREFERENCES_FILE: &str = "preferences.yaml";

fn default_true() -> bool {
    true
}

/// Settings remembered for one workspace between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePreferences {
    /// Directory containing the revision archives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_source: Option<PathBuf>,
    /// Run the dependency setup pipeline on sync.
    #[serde(default = "default_true")]
    pub sync_dependencies: bool,
    /// Workspace-relative entry point launched after sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_target: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_depth: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for WorkspacePreferences {
    fn default() -> Self {
        Self {
            binary_source: None,
            sync_dependencies: true,
            launch_target: None,
            tag_pattern: None,
            scan_depth: None,
            updated_at: None,
        }
    }
}

/// Root of `preferences.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub version: u32,
    #[serde(default)]
    pub workspaces: BTreeMap<String, WorkspacePreferences>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            version: PREFERENCES_VERSION,
            workspaces: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.binsync/` (pure, no I/O).
pub fn config_dir_at(home: &Path) -> PathBuf {
    home.join(".binsync")
}

/// `<home>/.binsync/preferences.yaml` (pure, no I/O).
pub fn preferences_path_at(home: &Path) -> PathBuf {
    config_dir_at(home).join(PREFERENCES_FILE)
}

/// Key under which a workspace is stored.
pub fn workspace_key(workspace: &Path) -> String {
    workspace.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load the whole preferences document.
///
/// Returns an empty document if the file does not exist yet, and
/// `PreferencesError::Parse` (with path + line context) if it is malformed.
pub fn load_at(home: &Path) -> Result<Preferences, PreferencesError> {
    let path = preferences_path_at(home);
    if !path.exists() {
        return Ok(Preferences::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| PreferencesError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Preferences, PreferencesError> {
    load_at(&home()?)
}

/// Preferences for `workspace`, or defaults when none were remembered.
pub fn workspace_at(home: &Path, workspace: &Path) -> Result<WorkspacePreferences, PreferencesError> {
    let prefs = load_at(home)?;
    Ok(prefs
        .workspaces
        .get(&workspace_key(workspace))
        .cloned()
        .unwrap_or_default())
}

/// `workspace_at` convenience wrapper.
pub fn workspace(workspace: &Path) -> Result<WorkspacePreferences, PreferencesError> {
    workspace_at(&home()?, workspace)
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the preferences document.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, prefs: &Preferences) -> Result<(), PreferencesError> {
    let dir = config_dir_at(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = preferences_path_at(home);
    let tmp_path = path.with_file_name(format!("{PREFERENCES_FILE}.tmp"));
    let yaml = serde_yaml::to_string(prefs)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(prefs: &Preferences) -> Result<(), PreferencesError> {
    save_at(&home()?, prefs)
}

/// Store `entry` for `workspace`, replacing whatever was remembered before.
pub fn remember_at(
    home: &Path,
    workspace: &Path,
    mut entry: WorkspacePreferences,
) -> Result<WorkspacePreferences, PreferencesError> {
    let mut prefs = load_at(home)?;
    entry.updated_at = Some(Utc::now());
    prefs.workspaces.insert(workspace_key(workspace), entry.clone());
    save_at(home, &prefs)?;
    Ok(entry)
}

/// `remember_at` convenience wrapper.
pub fn remember(
    workspace: &Path,
    entry: WorkspacePreferences,
) -> Result<WorkspacePreferences, PreferencesError> {
    remember_at(&home()?, workspace, entry)
}

/// Drop everything remembered for `workspace`. Returns `false` if nothing was stored.
pub fn forget_at(home: &Path, workspace: &Path) -> Result<bool, PreferencesError> {
    let mut prefs = load_at(home)?;
    if prefs.workspaces.remove(&workspace_key(workspace)).is_none() {
        return Ok(false);
    }
    save_at(home, &prefs)?;
    Ok(true)
}

/// `forget_at` convenience wrapper.
pub fn forget(workspace: &Path) -> Result<bool, PreferencesError> {
    forget_at(&home()?, workspace)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, PreferencesError> {
    dirs::home_dir().ok_or(PreferencesError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), PreferencesError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), PreferencesError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), PreferencesError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), PreferencesError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
