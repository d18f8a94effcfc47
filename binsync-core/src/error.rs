//! Error types for binsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading or saving remembered preferences.
#[derive(Debug, Error)]
pub enum PreferencesError {
    /// Underlying I/O failure (permission denied, read-only home, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse preferences at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`, so we cannot locate `~/.binsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
