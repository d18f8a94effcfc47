//! `binsync targets`: list project files that can be launched after a sync.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tabled::{settings::Style, Table, Tabled};

use binsync_detector::{discover_launch_targets, DEFAULT_TARGET_EXTENSION, LAUNCH_TARGET_DEPTH};

use super::resolve_workspace;

/// Arguments for `binsync targets`.
#[derive(Args, Debug)]
pub struct TargetsArgs {
    /// Workspace root (defaults to the current directory).
    #[arg(long, short = 'w')]
    pub workspace: Option<PathBuf>,

    /// File extension identifying a project, without the dot.
    #[arg(long, default_value = DEFAULT_TARGET_EXTENSION)]
    pub extension: String,

    /// Separators allowed in the relative path of a searched directory.
    #[arg(long, default_value_t = LAUNCH_TARGET_DEPTH)]
    pub depth: usize,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct TargetRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "path")]
    path: String,
}

impl TargetsArgs {
    pub fn run(self) -> Result<()> {
        let workspace = resolve_workspace(self.workspace.as_deref())?;
        let extension = self.extension.trim_start_matches('.');
        let targets = discover_launch_targets(&workspace, extension, self.depth)
            .with_context(|| format!("failed to scan '{}'", workspace.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&targets).context("failed to serialize targets")?
            );
            return Ok(());
        }

        if targets.is_empty() {
            println!("No *.{extension} files found in {}", workspace.display());
            return Ok(());
        }

        let rows: Vec<TargetRow> = targets
            .iter()
            .map(|t| TargetRow {
                name: t.display_name.clone(),
                path: t.path.display().to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
