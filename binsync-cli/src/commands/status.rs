//! `binsync status`: what the last sync wrote and whether it is still there.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use binsync_core::preferences;
use binsync_sync::{check_status, ManifestStatus};

use super::{home_dir, resolve_workspace, summarize};

/// Arguments for `binsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Workspace root (defaults to the current directory).
    #[arg(long, short = 'w')]
    pub workspace: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatusJson {
    workspace: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    binary_source: Option<PathBuf>,
    #[serde(flatten)]
    manifest: ManifestStatus,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "field")]
    field: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let workspace = resolve_workspace(self.workspace.as_deref())?;
        let remembered = preferences::workspace_at(&home, &workspace)
            .context("failed to load remembered settings")?;
        let status = check_status(&workspace)
            .with_context(|| format!("status check failed for '{}'", workspace.display()))?;

        if self.json {
            let payload = StatusJson {
                workspace,
                binary_source: remembered.binary_source,
                manifest: status,
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        let mut rows = vec![StatusRow {
            field: "workspace",
            value: workspace.display().to_string(),
        }];
        if let Some(source) = &remembered.binary_source {
            rows.push(StatusRow {
                field: "binary source",
                value: source.display().to_string(),
            });
        }
        rows.push(StatusRow {
            field: "status",
            value: status_label(&status),
        });
        match &status {
            ManifestStatus::NeverSynced => {}
            ManifestStatus::Current {
                archive_name,
                files,
                synced_ago,
            } => {
                rows.push(StatusRow {
                    field: "archive",
                    value: archive_name.clone(),
                });
                rows.push(StatusRow {
                    field: "files",
                    value: files.to_string(),
                });
                rows.push(StatusRow {
                    field: "last sync",
                    value: format!("{synced_ago} ago"),
                });
            }
            ManifestStatus::Incomplete {
                archive_name,
                files,
                missing,
            } => {
                rows.push(StatusRow {
                    field: "archive",
                    value: archive_name.clone(),
                });
                rows.push(StatusRow {
                    field: "files",
                    value: files.to_string(),
                });
                rows.push(StatusRow {
                    field: "missing",
                    value: summarize(missing),
                });
            }
        }

        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");

        if !matches!(status, ManifestStatus::Current { .. }) {
            println!("Run 'binsync sync' to apply the matching archive.");
        }
        Ok(())
    }
}

fn status_label(status: &ManifestStatus) -> String {
    match status {
        ManifestStatus::NeverSynced => "■ NEVER SYNCED".bright_black().bold().to_string(),
        ManifestStatus::Current { .. } => "■ CURRENT".green().bold().to_string(),
        ManifestStatus::Incomplete { .. } => "■ INCOMPLETE".red().bold().to_string(),
    }
}
