//! `binsync config`: remembered per-workspace settings.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use binsync_core::preferences::{self, WorkspacePreferences};

use super::{home_dir, resolve_workspace};

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the settings remembered for a workspace.
    Show {
        #[arg(long, short = 'w')]
        workspace: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Update remembered settings. Unspecified fields keep their value.
    Set {
        #[arg(long, short = 'w')]
        workspace: Option<PathBuf>,

        /// Directory containing `<revision>.zip` archives.
        #[arg(long, short = 's')]
        source: Option<PathBuf>,

        #[arg(long)]
        tag: Option<String>,

        #[arg(long)]
        depth: Option<usize>,

        #[arg(long)]
        launch: Option<PathBuf>,

        /// Run the setup steps on every sync (`true` or `false`).
        #[arg(long)]
        sync_dependencies: Option<bool>,
    },

    /// Forget everything remembered for a workspace.
    Clear {
        #[arg(long, short = 'w')]
        workspace: Option<PathBuf>,
    },
}

#[derive(Tabled)]
struct SettingRow {
    #[tabled(rename = "setting")]
    key: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    let home = home_dir()?;
    match command {
        ConfigCommand::Show { workspace, json } => {
            let workspace = resolve_workspace(workspace.as_deref())?;
            let entry = preferences::workspace_at(&home, &workspace)
                .context("failed to load remembered settings")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&entry).context("failed to serialize settings")?
                );
            } else {
                print_settings(&workspace, &entry);
            }
        }
        ConfigCommand::Set {
            workspace,
            source,
            tag,
            depth,
            launch,
            sync_dependencies,
        } => {
            let workspace = resolve_workspace(workspace.as_deref())?;
            let mut entry = preferences::workspace_at(&home, &workspace)
                .context("failed to load remembered settings")?;
            if let Some(source) = source {
                entry.binary_source = Some(source);
            }
            if tag.is_some() {
                entry.tag_pattern = tag;
            }
            if depth.is_some() {
                entry.scan_depth = depth;
            }
            if launch.is_some() {
                entry.launch_target = launch;
            }
            if let Some(enabled) = sync_dependencies {
                entry.sync_dependencies = enabled;
            }
            let saved = preferences::remember_at(&home, &workspace, entry)
                .context("failed to save settings")?;
            tracing::debug!(workspace = %workspace.display(), "settings updated");
            print_settings(&workspace, &saved);
        }
        ConfigCommand::Clear { workspace } => {
            let workspace = resolve_workspace(workspace.as_deref())?;
            let removed = preferences::forget_at(&home, &workspace)
                .context("failed to clear settings")?;
            if removed {
                println!("Forgot settings for {}", workspace.display());
            } else {
                println!("Nothing remembered for {}", workspace.display());
            }
        }
    }
    Ok(())
}

fn print_settings(workspace: &std::path::Path, entry: &WorkspacePreferences) {
    let show = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let rows = vec![
        SettingRow {
            key: "workspace",
            value: workspace.display().to_string(),
        },
        SettingRow {
            key: "binary source",
            value: show(&entry.binary_source),
        },
        SettingRow {
            key: "sync dependencies",
            value: entry.sync_dependencies.to_string(),
        },
        SettingRow {
            key: "tag pattern",
            value: entry.tag_pattern.clone().unwrap_or_else(|| "-".to_string()),
        },
        SettingRow {
            key: "scan depth",
            value: entry
                .scan_depth
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
        SettingRow {
            key: "launch target",
            value: show(&entry.launch_target),
        },
        SettingRow {
            key: "updated",
            value: entry
                .updated_at
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
