//! `binsync sync`: pick the revision, apply its archive, optionally run setup
//! and launch.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use binsync_core::{
    preferences::{self, WorkspacePreferences},
    Progress, ProgressEvent, ProgressSink, Stage, SyncSession, SyncStatus, DEFAULT_SCAN_DEPTH,
};
use binsync_detector::DEFAULT_GUARDED_EXECUTABLE;
use binsync_runtime::{start_blocking, SyncEnv, SyncReport};

use super::{home_dir, resolve_workspace};

/// Exit code when the session was canceled (128 + SIGINT).
const EXIT_CANCELED: u8 = 130;
const EXIT_FAILED: u8 = 1;
const EXIT_BUSY: u8 = 2;

/// Arguments for `binsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Workspace root (defaults to the current directory).
    #[arg(long, short = 'w')]
    pub workspace: Option<PathBuf>,

    /// Directory containing `<revision>.zip` archives.
    #[arg(long, short = 's')]
    pub source: Option<PathBuf>,

    /// Select the most recent revision with a tag or branch containing this text.
    #[arg(long)]
    pub tag: Option<String>,

    /// Number of history entries to inspect.
    #[arg(long)]
    pub depth: Option<usize>,

    /// Run dependency fetch, hook registration and installers first.
    #[arg(long, conflicts_with = "no_setup")]
    pub setup: bool,

    /// Skip the setup steps even if remembered as enabled.
    #[arg(long)]
    pub no_setup: bool,

    /// Project or executable to start after a successful sync.
    #[arg(long)]
    pub launch: Option<PathBuf>,

    /// Executable that must not be running while files are replaced.
    #[arg(long, default_value = DEFAULT_GUARDED_EXECUTABLE)]
    pub guard: PathBuf,

    /// Show what would change without touching the workspace.
    #[arg(long)]
    pub dry_run: bool,

    /// Store the effective settings for this workspace. Ignored with
    /// `--dry-run`, which writes nothing.
    #[arg(long)]
    pub remember: bool,

    /// Print the session report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<ExitCode> {
        let home = home_dir()?;
        let workspace = resolve_workspace(self.workspace.as_deref())?;
        let remembered = preferences::workspace_at(&home, &workspace)
            .context("failed to load remembered settings")?;

        let effective = self.merge(&remembered);
        let Some(source) = effective.binary_source.clone() else {
            bail!("no binary source directory; pass --source or remember one with `binsync config set --source`");
        };

        if self.remember && self.dry_run {
            tracing::info!("[dry-run] would remember settings for {}", workspace.display());
        } else if self.remember {
            preferences::remember_at(&home, &workspace, effective.clone())
                .context("failed to remember settings")?;
            tracing::info!(workspace = %workspace.display(), "settings remembered");
        }

        let mut session = SyncSession::new(source, &workspace);
        session.apply_setup = effective.sync_dependencies;
        session.dry_run = self.dry_run;
        session.launch_target = effective.launch_target.clone();
        session.tag_pattern = effective.tag_pattern.clone();
        session.max_depth = effective.scan_depth.unwrap_or(DEFAULT_SCAN_DEPTH);
        session.guarded_executable = Some(self.guard.clone());

        let env = SyncEnv::for_session(&session);
        let progress: Arc<dyn ProgressSink> = Arc::new(TerminalProgress::default());
        let report = start_blocking(&session, &env, progress).context("sync session failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report")?
            );
        } else {
            print_report(&report, self.dry_run);
        }

        Ok(exit_code(&report.status))
    }

    /// Flags win over remembered settings.
    fn merge(&self, remembered: &WorkspacePreferences) -> WorkspacePreferences {
        let mut merged = remembered.clone();
        if let Some(source) = &self.source {
            merged.binary_source = Some(source.clone());
        }
        if let Some(tag) = &self.tag {
            merged.tag_pattern = Some(tag.clone());
        }
        if let Some(depth) = self.depth {
            merged.scan_depth = Some(depth);
        }
        if let Some(launch) = &self.launch {
            merged.launch_target = Some(launch.clone());
        }
        if self.setup {
            merged.sync_dependencies = true;
        } else if self.no_setup {
            merged.sync_dependencies = false;
        }
        merged
    }
}

fn exit_code(status: &SyncStatus) -> ExitCode {
    match status {
        SyncStatus::Success => ExitCode::SUCCESS,
        SyncStatus::Canceled => ExitCode::from(EXIT_CANCELED),
        SyncStatus::Busy { .. } => ExitCode::from(EXIT_BUSY),
        SyncStatus::Failed { .. } => ExitCode::from(EXIT_FAILED),
    }
}

fn print_report(report: &SyncReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    let archive = report
        .archive
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match &report.status {
        SyncStatus::Success => {
            if let Some(applied) = &report.applied {
                println!(
                    "{prefix}{} applied {} ({} written, {} removed)",
                    "✓".green().bold(),
                    archive,
                    applied.written.len(),
                    applied.removed.len(),
                );
            }
            if let Some(plan) = &report.plan {
                println!(
                    "{prefix}{} would apply {} ({} to write, {} to remove)",
                    "~".cyan().bold(),
                    archive,
                    plan.would_write.len(),
                    plan.would_remove.len(),
                );
                for path in &plan.would_remove {
                    println!("  -  {path}");
                }
                for path in &plan.would_write {
                    println!("  +  {path}");
                }
            }
            for step in &report.setup_steps {
                println!("{prefix}  setup: {step}");
            }
            if let Some(launched) = &report.launched {
                println!("  launched {}", launched.display());
            }
        }
        SyncStatus::Canceled => println!("{} sync canceled", "■".yellow().bold()),
        SyncStatus::Busy { reason } => println!("{} {reason}", "■".yellow().bold()),
        SyncStatus::Failed { stage, message } => {
            println!("{} {stage} failed: {message}", "✗".red().bold())
        }
    }

    for advisory in &report.advisories {
        println!("  {} {}: {}", "!".yellow(), advisory.stage, advisory.message);
    }
}

// ---------------------------------------------------------------------------
// Progress display
// ---------------------------------------------------------------------------

/// Single redrawn stderr line: stage plus percentage or current detail.
#[derive(Default)]
struct TerminalProgress {
    last: Mutex<Option<ProgressKey>>,
}

type ProgressKey = (Stage, Option<u8>, Option<String>);

impl TerminalProgress {
    /// Text to draw for `event`, or `None` when it repeats the previous line.
    fn render(&self, event: &ProgressEvent) -> Option<String> {
        let percent = match event.progress {
            Progress::Fraction(f) => Some((f * 100.0).round() as u8),
            Progress::Indeterminate => None,
        };
        let key = (event.stage, percent, event.detail.clone());
        let mut last = self.last.lock().ok()?;
        if last.as_ref() == Some(&key) {
            return None;
        }
        *last = Some(key);

        let text = match (percent, event.detail.as_deref()) {
            (Some(p), Some(detail)) => format!("{detail} {p:>3}%"),
            (Some(p), None) => format!("{p:>3}%"),
            (None, Some(detail)) => detail.to_string(),
            (None, None) => String::new(),
        };
        Some(format!("{} {text}", format!("[{}]", event.stage).dimmed()))
    }
}

impl ProgressSink for TerminalProgress {
    fn report(&self, event: ProgressEvent) {
        let Some(line) = self.render(&event) else {
            return;
        };
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[2K{line}");
        let _ = stderr.flush();
    }

    fn finish(&self) {
        let started = self.last.lock().map(|last| last.is_some()).unwrap_or(false);
        if started {
            eprintln!();
        }
    }
}
