//! binsync: apply prebuilt binaries matching the workspace's history.
//!
//! # Usage
//!
//! ```text
//! binsync sync [--source <dir>] [--tag <pattern>] [--setup|--no-setup] [--launch <path>] [--dry-run] [--remember]
//! binsync status [--json]
//! binsync targets [--extension uproject] [--json]
//! binsync config show|set|clear
//! ```

mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    config::ConfigCommand, status::StatusArgs, sync::SyncArgs, targets::TargetsArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "binsync",
    version,
    about = "Sync prebuilt binary archives into a version-controlled workspace",
    long_about = None,
)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply the archive for the matching revision to the workspace.
    Sync(SyncArgs),

    /// Show what the last sync wrote and whether it is still in place.
    Status(StatusArgs),

    /// List project files that can be launched after a sync.
    Targets(TargetsArgs),

    /// Show or change remembered per-workspace settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    binsync_runtime::init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Sync(args) => args.run(),
        Commands::Status(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Targets(args) => args.run().map(|()| ExitCode::SUCCESS),
        Commands::Config { command } => commands::config::run(command).map(|()| ExitCode::SUCCESS),
    }
}
