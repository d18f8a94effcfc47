//! Run a planned list of setup steps in order.
//!
//! A fatal step that fails aborts the pipeline with [`SetupError`]; an
//! advisory step that fails is recorded in the outcome and the pipeline moves
//! on. Cancellation returns [`SetupOutcome::Canceled`] immediately.

use std::path::Path;

use serde::Serialize;

use binsync_core::{CancellationToken, ProgressEvent, ProgressSink, Stage};

use crate::error::SetupError;
use crate::hooks;
use crate::step::{SetupStep, StepAction, StepKind};
use crate::supervise::{run_tool, ToolExit};

/// A non-fatal step failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupAdvisory {
    pub step: StepKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupOutcome {
    Completed {
        ran: Vec<StepKind>,
        advisories: Vec<SetupAdvisory>,
    },
    /// Dry run: the steps that would run.
    Planned(Vec<StepKind>),
    Canceled,
}

enum StepResult {
    Done,
    Canceled,
}

pub async fn run(
    steps: &[SetupStep],
    workspace: &Path,
    dry_run: bool,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<SetupOutcome, SetupError> {
    if dry_run {
        for step in steps {
            tracing::info!("[dry-run] would run {}", step.kind);
        }
        return Ok(SetupOutcome::Planned(steps.iter().map(|s| s.kind).collect()));
    }

    let mut ran = Vec::with_capacity(steps.len());
    let mut advisories = Vec::new();

    for step in steps {
        if cancel.is_cancelled() {
            return Ok(SetupOutcome::Canceled);
        }
        progress.report(ProgressEvent::indeterminate(Stage::Setup, step.kind.to_string()));
        tracing::info!(step = %step.kind, "running setup step");

        match execute(step, workspace, cancel, progress).await {
            Ok(StepResult::Done) => ran.push(step.kind),
            Ok(StepResult::Canceled) => return Ok(SetupOutcome::Canceled),
            Err(err) if step.is_fatal() => {
                tracing::error!(step = %step.kind, error = %err, "setup step failed");
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(step = %step.kind, error = %err, "setup step failed; continuing");
                advisories.push(SetupAdvisory {
                    step: step.kind,
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(SetupOutcome::Completed { ran, advisories })
}

async fn execute(
    step: &SetupStep,
    workspace: &Path,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<StepResult, SetupError> {
    match &step.action {
        StepAction::WriteHooks { hooks_dir, command } => {
            hooks::write_hooks(hooks_dir, command)?;
            Ok(StepResult::Done)
        }
        StepAction::Run {
            tool,
            args,
            progress: parser,
        } => {
            let exit =
                run_tool(step.kind, tool, args, workspace, *parser, cancel, progress).await?;
            match exit {
                ToolExit::Canceled => Ok(StepResult::Canceled),
                ToolExit::Exited(status) if status.success() => Ok(StepResult::Done),
                ToolExit::Exited(status) => Err(SetupError::StepFailed {
                    step: step.kind,
                    reason: format!("{} exited with {status}", tool.display()),
                }),
            }
        }
    }
}
