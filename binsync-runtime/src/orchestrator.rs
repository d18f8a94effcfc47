//! One sync session, start to finish.
//!
//! Stages run strictly in order:
//!
//! guard → history → match → resolve → setup (optional) → extraction → launch (optional)
//!
//! The first fatal error ends the session with `SyncStatus::Failed`; a running
//! guarded executable ends it with `SyncStatus::Busy` before anything else
//! runs. Launch problems and advisory setup failures are collected in the
//! report. The progress sink's `finish` runs on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use binsync_core::{
    ArchiveDescriptor, CancellationToken, ProgressEvent, ProgressSink, RevisionId, Stage,
    SyncSession, SyncStatus,
};
use binsync_detector::{is_running_in, ProcessTable, SystemProcessTable};
use binsync_setup::{SetupLayout, SetupOutcome, StepKind};
use binsync_sync::{
    find_first_available, find_match, resolve, AppliedArchive, ExtractOutcome, ExtractPlan,
    GitHistory, RevisionSource,
};

use crate::error::{join_err, AtStage, SessionError, StageFailure};
use crate::launch;

/// The host-facing collaborators of a session.
#[derive(Clone)]
pub struct SyncEnv {
    pub history: Arc<dyn RevisionSource>,
    pub processes: Arc<dyn ProcessTable>,
    pub layout: SetupLayout,
}

impl SyncEnv {
    /// Git history of the session's workspace, the host process table and the
    /// default tool layout.
    pub fn for_session(session: &SyncSession) -> Self {
        Self {
            history: Arc::new(GitHistory::new(session.workspace_root.clone())),
            processes: Arc::new(SystemProcessTable),
            layout: SetupLayout::default(),
        }
    }
}

/// A non-fatal problem reported alongside the status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub stage: Stage,
    pub message: String,
}

/// Everything a session did, plus its terminal status.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    #[serde(flatten)]
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<RevisionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub setup_steps: Vec<StepKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<AppliedArchive>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<ExtractPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launched: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub advisories: Vec<Advisory>,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            status: SyncStatus::Success,
            revision: None,
            archive: None,
            setup_steps: Vec::new(),
            applied: None,
            plan: None,
            launched: None,
            advisories: Vec::new(),
        }
    }

    fn advise(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(stage = %stage, "{message}");
        self.advisories.push(Advisory { stage, message });
    }
}

/// Calls `finish` on the sink when dropped.
struct FinishOnDrop(Arc<dyn ProgressSink>);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Run one sync session.
pub async fn run(
    session: &SyncSession,
    env: &SyncEnv,
    cancel: &CancellationToken,
    progress: Arc<dyn ProgressSink>,
) -> SyncReport {
    let _finish = FinishOnDrop(progress.clone());
    let mut report = SyncReport::new();

    report.status = match drive(session, env, cancel, &progress, &mut report).await {
        Ok(status) => status,
        Err(StageFailure {
            error: SessionError::ProcessBusy { executable },
            ..
        }) => {
            let reason = format!("{} is running", executable.display());
            tracing::warn!("{reason}");
            SyncStatus::Busy { reason }
        }
        Err(StageFailure { stage, error }) => {
            tracing::error!(stage = %stage, error = %error, "sync failed");
            SyncStatus::failed(stage, error)
        }
    };

    tracing::info!(status = %report.status, "sync session finished");
    report
}

async fn drive(
    session: &SyncSession,
    env: &SyncEnv,
    cancel: &CancellationToken,
    progress: &Arc<dyn ProgressSink>,
    report: &mut SyncReport,
) -> Result<SyncStatus, StageFailure> {
    let workspace = session.workspace_root.clone();

    // ----- guard ----- //
    if let Some(executable) = &session.guarded_executable {
        progress.report(ProgressEvent::indeterminate(
            Stage::Guard,
            "checking running applications",
        ));
        let processes = env.processes.clone();
        let target = session.workspace_path(executable);
        let probe = target.clone();
        let running = tokio::task::spawn_blocking(move || is_running_in(&*processes, &probe))
            .await
            .map_err(|e| join_err("process guard", e))
            .at(Stage::Guard)?;
        if running {
            return Err(SessionError::ProcessBusy { executable: target }).at(Stage::Guard);
        }
    }
    if cancel.is_cancelled() {
        return Ok(SyncStatus::Canceled);
    }

    // ----- history ----- //
    progress.report(ProgressEvent::indeterminate(Stage::History, "reading history"));
    let source = env.history.clone();
    let depth = session.max_depth;
    let history = tokio::task::spawn_blocking(move || source.history(depth))
        .await
        .map_err(|e| join_err("history", e))
        .at(Stage::History)?
        .at(Stage::History)?;
    if cancel.is_cancelled() {
        return Ok(SyncStatus::Canceled);
    }

    // ----- match + resolve ----- //
    let archive: ArchiveDescriptor = match &session.tag_pattern {
        Some(pattern) => {
            let entry = find_match(&history, pattern, depth).at(Stage::Match)?;
            tracing::info!(revision = %entry.id, pattern = %pattern, "matched revision");
            resolve(&session.source_dir, &entry.id).at(Stage::Resolve)?
        }
        None => find_first_available(&history, &session.source_dir, depth).at(Stage::Match)?,
    };
    tracing::info!(archive = %archive.path.display(), "resolved archive");
    report.revision = Some(archive.revision.clone());
    report.archive = Some(archive.path.clone());

    // ----- setup ----- //
    if session.apply_setup {
        let steps = env.layout.plan(&workspace);
        let outcome = binsync_setup::run(&steps, &workspace, session.dry_run, cancel, &**progress)
            .await
            .at(Stage::Setup)?;
        match outcome {
            SetupOutcome::Completed { ran, advisories } => {
                report.setup_steps = ran;
                for advisory in advisories {
                    report.advise(Stage::Setup, format!("{}: {}", advisory.step, advisory.message));
                }
            }
            SetupOutcome::Planned(steps) => report.setup_steps = steps,
            SetupOutcome::Canceled => return Ok(SyncStatus::Canceled),
        }
    }
    if cancel.is_cancelled() {
        return Ok(SyncStatus::Canceled);
    }

    // ----- extraction ----- //
    let dry_run = session.dry_run;
    let token = cancel.clone();
    let sink = progress.clone();
    let extract_root = workspace.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        binsync_sync::apply(&archive, &extract_root, dry_run, &token, &*sink)
    })
    .await
    .map_err(|e| join_err("extraction", e))
    .at(Stage::Extraction)?
    .at(Stage::Extraction)?;
    match outcome {
        ExtractOutcome::Applied(applied) => report.applied = Some(applied),
        ExtractOutcome::Planned(plan) => report.plan = Some(plan),
        ExtractOutcome::Canceled => return Ok(SyncStatus::Canceled),
    }

    // ----- launch ----- //
    if let Some(target) = &session.launch_target {
        if session.dry_run {
            tracing::info!("[dry-run] would launch {}", target.display());
        } else {
            progress.report(ProgressEvent::indeterminate(
                Stage::Launch,
                target.display().to_string(),
            ));
            match launch::launch(&workspace, target) {
                Ok(path) => report.launched = Some(path),
                Err(err) => report.advise(Stage::Launch, err.to_string()),
            }
        }
    }

    Ok(SyncStatus::Success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use binsync_core::RevisionEntry;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct NoProcesses;

    impl ProcessTable for NoProcesses {
        fn executables(&self) -> Vec<PathBuf> {
            Vec::new()
        }
    }

    #[derive(Default)]
    struct CountingSink {
        events: Mutex<Vec<ProgressEvent>>,
        finished: Mutex<usize>,
    }

    impl ProgressSink for CountingSink {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }

        fn finish(&self) {
            *self.finished.lock().unwrap() += 1;
        }
    }

    fn env(history: Vec<RevisionEntry>) -> SyncEnv {
        SyncEnv {
            history: Arc::new(history),
            processes: Arc::new(NoProcesses),
            layout: SetupLayout::default(),
        }
    }

    #[tokio::test]
    async fn finish_runs_on_failure() {
        let tmp = TempDir::new().unwrap();
        let session = SyncSession::new(tmp.path().join("drops"), tmp.path());
        let sink = Arc::new(CountingSink::default());

        let report = run(&session, &env(vec![]), &CancellationToken::new(), sink.clone()).await;
        assert!(matches!(report.status, SyncStatus::Failed { stage: Stage::Match, .. }));
        assert_eq!(*sink.finished.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn pre_canceled_session_stops_after_guard() {
        let tmp = TempDir::new().unwrap();
        let session = SyncSession::new(tmp.path(), tmp.path());
        let token = CancellationToken::new();
        token.cancel();
        let sink = Arc::new(CountingSink::default());

        let report = run(&session, &env(vec![]), &token, sink.clone()).await;
        assert_eq!(report.status, SyncStatus::Canceled);
        assert!(sink.events.lock().unwrap().is_empty());
        assert_eq!(*sink.finished.lock().unwrap(), 1);
    }
}
