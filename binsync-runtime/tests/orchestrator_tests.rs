//! End-to-end session tests over a fixed history and fixture archives.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use binsync_core::{
    CancellationToken, ProgressEvent, ProgressSink, RevisionEntry, Stage, SyncSession, SyncStatus,
};
use binsync_detector::ProcessTable;
use binsync_runtime::{run, SyncEnv};
use binsync_setup::SetupLayout;
use binsync_sync::manifest;
use tempfile::TempDir;
use zip::write::FileOptions;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct FixedProcesses(Vec<PathBuf>);

impl ProcessTable for FixedProcesses {
    fn executables(&self) -> Vec<PathBuf> {
        self.0.clone()
    }
}

#[derive(Default)]
struct RecordingSink {
    stages: Mutex<Vec<Stage>>,
    finished: Mutex<bool>,
}

impl ProgressSink for RecordingSink {
    fn report(&self, event: ProgressEvent) {
        self.stages.lock().unwrap().push(event.stage);
    }

    fn finish(&self) {
        *self.finished.lock().unwrap() = true;
    }
}

struct Fixture {
    _root: TempDir,
    drops: PathBuf,
    ws: PathBuf,
}

impl Fixture {
    /// History C3 -> C2 (v2-Editor) -> C1; the last sync applied C1 (a/x, b/y).
    fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        let drops = root.path().join("drops");
        let ws = root.path().join("ws");
        fs::create_dir_all(&drops).unwrap();
        fs::create_dir_all(&ws).unwrap();

        write_zip(&drops.join("C2.zip"), &[("b/y", "new y"), ("c/z", "new z")]);
        for rel in ["a/x", "b/y"] {
            let path = ws.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "old").unwrap();
        }
        manifest::save(
            &ws,
            &manifest::Manifest::new("C1.zip", vec!["a/x".to_string(), "b/y".to_string()]),
        )
        .unwrap();

        Self {
            _root: root,
            drops,
            ws,
        }
    }

    fn session(&self) -> SyncSession {
        let mut session = SyncSession::new(&self.drops, &self.ws);
        session.tag_pattern = Some("Editor".to_string());
        session
    }

    fn env(&self, running: Vec<PathBuf>) -> SyncEnv {
        SyncEnv {
            history: Arc::new(vec![
                RevisionEntry::new("C3", &[]),
                RevisionEntry::new("C2", &["v2-Editor"]),
                RevisionEntry::new("C1", &[]),
            ]),
            processes: Arc::new(FixedProcesses(running)),
            layout: SetupLayout::default(),
        }
    }

    fn manifest_bytes(&self) -> Vec<u8> {
        fs::read(manifest::manifest_path(&self.ws)).unwrap()
    }
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, content) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn labelled_sync_applies_matching_archive() {
    let fx = Fixture::new();
    let sink = Arc::new(RecordingSink::default());

    let report = run(&fx.session(), &fx.env(vec![]), &CancellationToken::new(), sink.clone()).await;

    assert_eq!(report.status, SyncStatus::Success);
    assert_eq!(report.revision.as_ref().map(|r| r.0.as_str()), Some("C2"));
    let applied = report.applied.expect("applied");
    assert_eq!(applied.written, vec!["b/y", "c/z"]);
    assert!(!fx.ws.join("a/x").exists());
    assert_eq!(fs::read_to_string(fx.ws.join("b/y")).unwrap(), "new y");

    let stages = sink.stages.lock().unwrap().clone();
    assert_eq!(stages.first(), Some(&Stage::History));
    assert_eq!(stages.last(), Some(&Stage::Extraction));
    assert!(*sink.finished.lock().unwrap());
}

#[tokio::test]
async fn running_target_is_busy_and_nothing_else_runs() {
    let fx = Fixture::new();
    let editor = fx.ws.join("UnrealEditor");
    fs::write(&editor, "").unwrap();
    let mut session = fx.session();
    session.guarded_executable = Some(PathBuf::from("UnrealEditor"));
    let before = fx.manifest_bytes();
    let sink = Arc::new(RecordingSink::default());

    let report = run(&session, &fx.env(vec![editor]), &CancellationToken::new(), sink.clone()).await;

    assert!(matches!(report.status, SyncStatus::Busy { .. }), "{:?}", report.status);
    assert!(report.revision.is_none());
    assert_eq!(*sink.stages.lock().unwrap(), vec![Stage::Guard]);
    assert_eq!(fx.manifest_bytes(), before);
    assert!(*sink.finished.lock().unwrap());
}

#[tokio::test]
async fn guard_passes_when_other_processes_run() {
    let fx = Fixture::new();
    let editor = fx.ws.join("UnrealEditor");
    fs::write(&editor, "").unwrap();
    let mut session = fx.session();
    session.guarded_executable = Some(editor);

    let report = run(
        &session,
        &fx.env(vec![PathBuf::from("/usr/bin/env")]),
        &CancellationToken::new(),
        Arc::new(|_: ProgressEvent| {}),
    )
    .await;
    assert_eq!(report.status, SyncStatus::Success);
}

#[tokio::test]
async fn missing_archive_fails_at_resolve_and_leaves_workspace() {
    let fx = Fixture::new();
    fs::remove_file(fx.drops.join("C2.zip")).unwrap();
    let before = fx.manifest_bytes();

    let report = run(
        &fx.session(),
        &fx.env(vec![]),
        &CancellationToken::new(),
        Arc::new(|_: ProgressEvent| {}),
    )
    .await;

    match &report.status {
        SyncStatus::Failed { stage, message } => {
            assert_eq!(*stage, Stage::Resolve);
            assert!(message.contains("C2.zip"), "{message}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(fx.ws.join("a/x").exists());
    assert_eq!(fx.manifest_bytes(), before);
}

#[tokio::test]
async fn unmatched_pattern_fails_at_match() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.tag_pattern = Some("Shipping".to_string());

    let report = run(
        &session,
        &fx.env(vec![]),
        &CancellationToken::new(),
        Arc::new(|_: ProgressEvent| {}),
    )
    .await;
    assert!(matches!(report.status, SyncStatus::Failed { stage: Stage::Match, .. }));
}

#[tokio::test]
async fn no_pattern_picks_first_available_archive() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.tag_pattern = None;

    let report = run(
        &session,
        &fx.env(vec![]),
        &CancellationToken::new(),
        Arc::new(|_: ProgressEvent| {}),
    )
    .await;
    assert_eq!(report.status, SyncStatus::Success);
    assert_eq!(report.archive, Some(fx.drops.join("C2.zip")));
}

#[tokio::test]
async fn dry_run_reports_plan_only() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.dry_run = true;
    let before = fx.manifest_bytes();

    let report = run(
        &session,
        &fx.env(vec![]),
        &CancellationToken::new(),
        Arc::new(|_: ProgressEvent| {}),
    )
    .await;

    assert_eq!(report.status, SyncStatus::Success);
    let plan = report.plan.expect("plan");
    assert_eq!(plan.would_write, vec!["b/y", "c/z"]);
    assert_eq!(plan.would_remove, vec!["a/x"]);
    assert!(report.applied.is_none());
    assert_eq!(fx.manifest_bytes(), before);
}

#[tokio::test]
#[cfg(unix)]
async fn failing_dependency_fetch_stops_before_extraction() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.apply_setup = true;
    let mut env = fx.env(vec![]);
    env.layout.fetch_tool = PathBuf::from("/bin/false");
    let before = fx.manifest_bytes();

    let report = run(&session, &env, &CancellationToken::new(), Arc::new(|_: ProgressEvent| {})).await;

    match &report.status {
        SyncStatus::Failed { stage, message } => {
            assert_eq!(*stage, Stage::Setup);
            assert!(message.contains("dependency fetch"), "{message}");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(fx.manifest_bytes(), before);
}

#[tokio::test]
async fn launch_failure_is_advisory() {
    let fx = Fixture::new();
    let mut session = fx.session();
    session.launch_target = Some(PathBuf::from("Game/Missing.uproject"));

    let report = run(
        &session,
        &fx.env(vec![]),
        &CancellationToken::new(),
        Arc::new(|_: ProgressEvent| {}),
    )
    .await;

    assert_eq!(report.status, SyncStatus::Success);
    assert_eq!(report.advisories.len(), 1);
    assert_eq!(report.advisories[0].stage, Stage::Launch);
    assert!(report.launched.is_none());
}
