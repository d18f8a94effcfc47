//! Setup pipeline tests driving real child processes through `/bin/sh`.

#![cfg(unix)]

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use binsync_core::{CancellationToken, Progress, ProgressEvent};
use binsync_setup::{
    parse_percent, run, Fatality, SetupError, SetupLayout, SetupOutcome, SetupStep, StepAction,
    StepKind,
};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn shell_step(kind: StepKind, script: &str, fatality: Fatality) -> SetupStep {
    SetupStep {
        kind,
        action: StepAction::Run {
            tool: PathBuf::from("/bin/sh"),
            args: vec!["-c".to_string(), script.to_string()],
            progress: Some(parse_percent),
        },
        fatality,
    }
}

fn marker_step(kind: StepKind, marker: &str) -> SetupStep {
    shell_step(kind, &format!("touch {marker}"), Fatality::Advisory)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_progress_is_parsed_from_redrawn_lines() {
    let ws = TempDir::new().unwrap();
    let steps = vec![shell_step(
        StepKind::DependencyFetch,
        r"printf 'Fetching  25%%\rFetching  50%%\rFetching 100%%\nDone\n'",
        Fatality::Fatal,
    )];
    let seen = Mutex::new(Vec::new());
    let sink = |event: ProgressEvent| seen.lock().unwrap().push(event.progress);

    let outcome = run(&steps, ws.path(), false, &CancellationToken::new(), &sink)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SetupOutcome::Completed {
            ran: vec![StepKind::DependencyFetch],
            advisories: vec![],
        }
    );

    let seen = seen.into_inner().unwrap();
    assert_eq!(
        seen,
        vec![
            Progress::Indeterminate,
            Progress::Fraction(0.25),
            Progress::Fraction(0.5),
            Progress::Fraction(1.0),
        ]
    );
}

#[tokio::test]
async fn failed_fetch_is_fatal_and_stops_pipeline() {
    let ws = TempDir::new().unwrap();
    let steps = vec![
        shell_step(StepKind::DependencyFetch, "exit 1", Fatality::Fatal),
        marker_step(StepKind::EngineRegistration, "registered"),
    ];

    let err = run(&steps, ws.path(), false, &CancellationToken::new(), &|_: ProgressEvent| {})
        .await
        .unwrap_err();
    match err {
        SetupError::StepFailed { step, .. } => assert_eq!(step, StepKind::DependencyFetch),
        other => panic!("expected StepFailed, got {other:?}"),
    }
    assert!(!ws.path().join("registered").exists());
}

#[tokio::test]
async fn advisory_failure_is_recorded_and_pipeline_continues() {
    let ws = TempDir::new().unwrap();
    let steps = vec![
        shell_step(StepKind::PrerequisiteInstall, "exit 3", Fatality::Advisory),
        marker_step(StepKind::EngineRegistration, "registered"),
    ];

    let outcome = run(&steps, ws.path(), false, &CancellationToken::new(), &|_: ProgressEvent| {})
        .await
        .unwrap();
    let SetupOutcome::Completed { ran, advisories } = outcome else {
        panic!("expected Completed, got {outcome:?}");
    };
    assert_eq!(ran, vec![StepKind::EngineRegistration]);
    assert_eq!(advisories.len(), 1);
    assert_eq!(advisories[0].step, StepKind::PrerequisiteInstall);
    assert!(ws.path().join("registered").exists(), "tools run from the workspace root");
}

#[tokio::test]
async fn missing_advisory_tool_is_not_fatal() {
    let ws = TempDir::new().unwrap();
    let steps = vec![SetupStep {
        kind: StepKind::PrerequisiteInstall,
        action: StepAction::Run {
            tool: ws.path().join("nope.exe"),
            args: vec![],
            progress: None,
        },
        fatality: Fatality::Advisory,
    }];

    let outcome = run(&steps, ws.path(), false, &CancellationToken::new(), &|_: ProgressEvent| {})
        .await
        .unwrap();
    assert!(matches!(outcome, SetupOutcome::Completed { ref advisories, .. } if advisories.len() == 1));
}

#[tokio::test]
async fn cancellation_kills_running_tool() {
    let ws = TempDir::new().unwrap();
    let steps = vec![
        shell_step(StepKind::DependencyFetch, "exec sleep 30", Fatality::Fatal),
        marker_step(StepKind::EngineRegistration, "registered"),
    ];
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = run(&steps, ws.path(), false, &token, &|_: ProgressEvent| {})
        .await
        .unwrap();
    assert_eq!(outcome, SetupOutcome::Canceled);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!ws.path().join("registered").exists());
}

#[tokio::test]
async fn cancellation_wins_while_helper_holds_output_open() {
    let ws = TempDir::new().unwrap();
    // The shell exits at once; the background sleep keeps stdout open.
    let steps = vec![
        shell_step(StepKind::DependencyFetch, "sleep 6 & echo started", Fatality::Fatal),
        marker_step(StepKind::EngineRegistration, "registered"),
    ];
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = run(&steps, ws.path(), false, &token, &|_: ProgressEvent| {})
        .await
        .unwrap();
    assert_eq!(outcome, SetupOutcome::Canceled);
    assert!(started.elapsed() < Duration::from_secs(4), "took {:?}", started.elapsed());
    assert!(!ws.path().join("registered").exists());
}

#[tokio::test]
async fn dry_run_lists_steps_without_running_them() {
    let ws = TempDir::new().unwrap();
    let steps = vec![
        marker_step(StepKind::PrerequisiteInstall, "installed"),
        marker_step(StepKind::EngineRegistration, "registered"),
    ];

    let outcome = run(&steps, ws.path(), true, &CancellationToken::new(), &|_: ProgressEvent| {})
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SetupOutcome::Planned(vec![StepKind::PrerequisiteInstall, StepKind::EngineRegistration])
    );
    assert!(!ws.path().join("installed").exists());
}

#[tokio::test]
async fn hook_step_writes_scripts() {
    let ws = TempDir::new().unwrap();
    std::fs::create_dir_all(ws.path().join(".git")).unwrap();
    let layout = SetupLayout::default();
    let steps = vec![SetupStep {
        kind: StepKind::HookRegistration,
        action: StepAction::WriteHooks {
            hooks_dir: ws.path().join(".git/hooks"),
            command: layout.hook_command(),
        },
        fatality: Fatality::Advisory,
    }];

    run(&steps, ws.path(), false, &CancellationToken::new(), &|_: ProgressEvent| {})
        .await
        .unwrap();
    let body = std::fs::read_to_string(ws.path().join(".git/hooks/post-checkout")).unwrap();
    assert!(body.starts_with("#!/bin/sh\nEngine/Binaries/DotNET/GitDependencies/"));
}
