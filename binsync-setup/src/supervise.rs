//! Child process supervision.
//!
//! The child's exit, its output and the cancellation token are raced with
//! `tokio::select!`; cancellation kills the child and returns at once.
//! Stdout is split into segments on `\n` or `\r`, because fetch tools redraw
//! their progress line in place.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use binsync_core::{CancellationToken, Progress, ProgressEvent, ProgressSink, Stage};

use crate::error::SetupError;
use crate::step::{ProgressParser, StepKind};

pub(crate) enum ToolExit {
    Exited(ExitStatus),
    Canceled,
}

pub(crate) async fn run_tool(
    kind: StepKind,
    tool: &Path,
    args: &[String],
    workspace: &Path,
    parser: Option<ProgressParser>,
    cancel: &CancellationToken,
    progress: &dyn ProgressSink,
) -> Result<ToolExit, SetupError> {
    let mut child = Command::new(tool)
        .args(args)
        .current_dir(workspace)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| SetupError::Spawn {
            tool: tool.to_path_buf(),
            source,
        })?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let stdout_task = child
        .stdout
        .take()
        .map(|stdout| tokio::spawn(forward_segments(stdout, tx)));
    let mut stderr_task = child
        .stderr
        .take()
        .map(|stderr| tokio::spawn(log_stderr(stderr, kind)));

    let report = |segment: &str| {
        tracing::debug!(step = %kind, "{segment}");
        if let Some(fraction) = parser.and_then(|parse| parse(segment)) {
            progress.report(
                ProgressEvent::new(Stage::Setup, Progress::fraction(fraction))
                    .with_detail(kind.to_string()),
            );
        }
    };

    let status = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(err) = child.kill().await {
                    tracing::warn!(step = %kind, error = %err, "failed to kill canceled tool");
                }
                abort(stdout_task);
                abort(stderr_task);
                tracing::info!(step = %kind, "setup step canceled");
                return Ok(ToolExit::Canceled);
            }
            Some(segment) = rx.recv() => report(&segment),
            status = child.wait() => {
                break status.map_err(|source| SetupError::Spawn {
                    tool: tool.to_path_buf(),
                    source,
                })?;
            }
        }
    };

    // Drain output still buffered when the child exited. A helper process
    // that inherited the pipes keeps them open, so the token still applies.
    let canceled = {
        let drain = async {
            while let Some(segment) = rx.recv().await {
                report(&segment);
            }
            if let Some(task) = stderr_task.as_mut() {
                let _ = task.await;
            }
        };
        tokio::select! {
            _ = cancel.cancelled() => true,
            () = drain => false,
        }
    };
    if canceled {
        abort(stdout_task);
        abort(stderr_task);
        tracing::info!(step = %kind, "setup step canceled while draining output");
        return Ok(ToolExit::Canceled);
    }

    Ok(ToolExit::Exited(status))
}

fn abort(task: Option<tokio::task::JoinHandle<()>>) {
    if let Some(task) = task {
        task.abort();
    }
}

async fn forward_segments<R>(stream: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut segments = Segments::new(stream);
    loop {
        match segments.next_segment().await {
            Ok(Some(segment)) => {
                if tx.send(segment).is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                tracing::warn!(error = %err, "error reading tool output");
                break;
            }
        }
    }
}

async fn log_stderr<R>(stream: R, kind: StepKind)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            tracing::warn!(step = %kind, "{line}");
        }
    }
}

/// Splits a byte stream on `\n` and `\r`, dropping empty segments.
pub(crate) struct Segments<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin> Segments<R> {
    pub(crate) fn new(stream: R) -> Self {
        Self {
            reader: BufReader::new(stream),
            pending: Vec::new(),
        }
    }

    pub(crate) async fn next_segment(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_pending()));
            }

            match available.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) => {
                    self.pending.extend_from_slice(&available[..pos]);
                    self.reader.consume(pos + 1);
                    if !self.pending.is_empty() {
                        return Ok(Some(self.take_pending()));
                    }
                }
                None => {
                    let len = available.len();
                    self.pending.extend_from_slice(available);
                    self.reader.consume(len);
                }
            }
        }
    }

    fn take_pending(&mut self) -> String {
        let bytes = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
