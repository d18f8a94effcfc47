use std::sync::Arc;

use binsync_core::{CancellationToken, ProgressSink, SyncSession};

use crate::error::{io_err, SessionError};
use crate::orchestrator::{self, SyncEnv, SyncReport};

/// Run one session on a fresh multi-threaded runtime, blocking the current
/// thread until it ends. Ctrl-C cancels the session.
pub fn start_blocking(
    session: &SyncSession,
    env: &SyncEnv,
    progress: Arc<dyn ProgressSink>,
) -> Result<SyncReport, SessionError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run_until_interrupted(session, env, progress))
}

/// [`orchestrator::run`] with a Ctrl-C listener wired to the cancellation token.
pub async fn run_until_interrupted(
    session: &SyncSession,
    env: &SyncEnv,
    progress: Arc<dyn ProgressSink>,
) -> Result<SyncReport, SessionError> {
    let cancel = CancellationToken::new();

    let signal_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => {
                        tracing::info!("received ctrl-c, canceling sync");
                        cancel.cancel();
                    }
                    Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
                }
            }
        })
    };

    let report = orchestrator::run(session, env, &cancel, progress).await;

    // Release the signal listener.
    cancel.cancel();
    let _ = signal_handle.await;
    Ok(report)
}

/// Install the global `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` wins when set; otherwise `info`, or `debug` when `verbose`.
pub fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
