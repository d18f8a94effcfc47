//! Session runtime: the sync orchestrator, the launch manager and the tokio
//! plumbing the CLI runs them on.

mod error;
pub mod launch;
pub mod orchestrator;
mod runtime;

pub use error::{SessionError, StageFailure};
pub use launch::{launch, LaunchError};
pub use orchestrator::{run, Advisory, SyncEnv, SyncReport};
pub use runtime::{init_tracing, run_until_interrupted, start_blocking};
