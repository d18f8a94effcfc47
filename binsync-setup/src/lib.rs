//! # binsync-setup
//!
//! Optional external setup run after an archive has been selected: dependency
//! fetch, git hook registration, prerequisite install and engine registration.
//!
//! [`SetupLayout::plan`] probes which tools exist in the workspace and builds
//! the ordered step list; [`run`] executes it, supervising every child process
//! against a cancellation token.

mod error;
pub mod hooks;
pub mod layout;
pub mod pipeline;
pub mod step;
mod supervise;

pub use error::SetupError;
pub use layout::SetupLayout;
pub use pipeline::{run, SetupAdvisory, SetupOutcome};
pub use step::{parse_percent, Fatality, SetupStep, StepAction, StepKind};
