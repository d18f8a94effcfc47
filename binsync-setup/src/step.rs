//! Setup step descriptors.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// The four setup steps, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    DependencyFetch,
    HookRegistration,
    PrerequisiteInstall,
    EngineRegistration,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepKind::DependencyFetch => "dependency fetch",
            StepKind::HookRegistration => "hook registration",
            StepKind::PrerequisiteInstall => "prerequisite install",
            StepKind::EngineRegistration => "engine registration",
        };
        f.write_str(label)
    }
}

/// Whether a failing step aborts the session or is only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fatality {
    Fatal,
    Advisory,
}

/// Turns one line of tool output into a completed fraction.
pub type ProgressParser = fn(&str) -> Option<f32>;

#[derive(Debug, Clone)]
pub enum StepAction {
    /// Run an external tool from the workspace root.
    Run {
        tool: PathBuf,
        args: Vec<String>,
        progress: Option<ProgressParser>,
    },
    /// (Re)write the post-checkout and post-merge hooks.
    WriteHooks { hooks_dir: PathBuf, command: String },
}

/// One entry of a setup pipeline.
#[derive(Debug, Clone)]
pub struct SetupStep {
    pub kind: StepKind,
    pub action: StepAction,
    pub fatality: Fatality,
}

impl SetupStep {
    pub fn is_fatal(&self) -> bool {
        self.fatality == Fatality::Fatal
    }
}

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:\.\d+)?)\s*%").unwrap());

/// Parse the first `NN%` in `line` into `0.0..=1.0`.
pub fn parse_percent(line: &str) -> Option<f32> {
    let value: f32 = PERCENT.captures(line)?.get(1)?.as_str().parse().ok()?;
    Some((value / 100.0).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Updating dependencies:  42% (1234/5678)", Some(0.42))]
    #[case("100%", Some(1.0))]
    #[case("  7 %", Some(0.07))]
    #[case("Checking dependencies...", None)]
    #[case("12.5% done", Some(0.125))]
    fn percent_lines(#[case] line: &str, #[case] expected: Option<f32>) {
        match (parse_percent(line), expected) {
            (Some(got), Some(want)) => assert!((got - want).abs() < 1e-6, "{line}: {got}"),
            (got, want) => assert_eq!(got, want, "{line}"),
        }
    }

    #[test]
    fn labels_read_naturally() {
        assert_eq!(StepKind::DependencyFetch.to_string(), "dependency fetch");
        assert_eq!(StepKind::EngineRegistration.to_string(), "engine registration");
    }
}
