//! Where the setup tools live inside a workspace, and how they are invoked.
//!
//! The default is the Unreal Engine source layout. Tool paths are relative to
//! the workspace root; a tool that is not on disk turns its step off.

use std::path::{Path, PathBuf};

use crate::hooks;
use crate::step::{parse_percent, Fatality, SetupStep, StepAction, StepKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupLayout {
    pub fetch_tool: PathBuf,
    pub fetch_args: Vec<String>,
    /// Platforms/categories passed to the fetch tool as `--exclude=<name>`.
    pub fetch_exclusions: Vec<String>,
    pub prerequisite_installer: PathBuf,
    pub prerequisite_args: Vec<String>,
    pub registration_tool: PathBuf,
    pub registration_args: Vec<String>,
}

impl Default for SetupLayout {
    fn default() -> Self {
        Self {
            fetch_tool: PathBuf::from(
                "Engine/Binaries/DotNET/GitDependencies/win-x64/GitDependencies.exe",
            ),
            fetch_args: strings(&["--force", "--no-prompt"]),
            fetch_exclusions: strings(&[
                "Android", "HTML5", "IOS", "Linux", "Linux32", "LinuxArm64", "Mac", "TVOS",
                "WinRT", "osx32", "osx64",
            ]),
            prerequisite_installer: PathBuf::from(
                "Engine/Extras/Redist/en-us/UEPrereqSetup_x64.exe",
            ),
            prerequisite_args: strings(&["/quiet", "/norestart"]),
            registration_tool: PathBuf::from(
                "Engine/Binaries/Win64/UnrealVersionSelector-Win64-Shipping.exe",
            ),
            registration_args: strings(&["-register", "-unattended"]),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl SetupLayout {
    /// Full argument list for the dependency fetch tool.
    pub fn fetch_command_args(&self) -> Vec<String> {
        let mut args = self.fetch_args.clone();
        args.extend(self.fetch_exclusions.iter().map(|e| format!("--exclude={e}")));
        args
    }

    /// Shell command the git hooks run: the fetch tool by its relative path.
    pub fn hook_command(&self) -> String {
        let tool = self
            .fetch_tool
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        std::iter::once(tool)
            .chain(self.fetch_command_args())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Ordered steps for `workspace`, skipping any whose tool is absent.
    pub fn plan(&self, workspace: &Path) -> Vec<SetupStep> {
        let mut steps = Vec::new();
        let fetch_tool = workspace.join(&self.fetch_tool);

        if fetch_tool.is_file() {
            steps.push(SetupStep {
                kind: StepKind::DependencyFetch,
                action: StepAction::Run {
                    tool: fetch_tool,
                    args: self.fetch_command_args(),
                    progress: Some(parse_percent),
                },
                fatality: Fatality::Fatal,
            });

            if let Some(hooks_dir) = hooks::hooks_dir(workspace) {
                steps.push(SetupStep {
                    kind: StepKind::HookRegistration,
                    action: StepAction::WriteHooks {
                        hooks_dir,
                        command: self.hook_command(),
                    },
                    fatality: Fatality::Advisory,
                });
            }
        }

        let installer = workspace.join(&self.prerequisite_installer);
        if installer.is_file() {
            steps.push(SetupStep {
                kind: StepKind::PrerequisiteInstall,
                action: StepAction::Run {
                    tool: installer,
                    args: self.prerequisite_args.clone(),
                    progress: None,
                },
                fatality: Fatality::Advisory,
            });
        }

        let registration = workspace.join(&self.registration_tool);
        if registration.is_file() {
            steps.push(SetupStep {
                kind: StepKind::EngineRegistration,
                action: StepAction::Run {
                    tool: registration,
                    args: self.registration_args.clone(),
                    progress: None,
                },
                fatality: Fatality::Advisory,
            });
        }

        tracing::debug!(
            workspace = %workspace.display(),
            steps = steps.len(),
            "planned setup steps",
        );
        steps
    }
}
