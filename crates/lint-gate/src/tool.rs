//! The external linter and how it is invoked.

use crate::error::GateError;
use crate::exit::ToolStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;
use venv_env_manager::ActivatedEnv;

/// Linter used when none is configured
pub const DEFAULT_LINTER: &str = "flake8";

/// The linter command line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LintCommand {
    /// Program name (resolved against the venv) or path.
    pub program: String,

    /// Arguments; the scan root is the working directory.
    pub args: Vec<String>,
}

impl Default for LintCommand {
    fn default() -> Self {
        Self::flake8()
    }
}

impl LintCommand {
    /// `flake8 .`
    pub fn flake8() -> Self {
        Self {
            program: DEFAULT_LINTER.to_string(),
            args: vec![".".to_string()],
        }
    }

    /// A custom linter command. Empty `args` scan the working directory.
    pub fn custom(program: impl Into<String>, args: Vec<String>) -> Self {
        let args = if args.is_empty() {
            vec![".".to_string()]
        } else {
            args
        };
        Self {
            program: program.into(),
            args,
        }
    }

    /// Shell-ish rendering for logs and reports
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What happens to the linter's stdout/stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Linter writes straight to our streams
    #[default]
    Inherit,
    /// Collected and returned in [`ToolOutput`]
    Capture,
}

/// Result of one linter invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ToolStatus,

    /// Captured stdout bytes, unmodified (`OutputMode::Capture` only)
    pub stdout: Option<Vec<u8>>,

    /// Captured stderr bytes, unmodified (`OutputMode::Capture` only)
    pub stderr: Option<Vec<u8>>,
}

/// The static-analysis tool behind the gate.
#[async_trait]
pub trait LintTool: Send + Sync {
    /// The command this tool runs
    fn command(&self) -> &LintCommand;

    /// Run once against `target` inside `env` and report how it terminated.
    async fn invoke(&self, env: &ActivatedEnv, target: &Path) -> Result<ToolOutput, GateError>;
}

/// Runs the linter as a child process.
#[derive(Debug, Clone, Default)]
pub struct ProcessLintTool {
    command: LintCommand,
    output: OutputMode,
}

impl ProcessLintTool {
    pub fn new(command: LintCommand) -> Self {
        Self {
            command,
            output: OutputMode::Inherit,
        }
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }
}

#[async_trait]
impl LintTool for ProcessLintTool {
    fn command(&self) -> &LintCommand {
        &self.command
    }

    async fn invoke(&self, env: &ActivatedEnv, target: &Path) -> Result<ToolOutput, GateError> {
        if self.command.program.is_empty() {
            return Err(GateError::EmptyCommand);
        }

        let program = env.resolve_program(&self.command.program);

        let mut std_cmd = std::process::Command::new(&program);
        std_cmd
            .args(&self.command.args)
            .current_dir(target)
            .stdin(Stdio::null());
        env.apply(&mut std_cmd)?;
        let mut cmd = Command::from(std_cmd);

        let (stdout, stderr) = match self.output {
            OutputMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
            OutputMode::Capture => (Stdio::piped(), Stdio::piped()),
        };
        cmd.stdout(stdout).stderr(stderr);

        debug!(program = %program.display(), target = %target.display(), "Spawning linter");
        let child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => GateError::ToolNotFound {
                program: program.display().to_string(),
            },
            ErrorKind::PermissionDenied => GateError::ToolNotExecutable {
                program: program.display().to_string(),
            },
            _ => GateError::Io(e),
        })?;

        match self.output {
            OutputMode::Inherit => {
                let mut child = child;
                let status = child.wait().await?;
                Ok(ToolOutput {
                    status: ToolStatus::from_exit_status(status),
                    stdout: None,
                    stderr: None,
                })
            }
            OutputMode::Capture => {
                let output = child.wait_with_output().await?;
                Ok(ToolOutput {
                    status: ToolStatus::from_exit_status(output.status),
                    stdout: Some(output.stdout),
                    stderr: Some(output.stderr),
                })
            }
        }
    }
}
