//! Lint Gate - pass/fail static analysis checkpoint
//!
//! Runs a single linter over a project inside the project's Python
//! virtual environment and turns the linter's status into this process's
//! exit code:
//! - activates the venv as an explicit overlay for the child process
//! - invokes the linter once, passing its output through
//! - propagates the linter's exit code verbatim

pub mod error;
pub mod exit;
pub mod gate;
pub mod report;
pub mod runner;
pub mod telemetry;
pub mod tool;

// Re-export key types
pub use error::GateError;
pub use exit::{map_exit_code, ToolStatus};
pub use gate::{GateState, GateVerdict, LintGate};
pub use report::GateReport;
pub use runner::{resolve_project_dir, EnvironmentInfo, GateRun, LintGateRunner, LintOutcome};
pub use telemetry::init_tracing;
pub use tool::{LintCommand, LintTool, OutputMode, ProcessLintTool, ToolOutput, DEFAULT_LINTER};
