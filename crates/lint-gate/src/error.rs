//! Error types for lint-gate

use crate::exit::{EXIT_ENVIRONMENT, EXIT_FAILURE, EXIT_NOT_EXECUTABLE, EXIT_NOT_FOUND};
use std::path::PathBuf;
use thiserror::Error;
use venv_env_manager::EnvError;

/// Errors that stop the gate before a linter status is available
#[derive(Error, Debug)]
pub enum GateError {
    /// Project directory missing or not a directory
    #[error("Project directory not usable: {path}: {reason}")]
    ProjectDir { path: PathBuf, reason: String },

    /// Virtual environment could not be engaged
    #[error("Environment activation failed: {0}")]
    Environment(#[from] EnvError),

    /// Linter command has no program
    #[error("Linter command is empty")]
    EmptyCommand,

    /// Linter binary not found
    #[error("Linter not found: {program}")]
    ToolNotFound { program: String },

    /// Linter binary found but not runnable
    #[error("Linter not executable: {program}")]
    ToolNotExecutable { program: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialization error
    #[error("Report error: {0}")]
    Report(#[from] serde_json::Error),
}

impl GateError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            GateError::ProjectDir { .. } | GateError::Environment(_) => EXIT_ENVIRONMENT,
            GateError::ToolNotFound { .. } | GateError::EmptyCommand => EXIT_NOT_FOUND,
            GateError::ToolNotExecutable { .. } => EXIT_NOT_EXECUTABLE,
            GateError::Io(_) | GateError::Report(_) => EXIT_FAILURE,
        }
    }

    /// Whether the linter was never started.
    pub fn before_linter(&self) -> bool {
        matches!(
            self,
            GateError::ProjectDir { .. } | GateError::Environment(_) | GateError::EmptyCommand
        )
    }
}
