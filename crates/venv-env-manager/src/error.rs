//! Error types for venv-env-manager

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating or activating an environment
#[derive(Error, Debug)]
pub enum EnvError {
    /// No candidate directory held a virtual environment
    #[error("No virtual environment found (searched: {})", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    /// Directory exists but is not a usable virtual environment
    #[error("Not a virtual environment: {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "<none>".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
