//! Machine-readable record of a gate run.

use crate::error::GateError;
use crate::exit::ToolStatus;
use crate::gate::{GateState, GateVerdict};
use crate::runner::{EnvironmentInfo, GateRun};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// JSON report written after a run.
#[derive(Debug, Clone, Serialize)]
pub struct GateReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub project_dir: PathBuf,
    pub linter: String,
    pub environment: Option<EnvironmentInfo>,

    /// Linter termination; absent when the linter never finished.
    pub linter_status: Option<ToolStatus>,

    /// Error that aborted the run, if any.
    pub error: Option<String>,

    pub state: GateState,

    pub verdict: GateVerdict,
}

impl GateReport {
    pub fn from_run(run: &GateRun) -> Self {
        let (linter_status, error) = match &run.outcome {
            Ok(outcome) => (Some(outcome.status), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Self {
            run_id: run.run_id,
            started_at: run.started_at,
            duration_ms: run.duration_ms,
            project_dir: run.project_dir.clone(),
            linter: run.linter.display(),
            environment: run.environment.clone(),
            linter_status,
            error,
            state: run.state,
            verdict: run.verdict(),
        }
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), GateError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        debug!(path = %path.display(), "Wrote gate report");
        Ok(())
    }
}
