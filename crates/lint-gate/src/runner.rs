//! Lint gate execution.

use crate::error::GateError;
use crate::exit::{map_exit_code, ToolStatus, EXIT_FAILURE};
use crate::gate::{GateState, GateVerdict, LintGate};
use crate::tool::{LintCommand, LintTool};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;
use venv_env_manager::{fingerprint, ActivatedEnv, EnvFingerprint, VenvLocator};

/// Result of the linter invocation.
#[derive(Debug, Clone)]
pub struct LintOutcome {
    /// How the linter terminated.
    pub status: ToolStatus,

    /// Exit code this process will use.
    pub exit_code: u8,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Captured stdout bytes (capture mode only).
    pub stdout: Option<Vec<u8>>,

    /// Captured stderr bytes (capture mode only).
    pub stderr: Option<Vec<u8>>,
}

impl LintOutcome {
    /// Whether the linter found no violations (exit code 0).
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// The environment a run used.
#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentInfo {
    pub root: PathBuf,
    pub python_version: Option<String>,
    pub fingerprint: Option<EnvFingerprint>,
}

impl EnvironmentInfo {
    fn capture(env: &ActivatedEnv) -> Self {
        let fingerprint = match fingerprint(env) {
            Ok(fp) => Some(fp),
            Err(e) => {
                warn!(error = %e, "Could not fingerprint environment");
                None
            }
        };
        Self {
            root: env.root().to_path_buf(),
            python_version: env
                .config()
                .and_then(|c| c.version())
                .map(str::to_string),
            fingerprint,
        }
    }
}

/// A completed gate run.
#[derive(Debug)]
pub struct GateRun {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    /// Canonical project directory when it resolved, the given path otherwise.
    pub project_dir: PathBuf,

    pub linter: LintCommand,

    /// `None` when activation failed.
    pub environment: Option<EnvironmentInfo>,

    pub outcome: Result<LintOutcome, GateError>,

    /// Terminal once [`LintGateRunner::run`] returns.
    pub state: GateState,

    /// Wall time of the whole run in milliseconds.
    pub duration_ms: u64,
}

impl GateRun {
    pub fn verdict(&self) -> GateVerdict {
        LintGate::evaluate(self.state, self.outcome.as_ref().err())
    }

    /// Exit code for the process.
    pub fn exit_code(&self) -> u8 {
        self.state.exit_code().unwrap_or(EXIT_FAILURE)
    }
}

/// Runs the linter against a project inside its virtual environment.
pub struct LintGateRunner<T: LintTool> {
    tool: T,
    locator: VenvLocator,
}

impl<T: LintTool> LintGateRunner<T> {
    pub fn new(tool: T, locator: VenvLocator) -> Self {
        Self { tool, locator }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    /// Execute the gate once.
    ///
    /// Never retries. Errors are carried in [`GateRun::outcome`] so a
    /// report can still be written for them.
    pub async fn run(&self, project_dir: &Path) -> GateRun {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let linter = self.tool.command().clone();

        info!(run_id = %run_id, linter = %linter.display(), "Starting lint gate");

        let state = GateState::Running;
        let mut environment = None;
        let (project_dir, outcome) = match resolve_project_dir(project_dir) {
            Ok(project) => {
                let outcome = self.execute(&project, &mut environment).await;
                (project, outcome)
            }
            Err(e) => (project_dir.to_path_buf(), Err(e)),
        };

        let state = match &outcome {
            Ok(outcome) => state.complete(outcome.exit_code),
            Err(e) => state.complete(e.exit_code()),
        };

        let run = GateRun {
            run_id,
            started_at,
            project_dir,
            linter,
            environment,
            outcome,
            state,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        match &run.outcome {
            Ok(outcome) if outcome.passed() => {
                info!(run_id = %run_id, duration_ms = run.duration_ms, "Lint gate passed")
            }
            Ok(outcome) => info!(
                run_id = %run_id,
                status = %outcome.status,
                exit_code = outcome.exit_code,
                "Lint gate failed"
            ),
            Err(e) => warn!(
                run_id = %run_id,
                error = %e,
                exit_code = e.exit_code(),
                linter_started = !e.before_linter(),
                "Lint gate aborted"
            ),
        }

        run
    }

    async fn execute(
        &self,
        project: &Path,
        environment: &mut Option<EnvironmentInfo>,
    ) -> Result<LintOutcome, GateError> {
        // Scoped to this call; dropped on every return path
        let env = self.locator.activate(project)?;
        *environment = Some(EnvironmentInfo::capture(&env));

        let start = Instant::now();
        let output = self.tool.invoke(&env, project).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        // Captured before anything else looks at the result
        let exit_code = map_exit_code(output.status);

        Ok(LintOutcome {
            status: output.status,
            exit_code,
            duration_ms,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Canonicalise and validate the project root.
pub fn resolve_project_dir(path: &Path) -> Result<PathBuf, GateError> {
    let resolved = path.canonicalize().map_err(|e| GateError::ProjectDir {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !resolved.is_dir() {
        return Err(GateError::ProjectDir {
            path: resolved,
            reason: "not a directory".to_string(),
        });
    }
    Ok(resolved)
}
