//! lint-gate CLI
//!
//! Runs the project's linter inside its virtual environment and exits with
//! the linter's status. Every flag is optional; with none, `flake8 .` runs
//! in the current directory using the project's own venv.
//!
//! ## Exit codes
//!
//! - `0`: lint passed
//! - `1..=255`: the linter's own non-zero exit code
//! - `125`: environment activation failed, linter not run
//! - `126` / `127`: linter not executable / not found

use anyhow::{Context, Result};
use clap::Parser;
use lint_gate::{
    exit::EXIT_FAILURE, init_tracing, GateReport, GateRun, LintCommand, LintGateRunner,
    OutputMode, ProcessLintTool, DEFAULT_LINTER,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, warn, Level};
use venv_env_manager::VenvLocator;

#[derive(Parser, Debug)]
#[command(name = "lint-gate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run the project linter in its virtual environment and propagate its exit code", long_about = None)]
struct Cli {
    /// Project root to lint
    #[arg(short, long, env = "LINT_GATE_PROJECT", default_value = ".")]
    project: PathBuf,

    /// Virtual environment to activate (default: search .venv, venv, ../venv)
    #[arg(long, env = "LINT_GATE_VENV")]
    venv: Option<PathBuf>,

    /// Fall back to an already-active VIRTUAL_ENV when the project has no venv
    #[arg(long)]
    inherit_active_venv: bool,

    /// Linter program, resolved inside the venv first
    #[arg(long, env = "LINT_GATE_LINTER", default_value = DEFAULT_LINTER)]
    linter: String,

    /// Capture linter output and print it after the run instead of streaming it
    #[arg(long)]
    capture: bool,

    /// Write a JSON run report to this file
    #[arg(long, env = "LINT_GATE_REPORT")]
    report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,

    /// Arguments passed to the linter (default: `.`)
    #[arg(last = true)]
    linter_args: Vec<String>,
}

impl Cli {
    fn lint_command(&self) -> LintCommand {
        LintCommand::custom(self.linter.clone(), self.linter_args.clone())
    }

    fn locator(&self) -> VenvLocator {
        let locator = VenvLocator::new().inherit_active(self.inherit_active_venv);
        match &self.venv {
            Some(venv) => locator.with_explicit(venv),
            None => locator,
        }
    }

    fn output_mode(&self) -> OutputMode {
        if self.capture {
            OutputMode::Capture
        } else {
            OutputMode::Inherit
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Quiet by default: the linter's own output is the user-facing result
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    init_tracing(cli.json, level);

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    Ok(runtime.block_on(run_gate(&cli)))
}

async fn run_gate(cli: &Cli) -> u8 {
    let tool = ProcessLintTool::new(cli.lint_command()).with_output(cli.output_mode());
    let runner = LintGateRunner::new(tool, cli.locator());

    let run = runner.run(&cli.project).await;

    finish(
        &run,
        cli.report.as_deref(),
        &mut std::io::stdout().lock(),
        &mut std::io::stderr().lock(),
    )
}

/// Re-emit captured output, write the report, and return the run's exit code.
///
/// Nothing here can change the exit code: write failures (a closed pipe,
/// an unwritable report path) are logged and skipped.
fn finish(run: &GateRun, report: Option<&Path>, out: &mut dyn Write, err: &mut dyn Write) -> u8 {
    match &run.outcome {
        Ok(outcome) => {
            if let Some(stdout) = &outcome.stdout {
                emit(out, stdout, "stdout");
            }
            if let Some(stderr) = &outcome.stderr {
                emit(err, stderr, "stderr");
            }
        }
        Err(e) => emit(err, format!("lint-gate: {}\n", e).as_bytes(), "stderr"),
    }

    if let Some(path) = report {
        if let Err(e) = GateReport::from_run(run).write(path) {
            warn!(path = %path.display(), error = %e, "Failed to write gate report");
        }
    }

    run.exit_code()
}

fn emit(stream: &mut dyn Write, bytes: &[u8], name: &str) {
    if let Err(e) = stream.write_all(bytes).and_then(|_| stream.flush()) {
        warn!(stream = name, error = %e, "Failed to forward linter output");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_arguments_runs_flake8_in_cwd() {
        let cli = Cli::try_parse_from(["lint-gate"]).unwrap();
        assert_eq!(cli.project, PathBuf::from("."));
        assert_eq!(cli.lint_command(), LintCommand::flake8());
        assert_eq!(cli.output_mode(), OutputMode::Inherit);
        assert!(cli.report.is_none());
    }

    #[test]
    fn test_trailing_args_go_to_linter() {
        let cli = Cli::try_parse_from([
            "lint-gate",
            "--project",
            "backend_api",
            "--",
            "--max-line-length=120",
            "api",
        ])
        .unwrap();

        let cmd = cli.lint_command();
        assert_eq!(cmd.program, "flake8");
        assert_eq!(cmd.args, vec!["--max-line-length=120", "api"]);
        assert_eq!(cli.project, PathBuf::from("backend_api"));
    }

    #[test]
    fn test_explicit_venv_is_only_candidate() {
        let cli = Cli::try_parse_from(["lint-gate", "--venv", "/opt/venv"]).unwrap();
        let candidates = cli
            .locator()
            .candidates(std::path::Path::new("/srv/app"), None);
        assert_eq!(candidates, vec![PathBuf::from("/opt/venv")]);
    }

    #[test]
    fn test_active_venv_is_opt_in() {
        let active = Some(std::ffi::OsStr::new("/opt/active"));
        let project = std::path::Path::new("/srv/app");

        let cli = Cli::try_parse_from(["lint-gate"]).unwrap();
        let candidates = cli.locator().candidates(project, active);
        assert!(!candidates.contains(&PathBuf::from("/opt/active")));

        let cli = Cli::try_parse_from(["lint-gate", "--inherit-active-venv"]).unwrap();
        let candidates = cli.locator().candidates(project, active);
        assert_eq!(candidates.last(), Some(&PathBuf::from("/opt/active")));
    }

    #[test]
    fn test_capture_flag() {
        let cli = Cli::try_parse_from(["lint-gate", "--capture", "--linter", "ruff"]).unwrap();
        assert_eq!(cli.output_mode(), OutputMode::Capture);
        assert_eq!(cli.lint_command().program, "ruff");
    }

    /// A writer whose reader has gone away
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }
    }

    #[cfg(unix)]
    fn fake_project(script_exit: i32) -> (tempfile::TempDir, Cli) {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join(".venv").join(venv_env_manager::EXE_DIR);
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(
            dir.path().join(".venv").join(venv_env_manager::PYVENV_CFG),
            "version = 3.11.4\n",
        )
        .unwrap();
        std::os::unix::fs::symlink("/bin/sh", bin.join("flake8")).unwrap();

        let script = format!("printf 'caf\\351.py:1:1: E302\\n'; exit {}", script_exit);
        let project = dir.path().display().to_string();
        let cli = Cli::try_parse_from([
            "lint-gate",
            "--project",
            project.as_str(),
            "--capture",
            "--",
            "-c",
            script.as_str(),
        ])
        .unwrap();
        (dir, cli)
    }

    #[cfg(unix)]
    async fn gate_run(cli: &Cli) -> GateRun {
        let tool = ProcessLintTool::new(cli.lint_command()).with_output(cli.output_mode());
        LintGateRunner::new(tool, cli.locator())
            .run(&cli.project)
            .await
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_captured_output_forwarded_byte_exact() {
        let (_dir, cli) = fake_project(1);
        let run = gate_run(&cli).await;

        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = finish(&run, None, &mut out, &mut err);

        assert_eq!(code, 1);
        assert_eq!(out, b"caf\xe9.py:1:1: E302\n");
        assert!(err.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_closed_stdout_keeps_linter_exit_code() {
        let (dir, cli) = fake_project(3);
        let run = gate_run(&cli).await;
        let report = dir.path().join("lint-gate.json");

        let code = finish(&run, Some(&report), &mut ClosedPipe, &mut ClosedPipe);

        assert_eq!(code, 3);
        assert!(report.is_file(), "report still written");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_report_failure_keeps_linter_exit_code() {
        let (dir, cli) = fake_project(1);
        let run = gate_run(&cli).await;

        // A directory cannot be opened as the report file
        let code = finish(&run, Some(dir.path()), &mut Vec::new(), &mut Vec::new());

        assert_eq!(code, 1);
    }

    #[test]
    fn test_emit_swallows_write_errors() {
        emit(&mut ClosedPipe, b"api/views.py:1:1: E302\n", "stdout");
    }
}
