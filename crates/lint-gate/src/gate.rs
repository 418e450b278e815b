//! Gate state and pass/fail verdict.

use crate::error::GateError;
use crate::exit::{EXIT_FAILURE, EXIT_SUCCESS};
use serde::Serialize;

/// Lifecycle of a single gate run.
///
/// `Running` is initial. `Passed` and `Failed` are terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    Running,
    Passed,
    Failed { exit_code: u8 },
}

impl GateState {
    /// Settle on the captured exit code. A terminal state is returned unchanged.
    pub fn complete(self, exit_code: u8) -> GateState {
        match self {
            GateState::Running if exit_code == EXIT_SUCCESS => GateState::Passed,
            GateState::Running => GateState::Failed { exit_code },
            terminal => terminal,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, GateState::Running)
    }

    /// Exit code of a terminal state; `None` while running.
    pub fn exit_code(&self) -> Option<u8> {
        match self {
            GateState::Running => None,
            GateState::Passed => Some(EXIT_SUCCESS),
            GateState::Failed { exit_code } => Some(*exit_code),
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateState::Running => write!(f, "running"),
            GateState::Passed => write!(f, "passed"),
            GateState::Failed { exit_code } => write!(f, "failed (exit code {})", exit_code),
        }
    }
}

/// Gate evaluation verdict.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GateVerdict {
    /// Whether the gate passed.
    pub passed: bool,

    /// Exit code the process should terminate with.
    pub exit_code: u8,

    /// Summary message.
    pub message: String,
}

/// Pass/fail rules.
pub struct LintGate;

impl LintGate {
    /// Evaluate a run's state.
    ///
    /// Gate rule:
    /// - `Passed` passes with exit code 0
    /// - `Failed` fails with the captured code; `error` explains an abort
    /// - a run still `Running` never passes
    pub fn evaluate(state: GateState, error: Option<&GateError>) -> GateVerdict {
        match (state, error) {
            (GateState::Passed, _) => GateVerdict {
                passed: true,
                exit_code: EXIT_SUCCESS,
                message: "Lint passed".to_string(),
            },
            (GateState::Failed { exit_code }, Some(err)) => GateVerdict {
                passed: false,
                exit_code,
                message: err.to_string(),
            },
            (GateState::Failed { exit_code }, None) => GateVerdict {
                passed: false,
                exit_code,
                message: format!("Lint failed with exit code {}", exit_code),
            },
            (GateState::Running, _) => GateVerdict {
                passed: false,
                exit_code: EXIT_FAILURE,
                message: "Lint gate did not finish".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use venv_env_manager::EnvError;

    #[test]
    fn test_running_to_passed() {
        let state = GateState::Running.complete(0);
        assert_eq!(state, GateState::Passed);
        assert!(state.is_terminal());
        assert_eq!(state.exit_code(), Some(0));
    }

    #[test]
    fn test_running_to_failed() {
        let state = GateState::Running.complete(1);
        assert_eq!(state, GateState::Failed { exit_code: 1 });
        assert_eq!(state.exit_code(), Some(1));
    }

    #[test]
    fn test_terminal_states_are_absorbing() {
        assert_eq!(GateState::Passed.complete(1), GateState::Passed);
        assert_eq!(
            GateState::Failed { exit_code: 2 }.complete(0),
            GateState::Failed { exit_code: 2 }
        );
    }

    #[test]
    fn test_running_has_no_exit_code() {
        assert!(!GateState::Running.is_terminal());
        assert_eq!(GateState::Running.exit_code(), None);
    }

    #[test]
    fn test_evaluate_pass() {
        let verdict = LintGate::evaluate(GateState::Passed, None);
        assert!(verdict.passed);
        assert_eq!(verdict.exit_code, 0);
    }

    #[test]
    fn test_evaluate_violation_keeps_code() {
        let verdict = LintGate::evaluate(GateState::Running.complete(1), None);
        assert!(!verdict.passed);
        assert_eq!(verdict.exit_code, 1);
        assert!(verdict.message.contains("exit code 1"));
    }

    #[test]
    fn test_evaluate_environment_error() {
        let err = GateError::from(EnvError::NotFound { searched: vec![] });
        let state = GateState::Running.complete(err.exit_code());
        let verdict = LintGate::evaluate(state, Some(&err));
        assert!(!verdict.passed);
        assert_eq!(verdict.exit_code, 125);
        assert!(verdict.message.contains("Environment activation failed"));
    }

    #[test]
    fn test_evaluate_unfinished_run_fails() {
        let verdict = LintGate::evaluate(GateState::Running, None);
        assert!(!verdict.passed);
        assert_ne!(verdict.exit_code, 0);
    }
}
