//! Translation of a linter's termination status into this process's exit code.

use serde::Serialize;

/// Linter reported no violations.
pub const EXIT_SUCCESS: u8 = 0;

/// Generic failure (I/O errors, unknown termination).
pub const EXIT_FAILURE: u8 = 1;

/// The environment could not be activated; the linter never ran.
pub const EXIT_ENVIRONMENT: u8 = 125;

/// The linter was found but could not be executed.
pub const EXIT_NOT_EXECUTABLE: u8 = 126;

/// The linter was not found in the venv or on `PATH`.
pub const EXIT_NOT_FOUND: u8 = 127;

/// How the linter process terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolStatus {
    /// Normal exit with a code
    Exited { code: i32 },
    /// Killed by a signal (Unix)
    Signaled { signal: i32 },
    /// Neither a code nor a signal is available
    Unknown,
}

impl ToolStatus {
    pub fn from_exit_status(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ToolStatus::Exited { code };
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ToolStatus::Signaled { signal };
            }
        }

        ToolStatus::Unknown
    }

    pub fn success(&self) -> bool {
        matches!(self, ToolStatus::Exited { code: 0 })
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolStatus::Exited { code } => write!(f, "exit code {}", code),
            ToolStatus::Signaled { signal } => write!(f, "signal {}", signal),
            ToolStatus::Unknown => write!(f, "unknown status"),
        }
    }
}

/// Map the linter's status to our own exit code.
///
/// Codes in 1..=255 pass through unchanged. A failure never maps to 0.
pub fn map_exit_code(status: ToolStatus) -> u8 {
    match status {
        ToolStatus::Exited { code: 0 } => EXIT_SUCCESS,
        ToolStatus::Exited { code } if (1..=255).contains(&code) => code as u8,
        ToolStatus::Exited { code } => nonzero((code & 0xFF) as u8),
        ToolStatus::Signaled { signal } => {
            let code = 128i64 + i64::from(signal);
            nonzero(code.clamp(1, 255) as u8)
        }
        ToolStatus::Unknown => EXIT_FAILURE,
    }
}

fn nonzero(code: u8) -> u8 {
    if code == 0 {
        EXIT_FAILURE
    } else {
        code
    }
}
