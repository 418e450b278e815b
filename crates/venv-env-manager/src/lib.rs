//! Venv-Env-Manager: Python virtual environment integration for lint-gate
//!
//! This crate provides the environment layer for lint-gate. It finds the
//! virtual environment that owns a project's tooling and turns it into an
//! explicit, scoped [`ActivatedEnv`] that is handed to the child command,
//! instead of mutating the calling process the way `source bin/activate` does.
//!
//! Creating environments or installing packages is out of scope; an
//! environment is consumed as it is found on disk.

pub mod error;
pub mod fingerprint;
pub mod venv;

pub use error::EnvError;
pub use fingerprint::{fingerprint, EnvFingerprint, FingerprintSource};
pub use venv::{
    activate, is_venv, ActivatedEnv, EnvOverlay, PyvenvConfig, VenvLocator, EXE_DIR, PYVENV_CFG,
    VIRTUAL_ENV_VAR,
};

/// Result type for environment operations
pub type Result<T> = std::result::Result<T, EnvError>;
