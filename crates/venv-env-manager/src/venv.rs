//! Virtual environment discovery and activation
//!
//! Activation never touches the calling process. It yields an
//! [`ActivatedEnv`] whose [`EnvOverlay`] is applied to a single child
//! command and dropped with it.

use crate::error::EnvError;
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Marker file written by `python -m venv` and virtualenv
pub const PYVENV_CFG: &str = "pyvenv.cfg";

/// Directory holding the environment's executables
#[cfg(windows)]
pub const EXE_DIR: &str = "Scripts";
#[cfg(not(windows))]
pub const EXE_DIR: &str = "bin";

/// Variable an activated shell exports with the venv root
pub const VIRTUAL_ENV_VAR: &str = "VIRTUAL_ENV";

const INTERPRETERS: &[&str] = &["python", "python3"];

/// Conventional venv directory names, relative to the project root
const PROJECT_CANDIDATES: &[&str] = &[".venv", "venv", "../venv", "../.venv"];

/// Parsed `pyvenv.cfg`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PyvenvConfig {
    entries: BTreeMap<String, String>,
}

impl PyvenvConfig {
    /// Parse `key = value` lines; blank lines and lines without `=` are skipped.
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .filter_map(|line| {
                let (key, value) = line.split_once('=')?;
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_lowercase(), value.trim().to_string()))
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Directory of the base interpreter the venv was created from
    pub fn home(&self) -> Option<&str> {
        self.get("home")
    }

    /// Python version (`version` or `version_info`, depending on the creator)
    pub fn version(&self) -> Option<&str> {
        self.get("version").or_else(|| self.get("version_info"))
    }
}

/// Environment variable changes for a child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverlay {
    /// Variables to set
    pub set: Vec<(OsString, OsString)>,
    /// Variables to remove
    pub remove: Vec<OsString>,
}

/// An activated virtual environment.
///
/// Holding one is the "environment is active" state. It is scoped to the
/// value's lifetime; nothing needs to be undone when it is dropped.
#[derive(Debug, Clone)]
pub struct ActivatedEnv {
    root: PathBuf,
    exe_dir: PathBuf,
    config: Option<PyvenvConfig>,
    base_path: Option<OsString>,
}

impl ActivatedEnv {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exe_dir(&self) -> &Path {
        &self.exe_dir
    }

    pub fn config(&self) -> Option<&PyvenvConfig> {
        self.config.as_ref()
    }

    /// Replace the `PATH` the overlay is built on (defaults to the caller's).
    pub fn with_base_path(mut self, base_path: Option<OsString>) -> Self {
        self.base_path = base_path;
        self
    }

    /// `PATH` with the venv executable directory prepended
    pub fn path_value(&self) -> Result<OsString> {
        let mut dirs = vec![self.exe_dir.clone()];
        if let Some(base) = &self.base_path {
            dirs.extend(std::env::split_paths(base));
        }
        std::env::join_paths(dirs).map_err(|e| EnvError::Invalid {
            path: self.exe_dir.clone(),
            reason: e.to_string(),
        })
    }

    /// The same changes `bin/activate` makes to a shell
    pub fn overlay(&self) -> Result<EnvOverlay> {
        Ok(EnvOverlay {
            set: vec![
                (
                    OsString::from(VIRTUAL_ENV_VAR),
                    self.root.clone().into_os_string(),
                ),
                (OsString::from("PATH"), self.path_value()?),
            ],
            remove: vec![OsString::from("PYTHONHOME")],
        })
    }

    /// Apply the overlay to a command; the calling process is left untouched.
    ///
    /// Async callers build a `std::process::Command` and convert it.
    pub fn apply(&self, cmd: &mut Command) -> Result<()> {
        let overlay = self.overlay()?;
        for (key, value) in &overlay.set {
            cmd.env(key, value);
        }
        for key in &overlay.remove {
            cmd.env_remove(key);
        }
        Ok(())
    }

    /// Resolve a program name against the venv first.
    ///
    /// Names containing a path separator are returned untouched. Names not
    /// present in the venv are returned bare so the OS searches the overlaid
    /// `PATH`.
    pub fn resolve_program(&self, name: &str) -> PathBuf {
        let as_path = Path::new(name);
        if as_path.components().count() > 1 {
            return as_path.to_path_buf();
        }

        for candidate in program_candidates(name) {
            let local = self.exe_dir.join(&candidate);
            if local.is_file() {
                debug!(program = %local.display(), "Resolved program inside venv");
                return local;
            }
        }
        PathBuf::from(name)
    }
}

#[cfg(windows)]
fn program_candidates(name: &str) -> Vec<String> {
    if Path::new(name).extension().is_some() {
        vec![name.to_string()]
    } else {
        vec![format!("{name}.exe"), name.to_string()]
    }
}

#[cfg(not(windows))]
fn program_candidates(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

/// Whether `path` looks like a virtual environment
pub fn is_venv(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    if path.join(PYVENV_CFG).is_file() {
        return true;
    }
    let exe_dir = path.join(EXE_DIR);
    INTERPRETERS.iter().any(|name| {
        program_candidates(name)
            .iter()
            .any(|c| exe_dir.join(c).is_file())
    })
}

/// Activate the environment rooted at `root`.
///
/// # TDD: test_activate_missing_root_fails
pub fn activate(root: &Path) -> Result<ActivatedEnv> {
    if !root.exists() {
        return Err(EnvError::NotFound {
            searched: vec![root.to_path_buf()],
        });
    }
    if !is_venv(root) {
        return Err(EnvError::Invalid {
            path: root.to_path_buf(),
            reason: format!("missing {PYVENV_CFG} and no interpreter in {EXE_DIR}/"),
        });
    }

    let root = root.canonicalize()?;
    let exe_dir = root.join(EXE_DIR);
    if !exe_dir.is_dir() {
        return Err(EnvError::Invalid {
            path: root,
            reason: format!("missing {EXE_DIR}/ directory"),
        });
    }

    let cfg_path = root.join(PYVENV_CFG);
    let config = if cfg_path.is_file() {
        Some(PyvenvConfig::parse(&std::fs::read_to_string(&cfg_path)?))
    } else {
        None
    };

    info!(
        venv = %root.display(),
        python = config.as_ref().and_then(|c| c.version()).unwrap_or("unknown"),
        "Activated virtual environment"
    );

    Ok(ActivatedEnv {
        root,
        exe_dir,
        config,
        base_path: std::env::var_os("PATH"),
    })
}

/// Finds the virtual environment for a project.
#[derive(Debug, Clone)]
pub struct VenvLocator {
    explicit: Option<PathBuf>,
    inherit_active: bool,
}

impl Default for VenvLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl VenvLocator {
    pub fn new() -> Self {
        Self {
            explicit: None,
            inherit_active: false,
        }
    }

    /// Use exactly this venv; no other candidate is tried.
    pub fn with_explicit(mut self, path: impl Into<PathBuf>) -> Self {
        self.explicit = Some(path.into());
        self
    }

    /// Whether an already-exported `VIRTUAL_ENV` is tried after the project's
    /// own candidates. Off by default.
    pub fn inherit_active(mut self, inherit: bool) -> Self {
        self.inherit_active = inherit;
        self
    }

    /// Candidate roots in search order.
    pub fn candidates(&self, project: &Path, active: Option<&OsStr>) -> Vec<PathBuf> {
        if let Some(explicit) = &self.explicit {
            let path = if explicit.is_absolute() {
                explicit.clone()
            } else {
                project.join(explicit)
            };
            return vec![path];
        }

        let mut out: Vec<PathBuf> = PROJECT_CANDIDATES.iter().map(|c| project.join(c)).collect();
        if self.inherit_active {
            if let Some(active) = active.filter(|v| !v.is_empty()) {
                out.push(PathBuf::from(active));
            }
        }
        out
    }

    /// Locate the venv root for `project`, reading `VIRTUAL_ENV` from the caller.
    pub fn locate(&self, project: &Path) -> Result<PathBuf> {
        let active = std::env::var_os(VIRTUAL_ENV_VAR);
        self.locate_with(project, active.as_deref())
    }

    /// Same as [`locate`](Self::locate) with an explicit `VIRTUAL_ENV` value.
    pub fn locate_with(&self, project: &Path, active: Option<&OsStr>) -> Result<PathBuf> {
        let candidates = self.candidates(project, active);

        if self.explicit.is_some() {
            let path = &candidates[0];
            if !path.exists() {
                return Err(EnvError::NotFound {
                    searched: candidates,
                });
            }
            if !is_venv(path) {
                return Err(EnvError::Invalid {
                    path: path.clone(),
                    reason: format!("missing {PYVENV_CFG} and no interpreter in {EXE_DIR}/"),
                });
            }
            return Ok(path.clone());
        }

        for candidate in &candidates {
            debug!(candidate = %candidate.display(), "Checking venv candidate");
            if is_venv(candidate) {
                return Ok(candidate.clone());
            }
        }

        Err(EnvError::NotFound {
            searched: candidates,
        })
    }

    /// Locate and activate in one step.
    pub fn activate(&self, project: &Path) -> Result<ActivatedEnv> {
        let root = self.locate(project)?;
        activate(&root)
    }
}
