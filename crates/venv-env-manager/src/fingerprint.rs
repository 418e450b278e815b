//! Environment fingerprinting
//!
//! A fingerprint identifies which environment a gate run used, so two
//! reports can be compared for "same tree, same environment".

use crate::venv::{ActivatedEnv, PYVENV_CFG};
use crate::Result;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::debug;

/// Content hash of an activated environment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EnvFingerprint {
    /// The SHA256 hash
    pub hash: String,
    /// What was hashed
    pub source: FingerprintSource,
}

/// Source of the fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintSource {
    /// Hash of pyvenv.cfg
    PyvenvCfg,
    /// Hash of the sorted executable directory listing (no pyvenv.cfg)
    ExeListing,
}

impl std::fmt::Display for EnvFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

impl EnvFingerprint {
    pub fn new(hash: String, source: FingerprintSource) -> Self {
        EnvFingerprint { hash, source }
    }

    /// Get short hash (first 12 characters)
    pub fn short(&self) -> &str {
        &self.hash[..12.min(self.hash.len())]
    }
}

/// Fingerprint an activated environment.
///
/// Prefers `pyvenv.cfg`; falls back to the names in the executable directory.
pub fn fingerprint(env: &ActivatedEnv) -> Result<EnvFingerprint> {
    let cfg = env.root().join(PYVENV_CFG);
    if cfg.is_file() {
        return hash_file(&cfg);
    }
    hash_listing(env.exe_dir())
}

fn hash_file(path: &Path) -> Result<EnvFingerprint> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    let hash = hex::encode(hasher.finalize());

    debug!("pyvenv.cfg hash: {}", &hash[..12]);
    Ok(EnvFingerprint::new(hash, FingerprintSource::PyvenvCfg))
}

fn hash_listing(dir: &Path) -> Result<EnvFingerprint> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();

    // Sort for deterministic ordering
    names.sort();

    let mut hasher = Sha256::new();
    for name in &names {
        hasher.update(name.as_bytes());
        hasher.update(b"\0");
    }
    let hash = hex::encode(hasher.finalize());

    debug!("Executable listing hash: {}", &hash[..12]);
    Ok(EnvFingerprint::new(hash, FingerprintSource::ExeListing))
}
