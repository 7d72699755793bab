// src/core/paths.rs

use crate::constants::HOME_ENV_VAR;
use lazy_static::lazy_static;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref DEFAULT_BASE_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system data directory.")]
    DataDirNotFound,
    #[error("Could not expand path '{path}': {reason}")]
    Expansion { path: String, reason: String },
    #[error("Could not create base directory at '{path}': {source}")]
    BaseDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Expands `~` and environment variables in a user-supplied path and strips
/// Windows verbatim prefixes.
pub fn expand(raw: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(raw).map_err(|e| PathError::Expansion {
        path: raw.to_string(),
        reason: e.to_string(),
    })?;
    Ok(dunce::simplified(&PathBuf::from(expanded.into_owned())).to_path_buf())
}

/// Returns the default registry base directory (`<data dir>/defreg`).
///
/// Memoized: the first call computes the path, later calls return the cached value.
pub fn default_base_dir() -> Result<PathBuf, PathError> {
    let mut cached = DEFAULT_BASE_DIR
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    if let Some(path) = &*cached {
        return Ok(path.clone());
    }
    let path = dirs::data_dir()
        .ok_or(PathError::DataDirNotFound)?
        .join("defreg");
    *cached = Some(path.clone());
    Ok(path)
}

/// Resolves the base directory: explicit value, then `DEFREG_HOME`, then the default.
/// The directory is created if it does not exist.
pub fn resolve_base_dir(explicit: Option<&str>) -> Result<PathBuf, PathError> {
    let from_env = std::env::var(HOME_ENV_VAR).ok().filter(|v| !v.trim().is_empty());
    let base = match explicit.map(str::to_string).or(from_env) {
        Some(raw) => expand(&raw)?,
        None => default_base_dir()?,
    };
    if !base.exists() {
        fs::create_dir_all(&base).map_err(|e| PathError::BaseDirCreation {
            path: base.display().to_string(),
            source: e,
        })?;
    }
    Ok(base)
}
