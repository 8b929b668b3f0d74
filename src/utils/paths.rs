//! Cross-Platform Path Utilities
//!
//! Resolves the application directory (~/.bug-cascade/) across platforms.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Bug Cascade directory (~/.bug-cascade/)
pub fn bug_cascade_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".bug-cascade"))
}

/// Get the config file path (~/.bug-cascade/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(bug_cascade_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
