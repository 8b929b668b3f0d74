//! JSON Configuration Management
//!
//! Handles reading and writing the agent configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::settings::{AgentConfig, ConfigOverrides};
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for loading agent settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AgentConfig,
}

impl ConfigService {
    /// Load from `explicit` when given, otherwise from ~/.bug-cascade/config.json.
    ///
    /// An explicit path must exist. The default location falls back to the
    /// built-in defaults when no file is there.
    pub fn load(explicit: Option<&Path>) -> AppResult<Self> {
        Self::open(explicit, false)
    }

    /// Like `load`, but a missing explicit file also yields the defaults,
    /// bound to that path so `save` creates it.
    pub fn load_or_default(explicit: Option<&Path>) -> AppResult<Self> {
        Self::open(explicit, true)
    }

    fn open(explicit: Option<&Path>, allow_missing: bool) -> AppResult<Self> {
        let (config_path, config) = match explicit {
            Some(path) if allow_missing && !path.exists() => {
                tracing::debug!(path = %path.display(), "Config file absent; using defaults");
                (path.to_path_buf(), AgentConfig::default())
            }
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::not_found(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                (path.to_path_buf(), Self::load_from_file(path)?)
            }
            None => {
                let path = config_path()?;
                let config = if path.exists() {
                    Self::load_from_file(&path)?
                } else {
                    tracing::debug!(path = %path.display(), "No config file; using defaults");
                    AgentConfig::default()
                };
                (path, config)
            }
        };

        tracing::debug!(path = %config_path.display(), "Configuration loaded");
        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AgentConfig> {
        let content = fs::read_to_string(path)?;
        let config: AgentConfig = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AgentConfig) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Apply command-line overrides and re-validate
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) -> AppResult<&AgentConfig> {
        self.config.apply_overrides(overrides);
        self.config.validate().map_err(AppError::validation)?;
        Ok(&self.config)
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Consume the service, keeping only the configuration
    pub fn into_config(self) -> AgentConfig {
        self.config
    }
}
