//! Settings Models
//!
//! Agent configuration stored in config.json.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use bug_cascade_core::DEFAULT_TOKEN_BUDGET;

/// Agent configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Root directory every file operation and command is confined to
    #[serde(default = "default_repo_root")]
    pub repo_root: String,
    /// File under analysis, relative to `repo_root`
    #[serde(default = "default_target_file")]
    pub target_file: String,
    /// Test file the fix author extends, relative to `repo_root`
    #[serde(default = "default_test_file")]
    pub test_file: String,
    /// Command proposed for the test run
    #[serde(default = "default_test_command")]
    pub test_command: String,
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,
    /// Conversation log budget in approximate tokens
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

fn default_repo_root() -> String {
    ".".to_string()
}

fn default_target_file() -> String {
    "demo_repo/src/calculator.py".to_string()
}

fn default_test_file() -> String {
    "demo_repo/tests/test_calculator.py".to_string()
}

fn default_test_command() -> String {
    "pytest -q".to_string()
}

fn default_test_timeout_secs() -> u64 {
    60
}

fn default_token_budget() -> usize {
    DEFAULT_TOKEN_BUDGET
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            target_file: default_target_file(),
            test_file: default_test_file(),
            test_command: default_test_command(),
            test_timeout_secs: default_test_timeout_secs(),
            token_budget: default_token_budget(),
            llm: LlmSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

/// Reasoning service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Use the LLM analyzer when an API key is present
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    /// Chat-completions endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
        }
    }
}

impl LlmSettings {
    /// API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Command-line overrides (partial update)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub repo_root: Option<String>,
    pub token_budget: Option<usize>,
    pub disable_llm: bool,
    pub bind: Option<String>,
}

impl AgentConfig {
    /// Apply command-line overrides to the configuration
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(root) = overrides.repo_root {
            self.repo_root = root;
        }
        if let Some(budget) = overrides.token_budget {
            self.token_budget = budget;
        }
        if overrides.disable_llm {
            self.llm.enabled = false;
        }
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.repo_root.trim().is_empty() {
            return Err("repo_root cannot be empty".to_string());
        }

        if self.target_file.trim().is_empty() || self.test_file.trim().is_empty() {
            return Err("target_file and test_file must be set".to_string());
        }

        if self.test_command.trim().is_empty() {
            return Err("test_command cannot be empty".to_string());
        }

        if !(1..=600).contains(&self.test_timeout_secs) {
            return Err(format!(
                "Invalid test_timeout_secs: {}. Must be between 1 and 600",
                self.test_timeout_secs
            ));
        }

        if self.token_budget == 0 {
            return Err("token_budget must be positive".to_string());
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(format!("Invalid temperature: {}", self.llm.temperature));
        }

        if self.server.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", self.server.bind));
        }

        Ok(())
    }
}
