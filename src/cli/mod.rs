//! CLI command definitions and handlers

pub mod chat;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::settings::ConfigOverrides;
use crate::storage::ConfigService;
use crate::utils::error::AppResult;

/// Bug Cascade - conversational bug fixer
///
/// Reports a bug, asks two clarifying questions, analyzes the target file,
/// applies a fix with a regression test, and runs the tests only after you
/// approve the command.
#[derive(Parser, Debug)]
#[command(name = "bug-cascade")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.bug-cascade/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory every file and command operation is confined to
    #[arg(long, global = true)]
    pub repo_root: Option<String>,

    /// Conversation memory budget in approximate tokens
    #[arg(long, global = true)]
    pub token_budget: Option<usize>,

    /// Use heuristic analysis only
    #[arg(long, global = true)]
    pub no_llm: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Interactive terminal session (default)
    Chat,

    /// Start the HTTP API server
    Serve(ServeArgs),

    /// Write the effective configuration to the config file
    Init(InitArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Listen address, e.g. 127.0.0.1:8000
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        let bind = match &self.command {
            Some(Command::Serve(args)) => args.bind.clone(),
            _ => None,
        };
        ConfigOverrides {
            repo_root: self.repo_root.clone(),
            token_budget: self.token_budget,
            disable_llm: self.no_llm,
            bind,
        }
    }

    /// Load the config file and apply the command-line overrides.
    ///
    /// `init` accepts a `--config` path that does not exist yet.
    pub fn load_config(&self) -> AppResult<ConfigService> {
        let explicit = self.config.as_deref();
        let mut service = match self.command {
            Some(Command::Init(_)) => ConfigService::load_or_default(explicit)?,
            _ => ConfigService::load(explicit)?,
        };
        service.apply_overrides(self.overrides())?;
        Ok(service)
    }
}

/// Persist the effective configuration. Returns `false` when a file already
/// exists and `force` is not set.
pub fn init_config(service: &ConfigService, args: &InitArgs) -> AppResult<bool> {
    if service.config_path().exists() && !args.force {
        return Ok(false);
    }
    service.save()?;
    tracing::info!(path = %service.config_path().display(), "Config written");
    Ok(true)
}
