//! Application State
//!
//! Shared by the HTTP handlers: the loaded configuration and the session
//! registry.

use std::sync::Arc;

use crate::models::settings::AgentConfig;
use crate::services::session::{SessionFactory, SessionRegistry};
use crate::utils::error::AppResult;

#[derive(Clone)]
pub struct AppState {
    config: Arc<AgentConfig>,
    registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(factory: SessionFactory) -> Self {
        let config = Arc::new(factory.config().clone());
        Self {
            config,
            registry: Arc::new(SessionRegistry::new(Arc::new(factory))),
        }
    }

    /// State with the default analyzer chain, fix author and shell runner.
    pub fn from_config(config: AgentConfig) -> AppResult<Self> {
        Ok(Self::new(SessionFactory::from_config(config)?))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }
}
