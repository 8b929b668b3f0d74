//! Session Service
//!
//! A session binds one conversation log, one bug ledger, one permission gate
//! and the active bug. The registry is owned by the transport and maps
//! opaque session ids to sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use bug_cascade_core::ConversationLog;
use bug_cascade_tools::{
    CommandRunner, DeferredPermissionGate, ExecutionBoundary, GateMode, PermissionGate,
    PermissionResponse, SystemCommandRunner,
};

use crate::models::settings::AgentConfig;
use crate::services::analyzer::{build_default_analyzer, BugAnalyzer};
use crate::services::fixer::{FixAuthor, ZeroDivisionFixAuthor};
use crate::services::orchestrator::{
    no_matching_request, OrchestratorSettings, ResolutionOrchestrator, TurnOutcome,
};
use crate::utils::error::{AppError, AppResult};

/// One conversation with its own memory, ledger and permission gate.
pub struct Session {
    id: String,
    orchestrator: ResolutionOrchestrator,
    gate: Arc<dyn PermissionGate>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn gate_mode(&self) -> GateMode {
        self.gate.mode()
    }

    pub fn orchestrator(&self) -> &ResolutionOrchestrator {
        &self.orchestrator
    }

    pub async fn handle_message(&mut self, text: &str) -> TurnOutcome {
        tracing::debug!(session_id = %self.id, "User message");
        self.orchestrator.handle_message(text).await
    }

    /// Record an out-of-band decision, then re-drive the test step.
    pub async fn resolve_permission(
        &mut self,
        request_id: &str,
        response: PermissionResponse,
    ) -> TurnOutcome {
        if let Err(e) = self.gate.resolve_pending(request_id, response).await {
            tracing::info!(session_id = %self.id, request_id = %request_id, error = %e, "Permission response rejected");
            return self.orchestrator.notice(no_matching_request());
        }
        self.orchestrator.run_tests().await
    }

    pub fn context(&self) -> String {
        self.orchestrator.context()
    }
}

/// Builds sessions from configuration and shared collaborators.
pub struct SessionFactory {
    config: AgentConfig,
    analyzer: Arc<dyn BugAnalyzer>,
    fixer: Arc<dyn FixAuthor>,
    runner: Arc<dyn CommandRunner>,
}

impl SessionFactory {
    pub fn new(
        config: AgentConfig,
        analyzer: Arc<dyn BugAnalyzer>,
        fixer: Arc<dyn FixAuthor>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config,
            analyzer,
            fixer,
            runner,
        }
    }

    /// Default collaborators: the configured analyzer chain, the zero-division
    /// fix author and the system shell.
    pub fn from_config(config: AgentConfig) -> AppResult<Self> {
        let analyzer = build_default_analyzer(&config.llm)?;
        let fixer = ZeroDivisionFixAuthor::new()
            .map_err(|e| AppError::internal(format!("invalid fix pattern: {}", e)))?;
        Ok(Self::new(
            config,
            analyzer,
            Arc::new(fixer),
            Arc::new(SystemCommandRunner::new()),
        ))
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn build(&self, id: impl Into<String>, gate: Arc<dyn PermissionGate>) -> AppResult<Session> {
        let id = id.into();
        let boundary =
            ExecutionBoundary::new(&self.config.repo_root, gate.clone(), self.runner.clone())?;
        let orchestrator = ResolutionOrchestrator::new(
            OrchestratorSettings::from(&self.config),
            ConversationLog::new(self.config.token_budget),
            boundary,
            self.analyzer.clone(),
            self.fixer.clone(),
        );
        tracing::info!(session_id = %id, mode = ?gate.mode(), "Session created");
        Ok(Session {
            id,
            orchestrator,
            gate,
        })
    }

    /// Session whose commands wait for `resolve_permission`.
    pub fn build_deferred(&self, id: impl Into<String>) -> AppResult<Session> {
        self.build(id, Arc::new(DeferredPermissionGate::new()))
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

/// Explicit map of live sessions. Sessions are never evicted.
pub struct SessionRegistry {
    factory: Arc<SessionFactory>,
    sessions: RwLock<HashMap<String, SharedSession>>,
}

impl SessionRegistry {
    pub fn new(factory: Arc<SessionFactory>) -> Self {
        Self {
            factory,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a deferred-permission session under a fresh id.
    pub async fn create(&self) -> AppResult<(String, SharedSession)> {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(self.factory.build_deferred(id.clone())?));
        self.sessions.write().await.insert(id.clone(), session.clone());
        Ok((id, session))
    }

    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Look up a session, creating it on first contact.
    pub async fn get_or_create(&self, id: &str) -> AppResult<SharedSession> {
        if let Some(session) = self.get(id).await {
            return Ok(session);
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(id) {
            return Ok(session.clone());
        }
        let session = Arc::new(Mutex::new(self.factory.build_deferred(id)?));
        sessions.insert(id.to_string(), session.clone());
        Ok(session)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub fn factory(&self) -> &Arc<SessionFactory> {
        &self.factory
    }
}
