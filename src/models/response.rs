//! Response Types
//!
//! Request and response bodies for the HTTP transport.

use serde::{Deserialize, Serialize};

use crate::services::orchestrator::TurnOutcome;

/// Shape tag of a chat response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatResponseType {
    Message,
    PermissionRequest,
}

/// Response to `/chat` and `/permission/respond`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(rename = "type")]
    pub response_type: ChatResponseType,
    pub agent_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl From<TurnOutcome> for ChatResponse {
    fn from(outcome: TurnOutcome) -> Self {
        let agent_message = if outcome.messages.is_empty() {
            "(no response)".to_string()
        } else {
            outcome.agent_message()
        };
        let (response_type, request_id, command) = match outcome.permission {
            Some(pending) => (
                ChatResponseType::PermissionRequest,
                Some(pending.request_id),
                Some(pending.command),
            ),
            None => (ChatResponseType::Message, None, None),
        };
        Self {
            response_type,
            agent_message,
            diff: outcome.diff,
            test_output: outcome.test_output,
            request_id,
            command,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRespondRequest {
    pub session_id: String,
    pub request_id: String,
    pub approved: bool,
    /// Approve every later command in this session as well
    #[serde(default)]
    pub always_allow: bool,
}

/// Rendered session memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResponse {
    pub session_id: String,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_bug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub sessions: usize,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            service: "bug-cascade".to_string(),
            sessions: 0,
        }
    }
}
