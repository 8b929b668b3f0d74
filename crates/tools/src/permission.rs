//! Command Permission Types
//!
//! Defines the `PermissionGate` capability consulted before any shell command
//! runs, together with the request/response payloads shared by the
//! interactive and deferred implementations.
//!
//! The orchestrator only sees `dyn PermissionGate`; whether the decision is
//! asked for on a terminal or arrives later from a separate web request is
//! an implementation detail of the gate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bug_cascade_core::CoreResult;

/// How a gate obtains its decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMode {
    /// Ask the controlling user and block until they answer
    Interactive,
    /// Record a pending request and return immediately; the decision arrives later
    Deferred,
}

/// An outstanding request to run a side-effecting command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub request_id: String,
    pub command: String,
}

/// Decision for a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionResponse {
    /// Whether the command may run
    pub allowed: bool,
    /// If true, auto-allow every command for the remainder of the session
    #[serde(default)]
    pub always_allow: bool,
}

impl PermissionResponse {
    pub fn approve_once() -> Self {
        Self {
            allowed: true,
            always_allow: false,
        }
    }

    pub fn approve_for_session() -> Self {
        Self {
            allowed: true,
            always_allow: true,
        }
    }

    pub fn deny() -> Self {
        Self {
            allowed: false,
            always_allow: false,
        }
    }

    /// Whether this decision latches the session-wide allow flag.
    pub(crate) fn latches(&self) -> bool {
        self.allowed && self.always_allow
    }
}

/// Capability consulted before every externally visible command.
///
/// `request` returning `false` means "not approved right now": the caller
/// must not run the command and reports that outcome, it is not an error.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Ask whether `command` may run. May suspend in interactive mode.
    async fn request(&self, command: &str) -> bool;

    /// The request currently awaiting a decision, if any.
    async fn pending(&self) -> Option<PendingApproval>;

    /// Record an out-of-band decision for the pending request `request_id`.
    ///
    /// Fails with `CoreError::NoMatchingApprovalRequest` when no pending
    /// request carries that id.
    async fn resolve_pending(&self, request_id: &str, response: PermissionResponse)
        -> CoreResult<()>;

    fn mode(&self) -> GateMode;
}
