//! Deferred Permission Gate
//!
//! Web-style gate: a command without a recorded decision becomes the single
//! pending request of the session and `request` returns `false` right away.
//! The decision arrives later through `resolve_pending` (a separate entry
//! point, typically another HTTP request), and the next `request` for the
//! same command consumes it exactly once.
//!
//! The state is behind a mutex, but the transport must still serialize the
//! request / resolve / re-drive sequence per session.

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use bug_cascade_core::{CoreError, CoreResult};

use crate::permission::{GateMode, PendingApproval, PermissionGate, PermissionResponse};

/// Lifecycle of the single approval slot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ApprovalState {
    Idle,
    Pending(PendingApproval),
    Decided {
        approval: PendingApproval,
        allowed: bool,
    },
}

#[derive(Debug)]
struct GateInner {
    state: ApprovalState,
    always_allow: bool,
}

/// Permission gate whose decisions arrive asynchronously.
#[derive(Debug)]
pub struct DeferredPermissionGate {
    inner: Mutex<GateInner>,
}

impl DeferredPermissionGate {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: ApprovalState::Idle,
                always_allow: false,
            }),
        }
    }

    /// Whether the session-wide "always allow" flag has been latched.
    pub async fn is_always_allowed(&self) -> bool {
        self.inner.lock().await.always_allow
    }
}

impl Default for DeferredPermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionGate for DeferredPermissionGate {
    async fn request(&self, command: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.always_allow {
            return true;
        }

        match std::mem::replace(&mut inner.state, ApprovalState::Idle) {
            ApprovalState::Decided { approval, allowed } if approval.command == command => {
                tracing::info!(
                    request_id = %approval.request_id,
                    command = %command,
                    allowed,
                    "Consumed recorded permission decision"
                );
                return allowed;
            }
            ApprovalState::Decided { approval, .. } => {
                tracing::warn!(
                    request_id = %approval.request_id,
                    decided_command = %approval.command,
                    command = %command,
                    "Discarding decision recorded for a different command"
                );
            }
            ApprovalState::Pending(pending) => {
                if pending.command != command {
                    tracing::warn!(
                        request_id = %pending.request_id,
                        pending_command = %pending.command,
                        command = %command,
                        "A different command is already awaiting approval"
                    );
                }
                inner.state = ApprovalState::Pending(pending);
                return false;
            }
            ApprovalState::Idle => {}
        }

        let pending = PendingApproval {
            request_id: Uuid::new_v4().to_string(),
            command: command.to_string(),
        };
        tracing::info!(
            request_id = %pending.request_id,
            command = %command,
            "Command awaiting approval"
        );
        inner.state = ApprovalState::Pending(pending);
        false
    }

    async fn pending(&self) -> Option<PendingApproval> {
        match &self.inner.lock().await.state {
            ApprovalState::Pending(pending) => Some(pending.clone()),
            _ => None,
        }
    }

    async fn resolve_pending(
        &self,
        request_id: &str,
        response: PermissionResponse,
    ) -> CoreResult<()> {
        let mut inner = self.inner.lock().await;
        let approval = match &inner.state {
            ApprovalState::Pending(pending) if pending.request_id == request_id => pending.clone(),
            _ => return Err(CoreError::no_matching_request(request_id)),
        };

        tracing::info!(
            request_id = %request_id,
            allowed = response.allowed,
            always_allow = response.always_allow,
            "Recorded permission decision"
        );
        if response.latches() {
            // The latch answers every later request, this one included.
            inner.always_allow = true;
            inner.state = ApprovalState::Idle;
        } else {
            inner.state = ApprovalState::Decided {
                approval,
                allowed: response.allowed,
            };
        }
        Ok(())
    }

    fn mode(&self) -> GateMode {
        GateMode::Deferred
    }
}
