//! Bug Cascade Tools
//!
//! The execution boundary and the permission gates that guard it:
//! - `PermissionGate` - capability consulted before any shell command
//! - `PromptPermissionGate` - interactive ask-and-block implementation
//! - `DeferredPermissionGate` - pending-token implementation for web sessions
//! - `ExecutionBoundary` - path-contained file I/O plus gated command execution
//! - `CommandRunner` - process provider used after approval

pub mod deferred_gate;
pub mod executor;
pub mod path;
pub mod permission;
pub mod prompt_gate;
pub mod runner;

// Re-export core types
pub use deferred_gate::DeferredPermissionGate;
pub use executor::{unified_diff, CommandOutput, EditOutcome, ExecutionBoundary, REJECTED_EXIT_CODE};
pub use permission::{GateMode, PendingApproval, PermissionGate, PermissionResponse};
pub use prompt_gate::{ApprovalPrompt, LinePrompt, PromptPermissionGate, StdioPrompt};
pub use runner::{CommandRunner, ProcessOutput, SystemCommandRunner};
