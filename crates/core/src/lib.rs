//! Bug Cascade Core
//!
//! Foundational error types and the two pieces of per-session state the
//! resolution flow threads through every turn: the token-budgeted
//! conversation log and the bug ledger. This crate has zero dependencies on
//! application-level code (transports, LLM providers, process execution).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `conversation` - Turns and the self-compacting `ConversationLog`
//! - `ledger` - `BugRecord` and the id-assigning `BugLedger`

pub mod conversation;
pub mod error;
pub mod ledger;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Conversation Memory ────────────────────────────────────────────────
pub use conversation::{approx_tokens, ConversationLog, Turn, TurnRole, DEFAULT_TOKEN_BUDGET};

// ── Bug Ledger ─────────────────────────────────────────────────────────
pub use ledger::{BugLedger, BugRecord, TestStatus};
