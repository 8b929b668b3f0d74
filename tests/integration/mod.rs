//! Integration Tests Module
//!
//! Cross-component scenarios for Bug Cascade: the execution boundary with a
//! real shell, the deferred permission flow through sessions, and
//! conversation memory under a small budget.

// Execution boundary with the system shell
mod boundary_test;

// Deferred permission flow across sessions
mod permission_flow_test;

// Conversation memory compaction during a resolution
mod memory_test;
