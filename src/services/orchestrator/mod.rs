//! Resolution Orchestrator Module
//!
//! Drives one bug at a time from report to summary. Transports call
//! `handle_message` for each user turn and `run_tests` to re-drive the
//! test step after an out-of-band permission decision.

mod messages;
mod service;
pub mod state;

pub use service::{OrchestratorSettings, ResolutionOrchestrator, RUN_TESTS_COMMAND};
pub use state::{BugPhase, TurnOutcome};

pub(crate) use messages::no_matching_request;
