//! Bug Cascade
//!
//! Conversational bug-fixing assistant. A user reports a bug; the agent asks
//! clarifying questions, analyzes the target file, applies a fix with a
//! regression test, and runs the tests only after the user approves the
//! command. It includes:
//! - Analyzers (LLM-backed and heuristic) and the fix author
//! - The resolution orchestrator and session registry
//! - Config storage, the HTTP transport and the CLI

pub mod cli;
pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

pub use models::response::*;
pub use models::settings::{AgentConfig, ConfigOverrides};
pub use services::orchestrator::{BugPhase, ResolutionOrchestrator, TurnOutcome};
pub use services::session::{Session, SessionFactory, SessionRegistry};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
