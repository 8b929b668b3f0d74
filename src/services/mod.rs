//! Services
//!
//! Business logic: bug analysis, fix authoring, the resolution state machine
//! and sessions. Transports call into sessions only.

pub mod analyzer;
pub mod fixer;
pub mod orchestrator;
pub mod session;

pub use analyzer::{build_default_analyzer, BugAnalysis, BugAnalyzer};
pub use fixer::{FixAuthor, FixPlan, FixRequest, ZeroDivisionFixAuthor};
pub use session::{Session, SessionFactory, SessionRegistry, SharedSession};
