//! Bug Analysis
//!
//! Pluggable detection of a bug's root cause. The orchestrator only sees
//! `dyn BugAnalyzer`; string heuristics, a reasoning service, or any chain of
//! them can stand behind it.
//!
//! Analyzers never execute code and never recommend shell commands. Declining
//! (`None`) is a normal outcome, not an error.

pub mod chain;
pub mod heuristic;
pub mod llm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use chain::{build_default_analyzer, AnalysisAttempt, FallbackAnalyzer};
pub use heuristic::{HeuristicAnalyzer, HeuristicRule};
pub use llm::LlmBugAnalyzer;

/// Root cause plus the fix that addresses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugAnalysis {
    pub root_cause: String,
    pub proposed_fix: String,
}

impl BugAnalysis {
    pub fn new(root_cause: impl Into<String>, proposed_fix: impl Into<String>) -> Self {
        Self {
            root_cause: root_cause.into(),
            proposed_fix: proposed_fix.into(),
        }
    }
}

/// Produces a `BugAnalysis` for a report against one file, or declines.
#[async_trait]
pub trait BugAnalyzer: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// `report` is the user's description plus any clarifications; `code`
    /// is the current content of the file at `path`.
    async fn analyze(&self, report: &str, code: &str, path: &str) -> Option<BugAnalysis>;
}
