//! Orchestrator State Types

use serde::{Deserialize, Serialize};

use bug_cascade_core::TestStatus;
use bug_cascade_tools::PendingApproval;

/// Phase of the active bug. No active bug is represented by `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "status", rename_all = "snake_case")]
pub enum BugPhase {
    /// Waiting for the user's clarification (or more detail after a declined analysis)
    Clarifying,
    /// Analysis in progress; only observable within a single turn
    Analyzing,
    /// Fix and regression test written
    FixApplied,
    /// Test run requested; the command has not produced a result yet
    AwaitingTestApproval,
    TestsRan(TestStatus),
    /// Final report emitted after a passing run
    Summarized,
}

impl BugPhase {
    /// Whether a fix has been written for the bug, so a test run makes sense.
    pub fn has_fix(&self) -> bool {
        matches!(
            self,
            BugPhase::FixApplied
                | BugPhase::AwaitingTestApproval
                | BugPhase::TestsRan(_)
                | BugPhase::Summarized
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BugPhase::Clarifying => "clarifying",
            BugPhase::Analyzing => "analyzing",
            BugPhase::FixApplied => "fix_applied",
            BugPhase::AwaitingTestApproval => "awaiting_test_approval",
            BugPhase::TestsRan(TestStatus::Pass) => "tests_ran_pass",
            BugPhase::TestsRan(TestStatus::Fail) => "tests_ran_fail",
            BugPhase::TestsRan(TestStatus::Unset) => "tests_ran",
            BugPhase::Summarized => "summarized",
        }
    }
}

impl std::fmt::Display for BugPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one orchestrator step produced, for the transport to present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Agent messages, in the order they were appended to the log
    pub messages: Vec<String>,
    /// Set when a command is waiting for an out-of-band decision
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<PendingApproval>,
    /// Display diff of the source edit made during this step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Full command report of a test run made during this step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_output: Option<String>,
}

impl TurnOutcome {
    /// All messages joined with a blank line.
    pub fn agent_message(&self) -> String {
        self.messages.join("\n\n")
    }

    pub fn is_permission_request(&self) -> bool {
        self.permission.is_some()
    }
}
