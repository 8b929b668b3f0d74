//! Bug Ledger
//!
//! Storage and identity assignment for bug records. Records are created once
//! per reported issue and are never deleted; their fields only ever get set
//! or appended to while the resolution proceeds.

use serde::{Deserialize, Serialize};

/// Prefix of every bug identifier.
const BUG_ID_PREFIX: &str = "BUG";

/// Outcome of the most recent test run for a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    #[default]
    Unset,
    Pass,
    Fail,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Unset => "not run",
            TestStatus::Pass => "PASS",
            TestStatus::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured state tracked per reported issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugRecord {
    pub id: String,
    pub user_report: String,
    pub expected_behavior: Option<String>,
    pub root_cause: Option<String>,
    pub proposed_fix: Option<String>,
    pub files_changed: Vec<String>,
    pub tests_added: Vec<String>,
    pub test_command: Option<String>,
    pub test_result_summary: TestStatus,
}

impl BugRecord {
    fn new(id: String, user_report: impl Into<String>) -> Self {
        Self {
            id,
            user_report: user_report.into(),
            expected_behavior: None,
            root_cause: None,
            proposed_fix: None,
            files_changed: Vec::new(),
            tests_added: Vec::new(),
            test_command: None,
            test_result_summary: TestStatus::Unset,
        }
    }

    /// Record a clarification. Later clarifications are appended, never replace.
    pub fn add_expected_behavior(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match &mut self.expected_behavior {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(text);
            }
            None => self.expected_behavior = Some(text.to_string()),
        }
    }

    pub fn set_analysis(&mut self, root_cause: impl Into<String>, proposed_fix: impl Into<String>) {
        self.root_cause = Some(root_cause.into());
        self.proposed_fix = Some(proposed_fix.into());
    }

    /// Returns `true` when the path was newly recorded.
    pub fn record_file_changed(&mut self, path: &str) -> bool {
        push_unique(&mut self.files_changed, path)
    }

    /// Returns `true` when the path was newly recorded.
    pub fn record_test_added(&mut self, path: &str) -> bool {
        push_unique(&mut self.tests_added, path)
    }

    pub fn record_test_run(&mut self, command: impl Into<String>, status: TestStatus) {
        self.test_command = Some(command.into());
        self.test_result_summary = status;
    }

    /// Report text handed to analyzers: the original report plus every
    /// clarification the user gave.
    pub fn analysis_report(&self) -> String {
        match &self.expected_behavior {
            Some(expected) => format!("{}\nExpected behavior: {}", self.user_report, expected),
            None => self.user_report.clone(),
        }
    }
}

fn push_unique(list: &mut Vec<String>, path: &str) -> bool {
    if list.iter().any(|p| p == path) {
        return false;
    }
    list.push(path.to_string());
    true
}

impl std::fmt::Display for BugRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: report={:?} expected={:?} root_cause={:?} proposed_fix={:?} files_changed={:?} tests_added={:?} test_result={:?}",
            self.id,
            self.user_report,
            self.expected_behavior.as_deref().unwrap_or(""),
            self.root_cause.as_deref().unwrap_or(""),
            self.proposed_fix.as_deref().unwrap_or(""),
            self.files_changed,
            self.tests_added,
            self.test_result_summary.as_str(),
        )
    }
}

/// Ordered collection of bug records with monotonic id assignment.
#[derive(Debug, Clone, Default)]
pub struct BugLedger {
    records: Vec<BugRecord>,
    counter: u64,
}

impl BugLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new record with an id greater than every previous one.
    pub fn create(&mut self, user_report: impl Into<String>) -> &mut BugRecord {
        self.counter += 1;
        let id = format!("{}-{:03}", BUG_ID_PREFIX, self.counter);
        tracing::info!(bug_id = %id, "Opened bug record");
        self.records.push(BugRecord::new(id, user_report));
        let last = self.records.len() - 1;
        &mut self.records[last]
    }

    /// All records in creation order.
    pub fn list(&self) -> &[BugRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&BugRecord> {
        self.records.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut BugRecord> {
        self.records.iter_mut().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl std::fmt::Display for BugLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<String> = self.records.iter().map(|b| b.to_string()).collect();
        f.write_str(&lines.join("\n"))
    }
}
