// Resolution orchestrator scenario tests.
//
// Included into `service.rs` under `#[cfg(test)] mod tests`, so everything
// from the parent module is in scope via `use super::*`.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tempfile::TempDir;

use bug_cascade_core::{CoreError, CoreResult, DEFAULT_TOKEN_BUDGET};
use bug_cascade_tools::{
    CommandRunner, DeferredPermissionGate, PermissionGate, PermissionResponse, ProcessOutput,
};

use crate::services::analyzer::{BugAnalysis, HeuristicAnalyzer};
use crate::services::fixer::ZeroDivisionFixAuthor;

const CALCULATOR: &str = "from __future__ import annotations\n\n\
def add(a: float, b: float) -> float:\n    return a + b\n\n\
def divide(a: float, b: float) -> float:\n    return a / b\n";

const CALCULATOR_TESTS: &str = "from src.calculator import add\n\n\n\
def test_add():\n    assert add(2, 3) == 5\n";

/// Runner that replays scripted exit codes and counts invocations.
struct ScriptedRunner {
    exit_codes: StdMutex<Vec<i32>>,
    calls: AtomicUsize,
}

impl ScriptedRunner {
    fn new(exit_codes: &[i32]) -> Arc<Self> {
        Arc::new(Self {
            exit_codes: StdMutex::new(exit_codes.iter().rev().copied().collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str, _cwd: &Path, _timeout: Duration) -> CoreResult<ProcessOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let exit_code = self.exit_codes.lock().unwrap().pop().unwrap_or(0);
        Ok(ProcessOutput {
            exit_code,
            stdout: format!("{} -> {}", command, exit_code),
            stderr: String::new(),
        })
    }
}

/// Runner whose process never finishes in time.
struct TimingOutRunner;

#[async_trait]
impl CommandRunner for TimingOutRunner {
    async fn run(&self, command: &str, _cwd: &Path, timeout: Duration) -> CoreResult<ProcessOutput> {
        Err(CoreError::timeout(command, timeout.as_millis() as u64))
    }
}

/// Analyzer that never reaches a conclusion.
struct Undecided;

#[async_trait]
impl BugAnalyzer for Undecided {
    fn name(&self) -> &str {
        "undecided"
    }

    async fn analyze(&self, _: &str, _: &str, _: &str) -> Option<BugAnalysis> {
        None
    }
}

struct Harness {
    dir: TempDir,
    gate: Arc<DeferredPermissionGate>,
    runner: Arc<ScriptedRunner>,
    orchestrator: ResolutionOrchestrator,
}

fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        target_file: "src/calculator.py".to_string(),
        test_file: "tests/test_calculator.py".to_string(),
        test_command: "pytest -q".to_string(),
        test_timeout: Duration::from_secs(5),
    }
}

fn write_repo(dir: &Path) {
    std::fs::create_dir_all(dir.join("src")).unwrap();
    std::fs::create_dir_all(dir.join("tests")).unwrap();
    std::fs::write(dir.join("src/calculator.py"), CALCULATOR).unwrap();
    std::fs::write(dir.join("tests/test_calculator.py"), CALCULATOR_TESTS).unwrap();
}

fn build(
    root: &Path,
    analyzer: Arc<dyn BugAnalyzer>,
    runner: Arc<dyn CommandRunner>,
) -> (ResolutionOrchestrator, Arc<DeferredPermissionGate>) {
    build_with(root, settings(), analyzer, runner)
}

fn build_with(
    root: &Path,
    settings: OrchestratorSettings,
    analyzer: Arc<dyn BugAnalyzer>,
    runner: Arc<dyn CommandRunner>,
) -> (ResolutionOrchestrator, Arc<DeferredPermissionGate>) {
    let gate = Arc::new(DeferredPermissionGate::new());
    let boundary = ExecutionBoundary::new(root, gate.clone(), runner).unwrap();
    let orchestrator = ResolutionOrchestrator::new(
        settings,
        ConversationLog::new(DEFAULT_TOKEN_BUDGET),
        boundary,
        analyzer,
        Arc::new(ZeroDivisionFixAuthor::new().unwrap()),
    );
    (orchestrator, gate)
}

fn harness(exit_codes: &[i32]) -> Harness {
    let dir = TempDir::new().unwrap();
    write_repo(dir.path());
    let gate = Arc::new(DeferredPermissionGate::new());
    let runner = ScriptedRunner::new(exit_codes);
    let boundary = ExecutionBoundary::new(dir.path(), gate.clone(), runner.clone()).unwrap();
    let orchestrator = ResolutionOrchestrator::new(
        settings(),
        ConversationLog::new(DEFAULT_TOKEN_BUDGET),
        boundary,
        Arc::new(HeuristicAnalyzer::zero_division().unwrap()),
        Arc::new(ZeroDivisionFixAuthor::new().unwrap()),
    );
    Harness {
        dir,
        gate,
        runner,
        orchestrator,
    }
}

impl Harness {
    fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(path)).unwrap()
    }

    /// Report, clarify, and approve a single test run that passes or fails.
    async fn fix_and_approve(&mut self) -> TurnOutcome {
        self.orchestrator.handle_message("dividing by zero crashes").await;
        self.orchestrator
            .handle_message("it should raise a clear error instead")
            .await;
        let pending = self.orchestrator.handle_message("run-tests").await;
        let request = pending.permission.expect("permission request");
        self.gate
            .resolve_pending(&request.request_id, PermissionResponse::approve_once())
            .await
            .unwrap();
        self.orchestrator.run_tests().await
    }
}

#[tokio::test]
async fn test_report_opens_bug_and_asks_two_questions() {
    let mut h = harness(&[]);
    let outcome = h.orchestrator.handle_message("dividing by zero crashes").await;

    assert_eq!(h.orchestrator.active_bug_id(), Some("BUG-001"));
    assert_eq!(h.orchestrator.phase(), Some(BugPhase::Clarifying));
    assert_eq!(outcome.messages.len(), 1);
    let text = &outcome.messages[0];
    assert!(text.contains("BUG-001"));
    assert!(text.contains("1)"));
    assert!(text.contains("2)"));
    assert!(outcome.diff.is_none());
}

#[tokio::test]
async fn test_clarification_analyzes_then_fixes() {
    let mut h = harness(&[]);
    h.orchestrator.handle_message("dividing by zero crashes").await;
    let outcome = h
        .orchestrator
        .handle_message("it should raise a clear error instead")
        .await;

    assert_eq!(h.orchestrator.phase(), Some(BugPhase::FixApplied));
    assert_eq!(outcome.messages.len(), 2);
    assert!(outcome.messages[0].starts_with("Bug analysis summary for BUG-001"));
    assert!(outcome.messages[0].to_lowercase().contains("division by zero"));
    assert!(outcome.messages[1].starts_with("Implemented fix + tests."));

    let bug = h.orchestrator.active_record().unwrap();
    assert_eq!(
        bug.expected_behavior.as_deref(),
        Some("it should raise a clear error instead")
    );
    assert!(bug.root_cause.as_deref().unwrap().contains("division by zero"));
    assert_eq!(bug.files_changed, vec!["src/calculator.py".to_string()]);
    assert_eq!(bug.tests_added, vec!["tests/test_calculator.py".to_string()]);
    assert_eq!(bug.test_result_summary, TestStatus::Unset);

    let source = h.read("src/calculator.py");
    assert!(source.contains("if b == 0:"));
    assert!(source.contains("Cannot divide by zero"));
    let tests = h.read("tests/test_calculator.py");
    assert!(tests.starts_with(CALCULATOR_TESTS.trim_end()));
    assert!(tests.contains("def test_divide_by_zero():"));

    let diff = outcome.diff.unwrap();
    assert!(diff.contains("+    if b == 0:"));
}

#[tokio::test]
async fn test_analysis_is_logged_before_fix() {
    let mut h = harness(&[]);
    h.orchestrator.handle_message("dividing by zero crashes").await;
    h.orchestrator
        .handle_message("it should raise a clear error instead")
        .await;

    let agent_turns: Vec<&str> = h
        .orchestrator
        .log()
        .turns()
        .iter()
        .filter(|t| t.role == TurnRole::Agent)
        .map(|t| t.content.as_str())
        .collect();
    let analysis = agent_turns
        .iter()
        .position(|t| t.starts_with("Bug analysis summary"))
        .unwrap();
    let fix = agent_turns
        .iter()
        .position(|t| t.starts_with("Implemented fix"))
        .unwrap();
    assert!(analysis < fix);
}

#[tokio::test]
async fn test_inconclusive_analysis_stays_clarifying() {
    let dir = TempDir::new().unwrap();
    write_repo(dir.path());
    let (mut orchestrator, _gate) = build(dir.path(), Arc::new(Undecided), ScriptedRunner::new(&[]));

    orchestrator.handle_message("the app misbehaves").await;
    let outcome = orchestrator.handle_message("it should not").await;

    assert_eq!(orchestrator.phase(), Some(BugPhase::Clarifying));
    assert!(outcome.messages[0].contains("Unable to confidently identify"));
    assert!(outcome.diff.is_none());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/calculator.py")).unwrap(),
        CALCULATOR
    );
    assert!(orchestrator.active_record().unwrap().files_changed.is_empty());

    // More detail goes back through analysis and is kept with the bug.
    orchestrator.handle_message("here is the traceback").await;
    let bug = orchestrator.active_record().unwrap();
    assert_eq!(
        bug.expected_behavior.as_deref(),
        Some("it should not\nhere is the traceback")
    );
}

#[tokio::test]
async fn test_unreadable_target_reports_and_keeps_clarifying() {
    let dir = TempDir::new().unwrap();
    let (mut orchestrator, _gate) = build(
        dir.path(),
        Arc::new(HeuristicAnalyzer::zero_division().unwrap()),
        ScriptedRunner::new(&[]),
    );

    orchestrator.handle_message("dividing by zero crashes").await;
    let outcome = orchestrator.handle_message("raise an error").await;

    assert_eq!(orchestrator.phase(), Some(BugPhase::Clarifying));
    assert!(outcome.messages[0].starts_with("Could not read src/calculator.py"));
    assert!(orchestrator.active_record().unwrap().root_cause.is_none());
}

#[tokio::test]
async fn test_unreadable_test_file_aborts_fix_untouched() {
    let dir = TempDir::new().unwrap();
    write_repo(dir.path());
    let mut original = CALCULATOR_TESTS.as_bytes().to_vec();
    original.extend_from_slice(b"\n# \xff\xfe\ndef test_keep_me():\n    assert True\n");
    std::fs::write(dir.path().join("tests/test_calculator.py"), &original).unwrap();
    let (mut orchestrator, _gate) = build(
        dir.path(),
        Arc::new(HeuristicAnalyzer::zero_division().unwrap()),
        ScriptedRunner::new(&[]),
    );

    orchestrator.handle_message("dividing by zero crashes").await;
    let outcome = orchestrator.handle_message("raise a clear error").await;

    assert_eq!(orchestrator.phase(), Some(BugPhase::Clarifying));
    assert!(outcome.messages[0].starts_with("Bug analysis summary for BUG-001"));
    assert!(outcome
        .messages
        .last()
        .unwrap()
        .starts_with("Could not read tests/test_calculator.py"));
    assert!(outcome.diff.is_none());
    assert_eq!(
        std::fs::read(dir.path().join("tests/test_calculator.py")).unwrap(),
        original
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("src/calculator.py")).unwrap(),
        CALCULATOR
    );
    let bug = orchestrator.active_record().unwrap();
    assert!(bug.files_changed.is_empty());
    assert!(bug.tests_added.is_empty());
}

#[tokio::test]
async fn test_failed_test_write_notes_source_edit_and_retry_records_once() {
    let dir = TempDir::new().unwrap();
    write_repo(dir.path());
    // A plain file where the test directory should be blocks the write.
    std::fs::write(dir.path().join("tests/blocked"), "").unwrap();
    let settings = OrchestratorSettings {
        test_file: "tests/blocked/test_divide.py".to_string(),
        ..settings()
    };
    let (mut orchestrator, _gate) = build_with(
        dir.path(),
        settings,
        Arc::new(HeuristicAnalyzer::zero_division().unwrap()),
        ScriptedRunner::new(&[]),
    );

    orchestrator.handle_message("dividing by zero crashes").await;
    let outcome = orchestrator.handle_message("raise a clear error").await;

    assert_eq!(orchestrator.phase(), Some(BugPhase::Clarifying));
    let error = outcome.messages.last().unwrap();
    assert!(error.starts_with("Could not write tests/blocked/test_divide.py"));
    assert!(error.contains("the edit to src/calculator.py was already applied"));
    assert!(outcome.diff.is_some());
    assert!(std::fs::read_to_string(dir.path().join("src/calculator.py"))
        .unwrap()
        .contains("if b == 0:"));

    // Once the obstacle is gone the fix step runs again on the same bug.
    std::fs::remove_file(dir.path().join("tests/blocked")).unwrap();
    let retry = orchestrator.handle_message("please try again").await;

    assert_eq!(orchestrator.phase(), Some(BugPhase::FixApplied));
    assert!(retry.messages.last().unwrap().starts_with("Implemented fix + tests."));
    let bug = orchestrator.active_record().unwrap();
    assert_eq!(bug.id, "BUG-001");
    assert_eq!(bug.files_changed, vec!["src/calculator.py".to_string()]);
    assert_eq!(bug.tests_added, vec!["tests/blocked/test_divide.py".to_string()]);
    assert!(dir.path().join("tests/blocked/test_divide.py").is_file());
}

#[tokio::test]
async fn test_run_tests_without_fix_has_nothing_to_test() {
    let mut h = harness(&[]);
    let outcome = h.orchestrator.handle_message("run-tests").await;
    assert!(outcome.messages[0].starts_with("There is nothing to test yet"));
    assert!(h.orchestrator.phase().is_none());

    h.orchestrator.handle_message("dividing by zero crashes").await;
    let outcome = h.orchestrator.handle_message("RUN-TESTS").await;
    assert!(outcome.messages[0].starts_with("There is nothing to test yet"));
    assert_eq!(h.orchestrator.phase(), Some(BugPhase::Clarifying));
    assert_eq!(h.runner.calls(), 0);
}

#[tokio::test]
async fn test_run_tests_goes_pending_without_executing() {
    let mut h = harness(&[0]);
    h.orchestrator.handle_message("dividing by zero crashes").await;
    h.orchestrator.handle_message("raise a clear error").await;

    let outcome = h.orchestrator.handle_message("run-tests").await;
    assert!(outcome.is_permission_request());
    let pending = outcome.permission.clone().unwrap();
    assert_eq!(pending.command, "pytest -q");
    assert!(outcome.agent_message().contains("Permission Request"));
    assert!(outcome.agent_message().contains("Command: pytest -q"));
    assert_eq!(h.orchestrator.phase(), Some(BugPhase::AwaitingTestApproval));
    assert_eq!(h.runner.calls(), 0);

    // Asking again reuses the same request.
    let again = h.orchestrator.handle_message("run-tests").await;
    assert_eq!(again.permission.unwrap().request_id, pending.request_id);
    assert_eq!(h.runner.calls(), 0);
}

#[tokio::test]
async fn test_approved_passing_run_summarizes() {
    let mut h = harness(&[0]);
    let outcome = h.fix_and_approve().await;

    assert_eq!(h.runner.calls(), 1);
    assert_eq!(h.orchestrator.phase(), Some(BugPhase::Summarized));
    assert!(outcome.messages[0].starts_with("Test results summary: PASS (exit code 0)"));
    let summary = outcome.messages.last().unwrap();
    assert!(summary.starts_with("Final summary of work:"));
    assert!(summary.contains("- BUG-001: dividing by zero crashes"));
    assert!(summary.contains("Files changed: src/calculator.py"));
    assert!(summary.contains("Tests: PASS"));

    let report = outcome.test_output.unwrap();
    assert!(report.starts_with("Test run command: pytest -q\nExit code: 0\n"));

    let bug = h.orchestrator.active_record().unwrap();
    assert_eq!(bug.test_command.as_deref(), Some("pytest -q"));
    assert_eq!(bug.test_result_summary, TestStatus::Pass);
}

#[tokio::test]
async fn test_failing_run_stays_in_tests_ran() {
    let mut h = harness(&[1]);
    let outcome = h.fix_and_approve().await;

    assert_eq!(h.orchestrator.phase(), Some(BugPhase::TestsRan(TestStatus::Fail)));
    assert!(outcome.messages[0].contains("FAIL (exit code 1)"));
    assert!(outcome.messages[1].starts_with("The tests failed"));
    assert_eq!(
        h.orchestrator.active_record().unwrap().test_result_summary,
        TestStatus::Fail
    );
}

#[tokio::test]
async fn test_denied_run_is_declined_and_not_executed() {
    let mut h = harness(&[0]);
    h.orchestrator.handle_message("dividing by zero crashes").await;
    h.orchestrator.handle_message("raise a clear error").await;
    let pending = h.orchestrator.handle_message("run-tests").await.permission.unwrap();

    h.gate
        .resolve_pending(&pending.request_id, PermissionResponse::deny())
        .await
        .unwrap();
    let outcome = h.orchestrator.run_tests().await;

    assert_eq!(h.runner.calls(), 0);
    assert!(!outcome.is_permission_request());
    assert!(outcome.messages[0].starts_with("Understood. I will not execute `pytest -q`"));
    assert_eq!(
        h.orchestrator.active_record().unwrap().test_result_summary,
        TestStatus::Unset
    );
}

#[tokio::test]
async fn test_session_approval_skips_later_prompts() {
    let mut h = harness(&[1, 0]);
    h.orchestrator.handle_message("dividing by zero crashes").await;
    h.orchestrator.handle_message("raise a clear error").await;
    let pending = h.orchestrator.handle_message("run-tests").await.permission.unwrap();
    h.gate
        .resolve_pending(&pending.request_id, PermissionResponse::approve_for_session())
        .await
        .unwrap();

    h.orchestrator.run_tests().await;
    assert_eq!(h.orchestrator.phase(), Some(BugPhase::TestsRan(TestStatus::Fail)));

    let rerun = h.orchestrator.handle_message("run-tests").await;
    assert!(!rerun.is_permission_request());
    assert_eq!(h.runner.calls(), 2);
    assert_eq!(h.orchestrator.phase(), Some(BugPhase::Summarized));
}

#[tokio::test]
async fn test_message_after_fix_reminds_about_tests() {
    let mut h = harness(&[]);
    h.orchestrator.handle_message("dividing by zero crashes").await;
    h.orchestrator.handle_message("raise a clear error").await;

    let outcome = h.orchestrator.handle_message("is it done?").await;
    assert!(outcome.messages[0].starts_with("The fix is already applied."));
    assert_eq!(h.orchestrator.phase(), Some(BugPhase::FixApplied));
    assert_eq!(h.orchestrator.ledger().len(), 1);
}

#[tokio::test]
async fn test_message_after_summary_opens_next_bug() {
    let mut h = harness(&[0]);
    h.fix_and_approve().await;

    let outcome = h.orchestrator.handle_message("add() ignores negative numbers").await;
    assert_eq!(h.orchestrator.active_bug_id(), Some("BUG-002"));
    assert_eq!(h.orchestrator.phase(), Some(BugPhase::Clarifying));
    assert!(outcome.messages[0].contains("BUG-002"));
    assert_eq!(h.orchestrator.ledger().len(), 2);
    assert!(h.orchestrator.context().contains("BUG-001"));
}

#[tokio::test]
async fn test_second_fix_is_idempotent() {
    let mut h = harness(&[0]);
    h.fix_and_approve().await;
    let fixed_source = h.read("src/calculator.py");
    let fixed_tests = h.read("tests/test_calculator.py");

    h.orchestrator.handle_message("dividing by zero still crashes").await;
    let outcome = h.orchestrator.handle_message("raise an error").await;

    assert_eq!(h.orchestrator.phase(), Some(BugPhase::FixApplied));
    assert_eq!(outcome.diff.as_deref(), Some("(No changes)"));
    assert_eq!(h.read("src/calculator.py"), fixed_source);
    assert_eq!(h.read("tests/test_calculator.py"), fixed_tests);
    assert_eq!(fixed_tests.matches("def test_divide_by_zero").count(), 1);

    let bug = h.orchestrator.active_record().unwrap();
    assert_eq!(bug.id, "BUG-002");
    assert_eq!(bug.files_changed.len(), 1);
    assert_eq!(bug.tests_added.len(), 1);
}

#[tokio::test]
async fn test_timed_out_run_restores_phase() {
    let dir = TempDir::new().unwrap();
    write_repo(dir.path());
    let (mut orchestrator, gate) = build(
        dir.path(),
        Arc::new(HeuristicAnalyzer::zero_division().unwrap()),
        Arc::new(TimingOutRunner),
    );

    orchestrator.handle_message("dividing by zero crashes").await;
    orchestrator.handle_message("raise a clear error").await;
    let pending = orchestrator.handle_message("run-tests").await.permission.unwrap();
    gate.resolve_pending(&pending.request_id, PermissionResponse::approve_once())
        .await
        .unwrap();

    let outcome = orchestrator.run_tests().await;
    assert!(outcome.messages[0].starts_with("Test run `pytest -q` did not complete"));
    assert_eq!(orchestrator.phase(), Some(BugPhase::AwaitingTestApproval));
    assert_eq!(
        orchestrator.active_record().unwrap().test_result_summary,
        TestStatus::Unset
    );
}

#[tokio::test]
async fn test_every_turn_is_logged() {
    let mut h = harness(&[]);
    h.orchestrator.handle_message("dividing by zero crashes").await;
    let notice = h.orchestrator.notice("No matching permission request found.");

    assert_eq!(notice.agent_message(), "No matching permission request found.");
    let turns = h.orchestrator.log().turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[0].role, TurnRole::User);
    assert_eq!(turns[2].content, "No matching permission request found.");
}
