//! Resolution Orchestrator
//!
//! Threads a single active bug through clarification, analysis, fix, test
//! run and summary. Every agent message goes into the conversation log
//! before the step that follows it, and every side effect goes through the
//! execution boundary.

use std::sync::Arc;
use std::time::Duration;

use bug_cascade_core::{BugLedger, BugRecord, ConversationLog, CoreError, TestStatus, TurnRole};
use bug_cascade_tools::{CommandOutput, ExecutionBoundary};

use super::messages;
use super::state::{BugPhase, TurnOutcome};
use crate::models::settings::AgentConfig;
use crate::services::analyzer::BugAnalyzer;
use crate::services::fixer::{FixAuthor, FixRequest};

/// Literal command that asks for a test run.
pub const RUN_TESTS_COMMAND: &str = "run-tests";

/// Files and command the orchestrator works with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub target_file: String,
    pub test_file: String,
    pub test_command: String,
    pub test_timeout: Duration,
}

impl From<&AgentConfig> for OrchestratorSettings {
    fn from(config: &AgentConfig) -> Self {
        Self {
            target_file: config.target_file.clone(),
            test_file: config.test_file.clone(),
            test_command: config.test_command.clone(),
            test_timeout: config.test_timeout(),
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveBug {
    id: String,
    phase: BugPhase,
}

/// State machine for one session's bug resolution.
pub struct ResolutionOrchestrator {
    settings: OrchestratorSettings,
    log: ConversationLog,
    ledger: BugLedger,
    boundary: ExecutionBoundary,
    analyzer: Arc<dyn BugAnalyzer>,
    fixer: Arc<dyn FixAuthor>,
    active: Option<ActiveBug>,
}

impl ResolutionOrchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        log: ConversationLog,
        boundary: ExecutionBoundary,
        analyzer: Arc<dyn BugAnalyzer>,
        fixer: Arc<dyn FixAuthor>,
    ) -> Self {
        Self {
            settings,
            log,
            ledger: BugLedger::new(),
            boundary,
            analyzer,
            fixer,
            active: None,
        }
    }

    /// Rendered memory: summary, bug tracker, recent turns.
    pub fn context(&self) -> String {
        self.log.render(&self.ledger)
    }

    pub fn ledger(&self) -> &BugLedger {
        &self.ledger
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn phase(&self) -> Option<BugPhase> {
        self.active.as_ref().map(|a| a.phase)
    }

    pub fn active_bug_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.id.as_str())
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Handle one user message.
    pub async fn handle_message(&mut self, text: &str) -> TurnOutcome {
        self.log.append(TurnRole::User, text);

        if text.trim().eq_ignore_ascii_case(RUN_TESTS_COMMAND) {
            return self.run_tests().await;
        }

        let mut outcome = TurnOutcome::default();
        match self.phase() {
            None | Some(BugPhase::Summarized) => self.open_bug(text, &mut outcome),
            Some(BugPhase::Clarifying) | Some(BugPhase::Analyzing) => {
                self.clarify_and_analyze(text, &mut outcome).await
            }
            Some(BugPhase::FixApplied)
            | Some(BugPhase::AwaitingTestApproval)
            | Some(BugPhase::TestsRan(_)) => {
                let reminder = messages::fix_pending_reminder(&self.settings.test_command);
                self.say(&mut outcome, reminder);
            }
        }
        outcome
    }

    /// Record an agent message that did not come from a state transition.
    pub fn notice(&mut self, text: impl Into<String>) -> TurnOutcome {
        let mut outcome = TurnOutcome::default();
        self.say(&mut outcome, text.into());
        outcome
    }

    /// The re-drivable test-run step.
    ///
    /// Called for `run-tests` and again after an out-of-band permission
    /// decision; the gate decides whether the command actually runs.
    pub async fn run_tests(&mut self) -> TurnOutcome {
        let mut outcome = TurnOutcome::default();

        let Some(previous) = self.phase().filter(|p| p.has_fix()) else {
            self.say(&mut outcome, messages::nothing_to_test());
            return outcome;
        };
        self.set_phase(BugPhase::AwaitingTestApproval);

        let command = self.settings.test_command.clone();
        let result = self
            .boundary
            .run_command(&command, self.settings.test_timeout)
            .await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(command = %command, error = %e, "Test run did not complete");
                self.set_phase(previous);
                self.say(&mut outcome, messages::command_failed(&command, &e.to_string()));
                return outcome;
            }
        };

        if output.rejected {
            self.report_rejection(&command, &mut outcome).await;
            return outcome;
        }

        self.record_test_result(&command, output, &mut outcome);
        outcome
    }

    fn open_bug(&mut self, report: &str, outcome: &mut TurnOutcome) {
        let id = self.ledger.create(report.trim()).id.clone();
        self.active = Some(ActiveBug {
            id: id.clone(),
            phase: BugPhase::Clarifying,
        });
        self.say(outcome, messages::clarifying_questions(&id));
    }

    async fn clarify_and_analyze(&mut self, clarification: &str, outcome: &mut TurnOutcome) {
        let Some(bug_id) = self.active_bug_id().map(str::to_string) else {
            return;
        };
        if let Some(bug) = self.ledger.get_mut(&bug_id) {
            bug.add_expected_behavior(clarification);
        }
        self.set_phase(BugPhase::Analyzing);

        let path = self.settings.target_file.clone();
        let code = match self.boundary.read_file(&path) {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!(bug_id = %bug_id, path = %path, error = %e, "Target file unreadable");
                self.set_phase(BugPhase::Clarifying);
                self.say(outcome, messages::read_failed(&path, &e.to_string()));
                return;
            }
        };

        let report = match self.ledger.get(&bug_id) {
            Some(bug) => bug.analysis_report(),
            None => return,
        };

        let Some(analysis) = self.analyzer.analyze(&report, &code, &path).await else {
            let reason = CoreError::analysis_inconclusive(format!("no root cause in {}", path));
            tracing::info!(bug_id = %bug_id, analyzer = self.analyzer.name(), reason = %reason, "Declined to fix");
            self.set_phase(BugPhase::Clarifying);
            self.say(outcome, messages::analysis_inconclusive(&bug_id, &path));
            return;
        };

        let summary = match self.ledger.get_mut(&bug_id) {
            Some(bug) => {
                bug.set_analysis(analysis.root_cause, analysis.proposed_fix);
                messages::analysis_summary(bug, &path, &self.settings.test_command)
            }
            None => return,
        };
        // The analysis is surfaced before any source file is touched.
        self.say(outcome, summary);

        self.apply_fix(&bug_id, &code, outcome);
    }

    fn apply_fix(&mut self, bug_id: &str, source: &str, outcome: &mut TurnOutcome) {
        let source_path = self.settings.target_file.clone();
        let test_path = self.settings.test_file.clone();

        // A missing test file just means the test gets created.
        let existing_test = match self.boundary.read_file(&test_path) {
            Ok(content) => content,
            Err(CoreError::NotFound(_)) => String::new(),
            Err(e) => {
                tracing::warn!(bug_id = %bug_id, path = %test_path, error = %e, "Test file unreadable");
                self.set_phase(BugPhase::Clarifying);
                self.say(outcome, messages::read_failed(&test_path, &e.to_string()));
                return;
            }
        };

        let plan = {
            let Some(bug) = self.ledger.get(bug_id) else {
                return;
            };
            self.fixer.author(&FixRequest {
                bug,
                source_path: &source_path,
                source,
                test_path: &test_path,
                existing_test: &existing_test,
            })
        };
        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => {
                self.set_phase(BugPhase::Clarifying);
                self.say(outcome, messages::fix_failed("author a fix", &e.to_string()));
                return;
            }
        };

        let edit = match self.boundary.edit_file(&source_path, &plan.source) {
            Ok(edit) => edit,
            Err(e) => {
                self.set_phase(BugPhase::Clarifying);
                self.say(
                    outcome,
                    messages::fix_failed(&format!("edit {}", source_path), &e.to_string()),
                );
                return;
            }
        };
        outcome.diff = Some(edit.diff);
        if let Some(bug) = self.ledger.get_mut(bug_id) {
            bug.record_file_changed(&source_path);
        }

        if let Some(test_body) = &plan.test {
            if let Err(e) = self.boundary.write_file(&test_path, test_body) {
                tracing::warn!(bug_id = %bug_id, path = %test_path, error = %e, "Test write failed after source edit");
                self.set_phase(BugPhase::Clarifying);
                self.say(
                    outcome,
                    messages::test_write_failed(&source_path, &test_path, &e.to_string()),
                );
                return;
            }
        }

        let message = match self.ledger.get_mut(bug_id) {
            Some(bug) => {
                bug.record_test_added(&test_path);
                messages::fix_applied(bug, &self.settings.test_command)
            }
            None => return,
        };
        tracing::info!(bug_id = %bug_id, path = %source_path, "Fix applied");
        self.set_phase(BugPhase::FixApplied);
        self.say(outcome, message);
    }

    async fn report_rejection(&mut self, command: &str, outcome: &mut TurnOutcome) {
        match self.boundary.permission_gate().pending().await {
            Some(pending) => {
                tracing::info!(
                    request_id = %pending.request_id,
                    command = %pending.command,
                    "Test run awaiting approval"
                );
                self.say(outcome, messages::permission_pending(&pending.command));
                outcome.permission = Some(pending);
            }
            None => self.say(outcome, messages::command_declined(command)),
        }
    }

    fn record_test_result(&mut self, command: &str, output: CommandOutput, outcome: &mut TurnOutcome) {
        let status = if output.success {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        };
        let Some(bug_id) = self.active_bug_id().map(str::to_string) else {
            return;
        };
        if let Some(bug) = self.ledger.get_mut(&bug_id) {
            bug.record_test_run(command, status);
        }
        tracing::info!(bug_id = %bug_id, exit_code = output.exit_code, status = %status, "Tests ran");

        self.set_phase(BugPhase::TestsRan(status));
        self.say(outcome, messages::test_results(&output, status));
        outcome.test_output = Some(output.report());

        match status {
            TestStatus::Pass => {
                let summary = messages::final_summary(self.ledger.list());
                self.set_phase(BugPhase::Summarized);
                self.say(outcome, summary);
            }
            _ => self.say(outcome, messages::tests_failed()),
        }
    }

    fn set_phase(&mut self, phase: BugPhase) {
        if let Some(active) = self.active.as_mut() {
            tracing::debug!(bug_id = %active.id, from = %active.phase, to = %phase, "Phase change");
            active.phase = phase;
        }
    }

    fn say(&mut self, outcome: &mut TurnOutcome, message: String) {
        self.log.append(TurnRole::Agent, message.as_str());
        outcome.messages.push(message);
    }

    #[cfg(test)]
    pub(crate) fn active_record(&self) -> Option<&BugRecord> {
        self.active_bug_id().and_then(|id| self.ledger.get(id))
    }
}
