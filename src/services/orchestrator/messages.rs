//! Agent message texts.

use bug_cascade_core::{BugRecord, TestStatus};
use bug_cascade_tools::CommandOutput;

pub(super) fn clarifying_questions(bug_id: &str) -> String {
    format!(
        "I've logged this as {}.\n\
         A couple of quick clarifications so I fix the right behavior:\n\
         1) What is the expected behavior (exact output or error message)?\n\
         2) How should it fail: raise an error, return None, or fail silently?\n\
         If you're not sure, I can propose a sensible default and you can approve.",
        bug_id
    )
}

pub(super) fn read_failed(path: &str, error: &str) -> String {
    format!("Could not read {}: {}", path, error)
}

pub(super) fn analysis_inconclusive(bug_id: &str, path: &str) -> String {
    format!(
        "Bug analysis summary for {}:\n\
         - Suspected location: {}\n\
         - Root cause: Unable to confidently identify yet.\n\
         - Proposed fix: Please share the exact error message or stack trace.",
        bug_id, path
    )
}

pub(super) fn analysis_summary(bug: &BugRecord, path: &str, test_command: &str) -> String {
    format!(
        "Bug analysis summary for {}:\n\
         - Suspected location: {}\n\
         - Root cause: {}\n\
         - Proposed fix: {}\n\n\
         I will now implement the fix and add tests, then ask permission before running `{}`.",
        bug.id,
        path,
        bug.root_cause.as_deref().unwrap_or(""),
        bug.proposed_fix.as_deref().unwrap_or(""),
        test_command
    )
}

pub(super) fn fix_failed(step: &str, error: &str) -> String {
    format!("Could not {}: {}", step, error)
}

pub(super) fn test_write_failed(source_path: &str, test_path: &str, error: &str) -> String {
    format!(
        "Could not write {}: {}\n\
         Note: the edit to {} was already applied and is kept (see the diff).",
        test_path, error, source_path
    )
}

pub(super) fn fix_applied(bug: &BugRecord, test_command: &str) -> String {
    format!(
        "Implemented fix + tests.\n\
         - Changed: {}\n\
         - Tests: {}\n\
         Next: I can run tests with:\n  {}\n\
         But I must ask permission before executing any bash command.\n\
         Type 'run-tests' when you want me to execute it.",
        bug.files_changed.join(", "),
        bug.tests_added.join(", "),
        test_command
    )
}

pub(super) fn fix_pending_reminder(test_command: &str) -> String {
    format!(
        "The fix is already applied. Type 'run-tests' and I will ask permission to run `{}`.",
        test_command
    )
}

pub(super) fn nothing_to_test() -> String {
    "There is nothing to test yet: no fix has been applied. Describe the bug first.".to_string()
}

pub(super) fn permission_pending(command: &str) -> String {
    format!(
        "To validate this, I need to run tests.\n\
         Permission Request: May I execute this bash command?\n\
         Command: {}",
        command
    )
}

pub(super) fn command_declined(command: &str) -> String {
    format!(
        "Understood. I will not execute `{}`. Type 'run-tests' if you change your mind.",
        command
    )
}

pub(super) fn command_failed(command: &str, error: &str) -> String {
    format!("Test run `{}` did not complete: {}", command, error)
}

pub(super) fn test_results(output: &CommandOutput, status: TestStatus) -> String {
    format!(
        "Test results summary: {} (exit code {})",
        status, output.exit_code
    )
}

pub(super) fn tests_failed() -> String {
    "The tests failed. Review the output, then type 'run-tests' to run them again.".to_string()
}

pub(crate) fn no_matching_request() -> String {
    "No matching permission request found.".to_string()
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

/// Final report covering every bug in the session.
pub(super) fn final_summary(bugs: &[BugRecord]) -> String {
    let mut lines = vec!["Final summary of work:".to_string()];
    for bug in bugs {
        lines.push(format!("- {}: {}", bug.id, bug.user_report));
        lines.push(format!(
            "  - Root cause: {}",
            bug.root_cause.as_deref().unwrap_or("(not determined)")
        ));
        lines.push(format!(
            "  - Fix: {}",
            bug.proposed_fix.as_deref().unwrap_or("(none)")
        ));
        lines.push(format!("  - Files changed: {}", list_or_none(&bug.files_changed)));
        lines.push(format!("  - Tests added: {}", list_or_none(&bug.tests_added)));
        lines.push(format!("  - Tests: {}", bug.test_result_summary));
    }
    lines.join("\n")
}
