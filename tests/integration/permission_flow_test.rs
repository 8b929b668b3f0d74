//! Deferred Permission Flow Tests
//!
//! Drives sessions the way the HTTP transport does: a test run answers with
//! a pending request, and the decision arrives through `resolve_permission`.

use std::path::Path;
use std::sync::Arc;

use bug_cascade::models::settings::{AgentConfig, LlmSettings};
use bug_cascade::services::orchestrator::BugPhase;
use bug_cascade::services::session::{SessionFactory, SessionRegistry};
use bug_cascade_core::TestStatus;
use bug_cascade_tools::PermissionResponse;
use tempfile::TempDir;

const CALCULATOR: &str = "from __future__ import annotations\n\n\
def divide(a: float, b: float) -> float:\n    return a / b\n";

fn registry(root: &Path, test_command: &str) -> SessionRegistry {
    std::fs::create_dir_all(root.join("demo_repo/src")).unwrap();
    std::fs::write(root.join("demo_repo/src/calculator.py"), CALCULATOR).unwrap();

    let config = AgentConfig {
        repo_root: root.to_string_lossy().to_string(),
        test_command: test_command.to_string(),
        llm: LlmSettings {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    SessionRegistry::new(Arc::new(SessionFactory::from_config(config).unwrap()))
}

#[cfg(unix)]
#[tokio::test]
async fn test_pending_then_approved_run_completes_bug() {
    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path(), "touch ran.txt");
    let session = registry.get_or_create("web").await.unwrap();
    let mut session = session.lock().await;

    session.handle_message("dividing by zero crashes").await;
    let fixed = session.handle_message("it should raise a clear error instead").await;
    assert!(fixed.diff.is_some());

    let pending = session.handle_message("run-tests").await;
    let request = pending.permission.clone().expect("permission request");
    assert_eq!(request.command, "touch ran.txt");
    assert!(!dir.path().join("ran.txt").exists());

    let done = session
        .resolve_permission(&request.request_id, PermissionResponse::approve_once())
        .await;
    assert!(dir.path().join("ran.txt").exists());
    assert!(!done.is_permission_request());
    assert!(done.agent_message().contains("Final summary of work:"));
    assert!(done.test_output.unwrap().contains("Exit code: 0"));
    assert_eq!(session.orchestrator().phase(), Some(BugPhase::Summarized));

    // The request was consumed; replaying it is not accepted.
    let replay = session
        .resolve_permission(&request.request_id, PermissionResponse::approve_once())
        .await;
    assert_eq!(replay.agent_message(), "No matching permission request found.");
}

#[cfg(unix)]
#[tokio::test]
async fn test_denied_run_never_executes() {
    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path(), "touch ran.txt");
    let session = registry.get_or_create("web").await.unwrap();
    let mut session = session.lock().await;

    session.handle_message("dividing by zero crashes").await;
    session.handle_message("raise an error").await;
    let request = session.handle_message("run-tests").await.permission.unwrap();

    let outcome = session
        .resolve_permission(&request.request_id, PermissionResponse::deny())
        .await;
    assert!(outcome.agent_message().contains("I will not execute `touch ran.txt`"));
    assert!(!dir.path().join("ran.txt").exists());
    let bug = &session.orchestrator().ledger().list()[0];
    assert_eq!(bug.test_result_summary, TestStatus::Unset);

    // A fresh request is issued on the next attempt.
    let next = session.handle_message("run-tests").await.permission.unwrap();
    assert_ne!(next.request_id, request.request_id);
}

#[cfg(unix)]
#[tokio::test]
async fn test_failing_run_then_session_approval() {
    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path(), "test -f ok.txt");
    let session = registry.get_or_create("web").await.unwrap();
    let mut session = session.lock().await;

    session.handle_message("dividing by zero crashes").await;
    session.handle_message("raise an error").await;
    let request = session.handle_message("run-tests").await.permission.unwrap();

    let failed = session
        .resolve_permission(&request.request_id, PermissionResponse::approve_for_session())
        .await;
    assert!(failed.agent_message().contains("FAIL"));
    assert_eq!(
        session.orchestrator().phase(),
        Some(BugPhase::TestsRan(TestStatus::Fail))
    );

    std::fs::write(dir.path().join("ok.txt"), "").unwrap();
    let passed = session.handle_message("run-tests").await;
    assert!(!passed.is_permission_request());
    assert!(passed.agent_message().contains("PASS"));
    assert_eq!(session.orchestrator().phase(), Some(BugPhase::Summarized));
}

#[tokio::test]
async fn test_request_ids_are_per_session() {
    let dir = TempDir::new().unwrap();
    let registry = registry(dir.path(), "true");

    let a = registry.get_or_create("a").await.unwrap();
    let request = {
        let mut a = a.lock().await;
        a.handle_message("dividing by zero crashes").await;
        a.handle_message("raise an error").await;
        a.handle_message("run-tests").await.permission.unwrap()
    };

    let b = registry.get_or_create("b").await.unwrap();
    let outcome = b
        .lock()
        .await
        .resolve_permission(&request.request_id, PermissionResponse::approve_once())
        .await;
    assert_eq!(outcome.agent_message(), "No matching permission request found.");

    let a = a.lock().await;
    assert_eq!(a.orchestrator().phase(), Some(BugPhase::AwaitingTestApproval));
}
