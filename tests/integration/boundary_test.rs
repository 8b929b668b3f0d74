//! Execution Boundary Integration Tests
//!
//! Exercises `ExecutionBoundary` with `SystemCommandRunner`, using only
//! trivially portable shell commands.

use std::sync::Arc;
use std::time::Duration;

use bug_cascade_core::CoreError;
use bug_cascade_tools::{
    DeferredPermissionGate, ExecutionBoundary, PermissionGate, PermissionResponse,
    SystemCommandRunner, REJECTED_EXIT_CODE,
};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);

fn boundary(dir: &TempDir) -> (ExecutionBoundary, Arc<DeferredPermissionGate>) {
    let gate = Arc::new(DeferredPermissionGate::new());
    let boundary = ExecutionBoundary::new(
        dir.path(),
        gate.clone(),
        Arc::new(SystemCommandRunner::new()),
    )
    .unwrap();
    (boundary, gate)
}

async fn approve(gate: &DeferredPermissionGate) {
    let pending = gate.pending().await.expect("pending request");
    gate.resolve_pending(&pending.request_id, PermissionResponse::approve_once())
        .await
        .unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_rejected_command_has_no_side_effect() {
    let dir = TempDir::new().unwrap();
    let (boundary, gate) = boundary(&dir);

    let output = boundary.run_command("touch marker.txt", TIMEOUT).await.unwrap();
    assert!(output.rejected);
    assert!(!output.success);
    assert_eq!(output.exit_code, REJECTED_EXIT_CODE);
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
    assert!(!dir.path().join("marker.txt").exists());
    assert_eq!(gate.pending().await.unwrap().command, "touch marker.txt");
}

#[cfg(unix)]
#[tokio::test]
async fn test_approved_command_runs_in_root() {
    let dir = TempDir::new().unwrap();
    let (boundary, gate) = boundary(&dir);

    boundary.run_command("touch marker.txt", TIMEOUT).await.unwrap();
    approve(&gate).await;
    let output = boundary.run_command("touch marker.txt", TIMEOUT).await.unwrap();

    assert!(!output.rejected);
    assert!(output.success);
    assert_eq!(output.exit_code, 0);
    assert!(dir.path().join("marker.txt").exists());

    // The approval was consumed; the next request goes pending again.
    let again = boundary.run_command("touch marker.txt", TIMEOUT).await.unwrap();
    assert!(again.rejected);
}

#[cfg(unix)]
#[tokio::test]
async fn test_non_zero_exit_is_reported_not_raised() {
    let dir = TempDir::new().unwrap();
    let (boundary, gate) = boundary(&dir);

    boundary.run_command("echo broken >&2; exit 3", TIMEOUT).await.unwrap();
    approve(&gate).await;
    let output = boundary.run_command("echo broken >&2; exit 3", TIMEOUT).await.unwrap();

    assert!(!output.success);
    assert_eq!(output.exit_code, 3);
    assert!(output.stderr.contains("broken"));
    assert!(output.report().contains("Exit code: 3"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_is_an_error() {
    let dir = TempDir::new().unwrap();
    let (boundary, gate) = boundary(&dir);

    boundary.run_command("sleep 5", TIMEOUT).await.unwrap();
    approve(&gate).await;
    let err = boundary
        .run_command("sleep 5", Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Timeout { .. }));
}

#[test]
fn test_files_outside_root_are_refused() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("repo");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(dir.path().join("secret.txt"), "secret").unwrap();

    let boundary = ExecutionBoundary::new(
        &root,
        Arc::new(DeferredPermissionGate::new()),
        Arc::new(SystemCommandRunner::new()),
    )
    .unwrap();

    assert!(matches!(
        boundary.read_file("../secret.txt"),
        Err(CoreError::UnsafePath(_))
    ));
    assert!(matches!(
        boundary.edit_file("../secret.txt", "pwned"),
        Err(CoreError::UnsafePath(_))
    ));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("secret.txt")).unwrap(),
        "secret"
    );
}

#[test]
fn test_edit_replaces_whole_file() {
    let dir = TempDir::new().unwrap();
    let (boundary, _gate) = boundary(&dir);
    boundary.write_file("pkg/mod.py", "a = 1\nb = 2\n").unwrap();

    let outcome = boundary.edit_file("pkg/mod.py", "b = 3\n").unwrap();
    assert_eq!(boundary.read_file("pkg/mod.py").unwrap(), "b = 3\n");
    assert_eq!(outcome.bytes_written, 6);
    assert!(outcome.diff.contains("-a = 1"));
    assert!(outcome.diff.contains("+b = 3"));

    assert!(matches!(
        boundary.edit_file("pkg/missing.py", "x"),
        Err(CoreError::NotFound(_))
    ));
}
