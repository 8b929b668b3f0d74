//! Conversation Memory Tests
//!
//! A resolution under a tight budget keeps compacting old turns into the
//! summary while the bug tracker stays intact.

use std::sync::Arc;

use bug_cascade::models::settings::{AgentConfig, LlmSettings};
use bug_cascade::services::session::SessionFactory;
use bug_cascade_core::{BugLedger, ConversationLog, TurnRole};
use tempfile::TempDir;

#[tokio::test]
async fn test_small_budget_compacts_during_resolution() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("demo_repo/src")).unwrap();
    std::fs::write(
        dir.path().join("demo_repo/src/calculator.py"),
        "def divide(a: float, b: float) -> float:\n    return a / b\n",
    )
    .unwrap();

    let config = AgentConfig {
        repo_root: dir.path().to_string_lossy().to_string(),
        token_budget: 120,
        llm: LlmSettings {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let factory = Arc::new(SessionFactory::from_config(config).unwrap());
    let mut session = factory.build_deferred("small").unwrap();

    session.handle_message("dividing by zero crashes").await;
    session.handle_message("it should raise a clear error instead").await;
    session.handle_message("run-tests").await;

    let log = session.orchestrator().log();
    assert!(log.summary().starts_with("Compressed history:"));
    assert!(log.summary().contains("- user: dividing by zero crashes"));
    // Every turn is either live or summarized.
    assert!(log.turns().len() < 6);

    let context = session.context();
    assert!(context.contains("=== BUG TRACKER ===\nBUG-001"));
    assert!(context.contains("=== RECENT TURNS ==="));
}

#[test]
fn test_compacted_lines_are_bounded() {
    let mut log = ConversationLog::new(50);
    let long = "x".repeat(1_000);
    log.append(TurnRole::User, long.as_str());
    log.append(TurnRole::Agent, "short\nreply");

    for line in log.summary().lines().filter(|l| l.starts_with("- ")) {
        assert!(line.chars().count() <= "- agent: ".len() + 181);
    }
    let rendered = log.render(&BugLedger::new());
    assert!(rendered.contains("=== BUG TRACKER ===\n(none)"));
}
