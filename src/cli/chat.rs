//! Interactive chat loop
//!
//! Reads user lines and hands them to a session whose permission gate asks
//! on the same prompt, so approvals and chat input share one stdin.

use std::sync::Arc;

use bug_cascade_tools::{ApprovalPrompt, PromptPermissionGate};

use crate::models::settings::AgentConfig;
use crate::services::orchestrator::TurnOutcome;
use crate::services::session::{Session, SessionFactory};
use crate::utils::error::AppResult;

const HELP: &str = "Commands:\n  \
    help      show this help\n  \
    context   show the conversation memory and bug tracker\n  \
    run-tests ask to run the test command for the applied fix\n  \
    exit      leave (also: quit)\n\
    Anything else is treated as a bug report or an answer to my questions.";

/// Run an interactive session against the default collaborators.
pub async fn run(config: AgentConfig, prompt: Arc<dyn ApprovalPrompt>) -> AppResult<()> {
    let factory = SessionFactory::from_config(config)?;
    let gate = Arc::new(PromptPermissionGate::new(prompt.clone()));
    let mut session = factory.build("cli", gate)?;

    prompt
        .say(&format!(
            "Bug Cascade {}. Describe a bug, or type 'help'.\nRepository: {}",
            env!("CARGO_PKG_VERSION"),
            factory.config().repo_root
        ))
        .await;
    run_loop(&mut session, prompt.as_ref()).await;
    Ok(())
}

/// Drive `session` until `exit`, `quit` or end of input.
pub async fn run_loop(session: &mut Session, prompt: &dyn ApprovalPrompt) {
    while let Some(line) = prompt.ask("\nYou> ").await {
        let input = line.trim();
        match input.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" => break,
            "help" => prompt.say(HELP).await,
            "context" => prompt.say(&session.context()).await,
            _ => {
                let outcome = session.handle_message(input).await;
                present(prompt, &outcome).await;
            }
        }
    }
    prompt.say("Bye.").await;
}

async fn present(prompt: &dyn ApprovalPrompt, outcome: &TurnOutcome) {
    for message in &outcome.messages {
        prompt.say(&format!("\nAgent> {}", message)).await;
    }
    if let Some(diff) = &outcome.diff {
        prompt.say(&format!("\n--- Diff ---\n{}", diff)).await;
    }
    if let Some(output) = &outcome.test_output {
        prompt.say(&format!("\n--- Test output ---\n{}", output)).await;
    }
}
