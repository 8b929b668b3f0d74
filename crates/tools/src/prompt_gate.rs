//! Interactive Permission Gate
//!
//! Presents the command to the controlling user and blocks until they answer
//! approve-once, approve-for-session, or deny. There is no timeout on the
//! wait. Questions and answers travel through an `ApprovalPrompt`, so the CLI
//! can share one buffered stdin between the chat loop and the gate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::Mutex;

use bug_cascade_core::{CoreError, CoreResult};

use crate::permission::{GateMode, PendingApproval, PermissionGate, PermissionResponse};

/// Line-oriented question/answer channel to the controlling user.
#[async_trait]
pub trait ApprovalPrompt: Send + Sync {
    /// Print `text` without waiting for an answer.
    async fn say(&self, text: &str);

    /// Print `question` and read one line. `None` means end of input.
    async fn ask(&self, question: &str) -> Option<String>;
}

/// `ApprovalPrompt` over any buffered reader / writer pair.
pub struct LinePrompt<R, W> {
    reader: Mutex<Lines<R>>,
    writer: Mutex<W>,
}

impl<R, W> LinePrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader.lines()),
            writer: Mutex::new(writer),
        }
    }

    async fn write(&self, text: &str) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.write_all(text.as_bytes()).await {
            tracing::warn!(error = %e, "Failed to write prompt");
            return;
        }
        let _ = writer.flush().await;
    }
}

/// Prompt bound to the process stdin / stdout.
pub type StdioPrompt = LinePrompt<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdioPrompt {
    pub fn stdio() -> Self {
        LinePrompt::new(
            tokio::io::BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
    }
}

#[async_trait]
impl<R, W> ApprovalPrompt for LinePrompt<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn say(&self, text: &str) {
        self.write(&format!("{}\n", text)).await;
    }

    async fn ask(&self, question: &str) -> Option<String> {
        self.write(question).await;
        let mut reader = self.reader.lock().await;
        match reader.next_line().await {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read prompt answer");
                None
            }
        }
    }
}

/// Parsed answer to a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    Once,
    Always,
    Deny,
}

fn parse_answer(input: &str) -> Option<Answer> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Answer::Once),
        "a" | "always" => Some(Answer::Always),
        "" | "n" | "no" => Some(Answer::Deny),
        _ => None,
    }
}

/// Permission gate that asks on the terminal and blocks for the answer.
pub struct PromptPermissionGate {
    prompt: Arc<dyn ApprovalPrompt>,
    always_allow: AtomicBool,
}

impl PromptPermissionGate {
    pub fn new(prompt: Arc<dyn ApprovalPrompt>) -> Self {
        Self {
            prompt,
            always_allow: AtomicBool::new(false),
        }
    }

    pub fn is_always_allowed(&self) -> bool {
        self.always_allow.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for PromptPermissionGate {
    async fn request(&self, command: &str) -> bool {
        if self.is_always_allowed() {
            return true;
        }

        self.prompt
            .say(&format!(
                "\nPermission Request: May I execute this bash command?\nCommand: {}",
                command
            ))
            .await;

        loop {
            let Some(input) = self
                .prompt
                .ask("Approve? [y/N/a=always allow for session]: ")
                .await
            else {
                tracing::warn!(command = %command, "Input closed while awaiting approval; denying");
                return false;
            };

            match parse_answer(&input) {
                Some(Answer::Once) => return true,
                Some(Answer::Always) => {
                    self.always_allow.store(true, Ordering::SeqCst);
                    tracing::info!("Commands auto-approved for the rest of the session");
                    return true;
                }
                Some(Answer::Deny) => return false,
                None => self.prompt.say("Please type y / n / a.").await,
            }
        }
    }

    async fn pending(&self) -> Option<PendingApproval> {
        None
    }

    async fn resolve_pending(
        &self,
        request_id: &str,
        _response: PermissionResponse,
    ) -> CoreResult<()> {
        Err(CoreError::no_matching_request(request_id))
    }

    fn mode(&self) -> GateMode {
        GateMode::Interactive
    }
}
