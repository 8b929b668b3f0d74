//! Shell Command Runner
//!
//! The process provider behind the execution boundary. It is only ever
//! invoked after the permission gate approved the command.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use bug_cascade_core::{CoreError, CoreResult};

/// Maximum characters kept per captured stream.
const MAX_OUTPUT_CHARS: usize = 30_000;

/// Raw result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a command string with a timeout and captures its output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, cwd: &Path, timeout: Duration) -> CoreResult<ProcessOutput>;
}

/// Runs commands through the platform shell.
#[derive(Debug, Default, Clone)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

fn truncate_output(text: String) -> String {
    if text.chars().count() <= MAX_OUTPUT_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_OUTPUT_CHARS).collect();
    cut.push_str("\n\n... (output truncated)");
    cut
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &str, cwd: &Path, timeout: Duration) -> CoreResult<ProcessOutput> {
        #[cfg(windows)]
        let (shell, shell_arg) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (shell, shell_arg) = ("sh", "-c");

        let mut cmd = Command::new(shell);
        cmd.arg(shell_arg)
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the output future on timeout kills the child.
            .kill_on_drop(true);

        tracing::debug!(command = %command, cwd = %cwd.display(), "Spawning command");

        let output = match tokio::time::timeout(timeout, cmd.output()).await {
            Ok(result) => result?,
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                tracing::warn!(command = %command, timeout_ms, "Command timed out");
                return Err(CoreError::timeout(command, timeout_ms));
            }
        };

        Ok(ProcessOutput {
            // Killed by a signal: no exit code.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: truncate_output(String::from_utf8_lossy(&output.stdout).into_owned()),
            stderr: truncate_output(String::from_utf8_lossy(&output.stderr).into_owned()),
        })
    }
}
