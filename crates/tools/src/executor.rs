//! Execution Boundary
//!
//! The sole path through which file and command side effects happen.
//! File operations are confined to a fixed root by lexical prefix
//! containment; shell commands only run after the permission gate approves
//! them.
//!
//! `edit_file` is full-content replacement: the new body is written
//! verbatim and the unified diff it returns exists for display only.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use similar::TextDiff;

use bug_cascade_core::{CoreError, CoreResult};

use crate::path::{absolute_root, resolve_within};
use crate::permission::PermissionGate;
use crate::runner::CommandRunner;

/// Exit code reported for a command the user did not approve.
pub const REJECTED_EXIT_CODE: i32 = 126;

const REJECTED_STDERR: &str = "User rejected bash command execution.";

/// Result of a `run_command` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Exit code was zero
    pub success: bool,
    /// The gate did not approve the command; nothing was executed
    pub rejected: bool,
}

impl CommandOutput {
    fn rejected(command: &str) -> Self {
        Self {
            command: command.to_string(),
            exit_code: REJECTED_EXIT_CODE,
            stdout: String::new(),
            stderr: REJECTED_STDERR.to_string(),
            success: false,
            rejected: true,
        }
    }

    /// Human-readable block with the command, exit code and both streams.
    pub fn report(&self) -> String {
        format!(
            "Test run command: {}\nExit code: {}\nSTDOUT:\n{}\nSTDERR:\n{}\n",
            self.command, self.exit_code, self.stdout, self.stderr
        )
    }
}

/// Result of an `edit_file` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditOutcome {
    /// Unified diff of old → new, or `(No changes)`
    pub diff: String,
    pub bytes_written: usize,
}

/// Unified diff between two file bodies, for display.
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    if old == new {
        return "(No changes)".to_string();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string()
}

/// File and command operations rooted at a fixed directory.
pub struct ExecutionBoundary {
    root: PathBuf,
    gate: Arc<dyn PermissionGate>,
    runner: Arc<dyn CommandRunner>,
}

impl ExecutionBoundary {
    pub fn new(
        root: impl AsRef<Path>,
        gate: Arc<dyn PermissionGate>,
        runner: Arc<dyn CommandRunner>,
    ) -> CoreResult<Self> {
        Ok(Self {
            root: absolute_root(root.as_ref())?,
            gate,
            runner,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn permission_gate(&self) -> &Arc<dyn PermissionGate> {
        &self.gate
    }

    pub fn read_file(&self, path: &str) -> CoreResult<String> {
        let abs = resolve_within(&self.root, path)?;
        if !abs.exists() {
            return Err(CoreError::not_found(format!("File not found: {}", path)));
        }
        let content = std::fs::read_to_string(&abs)?;
        tracing::debug!(path = %path, bytes = content.len(), "Read file");
        Ok(content)
    }

    /// Write `content`, creating parent directories. Returns bytes written.
    pub fn write_file(&self, path: &str, content: &str) -> CoreResult<usize> {
        let abs = resolve_within(&self.root, path)?;
        if let Some(parent) = abs.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&abs, content)?;
        tracing::info!(path = %path, bytes = content.len(), "Wrote file");
        Ok(content.len())
    }

    /// Replace the whole file with `new_content`. The file must exist.
    pub fn edit_file(&self, path: &str, new_content: &str) -> CoreResult<EditOutcome> {
        let old = self.read_file(path)?;
        let diff = unified_diff(path, &old, new_content);
        tracing::debug!(path = %path, "Proposed diff:\n{}", diff);
        let bytes_written = self.write_file(path, new_content)?;
        Ok(EditOutcome {
            diff,
            bytes_written,
        })
    }

    /// Run `command` in the root, but only once the gate approves it.
    pub async fn run_command(&self, command: &str, timeout: Duration) -> CoreResult<CommandOutput> {
        if !self.gate.request(command).await {
            tracing::info!(command = %command, "Command not approved; not executing");
            return Ok(CommandOutput::rejected(command));
        }

        let output = self.runner.run(command, &self.root, timeout).await?;
        tracing::info!(command = %command, exit_code = output.exit_code, "Command finished");
        Ok(CommandOutput {
            command: command.to_string(),
            success: output.exit_code == 0,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            rejected: false,
        })
    }
}
