//! Token-Budgeted Conversation Log
//!
//! Append-only record of conversation turns plus a rolling free-text summary.
//! Once the approximate size of the log exceeds its budget, the oldest turns
//! are folded into the summary as one-line entries.
//!
//! Compaction is a single bounded pass per append: it removes
//! `max(1, ceil(0.4 * n))` turns and never loops. When the summary alone is
//! already over budget the log stays over budget until later appends shrink
//! the live turn list further.

use serde::{Deserialize, Serialize};

use crate::ledger::BugLedger;

/// Default budget, in approximate tokens.
pub const DEFAULT_TOKEN_BUDGET: usize = 8_000;

/// Maximum characters kept per compacted turn.
const COMPACTED_LINE_MAX_CHARS: usize = 180;

/// Marker appended to a compacted line that was truncated.
const ELLIPSIS: char = '…';

/// Approximate token cost of a text: `max(1, chars / 4)`.
///
/// Deliberately not a real tokenizer. It only has to be monotonic in the
/// content length and shared by growth and the budget check.
pub fn approx_tokens(text: &str) -> usize {
    (text.chars().count() / 4).max(1)
}

/// Speaker of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Agent,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Agent => "agent",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Render as a single compacted summary line.
    fn compacted_line(&self) -> String {
        let flattened = self
            .content
            .trim()
            .replace("\r\n", " ")
            .replace('\n', " ");
        let line = if flattened.chars().count() > COMPACTED_LINE_MAX_CHARS {
            let mut cut: String = flattened.chars().take(COMPACTED_LINE_MAX_CHARS).collect();
            cut.push(ELLIPSIS);
            cut
        } else {
            flattened
        };
        format!("- {}: {}", self.role, line)
    }
}

/// Conversation memory: compressed summary plus the live turns.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    budget: usize,
    summary: String,
    turns: Vec<Turn>,
}

impl ConversationLog {
    /// Create an empty log with the given approximate token budget.
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            summary: String::new(),
            turns: Vec::new(),
        }
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Append a turn, then run at most one compaction pass.
    pub fn append(&mut self, role: TurnRole, content: impl Into<String>) {
        self.turns.push(Turn::new(role, content));
        if self.size() > self.budget {
            self.compact();
        }
    }

    /// Approximate cost of the summary plus all live turns.
    pub fn size(&self) -> usize {
        approx_tokens(&self.summary) + approx_tokens(&self.turns_text())
    }

    fn turns_text(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role, t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn compact(&mut self) {
        let count = self.turns.len();
        if count == 0 {
            return;
        }
        let cut = ((count * 2).div_ceil(5)).max(1).min(count);
        let removed: Vec<Turn> = self.turns.drain(..cut).collect();

        let lines: Vec<String> = removed.iter().map(Turn::compacted_line).collect();
        let addition = format!("Compressed history:\n{}\n", lines.join("\n"));
        self.summary = format!("{}\n{}", self.summary, addition).trim().to_string();

        tracing::debug!(
            removed = cut,
            remaining = self.turns.len(),
            size = self.size(),
            budget = self.budget,
            "Compacted conversation history"
        );
    }

    /// Agent-readable projection: summary, bug tracker, then live turns.
    pub fn render(&self, ledger: &BugLedger) -> String {
        let bugs = if ledger.is_empty() {
            "(none)".to_string()
        } else {
            ledger.to_string()
        };
        format!(
            "=== SUMMARY (compressed) ===\n{}\n\n=== BUG TRACKER ===\n{}\n\n=== RECENT TURNS ===\n{}\n",
            self.summary,
            bugs,
            self.turns_text()
        )
    }
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BUDGET)
    }
}
