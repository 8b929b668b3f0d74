//! LLM-backed Analyzer
//!
//! Asks a reasoning service for the root cause and a fix, then parses the
//! two labelled lines out of the reply. Any provider error or a reply missing
//! either line is a decline.

use std::sync::Arc;

use async_trait::async_trait;

use bug_cascade_llm::{LlmProvider, LlmRequestOptions, Message};

use super::{BugAnalysis, BugAnalyzer};

const SYSTEM_PROMPT: &str = "You are a senior software engineer acting as a bug analysis agent.\n\
You must only analyze and propose fixes.\n\
Do NOT execute code.\n\
Do NOT suggest running shell commands.\n\
Be concise and precise.\n\
Answer with exactly two lines:\n\
Root cause: <one sentence>\n\
Proposed fix: <one sentence>";

/// Analyzer that delegates reasoning to an `LlmProvider`.
pub struct LlmBugAnalyzer {
    provider: Arc<dyn LlmProvider>,
}

impl LlmBugAnalyzer {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }

    fn build_prompt(report: &str, code: &str, path: &str) -> String {
        format!(
            "Bug report:\n{}\n\nFile: {}\n\nCode:\n{}\n\nTasks:\n\
             1. Identify the root cause of the bug.\n\
             2. Propose a clean, maintainable fix.\n",
            report, path, code
        )
    }
}

/// Value of a `label: value` line, ignoring case, list markers and bold markup.
fn labelled_value(line: &str, label: &str) -> Option<String> {
    let cleaned = line
        .trim()
        .trim_start_matches(['-', '*', '•', ' '])
        .replace("**", "");
    let cleaned = cleaned.trim();
    let (key, value) = cleaned.split_once(':')?;
    if !key.trim().eq_ignore_ascii_case(label) {
        return None;
    }
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Extract both labelled lines from a reply.
pub(crate) fn parse_analysis(content: &str) -> Option<BugAnalysis> {
    let mut root_cause = None;
    let mut proposed_fix = None;
    for line in content.lines() {
        if root_cause.is_none() {
            root_cause = labelled_value(line, "root cause");
        }
        if proposed_fix.is_none() {
            proposed_fix = labelled_value(line, "proposed fix");
        }
    }
    Some(BugAnalysis::new(root_cause?, proposed_fix?))
}

#[async_trait]
impl BugAnalyzer for LlmBugAnalyzer {
    fn name(&self) -> &str {
        "llm"
    }

    async fn analyze(&self, report: &str, code: &str, path: &str) -> Option<BugAnalysis> {
        let prompt = Self::build_prompt(report, code, path);
        let response = match self
            .provider
            .send_message(
                vec![Message::user(prompt)],
                Some(SYSTEM_PROMPT.to_string()),
                LlmRequestOptions::default(),
            )
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "LLM analysis failed");
                return None;
            }
        };

        let content = response.content.unwrap_or_default();
        let analysis = parse_analysis(&content);
        if analysis.is_none() {
            tracing::warn!(
                provider = self.provider.name(),
                "LLM reply lacked a root cause or proposed fix"
            );
        }
        analysis
    }
}
