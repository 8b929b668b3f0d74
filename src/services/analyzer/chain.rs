//! Analyzer Fallback Chain
//!
//! Tries analyzers in order; the first one that produces an analysis wins.
//! Every attempt is recorded and logged.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bug_cascade_llm::{OpenAIProvider, ProviderConfig};

use super::{BugAnalysis, BugAnalyzer, HeuristicAnalyzer, LlmBugAnalyzer};
use crate::models::settings::LlmSettings;
use crate::utils::error::{AppError, AppResult};

/// Record of a single analyzer attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisAttempt {
    pub analyzer: String,
    pub produced: bool,
    pub duration_ms: u64,
}

/// Ordered chain of analyzers.
pub struct FallbackAnalyzer {
    analyzers: Vec<Arc<dyn BugAnalyzer>>,
}

impl FallbackAnalyzer {
    pub fn new(analyzers: Vec<Arc<dyn BugAnalyzer>>) -> Self {
        Self { analyzers }
    }

    /// Names of the analyzers in the order they are tried.
    pub fn chain(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Run the chain and return the analysis along with the attempt log.
    pub async fn analyze_with_log(
        &self,
        report: &str,
        code: &str,
        path: &str,
    ) -> (Option<BugAnalysis>, Vec<AnalysisAttempt>) {
        let mut attempts = Vec::new();

        for analyzer in &self.analyzers {
            let started = Instant::now();
            let result = analyzer.analyze(report, code, path).await;
            let attempt = AnalysisAttempt {
                analyzer: analyzer.name().to_string(),
                produced: result.is_some(),
                duration_ms: started.elapsed().as_millis() as u64,
            };
            debug!(
                analyzer = %attempt.analyzer,
                produced = attempt.produced,
                duration_ms = attempt.duration_ms,
                "Analyzer attempt"
            );
            attempts.push(attempt);

            if result.is_some() {
                return (result, attempts);
            }
        }

        info!(path = %path, tried = attempts.len(), "No analyzer produced a root cause");
        (None, attempts)
    }
}

#[async_trait]
impl BugAnalyzer for FallbackAnalyzer {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn analyze(&self, report: &str, code: &str, path: &str) -> Option<BugAnalysis> {
        self.analyze_with_log(report, code, path).await.0
    }
}

/// Default chain: the LLM analyzer (when enabled and a key is present), then
/// the built-in heuristics.
pub fn build_default_analyzer(settings: &LlmSettings) -> AppResult<Arc<dyn BugAnalyzer>> {
    let mut analyzers: Vec<Arc<dyn BugAnalyzer>> = Vec::new();

    match (settings.enabled, settings.api_key()) {
        (true, Some(api_key)) => {
            let provider = OpenAIProvider::new(ProviderConfig {
                api_key: Some(api_key),
                base_url: settings.base_url.clone(),
                model: settings.model.clone(),
                temperature: settings.temperature,
                ..Default::default()
            })?;
            info!(model = %settings.model, "LLM analysis enabled");
            analyzers.push(Arc::new(LlmBugAnalyzer::new(Arc::new(provider))));
        }
        (true, None) => {
            info!(
                env = %settings.api_key_env,
                "No API key found; using heuristic analysis only"
            );
        }
        (false, _) => debug!("LLM analysis disabled by configuration"),
    }

    let heuristics = HeuristicAnalyzer::zero_division()
        .map_err(|e| AppError::internal(format!("invalid heuristic rule: {}", e)))?;
    analyzers.push(Arc::new(heuristics));

    let chain = FallbackAnalyzer::new(analyzers);
    debug!(chain = ?chain.chain(), "Analyzer chain ready");
    Ok(Arc::new(chain))
}
