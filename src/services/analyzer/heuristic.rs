//! Heuristic Analyzer
//!
//! Ordered rules matched against the report text or the source. The first
//! rule that fires provides the analysis.

use async_trait::async_trait;
use regex::Regex;

use super::{BugAnalysis, BugAnalyzer};

/// What makes a rule fire.
#[derive(Debug, Clone)]
enum RuleSignal {
    /// Explicit user signal in the report
    Report(Regex),
    /// Static code signal: `present` appears and `absent` does not
    Code { present: String, absent: String },
}

/// One detection rule and the analysis it yields.
#[derive(Debug, Clone)]
pub struct HeuristicRule {
    pub name: String,
    signal: RuleSignal,
    analysis: BugAnalysis,
}

impl HeuristicRule {
    /// Fires when `pattern` matches the report.
    pub fn report_pattern(
        name: impl Into<String>,
        pattern: &str,
        analysis: BugAnalysis,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            signal: RuleSignal::Report(Regex::new(pattern)?),
            analysis,
        })
    }

    /// Fires when the code contains `present` but not `absent`.
    pub fn code_without(
        name: impl Into<String>,
        present: impl Into<String>,
        absent: impl Into<String>,
        analysis: BugAnalysis,
    ) -> Self {
        Self {
            name: name.into(),
            signal: RuleSignal::Code {
                present: present.into(),
                absent: absent.into(),
            },
            analysis,
        }
    }

    fn matches(&self, report: &str, code: &str) -> bool {
        match &self.signal {
            RuleSignal::Report(re) => re.is_match(report),
            RuleSignal::Code { present, absent } => {
                code.contains(present.as_str()) && !code.contains(absent.as_str())
            }
        }
    }
}

/// Rule-based analyzer.
#[derive(Debug, Clone, Default)]
pub struct HeuristicAnalyzer {
    rules: Vec<HeuristicRule>,
}

impl HeuristicAnalyzer {
    pub fn new(rules: Vec<HeuristicRule>) -> Self {
        Self { rules }
    }

    /// Built-in rules for an unguarded division by zero in `divide(a, b)`.
    pub fn zero_division() -> Result<Self, regex::Error> {
        let explicit = HeuristicRule::report_pattern(
            "zero-division-report",
            r"(?i)(zero ?division|divid\w* by zero|division by zero|/ ?0\b|divide\(\s*[\d.]+\s*,\s*0\s*\)|\bb\s*==?\s*0\b)",
            BugAnalysis::new(
                "divide(a, b) is called with b == 0, and the division by zero raises an unhandled ZeroDivisionError.",
                "Add an explicit guard for b == 0 in divide() and raise a ValueError with a clear message.",
            ),
        )?;
        let unguarded = HeuristicRule::code_without(
            "unguarded-divide",
            "def divide",
            "b == 0",
            BugAnalysis::new(
                "divide(a, b) does not guard against b == 0, so a division by zero crashes at runtime.",
                "Add explicit b == 0 handling in divide() that raises a ValueError.",
            ),
        );
        Ok(Self::new(vec![explicit, unguarded]))
    }

    pub fn rules(&self) -> &[HeuristicRule] {
        &self.rules
    }
}

#[async_trait]
impl BugAnalyzer for HeuristicAnalyzer {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn analyze(&self, report: &str, code: &str, path: &str) -> Option<BugAnalysis> {
        let rule = self.rules.iter().find(|r| r.matches(report, code))?;
        tracing::debug!(rule = %rule.name, path = %path, "Heuristic rule matched");
        Some(rule.analysis.clone())
    }
}
