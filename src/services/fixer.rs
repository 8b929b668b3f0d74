//! Fix Authoring
//!
//! Produces the complete new body of the source file and, when needed, of
//! the test file. Writing them is the orchestrator's job; authors are pure.

use regex::Regex;

use bug_cascade_core::{BugRecord, CoreError, CoreResult};

/// Everything an author needs to produce a fix.
#[derive(Debug, Clone, Copy)]
pub struct FixRequest<'a> {
    pub bug: &'a BugRecord,
    pub source_path: &'a str,
    pub source: &'a str,
    pub test_path: &'a str,
    /// Current test file content; empty when the file does not exist yet
    pub existing_test: &'a str,
}

/// Complete replacement bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixPlan {
    /// New source file body (may equal the input when already fixed)
    pub source: String,
    /// New test file body, or `None` when the regression test is already present
    pub test: Option<String>,
}

/// Writes the fix and the regression test for an analyzed bug.
pub trait FixAuthor: Send + Sync {
    fn author(&self, request: &FixRequest<'_>) -> CoreResult<FixPlan>;
}

const GUARD_MESSAGE: &str = "Cannot divide by zero";
const TEST_NAME: &str = "test_divide_by_zero";

/// Guards `divide(a, b)` against a zero divisor and adds a pytest case.
#[derive(Debug, Clone)]
pub struct ZeroDivisionFixAuthor {
    signature: Regex,
}

impl ZeroDivisionFixAuthor {
    pub fn new() -> Result<Self, regex::Error> {
        // Signature line plus the indentation of the first body line.
        let signature = Regex::new(
            r"(?m)^[ \t]*def\s+divide\s*\(\s*\w+[^,]*,\s*(?P<divisor>\w+)[^)]*\)[^:\n]*:[ \t]*\r?\n(?P<indent>[ \t]+)",
        )?;
        Ok(Self { signature })
    }

    fn guard_source(&self, path: &str, source: &str) -> CoreResult<String> {
        let caps = self.signature.captures(source).ok_or_else(|| {
            CoreError::not_found(format!("No divide(a, b) function found in {}", path))
        })?;
        let divisor = &caps["divisor"];
        let indent = &caps["indent"];

        let already_guarded = source.contains(GUARD_MESSAGE)
            || source.contains(&format!("{} == 0", divisor));
        if already_guarded {
            tracing::debug!(path = %path, "divide() already guarded");
            return Ok(source.to_string());
        }

        // Insert right before the first body line, reusing its indentation.
        let insert_at = caps
            .name("indent")
            .map(|m| m.start())
            .ok_or_else(|| CoreError::internal("divide() body indentation not captured"))?;
        let guard = format!(
            "{indent}if {divisor} == 0:\n{indent}    raise ValueError(\"{msg}\")\n",
            indent = indent,
            divisor = divisor,
            msg = GUARD_MESSAGE,
        );

        let mut fixed = String::with_capacity(source.len() + guard.len());
        fixed.push_str(&source[..insert_at]);
        fixed.push_str(&guard);
        fixed.push_str(&source[insert_at..]);
        Ok(fixed)
    }

    fn extend_tests(&self, source_path: &str, existing: &str) -> Option<String> {
        if existing.contains(TEST_NAME) {
            return None;
        }

        let module = python_module(source_path);
        let mut body = existing.trim_end().to_string();
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        if !existing.contains("import pytest") {
            body.push_str("import pytest\n");
        }
        let import_line = format!("from {} import divide", module);
        if !existing.contains(&import_line) {
            body.push_str(&import_line);
            body.push('\n');
        }
        body.push_str(&format!(
            "\n\ndef {}():\n    with pytest.raises(ValueError, match=\"divide by zero\"):\n        divide(10, 0)\n",
            TEST_NAME
        ));
        Some(body)
    }
}

impl FixAuthor for ZeroDivisionFixAuthor {
    fn author(&self, request: &FixRequest<'_>) -> CoreResult<FixPlan> {
        let source = self.guard_source(request.source_path, request.source)?;
        let test = self.extend_tests(request.source_path, request.existing_test);
        tracing::info!(
            bug_id = %request.bug.id,
            test_path = %request.test_path,
            source_changed = source != request.source,
            test_changed = test.is_some(),
            "Authored fix"
        );
        Ok(FixPlan { source, test })
    }
}

/// Dotted import path for a Python file, rooted at its `src` package when
/// there is one (`demo_repo/src/calculator.py` → `src.calculator`).
fn python_module(path: &str) -> String {
    let trimmed = path.strip_suffix(".py").unwrap_or(path);
    let parts: Vec<&str> = trimmed.split(['/', '\\']).filter(|p| !p.is_empty()).collect();
    let start = parts.iter().rposition(|p| *p == "src").unwrap_or(parts.len().saturating_sub(1));
    parts[start..].join(".")
}
