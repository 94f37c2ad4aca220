//! Denylist pre-check for expression text
//!
//! The parser only accepts a closed grammar, so none of these constructs could
//! reach a host runtime anyway. The check still runs (unless disabled per call)
//! so that expressions written against the old dynamic evaluator fail with the
//! same "dangerous expression" error instead of an obscure reference error.

use crate::error::{ExpressionError, Result};
use regex::{Regex, RegexBuilder};

lazy_static::lazy_static! {
    static ref DANGEROUS_PATTERNS: Vec<Regex> = [
        r"eval\s*\(",
        r"Function\s*\(",
        r"setTimeout\s*\(",
        r"setInterval\s*\(",
        r"import\s*\(",
        r"require\s*\(",
        r"process\.",
        r"global\.",
        r"window\.",
        r"document\.",
        r"__proto__",
        r"constructor\s*\(",
        r"prototype\.",
    ]
    .iter()
    .filter_map(|pattern| {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .ok()
    })
    .collect();
}

/// Raw pattern sources, for diagnostics
pub fn patterns() -> Vec<&'static str> {
    DANGEROUS_PATTERNS.iter().map(Regex::as_str).collect()
}

/// First denylisted pattern found in `expression`
pub fn find_dangerous_pattern(expression: &str) -> Option<&'static str> {
    DANGEROUS_PATTERNS
        .iter()
        .find(|re| re.is_match(expression))
        .map(Regex::as_str)
}

/// Reject `expression` if it matches any denylisted pattern
pub fn check(expression: &str) -> Result<()> {
    match find_dangerous_pattern(expression) {
        Some(pattern) => {
            tracing::debug!(pattern, expression, "rejected dangerous expression");
            Err(ExpressionError::Sanitization {
                expression: expression.to_string(),
            })
        }
        None => Ok(()),
    }
}
