//! Evaluator configuration
//!
//! Loaded from TOML; every key is optional:
//! ```toml
//! # Maximum AST nodes visited per expression
//! max_steps = 10000
//!
//! # Maximum nesting, applied to both parsing and evaluation
//! max_depth = 64
//!
//! # Run the dangerous-pattern check before evaluating
//! sanitize = true
//!
//! # Default log filter when RUST_LOG is unset
//! log_level = "warn"
//! ```

use crate::error::{ExpressionError, Result};
use crate::interpreter::DEFAULT_MAX_STEPS;
use crate::parser::DEFAULT_MAX_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Limits and defaults shared by an evaluator and its children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvaluatorConfig {
    /// Step budget per `evaluate_expression` call
    pub max_steps: usize,

    /// Nesting budget for parser and interpreter
    pub max_depth: usize,

    /// Default for `EvaluationOptions::sanitize`
    pub sanitize: bool,

    /// Log filter directive used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            max_depth: DEFAULT_MAX_DEPTH,
            sanitize: true,
            log_level: "warn".to_string(),
        }
    }
}

impl EvaluatorConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ExpressionError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| ExpressionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject budgets that would make every evaluation fail
    pub fn validate(&self) -> Result<()> {
        if self.max_steps == 0 {
            return Err(ExpressionError::Config(
                "max_steps must be greater than 0".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(ExpressionError::Config(
                "max_depth must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ExpressionError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = EvaluatorConfig::default();
        assert_eq!(config.max_steps, 10_000);
        assert_eq!(config.max_depth, 64);
        assert!(config.sanitize);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EvaluatorConfig::from_toml_str("max_steps = 500\nsanitize = false\n").unwrap();
        assert_eq!(
            config,
            EvaluatorConfig {
                max_steps: 500,
                sanitize: false,
                ..EvaluatorConfig::default()
            }
        );
        assert_eq!(EvaluatorConfig::from_toml_str("").unwrap(), EvaluatorConfig::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            EvaluatorConfig::from_toml_str("max_steps = \"many\""),
            Err(ExpressionError::Config(_))
        ));
        assert!(matches!(
            EvaluatorConfig::from_toml_str("unknown_key = 1"),
            Err(ExpressionError::Config(_))
        ));
        assert!(matches!(
            EvaluatorConfig::from_toml_str("max_depth = 0"),
            Err(ExpressionError::Config(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EvaluatorConfig {
            max_steps: 42,
            log_level: "debug".to_string(),
            ..EvaluatorConfig::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(EvaluatorConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EvaluatorConfig::load("/nonexistent/console-expr.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/console-expr.toml"));
    }
}
