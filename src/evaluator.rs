//! Template and expression evaluation
//!
//! [`ExpressionEvaluator`] is the entry point used by rendering code:
//!
//! - `evaluate` resolves `${...}` tokens inside a template string. A string that
//!   is exactly one token yields the typed value; mixed text yields a string.
//! - `evaluate_expression` runs one bare expression.
//! - `evaluate_condition` applies the visibility policy: no condition means visible.
//!
//! `evaluate` is the forgiving boundary. Unless `throw_on_error` is set, failures
//! are logged and the template degrades (raw token text, default value or the
//! original string). Denylist rejections are never suppressed.

use crate::ast::Expression;
use crate::config::EvaluatorConfig;
use crate::context::{build_standard_context, ExpressionContext, StandardContextOptions};
use crate::error::{ExpressionError, Result};
use crate::interpreter::Interpreter;
use crate::parser::parse_expression_with_depth;
use crate::sanitize;
use crate::template::{self, Segment};
use crate::value::Value;
use tracing::{debug, trace, warn};

/// Per-call evaluation options
#[derive(Debug, Clone, Default)]
pub struct EvaluationOptions {
    /// Returned when a whole-template evaluation fails and errors are suppressed
    pub default_value: Option<Value>,

    /// Propagate evaluation failures instead of degrading
    pub throw_on_error: bool,

    /// Run the denylist check; `None` uses the evaluator's configuration
    pub sanitize: Option<bool>,
}

impl EvaluationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict options: every failure propagates
    pub fn strict() -> Self {
        Self::default().with_throw_on_error(true)
    }

    pub fn with_default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_throw_on_error(mut self, throw_on_error: bool) -> Self {
        self.throw_on_error = throw_on_error;
        self
    }

    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize = Some(sanitize);
        self
    }
}

/// Evaluates templates and expressions against one context
#[derive(Debug, Clone, Default)]
pub struct ExpressionEvaluator {
    context: ExpressionContext,
    config: EvaluatorConfig,
}

impl ExpressionEvaluator {
    pub fn new(context: ExpressionContext) -> Self {
        ExpressionEvaluator {
            context,
            config: EvaluatorConfig::default(),
        }
    }

    /// Build the standard namespaces and wrap them in an evaluator
    pub fn from_standard_context(options: StandardContextOptions) -> Self {
        Self::new(build_standard_context(options))
    }

    /// Replace the configuration; evaluators derived with `with_context` inherit it
    pub fn with_config(mut self, config: EvaluatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn context(&self) -> &ExpressionContext {
        &self.context
    }

    /// Merge `data` into the local bindings of this evaluator's context
    pub fn update_context<I, K, V>(&mut self, data: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.context.extend(data);
    }

    /// New evaluator over a child context; `self` is left untouched
    pub fn with_context<I, K, V>(&self, bindings: I) -> ExpressionEvaluator
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        ExpressionEvaluator {
            context: self.context.create_child(bindings),
            config: self.config.clone(),
        }
    }

    /// Evaluate a template value. Anything that is not a string is returned as is.
    pub fn evaluate(&self, expression: &Value, options: &EvaluationOptions) -> Result<Value> {
        match expression {
            Value::String(text) => self.evaluate_template(text, options),
            other => Ok(other.clone()),
        }
    }

    /// Evaluate a template string
    pub fn evaluate_template(&self, text: &str, options: &EvaluationOptions) -> Result<Value> {
        if !template::has_template(text) {
            return Ok(Value::String(text.to_string()));
        }

        if let Some(source) = template::single_expression(text.trim()) {
            return match self.evaluate_expression(source, options) {
                Ok(value) => Ok(value),
                Err(error) if error.is_sanitization() || options.throw_on_error => Err(error),
                Err(error) => {
                    warn!(template = %text, error = %error, "template evaluation failed");
                    Ok(options
                        .default_value
                        .clone()
                        .unwrap_or_else(|| Value::String(text.to_string())))
                }
            };
        }

        let mut output = String::with_capacity(text.len());
        for segment in template::scan(text) {
            match segment {
                Segment::Literal(literal) => output.push_str(literal),
                Segment::Expression { source, raw } => {
                    match self.evaluate_expression(source, options) {
                        Ok(value) => output.push_str(&value.to_template_string()),
                        Err(error) if error.is_sanitization() || options.throw_on_error => {
                            return Err(error)
                        }
                        Err(error) => {
                            warn!(token = %raw, error = %error, "keeping unevaluated token");
                            output.push_str(raw);
                        }
                    }
                }
            }
        }
        Ok(Value::String(output))
    }

    /// Evaluate one bare expression (no `${}` wrapper).
    ///
    /// Empty input yields `Undefined`. Denylist matches fail with
    /// [`ExpressionError::Sanitization`]; every other failure is reported as
    /// [`ExpressionError::Evaluation`] carrying the expression text.
    pub fn evaluate_expression(&self, expression: &str, options: &EvaluationOptions) -> Result<Value> {
        let source = expression.trim();
        if source.is_empty() {
            return Ok(Value::Undefined);
        }

        if options.sanitize.unwrap_or(self.config.sanitize) {
            sanitize::check(source)?;
        }

        let mut interpreter = Interpreter::new(&self.context)
            .with_limits(self.config.max_steps, self.config.max_depth);
        let result = parse_expression_with_depth(source, self.config.max_depth)
            .and_then(|ast| interpreter.eval(&ast));

        match result {
            Ok(value) => {
                trace!(expression = source, steps = interpreter.steps(), "evaluated");
                Ok(value)
            }
            Err(error) => {
                debug!(expression = source, error = %error, "expression failed");
                Err(ExpressionError::Evaluation {
                    expression: source.to_string(),
                    message: error.to_string(),
                })
            }
        }
    }

    /// Decide a visibility/enabled condition.
    ///
    /// Absent, null and other falsy non-boolean conditions mean "no restriction".
    /// Booleans are returned as is; anything else goes through [`evaluate`](Self::evaluate)
    /// and is coerced by truthiness.
    pub fn evaluate_condition(
        &self,
        condition: Option<&Value>,
        options: &EvaluationOptions,
    ) -> Result<bool> {
        match condition {
            None => Ok(true),
            Some(Value::Bool(b)) => Ok(*b),
            Some(value) if !value.is_truthy() => Ok(true),
            Some(value) => Ok(self.evaluate(value, options)?.is_truthy()),
        }
    }

    /// Check that an expression passes the denylist and parses, without running it
    pub fn validate(&self, expression: &str) -> Result<Expression> {
        let source = expression.trim();
        if self.config.sanitize {
            sanitize::check(source)?;
        }
        parse_expression_with_depth(source, self.config.max_depth)
    }
}

/// One-shot [`ExpressionEvaluator::evaluate_expression`] against `context`
pub fn evaluate_expression(
    expression: &str,
    context: &ExpressionContext,
    options: &EvaluationOptions,
) -> Result<Value> {
    ExpressionEvaluator::new(context.clone()).evaluate_expression(expression, options)
}

/// One-shot [`ExpressionEvaluator::evaluate_condition`] against `context`
pub fn evaluate_condition(condition: Option<&Value>, context: &ExpressionContext) -> Result<bool> {
    ExpressionEvaluator::new(context.clone())
        .evaluate_condition(condition, &EvaluationOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evaluator() -> ExpressionEvaluator {
        ExpressionEvaluator::from_standard_context(
            StandardContextOptions::new().with_data(json!({"amount": 1500, "name": "Ada"})),
        )
    }

    fn eval(template: &str) -> Result<Value> {
        evaluator().evaluate(&Value::from(template), &EvaluationOptions::default())
    }

    #[test]
    fn test_single_token_keeps_type() {
        assert_eq!(eval("${data.amount}").unwrap(), Value::from(1500));
        assert_eq!(eval("  ${data.amount > 1000}  ").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_mixed_template_stringifies() {
        assert_eq!(
            eval("${data.name} owes ${data.amount}${data.missing}").unwrap(),
            Value::from("Ada owes 1500")
        );
    }

    #[test]
    fn test_failed_token_stays_in_place() {
        assert_eq!(
            eval("Total: ${data.amount.} (${data.name})").unwrap(),
            Value::from("Total: ${data.amount.} (Ada)")
        );
    }

    #[test]
    fn test_whole_template_failure_falls_back() {
        assert_eq!(eval("${nope}").unwrap(), Value::from("${nope}"));
        let options = EvaluationOptions::new().with_default_value(0);
        assert_eq!(
            evaluator().evaluate(&Value::from("${nope}"), &options).unwrap(),
            Value::from(0)
        );
        let strict = EvaluationOptions::strict();
        assert!(matches!(
            evaluator().evaluate(&Value::from("${nope}"), &strict),
            Err(ExpressionError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_evaluation_error_wraps_expression() {
        let err = evaluator()
            .evaluate_expression(" missing + 1 ", &EvaluationOptions::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to evaluate expression \"missing + 1\": missing is not defined"
        );
    }

    #[test]
    fn test_sanitize_can_be_disabled_per_call() {
        let evaluator = evaluator().with_context([("document", json!({"title": "t"}))]);
        let options = EvaluationOptions::new().with_sanitize(false);
        assert_eq!(
            evaluator.evaluate_expression("document.title", &options).unwrap(),
            Value::from("t")
        );
        assert!(evaluator
            .evaluate_expression("document.title", &EvaluationOptions::default())
            .unwrap_err()
            .is_sanitization());
    }

    #[test]
    fn test_config_budget_applies() {
        let config = EvaluatorConfig {
            max_steps: 2,
            ..EvaluatorConfig::default()
        };
        let evaluator = evaluator().with_config(config);
        let err = evaluator
            .evaluate_expression("1 + 2 + 3", &EvaluationOptions::default())
            .unwrap_err();
        assert!(err.to_string().contains("budget exhausted"));

        // children inherit the configuration
        let child = evaluator.with_context([("x", 1)]);
        assert_eq!(child.config().max_steps, 2);
    }

    #[test]
    fn test_validate() {
        let evaluator = evaluator();
        assert!(evaluator.validate("SUM(data.items, 'price') > 10").is_ok());
        assert!(matches!(
            evaluator.validate("data.amount >"),
            Err(ExpressionError::Parser { .. })
        ));
        assert!(evaluator.validate("eval('1')").unwrap_err().is_sanitization());
    }
}
