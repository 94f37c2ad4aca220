//! Console expression engine
//!
//! Evaluates the `${...}` template expressions used by schema-driven console
//! applications for visibility conditions, computed display values and
//! parameter binding. Expressions are parsed by a closed grammar and run by a
//! budgeted tree-walking interpreter against a scoped variable context and a
//! built-in formula library (`SUM`, `IF`, `DATEDIFF`, ...).
//!
//! ```
//! use console_expr::{EvaluationOptions, ExpressionEvaluator, StandardContextOptions, Value};
//! use serde_json::json;
//!
//! let evaluator = ExpressionEvaluator::from_standard_context(
//!     StandardContextOptions::new().with_data(json!({"amount": 1500})),
//! );
//! let options = EvaluationOptions::default();
//! let amount = evaluator.evaluate(&"${data.amount}".into(), &options).unwrap();
//! assert_eq!(amount, Value::from(1500));
//! ```

pub mod ast;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod sanitize;
pub mod stdlib;
pub mod template;
pub mod value;

pub use config::EvaluatorConfig;
pub use context::{build_standard_context, ExpressionContext, StandardContextOptions, UserInfo};
pub use error::{ExpressionError, Result};
pub use evaluator::{evaluate_condition, evaluate_expression, EvaluationOptions, ExpressionEvaluator};
pub use value::Value;
