//! Formula function library
//!
//! Every group exposes an `init()` returning its functions by name. All groups
//! are merged into one flat registry that every evaluation scope can reach, so
//! expressions call them unqualified:
//! ```text
//! ${SUM(data.items, 'price')}
//! ${IF(data.total > 1000, 'large', 'small')}
//! ```

pub mod aggregate;
pub mod date;
pub mod format;
pub mod logic;
pub mod math;
pub mod string;

use crate::error::{ExpressionError, Result};
use crate::value::Value;
use std::collections::HashMap;

/// Type alias for a group of named functions
pub type StdlibModule = HashMap<String, Value>;

static UNDEFINED: Value = Value::Undefined;

lazy_static::lazy_static! {
    static ref FORMULA_FUNCTIONS: StdlibModule = init_all();
}

/// Merge every function group into a single registry
pub fn init_all() -> StdlibModule {
    let mut functions = HashMap::new();

    functions.extend(aggregate::init());
    functions.extend(date::init());
    functions.extend(logic::init());
    functions.extend(string::init());
    functions.extend(math::init());
    functions.extend(format::init());

    functions
}

/// Shared registry built on first use
pub fn formula_functions() -> &'static StdlibModule {
    &FORMULA_FUNCTIONS
}

pub fn lookup(name: &str) -> Option<&'static Value> {
    FORMULA_FUNCTIONS.get(name)
}

/// Registered names, sorted
pub fn function_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = FORMULA_FUNCTIONS.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

/// Invoke a library function directly
pub fn call(name: &str, args: &[Value]) -> Result<Value> {
    match lookup(name) {
        Some(Value::NativeFunction { func, .. }) => func(args),
        _ => Err(ExpressionError::Reference(name.to_string())),
    }
}

/// Positional argument, `Undefined` when not supplied
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&UNDEFINED)
}

/// Numeric argument with null/undefined read as 0
pub(crate) fn number_or_zero(value: &Value) -> f64 {
    if value.is_nullish() {
        0.0
    } else {
        value.to_number()
    }
}

/// String argument with null/undefined read as ""
pub(crate) fn string_or_empty(value: &Value) -> String {
    value.to_template_string()
}

/// Optional numeric argument falling back to `default` when absent
pub(crate) fn optional_number(value: &Value, default: f64) -> f64 {
    if value.is_nullish() {
        default
    } else {
        value.to_number()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_is_complete() {
        let expected = [
            "SUM", "AVG", "MIN", "MAX", "COUNT", "TODAY", "NOW", "YEAR", "MONTH", "DAY",
            "DATEDIFF", "DATEADD", "IF", "COALESCE", "AND", "OR", "NOT", "SWITCH", "UPPER",
            "LOWER", "TRIM", "CONCAT", "LEN", "SUBSTRING", "CONTAINS", "ROUND", "FLOOR",
            "CEIL", "ABS", "POWER", "FIXED", "PERCENT",
        ];
        for name in expected {
            assert!(lookup(name).is_some(), "missing {}", name);
        }
        assert_eq!(function_names().len(), expected.len());
    }

    #[test]
    fn test_function_values_carry_their_name() {
        for (key, value) in formula_functions() {
            match value {
                Value::NativeFunction { name, .. } => assert_eq!(name, key),
                other => panic!("{} is not a function: {:?}", key, other),
            }
        }
    }

    #[test]
    fn test_call_unknown() {
        assert_eq!(
            call("NOPE", &[]),
            Err(ExpressionError::Reference("NOPE".to_string()))
        );
    }
}
