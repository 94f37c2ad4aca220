//! Aggregation functions: SUM, AVG, MIN, MAX, COUNT
//!
//! All take an array and an optional dot-path field read from each element.
//! Anything that is not an array aggregates to 0.

use super::arg;
use crate::value::Value;
use std::collections::HashMap;

fn field_path(value: &Value) -> Option<String> {
    match value {
        Value::Undefined | Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(other.to_string()),
    }
}

fn element(item: &Value, field: Option<&str>) -> Value {
    match field {
        Some(path) => item.get_path(path),
        None => item.clone(),
    }
}

/// Numeric view of `args[0]` (optionally projected through `args[1]`), None for non-arrays
fn numbers(args: &[Value]) -> Option<Vec<f64>> {
    let items = arg(args, 0).as_array()?;
    let field = field_path(arg(args, 1));
    Some(
        items
            .iter()
            .map(|item| {
                let n = element(item, field.as_deref()).parse_float();
                if n.is_nan() {
                    0.0
                } else {
                    n
                }
            })
            .collect(),
    )
}

/// Initialize the aggregation group
pub fn init() -> HashMap<String, Value> {
    let mut module: HashMap<String, Value> = HashMap::new();

    // SUM(array, field?) -> Number
    module.insert("SUM".to_string(), Value::NativeFunction {
        name: "SUM".to_string(),
        func: |args| {
            let total = numbers(args).map(|ns| ns.iter().sum::<f64>()).unwrap_or(0.0);
            Ok(Value::Number(total))
        },
    });

    // AVG(array, field?) -> Number, 0 for empty input
    module.insert("AVG".to_string(), Value::NativeFunction {
        name: "AVG".to_string(),
        func: |args| {
            let avg = match numbers(args) {
                Some(ns) if !ns.is_empty() => ns.iter().sum::<f64>() / ns.len() as f64,
                _ => 0.0,
            };
            Ok(Value::Number(avg))
        },
    });

    // MIN(array, field?) -> Number, 0 for empty input
    module.insert("MIN".to_string(), Value::NativeFunction {
        name: "MIN".to_string(),
        func: |args| {
            let min = numbers(args)
                .and_then(|ns| ns.into_iter().reduce(f64::min))
                .unwrap_or(0.0);
            Ok(Value::Number(min))
        },
    });

    // MAX(array, field?) -> Number, 0 for empty input
    module.insert("MAX".to_string(), Value::NativeFunction {
        name: "MAX".to_string(),
        func: |args| {
            let max = numbers(args)
                .and_then(|ns| ns.into_iter().reduce(f64::max))
                .unwrap_or(0.0);
            Ok(Value::Number(max))
        },
    });

    // COUNT(array, field?) -> Number
    // Without a field every element counts, nulls included. With a field only
    // elements whose value is not null, undefined, "" or false count.
    module.insert("COUNT".to_string(), Value::NativeFunction {
        name: "COUNT".to_string(),
        func: |args| {
            let items = match arg(args, 0) {
                Value::Array(items) => items,
                _ => return Ok(Value::Number(0.0)),
            };
            let count = match field_path(arg(args, 1)) {
                None => items.len(),
                Some(path) => items
                    .iter()
                    .filter(|item| match item.get_path(&path) {
                        Value::Undefined | Value::Null | Value::Bool(false) => false,
                        Value::String(s) => !s.is_empty(),
                        _ => true,
                    })
                    .count(),
            };
            Ok(Value::from(count))
        },
    });

    module
}

#[cfg(test)]
mod tests {
    use crate::stdlib::call;
    use crate::value::Value;
    use serde_json::json;

    fn items() -> Value {
        Value::from(json!([
            {"price": 10, "qty": 1},
            {"price": 20, "qty": null},
            {"price": 30, "qty": 0}
        ]))
    }

    #[test]
    fn test_sum_with_field() {
        assert_eq!(call("SUM", &[items(), "price".into()]), Ok(Value::from(60)));
    }

    #[test]
    fn test_sum_coerces_unparsable_to_zero() {
        let values = Value::from(json!([1, "2.5", "abc", null, true, "3px"]));
        assert_eq!(call("SUM", &[values]), Ok(Value::from(6.5)));
    }

    #[test]
    fn test_non_array_aggregates_to_zero() {
        for name in ["SUM", "AVG", "MIN", "MAX", "COUNT"] {
            assert_eq!(call(name, &["oops".into()]), Ok(Value::from(0)), "{}", name);
            assert_eq!(call(name, &[]), Ok(Value::from(0)), "{}", name);
        }
    }

    #[test]
    fn test_avg_min_max() {
        assert_eq!(call("AVG", &[items(), "price".into()]), Ok(Value::from(20)));
        assert_eq!(call("MIN", &[items(), "price".into()]), Ok(Value::from(10)));
        assert_eq!(call("MAX", &[items(), "price".into()]), Ok(Value::from(30)));
        assert_eq!(call("AVG", &[Value::Array(vec![])]), Ok(Value::from(0)));
    }

    #[test]
    fn test_nested_field_path() {
        let rows = Value::from(json!([{"line": {"total": 4}}, {"line": {"total": 6}}, {"line": null}]));
        assert_eq!(call("SUM", &[rows, "line.total".into()]), Ok(Value::from(10)));
    }

    #[test]
    fn test_count_asymmetry() {
        let values = Value::from(json!([1, null, 0, "", false]));
        assert_eq!(call("COUNT", &[values]), Ok(Value::from(5)));

        // qty: 1 and qty: 0 count, qty: null does not
        assert_eq!(call("COUNT", &[items(), "qty".into()]), Ok(Value::from(2)));

        let flags = Value::from(json!([{"f": false}, {"f": ""}, {"f": "x"}, {}]));
        assert_eq!(call("COUNT", &[flags, "f".into()]), Ok(Value::from(1)));
    }
}
