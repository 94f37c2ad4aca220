//! String functions: UPPER, LOWER, TRIM, CONCAT, LEN, SUBSTRING, CONTAINS
//!
//! null and undefined read as the empty string, so none of these fail on
//! missing fields.

use super::{arg, string_or_empty};
use crate::value::Value;
use std::collections::HashMap;

/// Initialize the string group
pub fn init() -> HashMap<String, Value> {
    let mut module: HashMap<String, Value> = HashMap::new();

    // UPPER(text) -> String
    module.insert("UPPER".to_string(), Value::NativeFunction {
        name: "UPPER".to_string(),
        func: |args| Ok(Value::String(string_or_empty(arg(args, 0)).to_uppercase())),
    });

    // LOWER(text) -> String
    module.insert("LOWER".to_string(), Value::NativeFunction {
        name: "LOWER".to_string(),
        func: |args| Ok(Value::String(string_or_empty(arg(args, 0)).to_lowercase())),
    });

    // TRIM(text) -> String
    module.insert("TRIM".to_string(), Value::NativeFunction {
        name: "TRIM".to_string(),
        func: |args| Ok(Value::String(string_or_empty(arg(args, 0)).trim().to_string())),
    });

    // CONCAT(...values) -> String
    module.insert("CONCAT".to_string(), Value::NativeFunction {
        name: "CONCAT".to_string(),
        func: |args| Ok(Value::String(args.iter().map(string_or_empty).collect())),
    });

    // LEN(value) -> Number, array length for arrays, string length otherwise
    module.insert("LEN".to_string(), Value::NativeFunction {
        name: "LEN".to_string(),
        func: |args| {
            let len = match arg(args, 0) {
                Value::Array(items) => items.len(),
                other => string_or_empty(other).encode_utf16().count(),
            };
            Ok(Value::from(len))
        },
    });

    // SUBSTRING(text, start, length?) -> String
    // start is 0-based; negative or NaN start reads as 0; omitted length takes the rest
    module.insert("SUBSTRING".to_string(), Value::NativeFunction {
        name: "SUBSTRING".to_string(),
        func: |args| {
            let chars: Vec<char> = string_or_empty(arg(args, 0)).chars().collect();
            let clamp = |n: f64| -> usize {
                if n.is_nan() || n <= 0.0 {
                    0
                } else {
                    (n.trunc() as usize).min(chars.len())
                }
            };
            let start = clamp(arg(args, 1).to_number());
            let end = match arg(args, 2) {
                Value::Undefined => chars.len(),
                length => clamp(start as f64 + length.to_number()),
            };
            let end = end.max(start);
            Ok(Value::String(chars[start..end].iter().collect()))
        },
    });

    // CONTAINS(text, search) -> Bool, case-insensitive
    module.insert("CONTAINS".to_string(), Value::NativeFunction {
        name: "CONTAINS".to_string(),
        func: |args| {
            let text = string_or_empty(arg(args, 0)).to_lowercase();
            let search = string_or_empty(arg(args, 1)).to_lowercase();
            Ok(Value::Bool(text.contains(&search)))
        },
    });

    module
}

#[cfg(test)]
mod tests {
    use crate::stdlib::call;
    use crate::value::Value;
    use serde_json::json;

    #[test]
    fn test_case_and_trim() {
        assert_eq!(call("UPPER", &["abc".into()]), Ok("ABC".into()));
        assert_eq!(call("LOWER", &["AbC".into()]), Ok("abc".into()));
        assert_eq!(call("TRIM", &["  pad  ".into()]), Ok("pad".into()));
    }

    #[test]
    fn test_null_input_is_empty_string() {
        for name in ["UPPER", "LOWER", "TRIM"] {
            assert_eq!(call(name, &[Value::Null]), Ok("".into()), "{}", name);
            assert_eq!(call(name, &[]), Ok("".into()), "{}", name);
        }
        assert_eq!(call("LEN", &[Value::Undefined]), Ok(Value::from(0)));
    }

    #[test]
    fn test_concat() {
        let args = ["Order #".into(), Value::from(42), Value::Null, " ".into(), true.into()];
        assert_eq!(call("CONCAT", &args), Ok("Order #42 true".into()));
    }

    #[test]
    fn test_len() {
        assert_eq!(call("LEN", &["héllo".into()]), Ok(Value::from(5)));
        assert_eq!(call("LEN", &[Value::from(json!([1, 2, 3]))]), Ok(Value::from(3)));
        assert_eq!(call("LEN", &[Value::from(12345)]), Ok(Value::from(5)));
    }

    #[test]
    fn test_substring() {
        let text: Value = "Hello World".into();
        assert_eq!(call("SUBSTRING", &[text.clone(), Value::from(6)]), Ok("World".into()));
        assert_eq!(
            call("SUBSTRING", &[text.clone(), Value::from(0), Value::from(5)]),
            Ok("Hello".into())
        );
        assert_eq!(
            call("SUBSTRING", &[text.clone(), Value::from(-3), Value::from(2)]),
            Ok("He".into())
        );
        assert_eq!(
            call("SUBSTRING", &[text, Value::from(20), Value::from(5)]),
            Ok("".into())
        );
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        assert_eq!(call("CONTAINS", &["Hello World".into(), "WORLD".into()]), Ok(true.into()));
        assert_eq!(call("CONTAINS", &["Hello".into(), "bye".into()]), Ok(false.into()));
        assert_eq!(call("CONTAINS", &[Value::Null, "".into()]), Ok(true.into()));
    }
}
