//! Logic functions: IF, COALESCE, AND, OR, NOT, SWITCH

use super::arg;
use crate::value::Value;
use std::collections::HashMap;

/// Initialize the logic group
pub fn init() -> HashMap<String, Value> {
    let mut module: HashMap<String, Value> = HashMap::new();

    // IF(condition, then, else)
    module.insert("IF".to_string(), Value::NativeFunction {
        name: "IF".to_string(),
        func: |args| {
            if arg(args, 0).is_truthy() {
                Ok(arg(args, 1).clone())
            } else {
                Ok(arg(args, 2).clone())
            }
        },
    });

    // COALESCE(...values) -> first value that is not null/undefined
    module.insert("COALESCE".to_string(), Value::NativeFunction {
        name: "COALESCE".to_string(),
        func: |args| {
            Ok(args
                .iter()
                .find(|v| !v.is_nullish())
                .cloned()
                .unwrap_or(Value::Undefined))
        },
    });

    // AND(...values) -> Bool, true when every value is truthy
    module.insert("AND".to_string(), Value::NativeFunction {
        name: "AND".to_string(),
        func: |args| Ok(Value::Bool(args.iter().all(Value::is_truthy))),
    });

    // OR(...values) -> Bool, true when any value is truthy
    module.insert("OR".to_string(), Value::NativeFunction {
        name: "OR".to_string(),
        func: |args| Ok(Value::Bool(args.iter().any(Value::is_truthy))),
    });

    // NOT(value) -> Bool
    module.insert("NOT".to_string(), Value::NativeFunction {
        name: "NOT".to_string(),
        func: |args| Ok(Value::Bool(!arg(args, 0).is_truthy())),
    });

    // SWITCH(expr, case1, value1, case2, value2, ..., default?)
    module.insert("SWITCH".to_string(), Value::NativeFunction {
        name: "SWITCH".to_string(),
        func: |args| {
            let subject = arg(args, 0);
            let cases = args.get(1..).unwrap_or(&[]);
            for pair in cases.chunks_exact(2) {
                if pair[0].strict_equals(subject) {
                    return Ok(pair[1].clone());
                }
            }
            if cases.len() % 2 == 1 {
                Ok(cases[cases.len() - 1].clone())
            } else {
                Ok(Value::Undefined)
            }
        },
    });

    module
}

#[cfg(test)]
mod tests {
    use crate::stdlib::call;
    use crate::value::Value;

    #[test]
    fn test_if() {
        assert_eq!(call("IF", &[true.into(), "yes".into(), "no".into()]), Ok("yes".into()));
        assert_eq!(call("IF", &[Value::from(0), "yes".into(), "no".into()]), Ok("no".into()));
        assert_eq!(call("IF", &[Value::Null, "yes".into()]), Ok(Value::Undefined));
    }

    #[test]
    fn test_coalesce_keeps_falsy_defined_values() {
        let args = [Value::Null, Value::Undefined, Value::from(0), "x".into()];
        assert_eq!(call("COALESCE", &args), Ok(Value::from(0)));
        assert_eq!(
            call("COALESCE", &[Value::Null, "".into()]),
            Ok(Value::from(""))
        );
        assert_eq!(call("COALESCE", &[Value::Null]), Ok(Value::Undefined));
    }

    #[test]
    fn test_and_or_not() {
        assert_eq!(call("AND", &[true.into(), Value::from(1), "x".into()]), Ok(true.into()));
        assert_eq!(call("AND", &[true.into(), Value::from("")]), Ok(false.into()));
        assert_eq!(call("AND", &[]), Ok(true.into()));
        assert_eq!(call("OR", &[Value::Null, Value::from(0), "x".into()]), Ok(true.into()));
        assert_eq!(call("OR", &[]), Ok(false.into()));
        assert_eq!(call("NOT", &[Value::Undefined]), Ok(true.into()));
    }

    #[test]
    fn test_switch() {
        let with_default = |subject: &str| {
            call(
                "SWITCH",
                &[
                    subject.into(),
                    "a".into(),
                    Value::from(1),
                    "b".into(),
                    Value::from(2),
                    Value::from(99),
                ],
            )
        };
        assert_eq!(with_default("b"), Ok(Value::from(2)));
        assert_eq!(with_default("z"), Ok(Value::from(99)));

        // strict equality: "1" does not match 1
        assert_eq!(
            call("SWITCH", &["1".into(), Value::from(1), "num".into()]),
            Ok(Value::Undefined)
        );
    }
}
