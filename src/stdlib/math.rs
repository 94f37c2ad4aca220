//! Math functions: ROUND, FLOOR, CEIL, ABS, POWER

use super::{arg, number_or_zero, optional_number};
use crate::value::Value;
use std::collections::HashMap;

/// `Math.round`: halves round towards +Infinity
pub fn js_round(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// `Math.pow` / `**`
pub fn js_pow(base: f64, exponent: f64) -> f64 {
    // powf treats 1^NaN and (+-1)^Infinity as 1
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

/// Scale by 10^decimals, apply `op`, scale back
fn with_decimals(args: &[Value], op: fn(f64) -> f64) -> Value {
    let value = number_or_zero(arg(args, 0));
    let decimals = optional_number(arg(args, 1), 0.0);
    if decimals == 0.0 {
        return Value::Number(op(value));
    }
    let factor = js_pow(10.0, decimals);
    Value::Number(op(value * factor) / factor)
}

/// Initialize the math group
pub fn init() -> HashMap<String, Value> {
    let mut module: HashMap<String, Value> = HashMap::new();

    // ROUND(value, decimals = 0) -> Number
    module.insert("ROUND".to_string(), Value::NativeFunction {
        name: "ROUND".to_string(),
        func: |args| Ok(with_decimals(args, js_round)),
    });

    // FLOOR(value, decimals = 0) -> Number
    module.insert("FLOOR".to_string(), Value::NativeFunction {
        name: "FLOOR".to_string(),
        func: |args| Ok(with_decimals(args, f64::floor)),
    });

    // CEIL(value, decimals = 0) -> Number
    module.insert("CEIL".to_string(), Value::NativeFunction {
        name: "CEIL".to_string(),
        func: |args| Ok(with_decimals(args, f64::ceil)),
    });

    // ABS(value) -> Number
    module.insert("ABS".to_string(), Value::NativeFunction {
        name: "ABS".to_string(),
        func: |args| Ok(Value::Number(number_or_zero(arg(args, 0)).abs())),
    });

    // POWER(base, exponent) -> Number
    module.insert("POWER".to_string(), Value::NativeFunction {
        name: "POWER".to_string(),
        func: |args| {
            let base = number_or_zero(arg(args, 0));
            let exponent = number_or_zero(arg(args, 1));
            Ok(Value::Number(js_pow(base, exponent)))
        },
    });

    module
}
