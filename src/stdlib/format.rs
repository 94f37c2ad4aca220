//! Format functions: FIXED, PERCENT

use super::{arg, number_or_zero, optional_number};
use crate::error::{ExpressionError, Result};
use crate::value::{format_number, Value};
use std::collections::HashMap;

const MAX_FRACTION_DIGITS: f64 = 100.0;

// extra digits rendered to tell exact halves apart from values just above or below
const TIE_EXTRA_DIGITS: usize = 31;

/// `Number.prototype.toFixed`
///
/// Exact halves round away from zero, everything else rounds to nearest.
pub fn to_fixed(value: f64, digits: f64) -> Result<String> {
    let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
    if !(0.0..=MAX_FRACTION_DIGITS).contains(&digits) {
        return Err(ExpressionError::type_error(
            "toFixed() digits argument must be between 0 and 100",
        ));
    }
    let digits = digits as usize;

    if value.is_nan() || value.abs() >= 1e21 {
        return Ok(format_number(value));
    }

    let abs = value.abs();
    let expanded = format!("{:.*}", digits + TIE_EXTRA_DIGITS, abs);
    let (kept, rest) = expanded.split_at(expanded.len() - TIE_EXTRA_DIGITS);
    let is_tie = rest.starts_with('5') && rest[1..].bytes().all(|b| b == b'0');

    let body = if is_tie {
        increment_last_digit(kept.trim_end_matches('.'))
    } else {
        format!("{:.*}", digits, abs)
    };

    Ok(if value < 0.0 {
        format!("-{}", body)
    } else {
        body
    })
}

/// Add one unit in the last place of a plain decimal string
fn increment_last_digit(number: &str) -> String {
    let mut bytes = number.as_bytes().to_vec();
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b'.' => continue,
            b'9' => bytes[i] = b'0',
            digit => {
                bytes[i] = digit + 1;
                return String::from_utf8_lossy(&bytes).into_owned();
            }
        }
    }
    format!("1{}", String::from_utf8_lossy(&bytes))
}

/// Initialize the format group
pub fn init() -> HashMap<String, Value> {
    let mut module: HashMap<String, Value> = HashMap::new();

    // FIXED(value, decimals = 2) -> String
    module.insert("FIXED".to_string(), Value::NativeFunction {
        name: "FIXED".to_string(),
        func: |args| {
            let value = number_or_zero(arg(args, 0));
            let decimals = optional_number(arg(args, 1), 2.0);
            Ok(Value::String(to_fixed(value, decimals)?))
        },
    });

    // PERCENT(value, decimals = 0) -> String, 0.256 -> "26%"
    module.insert("PERCENT".to_string(), Value::NativeFunction {
        name: "PERCENT".to_string(),
        func: |args| {
            let value = number_or_zero(arg(args, 0)) * 100.0;
            let decimals = optional_number(arg(args, 1), 0.0);
            Ok(Value::String(format!("{}%", to_fixed(value, decimals)?)))
        },
    });

    module
}
