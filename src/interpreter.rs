//! Tree-walking evaluator for parsed expressions
//!
//! Identifiers resolve against an [`ExpressionContext`] first and the formula
//! function library second. Every node visited costs one step; both the step
//! count and the recursion depth are bounded and fail closed with
//! [`ExpressionError::BudgetExhausted`].

use crate::ast::{BinaryOp, Expression, LogicalOp, UnaryOp};
use crate::context::ExpressionContext;
use crate::error::{ExpressionError, Result};
use crate::parser::DEFAULT_MAX_DEPTH;
use crate::stdlib;
use crate::stdlib::format::to_fixed;
use crate::stdlib::math::js_pow;
use crate::value::{format_number, Object, Value};
use std::cmp::Ordering;

/// Default number of nodes one evaluation may visit
pub const DEFAULT_MAX_STEPS: usize = 10_000;

/// Evaluator over a borrowed scope
pub struct Interpreter<'a> {
    context: &'a ExpressionContext,
    max_steps: usize,
    max_depth: usize,
    steps: usize,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(context: &'a ExpressionContext) -> Self {
        Interpreter {
            context,
            max_steps: DEFAULT_MAX_STEPS,
            max_depth: DEFAULT_MAX_DEPTH,
            steps: 0,
            depth: 0,
        }
    }

    pub fn with_limits(mut self, max_steps: usize, max_depth: usize) -> Self {
        self.max_steps = max_steps;
        self.max_depth = max_depth;
        self
    }

    /// Nodes visited so far
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Evaluate an expression tree to a value
    pub fn eval(&mut self, expr: &Expression) -> Result<Value> {
        Ok(self.eval_link(expr)?.unwrap_or(Value::Undefined))
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        if self.steps > self.max_steps {
            return Err(ExpressionError::BudgetExhausted {
                limit: self.max_steps,
            });
        }
        Ok(())
    }

    /// Evaluate one node. `None` means an optional chain short-circuited.
    fn eval_link(&mut self, expr: &Expression) -> Result<Option<Value>> {
        self.tick()?;
        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            return Err(ExpressionError::BudgetExhausted {
                limit: self.max_depth,
            });
        }
        let result = self.eval_node(expr);
        self.depth -= 1;
        result
    }

    fn eval_node(&mut self, expr: &Expression) -> Result<Option<Value>> {
        match expr {
            Expression::FieldAccess {
                object,
                field,
                optional,
            } => {
                let target = match self.eval_link(object)? {
                    Some(target) => target,
                    None => return Ok(None),
                };
                if target.is_nullish() {
                    if *optional {
                        return Ok(None);
                    }
                    return Err(cannot_read(&target, field));
                }
                Ok(Some(target.property(field)))
            }

            Expression::Index { object, index } => {
                let target = match self.eval_link(object)? {
                    Some(target) => target,
                    None => return Ok(None),
                };
                let key = property_key(&self.eval(index)?);
                if target.is_nullish() {
                    return Err(cannot_read(&target, &key));
                }
                Ok(Some(target.property(&key)))
            }

            Expression::MethodCall {
                object,
                method,
                arguments,
                optional,
            } => {
                let target = match self.eval_link(object)? {
                    Some(target) => target,
                    None => return Ok(None),
                };
                if target.is_nullish() {
                    if *optional {
                        return Ok(None);
                    }
                    return Err(cannot_read(&target, method));
                }
                let args = self.eval_arguments(arguments)?;
                if let Value::NativeFunction { func, .. } = target.property(method) {
                    return func(&args).map(Some);
                }
                match call_method(&target, method, &args)? {
                    Some(value) => Ok(Some(value)),
                    None => Err(ExpressionError::type_error(format!(
                        "{}.{} is not a function",
                        describe(object),
                        method
                    ))),
                }
            }

            Expression::Call {
                function,
                arguments,
            } => {
                let callee = match self.eval_link(function)? {
                    Some(callee) => callee,
                    None => return Ok(None),
                };
                let args = self.eval_arguments(arguments)?;
                match callee {
                    Value::NativeFunction { func, .. } => func(&args).map(Some),
                    _ => Err(ExpressionError::type_error(format!(
                        "{} is not a function",
                        describe(function)
                    ))),
                }
            }

            other => self.eval_value(other).map(Some),
        }
    }

    fn eval_value(&mut self, expr: &Expression) -> Result<Value> {
        match expr {
            Expression::Number(n) => Ok(Value::Number(*n)),
            Expression::String(s) => Ok(Value::String(s.clone())),
            Expression::Bool(b) => Ok(Value::Bool(*b)),
            Expression::Null => Ok(Value::Null),
            Expression::Undefined => Ok(Value::Undefined),

            Expression::Identifier(name) => self.resolve(name),

            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                Ok(eval_binary_op(*operator, lhs, rhs))
            }

            // Short-circuit: the result is an operand, not a boolean
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let lhs = self.eval(left)?;
                let take_left = match operator {
                    LogicalOp::And => !lhs.is_truthy(),
                    LogicalOp::Or => lhs.is_truthy(),
                    LogicalOp::Nullish => !lhs.is_nullish(),
                };
                if take_left {
                    Ok(lhs)
                } else {
                    self.eval(right)
                }
            }

            Expression::Unary { operator, operand } => {
                // typeof tolerates undeclared names
                if let (UnaryOp::Typeof, Expression::Identifier(name)) =
                    (operator, operand.as_ref())
                {
                    if self.lookup(name).is_none() {
                        return Ok(Value::from("undefined"));
                    }
                }
                let value = self.eval(operand)?;
                Ok(match operator {
                    UnaryOp::Not => Value::Bool(!value.is_truthy()),
                    UnaryOp::Neg => Value::Number(-value.to_number()),
                    UnaryOp::Plus => Value::Number(value.to_number()),
                    UnaryOp::Typeof => Value::from(value.type_name()),
                })
            }

            Expression::Conditional {
                condition,
                consequent,
                alternate,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }

            Expression::Array(elements) => Ok(Value::Array(self.eval_arguments(elements)?)),

            Expression::Object(entries) => {
                let mut map = Object::new();
                for (key, value) in entries {
                    let value = self.eval(value)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::Object(map))
            }

            Expression::FieldAccess { .. }
            | Expression::Index { .. }
            | Expression::MethodCall { .. }
            | Expression::Call { .. } => self.eval(expr),
        }
    }

    fn eval_arguments(&mut self, arguments: &[Expression]) -> Result<Vec<Value>> {
        arguments.iter().map(|arg| self.eval(arg)).collect()
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.context
            .lookup(name)
            .or_else(|| stdlib::lookup(name))
            .cloned()
    }

    fn resolve(&self, name: &str) -> Result<Value> {
        self.lookup(name)
            .ok_or_else(|| ExpressionError::Reference(name.to_string()))
    }
}

fn cannot_read(target: &Value, key: &str) -> ExpressionError {
    ExpressionError::type_error(format!(
        "Cannot read properties of {} (reading '{}')",
        target, key
    ))
}

/// Source-like name of a callee for error messages
fn describe(expr: &Expression) -> String {
    match expr {
        Expression::Identifier(name) => name.clone(),
        Expression::FieldAccess { object, field, .. } => {
            format!("{}.{}", describe(object), field)
        }
        Expression::Index { object, .. } => format!("{}[...]", describe(object)),
        Expression::MethodCall { object, method, .. } => {
            format!("{}.{}(...)", describe(object), method)
        }
        Expression::Call { function, .. } => format!("{}(...)", describe(function)),
        _ => "expression".to_string(),
    }
}

fn property_key(key: &Value) -> String {
    match key {
        Value::Number(n) => format_number(*n),
        other => other.to_string(),
    }
}

/// Objects and arrays compare and add through their string form
fn to_primitive(value: Value) -> Value {
    match value {
        Value::Array(_) | Value::Object(_) | Value::NativeFunction { .. } => {
            Value::String(value.to_string())
        }
        primitive => primitive,
    }
}

fn compare(lhs: Value, rhs: Value) -> Option<Ordering> {
    match (to_primitive(lhs), to_primitive(rhs)) {
        (Value::String(a), Value::String(b)) => Some(a.encode_utf16().cmp(b.encode_utf16())),
        (a, b) => a.to_number().partial_cmp(&b.to_number()),
    }
}

fn eval_binary_op(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
    match op {
        BinaryOp::Add => match (to_primitive(lhs), to_primitive(rhs)) {
            (a @ Value::String(_), b) | (a, b @ Value::String(_)) => {
                Value::String(format!("{}{}", a, b))
            }
            (a, b) => Value::Number(a.to_number() + b.to_number()),
        },
        BinaryOp::Sub => Value::Number(lhs.to_number() - rhs.to_number()),
        BinaryOp::Mul => Value::Number(lhs.to_number() * rhs.to_number()),
        BinaryOp::Div => Value::Number(lhs.to_number() / rhs.to_number()),
        BinaryOp::Mod => Value::Number(lhs.to_number() % rhs.to_number()),
        BinaryOp::Pow => Value::Number(js_pow(lhs.to_number(), rhs.to_number())),

        BinaryOp::Eq => Value::Bool(lhs.loose_equals(&rhs)),
        BinaryOp::Ne => Value::Bool(!lhs.loose_equals(&rhs)),
        BinaryOp::StrictEq => Value::Bool(lhs.strict_equals(&rhs)),
        BinaryOp::StrictNe => Value::Bool(!lhs.strict_equals(&rhs)),

        BinaryOp::Lt => Value::Bool(compare(lhs, rhs) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(lhs, rhs),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(lhs, rhs) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(lhs, rhs),
            Some(Ordering::Greater | Ordering::Equal)
        )),
    }
}

/// Resolve JS `slice` bounds: negative offsets count from the end
fn slice_bounds(len: usize, start: &Value, end: &Value) -> (usize, usize) {
    let clamp = |value: &Value, default: usize| -> usize {
        if value.is_nullish() {
            return default;
        }
        let n = value.to_number();
        if n.is_nan() {
            return 0;
        }
        let n = n.trunc();
        if n < 0.0 {
            (len as f64 + n).max(0.0) as usize
        } else {
            (n as usize).min(len)
        }
    };
    let start = clamp(start, 0);
    let end = clamp(end, len);
    (start, end.max(start))
}

/// SameValueZero, used by `includes`
fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_nan() && y.is_nan() => true,
        _ => a.strict_equals(b),
    }
}

/// Built-in receiver methods. `None` when the receiver has no such method.
fn call_method(target: &Value, method: &str, args: &[Value]) -> Result<Option<Value>> {
    let arg = |i: usize| stdlib::arg(args, i);

    let result = match (target, method) {
        (Value::String(s), "toUpperCase") => Value::String(s.to_uppercase()),
        (Value::String(s), "toLowerCase") => Value::String(s.to_lowercase()),
        (Value::String(s), "trim") => Value::String(s.trim().to_string()),
        (Value::String(s), "includes") => Value::Bool(s.contains(&arg(0).to_string())),
        (Value::String(s), "startsWith") => Value::Bool(s.starts_with(&arg(0).to_string())),
        (Value::String(s), "endsWith") => Value::Bool(s.ends_with(&arg(0).to_string())),
        (Value::String(s), "indexOf") => {
            let position = s
                .find(&arg(0).to_string())
                .map(|byte| s[..byte].encode_utf16().count() as f64)
                .unwrap_or(-1.0);
            Value::Number(position)
        }
        (Value::String(s), "slice") => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), arg(0), arg(1));
            Value::String(chars[start..end].iter().collect())
        }
        (Value::String(s), "split") => match arg(0) {
            Value::Undefined => Value::Array(vec![Value::String(s.clone())]),
            separator => {
                let separator = separator.to_string();
                let parts: Vec<Value> = if separator.is_empty() {
                    s.chars().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(separator.as_str()).map(Value::from).collect()
                };
                Value::Array(parts)
            }
        },

        (Value::Array(items), "includes") => {
            Value::Bool(items.iter().any(|item| same_value_zero(item, arg(0))))
        }
        (Value::Array(items), "indexOf") => {
            let position = items
                .iter()
                .position(|item| item.strict_equals(arg(0)))
                .map(|i| i as f64)
                .unwrap_or(-1.0);
            Value::Number(position)
        }
        (Value::Array(items), "join") => {
            let separator = match arg(0) {
                Value::Undefined => ",".to_string(),
                other => other.to_string(),
            };
            let parts: Vec<String> = items.iter().map(Value::to_template_string).collect();
            Value::String(parts.join(&separator))
        }
        (Value::Array(items), "slice") => {
            let (start, end) = slice_bounds(items.len(), arg(0), arg(1));
            Value::Array(items[start..end].to_vec())
        }

        (Value::Number(n), "toFixed") => {
            let digits = match arg(0) {
                Value::Undefined => 0.0,
                other => other.to_number(),
            };
            Value::String(to_fixed(*n, digits)?)
        }

        (_, "toString") => Value::String(target.to_string()),

        _ => return Ok(None),
    };

    Ok(Some(result))
}
