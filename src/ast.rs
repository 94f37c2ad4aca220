//! Abstract Syntax Tree definitions for template expressions

use serde::{Deserialize, Serialize};

/// Expression nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Number literal
    Number(f64),

    /// String literal
    String(String),

    /// Boolean literal
    Bool(bool),

    Null,

    Undefined,

    /// Variable reference
    Identifier(String),

    /// Binary operation
    Binary {
        left: Box<Expression>,
        operator: BinaryOp,
        right: Box<Expression>,
    },

    /// Short-circuiting `&&`, `||` and `??`
    Logical {
        left: Box<Expression>,
        operator: LogicalOp,
        right: Box<Expression>,
    },

    /// Unary operation
    Unary {
        operator: UnaryOp,
        operand: Box<Expression>,
    },

    /// `condition ? consequent : alternate`
    Conditional {
        condition: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },

    /// Function call
    Call {
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },

    /// Method call on a receiver: `value.method(args)`
    MethodCall {
        object: Box<Expression>,
        method: String,
        arguments: Vec<Expression>,
        optional: bool,
    },

    /// Field access: `value.field` or `value?.field`
    FieldAccess {
        object: Box<Expression>,
        field: String,
        optional: bool,
    },

    /// Index access: `value[index]`
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },

    /// Array literal
    Array(Vec<Expression>),

    /// Object literal, keys in source order
    Object(Vec<(String, Expression)>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Short-circuit operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Typeof,
}

impl Expression {
    /// Root identifiers read by this expression, in first-use order.
    ///
    /// `data.amount > limit` yields `["data", "limit"]`. Method and field names are not
    /// included since they are resolved against a receiver, not the scope.
    pub fn referenced_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut Vec<String>) {
        match self {
            Expression::Identifier(name) => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            Expression::Binary { left, right, .. } | Expression::Logical { left, right, .. } => {
                left.collect_names(names);
                right.collect_names(names);
            }
            Expression::Unary { operand, .. } => operand.collect_names(names),
            Expression::Conditional {
                condition,
                consequent,
                alternate,
            } => {
                condition.collect_names(names);
                consequent.collect_names(names);
                alternate.collect_names(names);
            }
            Expression::Call {
                function,
                arguments,
            } => {
                function.collect_names(names);
                for arg in arguments {
                    arg.collect_names(names);
                }
            }
            Expression::MethodCall {
                object, arguments, ..
            } => {
                object.collect_names(names);
                for arg in arguments {
                    arg.collect_names(names);
                }
            }
            Expression::FieldAccess { object, .. } => object.collect_names(names),
            Expression::Index { object, index } => {
                object.collect_names(names);
                index.collect_names(names);
            }
            Expression::Array(elements) => {
                for element in elements {
                    element.collect_names(names);
                }
            }
            Expression::Object(entries) => {
                for (_, value) in entries {
                    value.collect_names(names);
                }
            }
            Expression::Number(_)
            | Expression::String(_)
            | Expression::Bool(_)
            | Expression::Null
            | Expression::Undefined => {}
        }
    }
}
