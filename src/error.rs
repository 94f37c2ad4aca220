//! Error types for the expression engine

use thiserror::Error;

/// Result type alias for expression operations
pub type Result<T> = std::result::Result<T, ExpressionError>;

/// Main error type for expression operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Lexer error at position {position}: {message}")]
    Lexer { position: usize, message: String },

    #[error("Parser error at position {position}: {message}")]
    Parser { position: usize, message: String },

    #[error("Potentially dangerous expression detected: {expression}")]
    Sanitization { expression: String },

    #[error("Failed to evaluate expression \"{expression}\": {message}")]
    Evaluation { expression: String, message: String },

    #[error("{0} is not defined")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("Evaluation budget exhausted (limit {limit})")]
    BudgetExhausted { limit: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ExpressionError {
    /// Sanitization rejections bypass `throw_on_error` suppression.
    pub fn is_sanitization(&self) -> bool {
        matches!(self, ExpressionError::Sanitization { .. })
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        ExpressionError::Type(message.into())
    }
}
