//! Parser for template expressions
//!
//! Transforms a stream of tokens into an expression tree using
//! precedence climbing. The grammar is closed: there are no statements,
//! assignments or function definitions, so a parsed expression can only
//! read the scope and call library functions.

use crate::ast::*;
use crate::error::{ExpressionError, Result};
use crate::lexer::{Lexer, Token, TokenKind};

/// Default nesting limit when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Parse a complete expression from source text
pub fn parse_expression(source: &str) -> Result<Expression> {
    parse_expression_with_depth(source, DEFAULT_MAX_DEPTH)
}

/// Parse with an explicit nesting limit
pub fn parse_expression_with_depth(source: &str, max_depth: usize) -> Result<Expression> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens).with_max_depth(max_depth);
    parser.parse()
}

/// Parser for expression source
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            current: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Parse a single expression that must consume every token
    pub fn parse(&mut self) -> Result<Expression> {
        if self.tokens.is_empty() {
            return Err(self.error("Expected expression"));
        }

        let expr = self.expression()?;

        if let Some(token) = self.peek() {
            return Err(ExpressionError::Parser {
                position: token.position,
                message: format!("Unexpected token '{}'", token.lexeme),
            });
        }

        Ok(expr)
    }

    // Helper methods

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn previous(&self) -> Option<&Token> {
        if self.current > 0 {
            self.tokens.get(self.current - 1)
        } else {
            None
        }
    }

    fn advance(&mut self) -> Option<&Token> {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        if let Some(token) = self.peek() {
            std::mem::discriminant(&token.kind) == std::mem::discriminant(kind)
        } else {
            false
        }
    }

    fn match_token(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn previous_kind(&self) -> Option<&TokenKind> {
        self.previous().map(|t| &t.kind)
    }

    fn consume(&mut self, kind: &TokenKind, message: &str) -> Result<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn current_position(&self) -> usize {
        match self.peek() {
            Some(token) => token.position,
            None => self
                .tokens
                .last()
                .map(|t| t.position + t.lexeme.chars().count())
                .unwrap_or(0),
        }
    }

    fn error(&self, message: &str) -> ExpressionError {
        ExpressionError::Parser {
            position: self.current_position(),
            message: message.to_string(),
        }
    }

    /// One level per nested node, including each operator fold and postfix link
    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExpressionError::BudgetExhausted {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Expression parsing with precedence climbing

    fn expression(&mut self) -> Result<Expression> {
        self.enter()?;
        let expr = self.conditional();
        self.leave();
        expr
    }

    fn conditional(&mut self) -> Result<Expression> {
        let condition = self.nullish()?;

        if self.match_token(&[TokenKind::Question]) {
            let consequent = self.expression()?;
            self.consume(&TokenKind::Colon, "Expected ':' in conditional expression")?;
            let alternate = self.expression()?;
            return Ok(Expression::Conditional {
                condition: Box::new(condition),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            });
        }

        Ok(condition)
    }

    fn nullish(&mut self) -> Result<Expression> {
        let mut expr = self.or()?;
        let depth = self.depth;

        while self.match_token(&[TokenKind::Nullish]) {
            self.enter()?;
            let right = self.or()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Nullish,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn or(&mut self) -> Result<Expression> {
        let mut expr = self.and()?;
        let depth = self.depth;

        while self.match_token(&[TokenKind::Or]) {
            self.enter()?;
            let right = self.and()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator: LogicalOp::Or,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn and(&mut self) -> Result<Expression> {
        let mut expr = self.equality()?;
        let depth = self.depth;

        while self.match_token(&[TokenKind::And]) {
            self.enter()?;
            let right = self.equality()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator: LogicalOp::And,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expression> {
        let mut expr = self.comparison()?;
        let depth = self.depth;

        while self.match_token(&[
            TokenKind::Equal,
            TokenKind::NotEqual,
            TokenKind::StrictEqual,
            TokenKind::StrictNotEqual,
        ]) {
            self.enter()?;
            let operator = match self.previous_kind() {
                Some(TokenKind::Equal) => BinaryOp::Eq,
                Some(TokenKind::NotEqual) => BinaryOp::Ne,
                Some(TokenKind::StrictEqual) => BinaryOp::StrictEq,
                Some(TokenKind::StrictNotEqual) => BinaryOp::StrictNe,
                _ => unreachable!(),
            };
            let right = self.comparison()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expression> {
        let mut expr = self.term()?;
        let depth = self.depth;

        while self.match_token(&[
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
        ]) {
            self.enter()?;
            let operator = match self.previous_kind() {
                Some(TokenKind::Less) => BinaryOp::Lt,
                Some(TokenKind::LessEqual) => BinaryOp::Le,
                Some(TokenKind::Greater) => BinaryOp::Gt,
                Some(TokenKind::GreaterEqual) => BinaryOp::Ge,
                _ => unreachable!(),
            };
            let right = self.term()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn term(&mut self) -> Result<Expression> {
        let mut expr = self.factor()?;
        let depth = self.depth;

        while self.match_token(&[TokenKind::Plus, TokenKind::Minus]) {
            self.enter()?;
            let operator = match self.previous_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => unreachable!(),
            };
            let right = self.factor()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expression> {
        let mut expr = self.exponent()?;
        let depth = self.depth;

        while self.match_token(&[TokenKind::Star, TokenKind::Slash, TokenKind::Percent]) {
            self.enter()?;
            let operator = match self.previous_kind() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                Some(TokenKind::Percent) => BinaryOp::Mod,
                _ => unreachable!(),
            };
            let right = self.exponent()?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        self.depth = depth;
        Ok(expr)
    }

    /// `**` is right associative
    fn exponent(&mut self) -> Result<Expression> {
        let base = self.unary()?;

        if self.match_token(&[TokenKind::StarStar]) {
            self.enter()?;
            let power = self.exponent();
            self.leave();
            return Ok(Expression::Binary {
                left: Box::new(base),
                operator: BinaryOp::Pow,
                right: Box::new(power?),
            });
        }

        Ok(base)
    }

    fn unary(&mut self) -> Result<Expression> {
        if self.match_token(&[
            TokenKind::Not,
            TokenKind::Minus,
            TokenKind::Plus,
            TokenKind::Typeof,
        ]) {
            let operator = match self.previous_kind() {
                Some(TokenKind::Not) => UnaryOp::Not,
                Some(TokenKind::Minus) => UnaryOp::Neg,
                Some(TokenKind::Plus) => UnaryOp::Plus,
                Some(TokenKind::Typeof) => UnaryOp::Typeof,
                _ => unreachable!(),
            };
            self.enter()?;
            let operand = self.unary();
            self.leave();
            return Ok(Expression::Unary {
                operator,
                operand: Box::new(operand?),
            });
        }

        self.call()
    }

    fn call(&mut self) -> Result<Expression> {
        let mut expr = self.primary()?;
        let depth = self.depth;

        loop {
            if self.match_token(&[TokenKind::LeftParen]) {
                self.enter()?;
                let arguments = self.arguments(&TokenKind::RightParen)?;
                self.consume(&TokenKind::RightParen, "Expected ')' after arguments")?;
                expr = Expression::Call {
                    function: Box::new(expr),
                    arguments,
                };
            } else if self.match_token(&[TokenKind::Dot, TokenKind::QuestionDot]) {
                self.enter()?;
                let optional = matches!(self.previous_kind(), Some(TokenKind::QuestionDot));
                let name = self.consume_property_name()?;
                if self.match_token(&[TokenKind::LeftParen]) {
                    let arguments = self.arguments(&TokenKind::RightParen)?;
                    self.consume(&TokenKind::RightParen, "Expected ')' after arguments")?;
                    expr = Expression::MethodCall {
                        object: Box::new(expr),
                        method: name,
                        arguments,
                        optional,
                    };
                } else {
                    expr = Expression::FieldAccess {
                        object: Box::new(expr),
                        field: name,
                        optional,
                    };
                }
            } else if self.match_token(&[TokenKind::LeftBracket]) {
                self.enter()?;
                let index = self.expression()?;
                self.consume(&TokenKind::RightBracket, "Expected ']' after index")?;
                expr = Expression::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }

        self.depth = depth;
        Ok(expr)
    }

    fn arguments(&mut self, closing: &TokenKind) -> Result<Vec<Expression>> {
        let mut args = Vec::new();

        if !self.check(closing) {
            loop {
                args.push(self.expression()?);
                if !self.match_token(&[TokenKind::Comma]) {
                    break;
                }
                // trailing comma
                if self.check(closing) {
                    break;
                }
            }
        }

        Ok(args)
    }

    fn primary(&mut self) -> Result<Expression> {
        let token = match self.peek() {
            Some(token) => token.clone(),
            None => return Err(self.error("Unexpected end of expression")),
        };

        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expression::Number(n))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expression::String(s))
            }
            TokenKind::Bool(b) => {
                self.advance();
                Ok(Expression::Bool(b))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Null)
            }
            TokenKind::Undefined => {
                self.advance();
                Ok(Expression::Undefined)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expression::Identifier(name))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(&TokenKind::RightParen, "Expected ')' after expression")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => {
                self.advance();
                let elements = self.arguments(&TokenKind::RightBracket)?;
                self.consume(&TokenKind::RightBracket, "Expected ']' after array elements")?;
                Ok(Expression::Array(elements))
            }
            TokenKind::LeftBrace => {
                self.advance();
                self.object_literal()
            }
            _ => Err(ExpressionError::Parser {
                position: token.position,
                message: format!("Unexpected token '{}'", token.lexeme),
            }),
        }
    }

    /// Parse `{ key: value, ... }` after the opening brace
    fn object_literal(&mut self) -> Result<Expression> {
        let mut entries = Vec::new();

        while !self.check(&TokenKind::RightBrace) {
            let key_token = match self.advance() {
                Some(token) => token.clone(),
                None => return Err(self.error("Expected '}' after object entries")),
            };
            let is_identifier = matches!(key_token.kind, TokenKind::Identifier(_));
            let key = match key_token.kind {
                TokenKind::Identifier(name) => name,
                TokenKind::String(s) => s,
                TokenKind::Number(n) => crate::value::format_number(n),
                TokenKind::Bool(_) | TokenKind::Null | TokenKind::Undefined | TokenKind::Typeof => {
                    key_token.lexeme.clone()
                }
                _ => {
                    return Err(ExpressionError::Parser {
                        position: key_token.position,
                        message: "Expected property name in object literal".to_string(),
                    })
                }
            };

            let value = if self.match_token(&[TokenKind::Colon]) {
                self.expression()?
            } else if is_identifier {
                // shorthand `{ name }`
                Expression::Identifier(key.clone())
            } else {
                return Err(self.error("Expected ':' after property name"));
            };
            entries.push((key, value));

            if !self.match_token(&[TokenKind::Comma]) {
                break;
            }
        }

        self.consume(&TokenKind::RightBrace, "Expected '}' after object entries")?;
        Ok(Expression::Object(entries))
    }

    fn consume_property_name(&mut self) -> Result<String> {
        let name = match self.peek() {
            Some(Token {
                kind:
                    TokenKind::Identifier(_)
                    | TokenKind::Bool(_)
                    | TokenKind::Null
                    | TokenKind::Undefined
                    | TokenKind::Typeof,
                lexeme,
                ..
            }) => lexeme.clone(),
            _ => return Err(self.error("Expected property name after '.'")),
        };
        self.advance();
        Ok(name)
    }
}
