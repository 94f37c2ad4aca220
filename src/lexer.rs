//! Lexer for template expressions
//!
//! Transforms the body of a `${...}` token into a stream of tokens.

use crate::error::{ExpressionError, Result};
use std::iter::Peekable;
use std::str::Chars;

/// Token types for the expression language
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Undefined,

    Identifier(String),

    // Keywords
    Typeof,

    // Operators
    Plus,           // +
    Minus,          // -
    Star,           // *
    StarStar,       // **
    Slash,          // /
    Percent,        // %

    // Comparison
    Equal,          // ==
    NotEqual,       // !=
    StrictEqual,    // ===
    StrictNotEqual, // !==
    Less,           // <
    LessEqual,      // <=
    Greater,        // >
    GreaterEqual,   // >=

    // Logical
    And,            // &&
    Or,             // ||
    Not,            // !
    Nullish,        // ??

    // Delimiters
    LeftParen,      // (
    RightParen,     // )
    LeftBrace,      // {
    RightBrace,     // }
    LeftBracket,    // [
    RightBracket,   // ]

    // Punctuation
    Comma,          // ,
    Dot,            // .
    QuestionDot,    // ?.
    Colon,          // :
    Question,       // ?
}

/// A token with its character offset in the expression text
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize, lexeme: impl Into<String>) -> Self {
        Token {
            kind,
            position,
            lexeme: lexeme.into(),
        }
    }
}

/// Lexer for tokenizing expression source
pub struct Lexer<'a> {
    source: Peekable<Chars<'a>>,
    position: usize,
    current_lexeme: String,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source: source.chars().peekable(),
            position: 0,
            current_lexeme: String::new(),
        }
    }

    /// Collect every token, stopping at the first lexical error
    pub fn tokenize(self) -> Result<Vec<Token>> {
        self.collect()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.next()?;
        self.current_lexeme.push(ch);
        self.position += 1;
        Some(ch)
    }

    fn peek(&mut self) -> Option<&char> {
        self.source.peek()
    }

    fn peek_is(&mut self, expected: char) -> bool {
        self.peek() == Some(&expected)
    }

    fn peek_second(&self) -> Option<char> {
        let mut lookahead = self.source.clone();
        lookahead.next();
        lookahead.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek_is(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn scan_string(&mut self, quote: char, start: usize) -> Result<Token> {
        let unterminated = || ExpressionError::Lexer {
            position: start,
            message: "Unterminated string literal".to_string(),
        };
        let mut value = String::new();

        loop {
            match self.advance() {
                Some(ch) if ch == quote => break,
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('0') => value.push('\0'),
                    Some('u') => value.push(self.scan_unicode_escape(start)?),
                    Some(c) => value.push(c),
                    None => return Err(unterminated()),
                },
                Some(ch) => value.push(ch),
                None => return Err(unterminated()),
            }
        }

        Ok(Token::new(
            TokenKind::String(value),
            start,
            self.current_lexeme.clone(),
        ))
    }

    fn scan_unicode_escape(&mut self, start: usize) -> Result<char> {
        let mut hex = String::new();
        for _ in 0..4 {
            match self.advance() {
                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                _ => {
                    return Err(ExpressionError::Lexer {
                        position: start,
                        message: "Invalid unicode escape sequence".to_string(),
                    })
                }
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| ExpressionError::Lexer {
                position: start,
                message: format!("Invalid unicode escape \\u{}", hex),
            })
    }

    fn scan_number(&mut self, first: char, start: usize) -> Result<Token> {
        let mut num_str = String::from(first);

        if first == '0' && matches!(self.peek(), Some('x') | Some('X')) {
            self.advance();
            let mut digits = String::new();
            while let Some(&ch) = self.peek() {
                if ch.is_ascii_hexdigit() {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            let value = i64::from_str_radix(&digits, 16).map_err(|_| ExpressionError::Lexer {
                position: start,
                message: "Invalid hexadecimal literal".to_string(),
            })?;
            return Ok(Token::new(
                TokenKind::Number(value as f64),
                start,
                self.current_lexeme.clone(),
            ));
        }

        let mut seen_dot = first == '.';
        while let Some(&ch) = self.peek() {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else if ch == '.' && !seen_dot {
                // `1.toFixed` is not valid, but `1.5` is
                match self.peek_second() {
                    Some(next) if next.is_ascii_digit() => {
                        seen_dot = true;
                        num_str.push(ch);
                        self.advance();
                    }
                    _ => break,
                }
            } else {
                break;
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let exponent_follows = match self.peek_second() {
                Some(c) if c.is_ascii_digit() => true,
                Some('+') | Some('-') => true,
                _ => false,
            };
            if exponent_follows {
                num_str.push(self.advance().unwrap_or('e'));
                if let Some(&sign) = self.peek() {
                    if sign == '+' || sign == '-' {
                        num_str.push(sign);
                        self.advance();
                    }
                }
                while let Some(&ch) = self.peek() {
                    if ch.is_ascii_digit() {
                        num_str.push(ch);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let value: f64 = num_str.parse().map_err(|_| ExpressionError::Lexer {
            position: start,
            message: format!("Invalid number literal '{}'", num_str),
        })?;
        Ok(Token::new(
            TokenKind::Number(value),
            start,
            self.current_lexeme.clone(),
        ))
    }

    fn scan_identifier(&mut self, first: char, start: usize) -> Token {
        let mut ident = String::from(first);

        while let Some(&ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match ident.as_str() {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            "typeof" => TokenKind::Typeof,
            _ => TokenKind::Identifier(ident.clone()),
        };

        Token::new(kind, start, ident)
    }

    fn next_token(&mut self) -> Option<Result<Token>> {
        self.skip_whitespace();
        self.current_lexeme.clear();

        let start = self.position;
        let ch = self.advance()?;

        let token = match ch {
            '"' | '\'' => return Some(self.scan_string(ch, start)),

            '0'..='9' => return Some(self.scan_number(ch, start)),
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                return Some(self.scan_number(ch, start))
            }

            c if c.is_alphabetic() || c == '_' || c == '$' => self.scan_identifier(c, start),

            '+' => Token::new(TokenKind::Plus, start, "+"),
            '-' => Token::new(TokenKind::Minus, start, "-"),
            '*' => {
                if self.match_char('*') {
                    Token::new(TokenKind::StarStar, start, "**")
                } else {
                    Token::new(TokenKind::Star, start, "*")
                }
            }
            '/' => Token::new(TokenKind::Slash, start, "/"),
            '%' => Token::new(TokenKind::Percent, start, "%"),

            '=' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        Token::new(TokenKind::StrictEqual, start, "===")
                    } else {
                        Token::new(TokenKind::Equal, start, "==")
                    }
                } else {
                    return Some(Err(ExpressionError::Lexer {
                        position: start,
                        message: "Assignment is not allowed in expressions".to_string(),
                    }));
                }
            }
            '!' => {
                if self.match_char('=') {
                    if self.match_char('=') {
                        Token::new(TokenKind::StrictNotEqual, start, "!==")
                    } else {
                        Token::new(TokenKind::NotEqual, start, "!=")
                    }
                } else {
                    Token::new(TokenKind::Not, start, "!")
                }
            }
            '<' => {
                if self.match_char('=') {
                    Token::new(TokenKind::LessEqual, start, "<=")
                } else {
                    Token::new(TokenKind::Less, start, "<")
                }
            }
            '>' => {
                if self.match_char('=') {
                    Token::new(TokenKind::GreaterEqual, start, ">=")
                } else {
                    Token::new(TokenKind::Greater, start, ">")
                }
            }
            '&' if self.match_char('&') => Token::new(TokenKind::And, start, "&&"),
            '|' if self.match_char('|') => Token::new(TokenKind::Or, start, "||"),
            '?' => {
                if self.match_char('?') {
                    Token::new(TokenKind::Nullish, start, "??")
                } else if self.peek_is('.')
                    && !self.peek_second().is_some_and(|c| c.is_ascii_digit())
                {
                    self.advance();
                    Token::new(TokenKind::QuestionDot, start, "?.")
                } else {
                    Token::new(TokenKind::Question, start, "?")
                }
            }

            // Delimiters
            '(' => Token::new(TokenKind::LeftParen, start, "("),
            ')' => Token::new(TokenKind::RightParen, start, ")"),
            '{' => Token::new(TokenKind::LeftBrace, start, "{"),
            '}' => Token::new(TokenKind::RightBrace, start, "}"),
            '[' => Token::new(TokenKind::LeftBracket, start, "["),
            ']' => Token::new(TokenKind::RightBracket, start, "]"),

            // Punctuation
            ',' => Token::new(TokenKind::Comma, start, ","),
            '.' => Token::new(TokenKind::Dot, start, "."),
            ':' => Token::new(TokenKind::Colon, start, ":"),

            other => {
                return Some(Err(ExpressionError::Lexer {
                    position: start,
                    message: format!("Unexpected character '{}'", other),
                }))
            }
        };

        Some(Ok(token))
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
