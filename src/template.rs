//! `${...}` template scanning
//!
//! A token runs from `${` to the first following `}`; braces cannot nest
//! inside a token. `${}` (empty body) is not a token and stays literal.

use regex::Regex;

lazy_static::lazy_static! {
    static ref TOKEN: Regex = Regex::new(r"\$\{([^}]+)\}").expect("valid token pattern");
    static ref SINGLE_TOKEN: Regex = Regex::new(r"^\$\{([^}]+)\}$").expect("valid token pattern");
}

/// A piece of a scanned template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Literal(&'a str),
    Expression {
        /// Text between the braces
        source: &'a str,
        /// Full token including `${` and `}`
        raw: &'a str,
    },
}

/// Cheap pre-check: templates without `${` are never evaluated
pub fn has_template(text: &str) -> bool {
    text.contains("${")
}

/// Expression body when the whole (already trimmed) text is exactly one token
pub fn single_expression(text: &str) -> Option<&str> {
    SINGLE_TOKEN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Split `text` into literal and expression segments, in order
pub fn scan(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in TOKEN.captures_iter(text) {
        let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Literal(&text[last..whole.start()]));
        }
        segments.push(Segment::Expression {
            source: body.as_str(),
            raw: whole.as_str(),
        });
        last = whole.end();
    }

    if last < text.len() {
        segments.push(Segment::Literal(&text[last..]));
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_expression() {
        assert_eq!(single_expression("${data.amount}"), Some("data.amount"));
        assert_eq!(single_expression("${a} ${b}"), None);
        assert_eq!(single_expression("Total: ${a}"), None);
        assert_eq!(single_expression("${}"), None);
    }

    #[test]
    fn test_scan_mixed() {
        let segments = scan("Hello ${user.name}, you owe ${data.amount}!");
        assert_eq!(
            segments,
            vec![
                Segment::Literal("Hello "),
                Segment::Expression {
                    source: "user.name",
                    raw: "${user.name}"
                },
                Segment::Literal(", you owe "),
                Segment::Expression {
                    source: "data.amount",
                    raw: "${data.amount}"
                },
                Segment::Literal("!"),
            ]
        );
    }

    #[test]
    fn test_scan_stops_at_first_brace() {
        let segments = scan("${ {a: 1}.a }");
        assert_eq!(
            segments,
            vec![
                Segment::Expression {
                    source: " {a: 1",
                    raw: "${ {a: 1}"
                },
                Segment::Literal(".a }"),
            ]
        );
    }

    #[test]
    fn test_scan_keeps_unclosed_and_empty_tokens_literal() {
        assert_eq!(scan("${} and ${open"), vec![Segment::Literal("${} and ${open")]);
        assert!(has_template("${open"));
        assert!(!has_template("$ {x}"));
    }
}
