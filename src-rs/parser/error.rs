use std::fmt;

use nom::error::ErrorKind;
use nom::Offset;
use nom_supreme::error::{BaseErrorKind, ErrorTree, Expectation, GenericErrorTree};
use serde::Serialize;

use super::token::token_at;

/// A statement that falls outside of the rewritable grammar. Parsing stops
/// at the first violation, so this always describes the furthest point the
/// parser reached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub message: String,
    /// Text of the offending token, `None` at end of input
    pub token: Option<String>,
    pub position: usize,
    pub line: usize,
    pub column: usize,
    pub expected: Vec<String>,
}

impl ParseError {
    pub fn new(input: &str, position: usize, expected: Vec<String>) -> ParseError {
        let token = offending_token(input, position);
        let message = match &token {
            Some(token) => format!("unexpected '{}'", token),
            None => "unexpected end of input".to_string(),
        };
        Self::build(input, position, token, message, expected)
    }

    pub fn with_message(input: &str, position: usize, message: impl Into<String>) -> ParseError {
        let token = offending_token(input, position);
        Self::build(input, position, token, message.into(), Vec::new())
    }

    pub fn unrecognized(input: &str, position: usize) -> ParseError {
        let token = input[position..].chars().next().map(String::from);
        let message = match &token {
            Some(c) => format!("unrecognized character '{}'", c),
            None => "unexpected end of input".to_string(),
        };
        Self::build(input, position, token, message, Vec::new())
    }

    pub fn from_tree(input: &str, tree: &ErrorTree<&str>) -> ParseError {
        let mut furthest = 0;
        let mut expected = Vec::new();
        collect_expectations(input, tree, &mut furthest, &mut expected);
        ParseError::new(input, furthest, expected)
    }

    fn build(
        input: &str,
        position: usize,
        token: Option<String>,
        message: String,
        expected: Vec<String>,
    ) -> ParseError {
        let before = &input[..position];
        let line = before.matches('\n').count() + 1;
        let column = match before.rfind('\n') {
            Some(newline) => before[newline + 1..].chars().count() + 1,
            None => before.chars().count() + 1,
        };
        ParseError {
            message,
            token,
            position,
            line,
            column,
            expected,
        }
    }
}

fn offending_token(input: &str, position: usize) -> Option<String> {
    match token_at(input, position) {
        Some(token) => Some(token.text.to_string()),
        None => input
            .get(position..)
            .and_then(|rest| rest.trim_start().chars().next())
            .map(String::from),
    }
}

fn describe(kind: &BaseErrorKind<&'static str, Box<dyn std::error::Error + Send + Sync>>) -> Option<String> {
    match kind {
        BaseErrorKind::Expected(Expectation::Tag(tag)) => Some(tag.to_string()),
        BaseErrorKind::Expected(Expectation::Char(c)) => Some(c.to_string()),
        BaseErrorKind::Expected(Expectation::Eof) => Some("end of input".to_string()),
        BaseErrorKind::Expected(Expectation::Alpha) => Some("identifier".to_string()),
        BaseErrorKind::Expected(Expectation::Digit) => Some("number".to_string()),
        BaseErrorKind::Kind(ErrorKind::Eof) => Some("end of input".to_string()),
        BaseErrorKind::Kind(ErrorKind::Alpha) | BaseErrorKind::Kind(ErrorKind::Verify) => {
            Some("identifier".to_string())
        }
        BaseErrorKind::Kind(ErrorKind::Digit) => Some("number".to_string()),
        _ => None,
    }
}

fn collect_expectations<'a>(
    input: &'a str,
    tree: &ErrorTree<&'a str>,
    furthest: &mut usize,
    expected: &mut Vec<String>,
) {
    match tree {
        GenericErrorTree::Base { location, kind } => {
            // A keyword running into an identifier character is reported at
            // the start of the word, by the alternatives that tried it.
            if let BaseErrorKind::Kind(ErrorKind::Not) = kind {
                return;
            }
            let position = input.offset(location);
            if position > *furthest {
                *furthest = position;
                expected.clear();
            }
            if position == *furthest {
                if let Some(description) = describe(kind) {
                    if !expected.contains(&description) {
                        expected.push(description);
                    }
                }
            }
        }
        GenericErrorTree::Stack { base, .. } => {
            collect_expectations(input, base, furthest, expected)
        }
        GenericErrorTree::Alt(siblings) => {
            for sibling in siblings {
                collect_expectations(input, sibling, furthest, expected);
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}",
            self.message, self.line, self.column
        )?;
        if !self.expected.is_empty() {
            write!(f, ", expected one of: {}", self.expected.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_and_column() {
        let err = ParseError::new("update t\nset a = ", 17, vec!["?".to_string()]);
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 9);
        assert_eq!(err.token, None);
        assert_eq!(
            err.to_string(),
            "unexpected end of input at line 2, column 9, expected one of: ?"
        );
    }

    #[test]
    fn test_offending_token() {
        let err = ParseError::new("insert into t (a) values (?, ?)", 25, Vec::new());
        assert_eq!(err.token.as_deref(), Some("("));
        assert_eq!(err.message, "unexpected '('");
    }

    #[test]
    fn test_serialize() {
        let err = ParseError::with_message("delete", 0, "not a rewritable statement");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["token"], "delete");
        assert_eq!(json["message"], "not a rewritable statement");
        assert_eq!(json["column"], 1);
    }
}
