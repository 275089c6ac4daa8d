use nom::branch::alt;
use nom::bytes::complete::{is_not, take_until};
use nom::character::complete::{alpha1, alphanumeric1, char, digit1, multispace0, one_of, satisfy};
use nom::combinator::{map, not, opt, recognize, value, verify};
use nom::multi::many0_count;
use nom::sequence::{pair, preceded, terminated, tuple};
use nom::Offset;
use nom_supreme::tag::complete::{tag, tag_no_case};
use serde::Serialize;

use super::error::ParseError;
use super::keyword::{is_reserved_word, Keyword};
use super::Result;

// All token parser consume subsequent whitespace

fn comment_oneline(i: &str) -> Result<()> {
    value((), pair(tag("--"), opt(is_not("\n\r"))))(i)
}

fn comment_multiline(i: &str) -> Result<()> {
    value((), tuple((tag("/*"), take_until("*/"), tag("*/"))))(i)
}

pub(super) fn __(input: &str) -> Result<()> {
    value(
        (),
        tuple((
            multispace0,
            many0_count(alt((
                tuple((comment_oneline, multispace0)),
                tuple((comment_multiline, multispace0)),
            ))),
        )),
    )(input)
}

fn skip_whitespace(input: &str) -> &str {
    __(input).map(|(rest, _)| rest).unwrap_or(input)
}

#[test]
fn test_ws() {
    assert_eq!(
        __("-- foo
     -- foo foo
  /* bar

baz*/--quux
  next")
        .ok(),
        Some(("next", ()))
    );
    assert_eq!(__("--\nnext").ok(), Some(("next", ())));
}

fn identifier_char(input: &str) -> Result<char> {
    satisfy(|c| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn bare_word(input: &str) -> Result<&str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn quoted_word(input: &str) -> Result<&str> {
    recognize(tuple((
        char('"'),
        many0_count(alt((is_not("\""), tag("\"\"")))),
        char('"'),
    )))(input)
}

pub fn match_identifier(input: &str) -> Result<&str> {
    terminated(bare_word, __)(input)
}

// The keyword as written in the statement, e.g. `false` for Keyword::False
pub fn keyword_text<'a>(word: Keyword) -> impl FnMut(&'a str) -> Result<'a, &'a str> {
    move |input| {
        terminated(
            recognize(pair(
                tag_no_case(<&'static str>::from(word)),
                not(identifier_char),
            )),
            __,
        )(input)
    }
}

pub fn keyword<'a>(word: Keyword) -> impl FnMut(&'a str) -> Result<'a, ()> {
    value((), keyword_text(word))
}

pub fn keywords<'a>(words: &'static [Keyword]) -> impl FnMut(&'a str) -> Result<'a, ()> {
    move |mut input| {
        for word in words {
            let (rest, _) = keyword(*word)(input)?;
            input = rest;
        }
        Ok((input, ()))
    }
}

fn unquoted_identifier(input: &str) -> Result<&str> {
    verify(match_identifier, |identifier: &str| {
        !is_reserved_word(identifier)
    })(input)
}

fn quoted_identifier(input: &str) -> Result<&str> {
    terminated(quoted_word, __)(input)
}

pub fn identifier(input: &str) -> Result<&str> {
    alt((quoted_identifier, unquoted_identifier))(input)
}

pub fn symbol<'a>(s: &'static str) -> impl FnMut(&'a str) -> Result<'a, &'a str> {
    terminated(tag(s), __)
}

pub fn number(input: &str) -> Result<&str> {
    terminated(
        alt((
            recognize(tuple((
                digit1,
                opt(preceded(char('.'), digit1)),
                opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            ))),
            recognize(tuple((
                char('.'),
                digit1,
                opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
            ))),
        )),
        __,
    )(input)
}

pub fn string(input: &str) -> Result<&str> {
    terminated(
        recognize(tuple((
            char('\''),
            many0_count(alt((is_not("'"), tag("''")))),
            char('\''),
        ))),
        __,
    )(input)
}

pub fn placeholder(input: &str) -> Result<&str> {
    symbol("?")(input)
}

// int, varchar(255) is out of grammar, int[] is not
pub fn type_name(input: &str) -> Result<&str> {
    terminated(
        recognize(pair(alt((bare_word, quoted_word)), opt(tag("[]")))),
        __,
    )(input)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Keyword,
    Identifier,
    Number,
    String,
    Placeholder,
    Operator,
    Punctuation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset into the statement text
    pub position: usize,
}

fn word(input: &str) -> Result<(TokenKind, &str)> {
    alt((
        map(quoted_identifier, |text| (TokenKind::Identifier, text)),
        map(match_identifier, |text| {
            if is_reserved_word(text) {
                (TokenKind::Keyword, text)
            } else {
                (TokenKind::Identifier, text)
            }
        }),
    ))(input)
}

fn operator(input: &str) -> Result<&str> {
    alt((
        symbol("::"),
        symbol(">="),
        symbol("<="),
        symbol("!="),
        symbol("<>"),
        symbol("+"),
        symbol("-"),
        symbol("*"),
        symbol("/"),
        symbol("%"),
        symbol("="),
        symbol("<"),
        symbol(">"),
    ))(input)
}

fn punctuation(input: &str) -> Result<&str> {
    alt((symbol("("), symbol(")"), symbol(","), symbol("."), symbol(";")))(input)
}

fn next_token(input: &str) -> Result<(TokenKind, &str)> {
    alt((
        map(string, |text| (TokenKind::String, text)),
        map(number, |text| (TokenKind::Number, text)),
        map(placeholder, |text| (TokenKind::Placeholder, text)),
        word,
        map(operator, |text| (TokenKind::Operator, text)),
        map(punctuation, |text| (TokenKind::Punctuation, text)),
    ))(input)
}

/// Splits a statement into tokens, skipping whitespace and comments.
pub fn tokenize(input: &str) -> std::result::Result<Vec<Token<'_>>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = skip_whitespace(input);
    while !rest.is_empty() {
        match next_token(rest) {
            Ok((remaining, (kind, text))) => {
                tokens.push(Token {
                    kind,
                    text,
                    position: input.offset(text),
                });
                rest = remaining;
            }
            Err(_) => return Err(ParseError::unrecognized(input, input.offset(rest))),
        }
    }
    Ok(tokens)
}

/// The token starting at (or after whitespace following) `position`, if any.
pub fn token_at(input: &str, position: usize) -> Option<Token<'_>> {
    let rest = skip_whitespace(input.get(position..)?);
    if rest.is_empty() {
        return None;
    }
    next_token(rest).ok().map(|(_, (kind, text))| Token {
        kind,
        text,
        position: input.offset(text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, &str)> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect()
    }

    #[test]
    fn test_tokenize_insert() {
        assert_eq!(
            kinds("INSERT into t (a, \"B\") values (?, 'it''s', 1.5e3) -- done"),
            vec![
                (TokenKind::Keyword, "INSERT"),
                (TokenKind::Keyword, "into"),
                (TokenKind::Identifier, "t"),
                (TokenKind::Punctuation, "("),
                (TokenKind::Identifier, "a"),
                (TokenKind::Punctuation, ","),
                (TokenKind::Identifier, "\"B\""),
                (TokenKind::Punctuation, ")"),
                (TokenKind::Keyword, "values"),
                (TokenKind::Punctuation, "("),
                (TokenKind::Placeholder, "?"),
                (TokenKind::Punctuation, ","),
                (TokenKind::String, "'it''s'"),
                (TokenKind::Punctuation, ","),
                (TokenKind::Number, "1.5e3"),
                (TokenKind::Punctuation, ")"),
            ]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("a>=b<>c::int"),
            vec![
                (TokenKind::Identifier, "a"),
                (TokenKind::Operator, ">="),
                (TokenKind::Identifier, "b"),
                (TokenKind::Operator, "<>"),
                (TokenKind::Identifier, "c"),
                (TokenKind::Operator, "::"),
                (TokenKind::Identifier, "int"),
            ]
        );
    }

    #[test]
    fn test_token_positions() {
        let tokens = tokenize("  update  t").unwrap();
        assert_eq!(tokens[0].position, 2);
        assert_eq!(tokens[1].position, 10);
    }

    #[test]
    fn test_tokenize_rejects_unknown_character() {
        let err = tokenize("select # from t").unwrap_err();
        assert_eq!(err.position, 7);
        assert_eq!(err.token.as_deref(), Some("#"));
    }

    #[test]
    fn test_token_at() {
        let sql = "insert into t";
        assert_eq!(token_at(sql, 6).map(|t| t.text), Some("into"));
        assert_eq!(token_at(sql, sql.len()), None);
    }

    #[test]
    fn test_keyword_needs_word_boundary() {
        assert!(keyword(Keyword::Or)("order").is_err());
        assert_eq!(keyword(Keyword::Or)("OR x").ok(), Some(("x", ())));
    }
}
