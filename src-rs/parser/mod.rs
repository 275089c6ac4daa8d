mod error;
mod expression;
mod insert;
mod keyword;
mod misc;
mod result;
mod token;
mod update;
mod utils;

use nom::combinator::{eof, opt};
use nom::sequence::preceded;
use nom::{Offset, Parser};
use nom_supreme::error::ErrorTree;
use nom_supreme::final_parser::final_parser;

use self::result::Result;
use self::token::{__, symbol};
use self::utils::terminated2;
use super::ast;

pub use self::error::ParseError;
pub use self::keyword::Keyword;
pub use self::token::{token_at, tokenize, Token, TokenKind};

// A whole statement: leading comments, the statement itself and at most
// one trailing semicolon.
fn complete<'a, O, P>(input: &'a str, parser: P) -> std::result::Result<O, ParseError>
where
    P: Parser<&'a str, O, ErrorTree<&'a str>>,
{
    final_parser(terminated2(preceded(__, parser), opt(symbol(";")), eof))(input)
        .map_err(|tree: ErrorTree<&str>| ParseError::from_tree(input, &tree))
}

fn check_arity(input: &str, columns: &[&str], values: &ast::ValueList) -> std::result::Result<(), ParseError> {
    if columns.len() == values.atoms.len() {
        return Ok(());
    }
    Err(ParseError::with_message(
        input,
        input.offset(values.span),
        format!(
            "{} columns but {} values in VALUES list",
            columns.len(),
            values.atoms.len()
        ),
    ))
}

pub fn parse_insert(input: &str) -> std::result::Result<ast::InsertStatement, ParseError> {
    let statement = complete(input, insert::insert)?;
    check_arity(input, &statement.columns, &statement.values)?;
    Ok(statement)
}

pub fn parse_upsert(input: &str) -> std::result::Result<ast::UpsertStatement, ParseError> {
    let statement = complete(input, insert::upsert)?;
    check_arity(input, &statement.columns, &statement.values)?;
    Ok(statement)
}

pub fn parse_update(input: &str) -> std::result::Result<ast::UpdateStatement, ParseError> {
    complete(input, update::update)
}
