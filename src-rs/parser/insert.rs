use super::Result;
use crate::ast;
use crate::parser::expression::{function_call, literal, nested, param, with_casts};
use crate::parser::keyword::Keyword;
use crate::parser::misc::{identifier_list, table_ref};
use crate::parser::token::{identifier, keyword, keywords};
use crate::parser::utils::{list_of1, seq};
use nom::branch::alt;
use nom::combinator::{consumed, map, opt};
use nom::sequence::preceded;

// Atoms are deliberately narrower than UPDATE expressions: no operators and
// no column references, so every atom is either a parameter or a value that
// is the same for each row of the batch.
fn atom(input: &str) -> Result<ast::Expression> {
    with_casts(alt((
        param,
        map(literal, ast::Expression::Literal),
        function_call(atom),
        nested(atom),
    )))(input)
}

fn value_list(input: &str) -> Result<ast::ValueList> {
    map(consumed(list_of1(atom)), |(span, atoms)| ast::ValueList {
        atoms,
        span: span.trim_end(),
    })(input)
}

fn values(input: &str) -> Result<ast::ValueList> {
    preceded(keyword(Keyword::Values), value_list)(input)
}

fn conflict_target(input: &str) -> Result<ast::ConflictTarget> {
    alt((
        map(identifier_list, ast::ConflictTarget::Columns),
        map(
            preceded(keywords(&[Keyword::On, Keyword::Constraint]), identifier),
            ast::ConflictTarget::Constraint,
        ),
    ))(input)
}

fn on_conflict(input: &str) -> Result<ast::OnConflict> {
    seq(
        (
            keywords(&[Keyword::On, Keyword::Conflict]),
            conflict_target,
            keywords(&[Keyword::Do, Keyword::Nothing]),
        ),
        |(_, target, _)| ast::OnConflict { target },
    )(input)
}

pub fn insert(input: &str) -> Result<ast::InsertStatement> {
    seq(
        (
            preceded(keywords(&[Keyword::Insert, Keyword::Into]), table_ref),
            identifier_list,
            values,
            opt(on_conflict),
        ),
        |(table, columns, values, on_conflict)| ast::InsertStatement {
            table,
            columns,
            values,
            on_conflict,
        },
    )(input)
}

pub fn upsert(input: &str) -> Result<ast::UpsertStatement> {
    seq(
        (
            preceded(keywords(&[Keyword::Upsert, Keyword::Into]), table_ref),
            identifier_list,
            values,
        ),
        |(table, columns, values)| ast::UpsertStatement {
            table,
            columns,
            values,
        },
    )(input)
}
