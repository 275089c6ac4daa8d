use super::Result;
use crate::ast;
use crate::parser::expression::expression;
use crate::parser::keyword::Keyword;
use crate::parser::misc::table_ref;
use crate::parser::token::{identifier, keyword, symbol};
use crate::parser::utils::{sep_by1, seq};
use nom::combinator::map;
use nom::sequence::preceded;

// column = expression
fn set_clause(input: &str) -> Result<ast::SetClause> {
    seq(
        (identifier, symbol("="), expression),
        |(column, _, value)| ast::SetClause { column, value },
    )(input)
}

fn where_clause(input: &str) -> Result<ast::WhereClause> {
    map(preceded(keyword(Keyword::Where), expression), |predicate| {
        ast::WhereClause { predicate }
    })(input)
}

pub fn update(input: &str) -> Result<ast::UpdateStatement> {
    seq(
        (
            preceded(keyword(Keyword::Update), table_ref),
            preceded(keyword(Keyword::Set), sep_by1(",", set_clause)),
            where_clause,
        ),
        |(table, set, where_)| ast::UpdateStatement { table, set, where_ },
    )(input)
}
