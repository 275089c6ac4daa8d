use super::Result;
use crate::ast;
use crate::parser::token::{identifier, symbol};
use crate::parser::utils::{list_of1, seq};
use nom::combinator::opt;
use nom::sequence::preceded;

// (name1, name2, ...)
pub fn identifier_list(input: &str) -> Result<Vec<&str>> {
    list_of1(identifier)(input)
}

// [ schema . ] table
pub fn table_ref(input: &str) -> Result<ast::TableRef> {
    seq(
        (identifier, opt(preceded(symbol("."), identifier))),
        |(id1, id2)| match id2 {
            Some(table) => ast::TableRef {
                schema: Some(id1),
                table,
            },
            None => ast::TableRef {
                schema: None,
                table: id1,
            },
        },
    )(input)
}

// [ table . ] column
pub fn column_ref(input: &str) -> Result<ast::Identifier> {
    seq(
        (identifier, opt(preceded(symbol("."), identifier))),
        |(id1, id2)| match id2 {
            Some(name) => ast::Identifier {
                qualifier: Some(id1),
                name,
            },
            None => ast::Identifier {
                qualifier: None,
                name: id1,
            },
        },
    )(input)
}
