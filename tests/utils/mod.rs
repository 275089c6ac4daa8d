use std::fs::File;
use std::io::Read;
use std::path::Path;

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until};
use nom::character::complete::{anychar, char, newline};
use nom::combinator::{all_consuming, map, peek, recognize, rest, value};
use nom::multi::{many0_count, many1_count, many_till};
use nom::sequence::{delimited, terminated, tuple};
use nom::{error, Finish, IResult, Parser};

use sqlbatcher::{qualify, rewrite, StatementKind};

#[derive(Debug, PartialEq, Eq)]
pub enum Expected<'a> {
    Sql(&'a str),
    /// `line L, column C` of the parse error
    Error(&'a str),
}

pub struct TestCase<'a> {
    kind: StatementKind,
    query: &'a str,
    expected: Expected<'a>,
}

pub fn test(kind: StatementKind, query: &str, expected: &Expected) {
    match expected {
        Expected::Sql(sql) => {
            assert!(qualify(query, kind), "Qualify");
            match rewrite(query, kind) {
                Ok(rewritten) => assert_eq!(rewritten, *sql, "Rewritten SQL"),
                Err(err) => panic!("Rewrite failed: {}", err),
            }
        }
        Expected::Error(location) => {
            assert!(!qualify(query, kind), "Qualify");
            match rewrite(query, kind) {
                Ok(rewritten) => panic!("Rewritten to {}", rewritten),
                Err(err) => assert_eq!(
                    format!("line {}, column {}", err.line, err.column),
                    *location,
                    "Error location"
                ),
            }
        }
    }
}

pub fn run_test_file(path: &Path) {
    let mut file = File::open(path).unwrap();
    let mut contents = String::new();
    file.read_to_string(&mut contents).unwrap();
    let test_case = parse_test_case(&contents);
    test(test_case.kind, test_case.query, &test_case.expected);
}

fn parse_test_case(input: &str) -> TestCase {
    let (_, result) = test_case(input).finish().unwrap();
    result
}

fn test_case(input: &str) -> IResult<&str, TestCase> {
    all_consuming(map(
        tuple((
            initial,
            section("kind", statement_kind),
            section("query", section_content),
            alt((
                map(section("expected sql", section_content), |sql| {
                    Expected::Sql(sql.trim())
                }),
                map(section("expected error", section_content), |location| {
                    Expected::Error(location.trim())
                }),
            )),
        )),
        |(_, kind, query, expected)| TestCase {
            kind,
            query: query.trim(),
            expected,
        },
    ))(input)
}

fn initial(input: &str) -> IResult<&str, ()> {
    value((), many_till(anychar, peek(section_heading("kind"))))(input)
}

fn section<'a, O, F>(
    section_name: &'static str,
    content: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: Parser<&'a str, O, error::Error<&'a str>> + Copy,
{
    move |input: &'a str| {
        delimited(section_heading(section_name), content, many0_count(newline))(input)
    }
}

fn section_heading(section_name: &'static str) -> impl FnMut(&str) -> IResult<&str, ()> {
    move |input: &str| {
        value(
            (),
            tuple((
                tag("--- "),
                tag(section_name),
                tag(" ---"),
                many1_count(char('-')),
                many1_count(newline),
            )),
        )(input)
    }
}

fn section_content(input: &str) -> IResult<&str, &str> {
    alt((recognize(tuple((take_until("\n--- "), newline))), rest))(input)
}

fn statement_kind(input: &str) -> IResult<&str, StatementKind> {
    terminated(
        alt((
            value(StatementKind::Insert, tag("insert")),
            value(StatementKind::Upsert, tag("upsert")),
            value(StatementKind::Update, tag("update")),
        )),
        newline,
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_test_case_minimal() {
        let case = parse_test_case(
            "--- kind ---------

update

--- query ---------

update t set a = ?

--- expected error ---------

line 1, column 19
",
        );
        assert_eq!(case.kind, StatementKind::Update);
        assert_eq!(case.query, "update t set a = ?");
        assert_eq!(case.expected, Expected::Error("line 1, column 19"));
    }

    #[test]
    fn test_parse_test_case_maximal() {
        let case = parse_test_case(
            "
--- initial stuff
is ignored
--- kind ---------

insert

--- query ---------

insert into t (a)
values (?)

--- expected sql ---------

INSERT INTO t (a) SELECT unnest(?) AS a
",
        );
        assert_eq!(case.kind, StatementKind::Insert);
        assert_eq!(case.query, "insert into t (a)\nvalues (?)");
        assert_eq!(
            case.expected,
            Expected::Sql("INSERT INTO t (a) SELECT unnest(?) AS a")
        );
    }
}
