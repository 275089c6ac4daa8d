use nom::combinator::{cut, map};
use nom::error::ParseError;
use nom::multi::many0;
use nom::sequence::{delimited, terminated, tuple, Tuple};
use nom::{IResult, Parser};
use nom_supreme::error::ErrorTree;

use super::result::Result;
use super::token::symbol;
use crate::ast;

pub fn terminated2<I, O1, O2, O3, E, F, G, H>(
    first: F,
    second: G,
    third: H,
) -> impl FnMut(I) -> IResult<I, O1, E>
where
    E: ParseError<I>,
    F: Parser<I, O1, E>,
    G: Parser<I, O2, E>,
    H: Parser<I, O3, E>,
{
    terminated(first, terminated(second, third))
}

pub fn seq<I, Os, O, E, Parsers, F>(parsers: Parsers, f: F) -> impl FnMut(I) -> IResult<I, O, E>
where
    E: ParseError<I>,
    Parsers: Tuple<I, Os, E>,
    F: FnMut(Os) -> O,
{
    map(tuple(parsers), f)
}

pub fn sep_by1<'a, O, F>(sep: &'static str, parser: F) -> impl FnMut(&'a str) -> Result<Vec<O>>
where
    F: Parser<&'a str, O, ErrorTree<&'a str>> + Copy,
{
    seq(
        (
            parser,
            // A separator commits to another item, so a bad item is reported
            // where it starts instead of at the separator.
            many0(seq((symbol(sep), cut(parser)), |(_, value)| value)),
        ),
        |(first, mut rest)| {
            let mut result = Vec::with_capacity(rest.capacity() + 1);
            result.push(first);
            result.append(&mut rest);
            result
        },
    )
}

pub fn parenthesized<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> Result<O>
where
    F: Parser<&'a str, O, ErrorTree<&'a str>>,
{
    delimited(symbol("("), parser, symbol(")"))
}

pub fn list_of1<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> Result<Vec<O>>
where
    F: Parser<&'a str, O, ErrorTree<&'a str>> + Copy,
{
    parenthesized(sep_by1(",", parser))
}

// Left-associative chain of `next (op next)*`, folded with `build`
pub fn binop<'a, S, Op, P, B>(
    op: S,
    mut next: P,
    build: B,
) -> impl FnMut(&'a str) -> Result<'a, ast::Expression<'a>>
where
    S: Parser<&'a str, Op, ErrorTree<&'a str>>,
    P: Parser<&'a str, ast::Expression<'a>, ErrorTree<&'a str>> + Copy,
    B: Fn(ast::Expression<'a>, Op, ast::Expression<'a>) -> ast::Expression<'a>,
{
    let mut repeat = many0(tuple((op, next)));
    move |input: &'a str| {
        let (input, first) = next.parse(input)?;
        let (input, rest) = repeat.parse(input)?;
        let expr = rest
            .into_iter()
            .fold(first, |acc, (op, value)| build(acc, op, value));
        Ok((input, expr))
    }
}

// Prefix operators applied right to left: `- + x` is `-(+(x))`
pub fn unop<'a, S, Op, P, B>(
    op: S,
    mut next: P,
    build: B,
) -> impl FnMut(&'a str) -> Result<'a, ast::Expression<'a>>
where
    S: Parser<&'a str, Op, ErrorTree<&'a str>>,
    P: Parser<&'a str, ast::Expression<'a>, ErrorTree<&'a str>>,
    B: Fn(Op, ast::Expression<'a>) -> ast::Expression<'a>,
{
    let mut repeat = many0(op);
    move |input: &'a str| {
        let (input, ops) = repeat.parse(input)?;
        let (input, operand) = next.parse(input)?;
        let expr = ops
            .into_iter()
            .rev()
            .fold(operand, |acc, op| build(op, acc));
        Ok((input, expr))
    }
}
