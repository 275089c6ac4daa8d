use nom::branch::alt;
use nom::combinator::{map, opt};
use nom::multi::many0;
use nom::sequence::{pair, preceded};
use nom::Parser;
use nom_supreme::error::ErrorTree;

use super::Result;
use crate::ast;
use crate::parser::keyword::Keyword;
use crate::parser::misc::column_ref;
use crate::parser::token::{
    identifier, keyword, keyword_text, number, placeholder, string, symbol, type_name,
};
use crate::parser::utils::{binop, parenthesized, sep_by1, seq, unop};

pub fn literal(input: &str) -> Result<ast::Literal> {
    alt((
        map(keyword_text(Keyword::True), |text| ast::Literal {
            kind: ast::LiteralKind::Boolean,
            text,
        }),
        map(keyword_text(Keyword::False), |text| ast::Literal {
            kind: ast::LiteralKind::Boolean,
            text,
        }),
        map(keyword_text(Keyword::Null), |text| ast::Literal {
            kind: ast::LiteralKind::Null,
            text,
        }),
        map(number, |text| ast::Literal {
            kind: ast::LiteralKind::Number,
            text,
        }),
        map(string, |text| ast::Literal {
            kind: ast::LiteralKind::String,
            text,
        }),
    ))(input)
}

pub fn param(input: &str) -> Result<ast::Expression> {
    map(placeholder, |_| ast::Expression::Placeholder)(input)
}

// name ( [ arg, ... ] )
pub fn function_call<'a, P>(argument: P) -> impl FnMut(&'a str) -> Result<'a, ast::Expression<'a>>
where
    P: Parser<&'a str, ast::Expression<'a>, ErrorTree<&'a str>> + Copy,
{
    seq(
        (identifier, parenthesized(opt(sep_by1(",", argument)))),
        |(name, args)| ast::Expression::FunctionCall {
            name,
            args: args.unwrap_or_default(),
        },
    )
}

pub fn nested<'a, P>(inner: P) -> impl FnMut(&'a str) -> Result<'a, ast::Expression<'a>>
where
    P: Parser<&'a str, ast::Expression<'a>, ErrorTree<&'a str>>,
{
    map(parenthesized(inner), |expr| {
        ast::Expression::Nested(Box::new(expr))
    })
}

// expr [ :: type ]*
pub fn with_casts<'a, P>(mut inner: P) -> impl FnMut(&'a str) -> Result<'a, ast::Expression<'a>>
where
    P: Parser<&'a str, ast::Expression<'a>, ErrorTree<&'a str>>,
{
    let mut casts = many0(preceded(symbol("::"), type_name));
    move |input: &'a str| {
        let (input, expr) = inner.parse(input)?;
        let (input, types) = casts.parse(input)?;
        let expr = types
            .into_iter()
            .fold(expr, |expr, type_name| ast::Expression::Cast {
                expr: Box::new(expr),
                type_name,
            });
        Ok((input, expr))
    }
}

fn primary_expression(input: &str) -> Result<ast::Expression> {
    alt((
        param,
        map(literal, ast::Expression::Literal),
        function_call(expression),
        map(column_ref, ast::Expression::Identifier),
        nested(expression),
    ))(input)
}

fn cast_expression(input: &str) -> Result<ast::Expression> {
    with_casts(primary_expression)(input)
}

fn unary_operator(input: &str) -> Result<ast::UnaryOperator> {
    alt((
        map(symbol("+"), |_| ast::UnaryOperator::Plus),
        map(symbol("-"), |_| ast::UnaryOperator::Minus),
    ))(input)
}

fn unary_expression(input: &str) -> Result<ast::Expression> {
    unop(unary_operator, cast_expression, |op, expr| {
        ast::Expression::Unary {
            op,
            expr: Box::new(expr),
        }
    })(input)
}

fn arithmetic<'a>(
    lhs: ast::Expression<'a>,
    op: ast::ArithmeticOperator,
    rhs: ast::Expression<'a>,
) -> ast::Expression<'a> {
    ast::Expression::Arithmetic {
        lhs: Box::new(lhs),
        op,
        rhs: Box::new(rhs),
    }
}

fn mul_div_mod_expression(input: &str) -> Result<ast::Expression> {
    binop(
        alt((
            map(symbol("*"), |_| ast::ArithmeticOperator::Multiply),
            map(symbol("/"), |_| ast::ArithmeticOperator::Divide),
            map(symbol("%"), |_| ast::ArithmeticOperator::Modulo),
        )),
        unary_expression,
        arithmetic,
    )(input)
}

fn add_sub_expression(input: &str) -> Result<ast::Expression> {
    binop(
        alt((
            map(symbol("+"), |_| ast::ArithmeticOperator::Add),
            map(symbol("-"), |_| ast::ArithmeticOperator::Subtract),
        )),
        mul_div_mod_expression,
        arithmetic,
    )(input)
}

fn comparison_operator(input: &str) -> Result<ast::ComparisonOperator> {
    use ast::ComparisonOperator::*;
    alt((
        map(symbol(">="), |_| GreaterOrEqual),
        map(symbol("<="), |_| LessOrEqual),
        map(symbol("!="), |_| NotEqual),
        map(symbol("<>"), |_| NotEqual),
        map(symbol("="), |_| Equal),
        map(symbol("<"), |_| Less),
        map(symbol(">"), |_| Greater),
    ))(input)
}

// Comparisons do not chain: a = b = c is rejected
fn comparison_expression(input: &str) -> Result<ast::Expression> {
    seq(
        (
            add_sub_expression,
            opt(pair(comparison_operator, add_sub_expression)),
        ),
        |(lhs, rhs)| match rhs {
            Some((op, rhs)) => ast::Expression::Comparison {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            },
            None => lhs,
        },
    )(input)
}

// expr IS [ NOT ] NULL
fn is_null_expression(input: &str) -> Result<ast::Expression> {
    seq(
        (
            comparison_expression,
            many0(preceded(
                keyword(Keyword::Is),
                seq(
                    (opt(keyword(Keyword::Not)), keyword(Keyword::Null)),
                    |(not, _)| not.is_some(),
                ),
            )),
        ),
        |(expr, tests)| {
            tests
                .into_iter()
                .fold(expr, |expr, negated| ast::Expression::IsNull {
                    expr: Box::new(expr),
                    negated,
                })
        },
    )(input)
}

fn logical<'a>(
    lhs: ast::Expression<'a>,
    op: ast::LogicalOperator,
    rhs: ast::Expression<'a>,
) -> ast::Expression<'a> {
    ast::Expression::Logical {
        lhs: Box::new(lhs),
        op,
        rhs: Box::new(rhs),
    }
}

fn and_expression(input: &str) -> Result<ast::Expression> {
    binop(
        map(keyword(Keyword::And), |_| ast::LogicalOperator::And),
        is_null_expression,
        logical,
    )(input)
}

fn xor_expression(input: &str) -> Result<ast::Expression> {
    binop(
        map(keyword(Keyword::Xor), |_| ast::LogicalOperator::Xor),
        and_expression,
        logical,
    )(input)
}

pub fn expression(input: &str) -> Result<ast::Expression> {
    binop(
        map(keyword(Keyword::Or), |_| ast::LogicalOperator::Or),
        xor_expression,
        logical,
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expression;

    fn parse(input: &str) -> Expression {
        match expression(input) {
            Ok(("", expr)) => expr,
            Ok((rest, _)) => panic!("unparsed input: {}", rest),
            Err(err) => panic!("failed to parse {}: {:?}", input, err),
        }
    }

    #[test]
    fn test_precedence() {
        match parse("a + ? * 2 >= 0 and b is not null") {
            Expression::Logical { lhs, op, rhs } => {
                assert_eq!(op, ast::LogicalOperator::And);
                assert!(matches!(*lhs, Expression::Comparison { .. }));
                assert!(matches!(*rhs, Expression::IsNull { negated: true, .. }));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_left_associative() {
        match parse("a - b - c") {
            Expression::Arithmetic { lhs, rhs, .. } => {
                assert!(matches!(*lhs, Expression::Arithmetic { .. }));
                assert!(matches!(*rhs, Expression::Identifier(_)));
            }
            other => panic!("unexpected tree: {:?}", other),
        }
    }

    #[test]
    fn test_cast_and_unary() {
        assert_eq!(
            parse("-?::int"),
            Expression::Unary {
                op: ast::UnaryOperator::Minus,
                expr: Box::new(Expression::Cast {
                    expr: Box::new(Expression::Placeholder),
                    type_name: "int",
                }),
            }
        );
    }

    #[test]
    fn test_function_call() {
        assert_eq!(
            parse("clock_timestamp()"),
            Expression::FunctionCall {
                name: "clock_timestamp",
                args: vec![],
            }
        );
        assert_eq!(
            parse("with_min_timestamp(?, ?)"),
            Expression::FunctionCall {
                name: "with_min_timestamp",
                args: vec![Expression::Placeholder, Expression::Placeholder],
            }
        );
    }

    #[test]
    fn test_literal_text_is_kept() {
        assert_eq!(
            parse("FaLsE"),
            Expression::Literal(ast::Literal {
                kind: ast::LiteralKind::Boolean,
                text: "FaLsE",
            })
        );
    }

    #[test]
    fn test_comparison_does_not_chain() {
        assert!(matches!(expression("a = b = c"), Ok(("= c", _))));
    }
}
