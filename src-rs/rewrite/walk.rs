//! Post-order traversal of a parsed statement. Every node is reported to
//! the listener when it is exited, after all of its children, so a
//! composite node always finds its children's fragments on top of the
//! stack with the last child on top.

use std::fmt::Display;

use super::stack::{Fragment, FragmentStack, StackError};
use crate::ast;

type Result = std::result::Result<(), StackError>;

fn binary(stack: &mut FragmentStack, rule: &'static str, op: impl Display) -> Result {
    let rhs = stack.pop_operand(rule)?;
    let lhs = stack.pop_operand(rule)?;
    stack.push(Fragment::Expr(format!("{} {} {}", lhs, op, rhs)));
    Ok(())
}

/// Expression hooks. The provided methods re-render each node from the
/// fragments of its children.
pub trait Listener<'a> {
    fn stack(&mut self) -> &mut FragmentStack;

    fn exit_placeholder(&mut self) -> Result;

    fn exit_identifier(&mut self, identifier: &ast::Identifier<'a>) -> Result {
        self.stack().push(Fragment::Expr(identifier.to_string()));
        Ok(())
    }

    fn exit_literal(&mut self, literal: &ast::Literal<'a>) -> Result {
        self.stack().push(Fragment::Expr(literal.text.to_string()));
        Ok(())
    }

    fn exit_function_call(&mut self, name: &'a str, arity: usize) -> Result {
        let args = self.stack().pop_operands(arity, "function_call")?;
        self.stack()
            .push(Fragment::Expr(format!("{}({})", name, args.join(", "))));
        Ok(())
    }

    fn exit_nested(&mut self) -> Result {
        let inner = self.stack().pop_operand("nested")?;
        self.stack().push(Fragment::Expr(format!("({})", inner)));
        Ok(())
    }

    fn exit_cast(&mut self, type_name: &'a str) -> Result {
        match self.stack().pop("cast")? {
            Fragment::Placeholder { cast } => {
                let cast = match cast {
                    Some(cast) => format!("{}::{}", cast, type_name),
                    None => type_name.to_string(),
                };
                self.stack().push(Fragment::Placeholder { cast: Some(cast) });
            }
            other => {
                self.stack().push(other);
                let operand = self.stack().pop_operand("cast")?;
                self.stack()
                    .push(Fragment::Expr(format!("{}::{}", operand, type_name)));
            }
        }
        Ok(())
    }

    fn exit_unary(&mut self, op: ast::UnaryOperator) -> Result {
        let operand = self.stack().pop_operand("unary")?;
        // `- -x` must not collapse into a `--` line comment
        let separator = if operand.starts_with(&['-', '+'][..]) { " " } else { "" };
        self.stack()
            .push(Fragment::Expr(format!("{}{}{}", op, separator, operand)));
        Ok(())
    }

    fn exit_arithmetic(&mut self, op: ast::ArithmeticOperator) -> Result {
        binary(self.stack(), "arithmetic", op)
    }

    fn exit_comparison(&mut self, op: ast::ComparisonOperator) -> Result {
        binary(self.stack(), "comparison", op)
    }

    fn exit_logical(&mut self, op: ast::LogicalOperator) -> Result {
        binary(self.stack(), "logical", op)
    }

    fn exit_is_null(&mut self, negated: bool) -> Result {
        let operand = self.stack().pop_operand("is_null")?;
        let test = if negated { "IS NOT NULL" } else { "IS NULL" };
        self.stack()
            .push(Fragment::Expr(format!("{} {}", operand, test)));
        Ok(())
    }
}

pub trait InsertListener<'a>: Listener<'a> {
    fn exit_table(&mut self, table: &ast::TableRef<'a>);

    fn exit_column(&mut self, column: &'a str);

    /// Called once all `count` atoms of the VALUES list have been exited
    fn exit_value_list(&mut self, count: usize) -> Result;

    fn exit_on_conflict(&mut self, on_conflict: &ast::OnConflict<'a>);
}

pub trait UpdateListener<'a>: Listener<'a> {
    fn exit_table(&mut self, table: &ast::TableRef<'a>);

    fn exit_set_column(&mut self, column: &'a str) {
        self.stack().push(Fragment::Name(column.to_string()));
    }

    fn exit_set_clause(&mut self) -> Result;

    fn exit_where(&mut self) -> Result;
}

pub fn expression<'a, L>(listener: &mut L, expr: &ast::Expression<'a>) -> Result
where
    L: Listener<'a> + ?Sized,
{
    match expr {
        ast::Expression::Placeholder => listener.exit_placeholder(),
        ast::Expression::Literal(literal) => listener.exit_literal(literal),
        ast::Expression::Identifier(identifier) => listener.exit_identifier(identifier),
        ast::Expression::FunctionCall { name, args } => {
            for arg in args {
                expression(listener, arg)?;
            }
            listener.exit_function_call(*name, args.len())
        }
        ast::Expression::Nested(inner) => {
            expression(listener, inner)?;
            listener.exit_nested()
        }
        ast::Expression::Cast { expr, type_name } => {
            expression(listener, expr)?;
            listener.exit_cast(*type_name)
        }
        ast::Expression::Unary { op, expr } => {
            expression(listener, expr)?;
            listener.exit_unary(*op)
        }
        ast::Expression::Arithmetic { lhs, op, rhs } => {
            expression(listener, lhs)?;
            expression(listener, rhs)?;
            listener.exit_arithmetic(*op)
        }
        ast::Expression::Comparison { lhs, op, rhs } => {
            expression(listener, lhs)?;
            expression(listener, rhs)?;
            listener.exit_comparison(*op)
        }
        ast::Expression::Logical { lhs, op, rhs } => {
            expression(listener, lhs)?;
            expression(listener, rhs)?;
            listener.exit_logical(*op)
        }
        ast::Expression::IsNull { expr, negated } => {
            expression(listener, expr)?;
            listener.exit_is_null(*negated)
        }
    }
}

fn values_statement<'a, L: InsertListener<'a>>(
    listener: &mut L,
    table: &ast::TableRef<'a>,
    columns: &[&'a str],
    values: &ast::ValueList<'a>,
    on_conflict: Option<&ast::OnConflict<'a>>,
) -> Result {
    listener.exit_table(table);
    for column in columns {
        listener.exit_column(*column);
    }
    for atom in &values.atoms {
        expression(listener, atom)?;
    }
    listener.exit_value_list(values.atoms.len())?;
    if let Some(on_conflict) = on_conflict {
        listener.exit_on_conflict(on_conflict);
    }
    Ok(())
}

pub fn insert<'a, L: InsertListener<'a>>(
    listener: &mut L,
    statement: &ast::InsertStatement<'a>,
) -> Result {
    values_statement(
        listener,
        &statement.table,
        &statement.columns,
        &statement.values,
        statement.on_conflict.as_ref(),
    )
}

pub fn upsert<'a, L: InsertListener<'a>>(
    listener: &mut L,
    statement: &ast::UpsertStatement<'a>,
) -> Result {
    values_statement(
        listener,
        &statement.table,
        &statement.columns,
        &statement.values,
        None,
    )
}

pub fn update<'a, L: UpdateListener<'a>>(
    listener: &mut L,
    statement: &ast::UpdateStatement<'a>,
) -> Result {
    listener.exit_table(&statement.table);
    for clause in &statement.set {
        listener.exit_set_column(clause.column);
        expression(listener, &clause.value)?;
        listener.exit_set_clause()?;
    }
    expression(listener, &statement.where_.predicate)?;
    listener.exit_where()
}
