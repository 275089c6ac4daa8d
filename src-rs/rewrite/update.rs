use super::stack::{Fragment, FragmentStack, StackError};
use super::walk::{Listener, UpdateListener};
use super::Rewrite;
use crate::ast;

/// Turns `UPDATE t SET ... WHERE ...` into an update joined against a
/// derived table that unnests one array per placeholder:
///
/// ```text
/// UPDATE t SET a = dt.p1 FROM (SELECT unnest(?) AS p1, unnest(?) AS p2) AS dt WHERE t.id = dt.p2
/// ```
///
/// Bare column references are qualified with the table name so they cannot
/// be confused with the derived table's columns.
pub struct UpdateRewriter<'s> {
    derived_alias: &'s str,
    parameter_prefix: &'s str,
    stack: FragmentStack,
    table: String,
    assignments: Vec<String>,
    predicate: Option<String>,
    // Bind order of the arrays, which is the order the placeholders appear in
    parameters: Vec<String>,
}

impl<'s> UpdateRewriter<'s> {
    pub fn new(derived_alias: &'s str, parameter_prefix: &'s str) -> Self {
        UpdateRewriter {
            derived_alias,
            parameter_prefix,
            stack: FragmentStack::new(),
            table: String::new(),
            assignments: Vec::new(),
            predicate: None,
            parameters: Vec::new(),
        }
    }

    pub fn finish(self) -> Result<Rewrite, StackError> {
        self.stack.ensure_empty("update")?;
        let predicate = self.predicate.ok_or(StackError::Underflow {
            rule: "where",
            stack: Vec::new(),
        })?;

        let mut sql = format!("UPDATE {} SET {}", self.table, self.assignments.join(", "));
        if !self.parameters.is_empty() {
            let columns: Vec<String> = self
                .parameters
                .iter()
                .map(|name| format!("unnest(?) AS {}", name))
                .collect();
            sql.push_str(&format!(
                " FROM (SELECT {}) AS {}",
                columns.join(", "),
                self.derived_alias
            ));
        }
        sql.push_str(" WHERE ");
        sql.push_str(&predicate);

        Ok(Rewrite {
            sql,
            parameter_count: self.parameters.len(),
        })
    }
}

impl<'a, 's> Listener<'a> for UpdateRewriter<'s> {
    fn stack(&mut self) -> &mut FragmentStack {
        &mut self.stack
    }

    fn exit_placeholder(&mut self) -> Result<(), StackError> {
        let name = format!("{}{}", self.parameter_prefix, self.parameters.len() + 1);
        self.stack
            .push(Fragment::Expr(format!("{}.{}", self.derived_alias, name)));
        self.parameters.push(name);
        Ok(())
    }

    fn exit_identifier(&mut self, identifier: &ast::Identifier<'a>) -> Result<(), StackError> {
        let rendered = match identifier.qualifier {
            Some(_) => identifier.to_string(),
            None => format!("{}.{}", self.table, identifier.name),
        };
        self.stack.push(Fragment::Expr(rendered));
        Ok(())
    }
}

impl<'a, 's> UpdateListener<'a> for UpdateRewriter<'s> {
    fn exit_table(&mut self, table: &ast::TableRef<'a>) {
        self.table = table.to_string();
    }

    fn exit_set_clause(&mut self) -> Result<(), StackError> {
        let value = self.stack.pop_operand("set_clause")?;
        let column = self.stack.pop_name("set_clause")?;
        self.assignments.push(format!("{} = {}", column, value));
        Ok(())
    }

    fn exit_where(&mut self) -> Result<(), StackError> {
        self.predicate = Some(self.stack.pop_operand("where")?);
        Ok(())
    }
}
