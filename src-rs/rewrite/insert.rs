use super::stack::{Fragment, FragmentStack, StackError};
use super::walk::{InsertListener, Listener};
use super::Rewrite;
use crate::ast;
use crate::parser::Keyword;

/// Turns a single-row `INSERT` / `UPSERT ... VALUES` into
/// `... SELECT unnest(?) AS col, ...` over one array per parameter.
pub struct InsertRewriter<'a> {
    verb: Keyword,
    stack: FragmentStack,
    table: String,
    columns: Vec<&'a str>,
    values: Vec<Fragment>,
    on_conflict: Option<String>,
    parameters: usize,
}

impl<'a> InsertRewriter<'a> {
    pub fn new(verb: Keyword) -> Self {
        InsertRewriter {
            verb,
            stack: FragmentStack::new(),
            table: String::new(),
            columns: Vec::new(),
            values: Vec::new(),
            on_conflict: None,
            parameters: 0,
        }
    }

    pub fn finish(self) -> Result<Rewrite, StackError> {
        self.stack.ensure_empty("insert")?;
        if self.values.len() != self.columns.len() {
            return Err(StackError::Leftover {
                rule: "insert",
                stack: self.values,
            });
        }

        let mut atoms = Vec::with_capacity(self.values.len());
        for (column, value) in self.columns.iter().zip(self.values) {
            atoms.push(render_atom(column, value)?);
        }

        let mut sql = format!(
            "{} INTO {} ({}) SELECT {}",
            self.verb,
            self.table,
            self.columns.join(", "),
            atoms.join(", ")
        );
        if let Some(on_conflict) = self.on_conflict {
            sql.push(' ');
            sql.push_str(&on_conflict);
        }
        Ok(Rewrite {
            sql,
            parameter_count: self.parameters,
        })
    }
}

// Placeholders become one array element per row, anything else is the same
// value for every row and passes through as written.
fn render_atom(column: &str, value: Fragment) -> Result<String, StackError> {
    let rendered = match &value {
        Fragment::Placeholder { .. } => value
            .clone()
            .into_operand()
            .map(|operand| format!("{} AS {}", operand, column)),
        _ => value.clone().into_operand(),
    };
    rendered.ok_or(StackError::TypeMismatch {
        rule: "value_list",
        expected: "expression",
        found: value,
        stack: Vec::new(),
    })
}

impl<'a> Listener<'a> for InsertRewriter<'a> {
    fn stack(&mut self) -> &mut FragmentStack {
        &mut self.stack
    }

    fn exit_placeholder(&mut self) -> Result<(), StackError> {
        self.parameters += 1;
        self.stack.push(Fragment::Placeholder { cast: None });
        Ok(())
    }
}

impl<'a> InsertListener<'a> for InsertRewriter<'a> {
    fn exit_table(&mut self, table: &ast::TableRef<'a>) {
        self.table = table.to_string();
    }

    fn exit_column(&mut self, column: &'a str) {
        self.columns.push(column);
    }

    fn exit_value_list(&mut self, count: usize) -> Result<(), StackError> {
        self.values = self.stack.pop_n(count, "value_list")?;
        Ok(())
    }

    fn exit_on_conflict(&mut self, on_conflict: &ast::OnConflict<'a>) {
        let target = match &on_conflict.target {
            ast::ConflictTarget::Columns(columns) => format!("({})", columns.join(", ")),
            ast::ConflictTarget::Constraint(name) => format!("ON CONSTRAINT {}", name),
        };
        self.on_conflict = Some(format!("ON CONFLICT {} DO NOTHING", target));
    }
}
