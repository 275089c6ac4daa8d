use super::{Expression, TableRef};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetClause<'a> {
    pub column: &'a str,
    pub value: Expression<'a>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WhereClause<'a> {
    pub predicate: Expression<'a>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateStatement<'a> {
    pub table: TableRef<'a>,
    pub set: Vec<SetClause<'a>>,
    pub where_: WhereClause<'a>,
}
