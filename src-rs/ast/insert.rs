use super::{Expression, TableRef};

/// The parenthesized atoms of a single-row VALUES clause
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueList<'a> {
    pub atoms: Vec<Expression<'a>>,
    /// Source text of the list, parentheses included
    pub span: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConflictTarget<'a> {
    Columns(Vec<&'a str>),
    Constraint(&'a str),
}

// ON CONFLICT ... DO NOTHING is the only supported action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OnConflict<'a> {
    pub target: ConflictTarget<'a>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertStatement<'a> {
    pub table: TableRef<'a>,
    pub columns: Vec<&'a str>,
    pub values: ValueList<'a>,
    pub on_conflict: Option<OnConflict<'a>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpsertStatement<'a> {
    pub table: TableRef<'a>,
    pub columns: Vec<&'a str>,
    pub values: ValueList<'a>,
}
