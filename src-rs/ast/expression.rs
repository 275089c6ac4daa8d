use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiteralKind {
    Boolean,
    Null,
    Number,
    String,
}

/// A constant, kept exactly as written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Literal<'a> {
    pub kind: LiteralKind,
    pub text: &'a str,
}

// [ qualifier . ] name
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identifier<'a> {
    pub qualifier: Option<&'a str>,
    pub name: &'a str,
}

impl<'a> Display for Identifier<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.qualifier {
            Some(qualifier) => write!(f, "{}.{}", qualifier, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum UnaryOperator {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum ArithmeticOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
}

// `<>` is parsed as NotEqual
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum ComparisonOperator {
    #[strum(serialize = "=")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterOrEqual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
    Xor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression<'a> {
    Literal(Literal<'a>),
    Placeholder,
    Identifier(Identifier<'a>),
    FunctionCall {
        name: &'a str,
        args: Vec<Expression<'a>>,
    },
    Nested(Box<Expression<'a>>),
    Cast {
        expr: Box<Expression<'a>>,
        type_name: &'a str,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<Expression<'a>>,
    },
    Arithmetic {
        lhs: Box<Expression<'a>>,
        op: ArithmeticOperator,
        rhs: Box<Expression<'a>>,
    },
    Comparison {
        lhs: Box<Expression<'a>>,
        op: ComparisonOperator,
        rhs: Box<Expression<'a>>,
    },
    Logical {
        lhs: Box<Expression<'a>>,
        op: LogicalOperator,
        rhs: Box<Expression<'a>>,
    },
    IsNull {
        expr: Box<Expression<'a>>,
        negated: bool,
    },
}
