mod ast;
mod batch;
mod connection;
mod error;
mod parser;
pub mod pg;
mod preprocess;
mod rewrite;
mod settings;
mod statement;
mod value;

pub use crate::batch::{BindingTable, ColumnAccumulator, ColumnBatch, ParameterRecord};
pub use crate::connection::{BatchOutcome, Connection, PreparedStatement, Stream};
pub use crate::error::Error;
pub use crate::parser::{tokenize, ParseError, Token, TokenKind};
pub use crate::rewrite::{qualify, rewrite, Rewrite, Rewriter, StatementKind};
pub use crate::settings::{RewriteSettings, RewriteSettingsBuilder};
pub use crate::statement::{BatchStatement, ProxyState};
pub use crate::value::{classify, ArrayValue, Blob, Clob, SqlType, SqlValue};
