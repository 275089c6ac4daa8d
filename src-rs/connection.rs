//! The database client the batch statement sits in front of.

use std::any::Any;
use std::fmt;
use std::io::Read;

use async_trait::async_trait;

use crate::error::Error;
use crate::value::{ArrayValue, SqlValue};

/// Per-row result of a batch execution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The row was executed but its row count is unknown
    SuccessNoInfo,
    Updated(u64),
    Failed,
}

impl BatchOutcome {
    pub const SUCCESS_NO_INFO: i64 = -2;
    pub const EXECUTE_FAILED: i64 = -3;

    /// The conventional numeric encoding of the outcome
    pub fn code(self) -> i64 {
        match self {
            BatchOutcome::SuccessNoInfo => Self::SUCCESS_NO_INFO,
            BatchOutcome::Updated(count) => i64::try_from(count).unwrap_or(i64::MAX),
            BatchOutcome::Failed => Self::EXECUTE_FAILED,
        }
    }
}

/// A parameter value that is read rather than held. Streams are consumed
/// when bound, so they are never buffered for a batch.
pub enum Stream {
    Binary(Box<dyn Read + Send>),
    Character(Box<dyn Read + Send>),
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::Binary(_) => write!(f, "Stream::Binary"),
            Stream::Character(_) => write!(f, "Stream::Character"),
        }
    }
}

#[async_trait]
pub trait Connection: Send + Sync {
    type Statement: PreparedStatement;

    /// Prepares `sql`, which uses `?` placeholders
    async fn prepare_statement(&self, sql: &str) -> Result<Self::Statement, Error>;

    fn create_array(&self, type_name: &str, values: Vec<SqlValue>) -> Result<ArrayValue, Error>;
}

/// A real prepared statement. Parameter indices are 1-based.
#[async_trait]
pub trait PreparedStatement: Send {
    type Rows: Send;

    fn bind(&mut self, index: usize, value: SqlValue) -> Result<(), Error>;

    fn bind_stream(&mut self, index: usize, stream: Stream) -> Result<(), Error>;

    /// Binds a value of a type the batch statement could not classify
    fn bind_object(&mut self, index: usize, value: Box<dyn Any + Send>) -> Result<(), Error>;

    fn clear_parameters(&mut self) -> Result<(), Error>;

    /// Adds the bound parameters as a row of the statement's own batch
    fn add_batch(&mut self) -> Result<(), Error>;

    fn clear_batch(&mut self) -> Result<(), Error>;

    async fn execute_batch(&mut self) -> Result<Vec<BatchOutcome>, Error>;

    async fn execute_update(&mut self) -> Result<u64, Error>;

    async fn execute_query(&mut self) -> Result<Self::Rows, Error>;

    /// Type names of the statement's parameters, as reported by the server
    async fn parameter_types(&mut self) -> Result<Vec<String>, Error>;

    async fn close(&mut self) -> Result<(), Error>;
}

#[test]
fn test_outcome_codes() {
    assert_eq!(BatchOutcome::SuccessNoInfo.code(), -2);
    assert_eq!(BatchOutcome::Failed.code(), -3);
    assert_eq!(BatchOutcome::Updated(3).code(), 3);
}
