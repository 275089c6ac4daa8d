use std::fmt;

use tokio_postgres::error::SqlState;

use crate::parser::ParseError;
use crate::preprocess;
use crate::statement::ProxyState;
use crate::value::SqlType;

#[derive(Debug)]
pub enum Error {
    Parse(ParseError),
    Preprocess(preprocess::Error),
    /// A batch row does not have the shape of the rows before it, or the
    /// buffered columns do not match the rewritten statement's parameters.
    InconsistentBatchShape {
        expected: usize,
        found: usize,
    },
    /// A batch row binds a value whose type cannot share an array with
    /// the values already in its column.
    InconsistentColumnType {
        index: usize,
        expected: SqlType,
        found: SqlType,
    },
    MissingParameter {
        index: usize,
    },
    StatementState {
        operation: &'static str,
        state: ProxyState,
    },
    Closed,
    Postgres(tokio_postgres::Error),
    /// Failure reported by a non-Postgres delegate
    Delegate {
        message: String,
        code: Option<String>,
    },
    InvalidSetting {
        key: String,
        value: String,
    },
    InvalidUrl(url::ParseError),
    UnsupportedValue(String),
}

const SERIALIZATION_FAILURE: &str = "40001";

impl Error {
    pub fn delegate(message: impl Into<String>) -> Self {
        Error::Delegate {
            message: message.into(),
            code: None,
        }
    }

    /// SQLSTATE reported by the database, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Postgres(err) => err.code().map(SqlState::code),
            Error::Delegate { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// The transaction lost an optimistic-concurrency conflict and may be
    /// replayed as a whole.
    pub fn is_serialization_failure(&self) -> bool {
        self.code() == Some(SERIALIZATION_FAILURE)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "{}", err),
            Error::Preprocess(err) => write!(f, "{}", err),
            Error::InconsistentBatchShape { expected, found } => write!(
                f,
                "Inconsistent batch shape: expected {} columns, found {}",
                expected, found
            ),
            Error::InconsistentColumnType {
                index,
                expected,
                found,
            } => write!(
                f,
                "Inconsistent batch column {}: expected {}, found {}",
                index, expected, found
            ),
            Error::MissingParameter { index } => {
                write!(f, "No value specified for parameter {}", index)
            }
            Error::StatementState { operation, state } => {
                write!(f, "Cannot {} a statement in state {}", operation, state)
            }
            Error::Closed => write!(f, "Statement is closed"),
            Error::Postgres(err) => write!(f, "{}", err),
            Error::Delegate { message, code } => match code {
                Some(code) => write!(f, "{} (SQLSTATE {})", message, code),
                None => write!(f, "{}", message),
            },
            Error::InvalidSetting { key, value } => {
                write!(f, "Invalid value {:?} for setting {}", value, key)
            }
            Error::InvalidUrl(err) => write!(f, "Invalid connection url: {}", err),
            Error::UnsupportedValue(what) => write!(f, "Unsupported parameter value: {}", what),
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

impl From<preprocess::Error> for Error {
    fn from(err: preprocess::Error) -> Self {
        Error::Preprocess(err)
    }
}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        Error::Postgres(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Postgres(err) => Some(err),
            Error::InvalidUrl(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_failure() {
        let err = Error::Delegate {
            message: "restart transaction".to_string(),
            code: Some("40001".to_string()),
        };
        assert!(err.is_serialization_failure());
        assert_eq!(err.to_string(), "restart transaction (SQLSTATE 40001)");

        assert!(!Error::delegate("connection reset").is_serialization_failure());
        assert!(!Error::Closed.is_serialization_failure());
    }
}
