//! tokio-postgres as the database behind a [`BatchStatement`].
//!
//! [`BatchStatement`]: crate::statement::BatchStatement

use std::any::Any;
use std::error::Error as StdError;
use std::io::Read;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::BytesMut;
use postgres_types::{to_sql_checked, IsNull, Kind, ToSql, Type};
use rust_decimal::Decimal;
use tokio_postgres::{Client, NoTls, Row, Statement};
use tracing::{error, trace};

use crate::connection::{BatchOutcome, Connection, PreparedStatement, Stream};
use crate::error::Error;
use crate::preprocess::preprocess_sql;
use crate::settings::RewriteSettings;
use crate::value::{ArrayValue, Blob, Clob, SqlType, SqlValue};

type BoxError = Box<dyn StdError + Sync + Send>;

pub struct PgConnection {
    client: Arc<Client>,
}

impl PgConnection {
    pub async fn connect(config: &str) -> Result<PgConnection, Error> {
        let (client, connection) = tokio_postgres::connect(config, NoTls).await?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                error!(error = %err, "PostgreSQL connection error");
            }
        });

        Ok(PgConnection::from_client(client))
    }

    /// Connects with a url that may carry rewrite parameters next to the
    /// regular connection options.
    pub async fn connect_dsn(dsn: &str) -> Result<(PgConnection, RewriteSettings), Error> {
        let settings = RewriteSettings::from_dsn(dsn)?;
        let connection = PgConnection::connect(&RewriteSettings::strip_dsn(dsn)?).await?;
        Ok((connection, settings))
    }

    pub fn from_client(client: Client) -> PgConnection {
        PgConnection {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Connection for PgConnection {
    type Statement = PgStatement;

    async fn prepare_statement(&self, sql: &str) -> Result<PgStatement, Error> {
        let preprocessed = preprocess_sql(sql)?;
        trace!(sql = %preprocessed.sql, "preparing statement");
        let statement = self.client.prepare(&preprocessed.sql).await?;
        check_param_count(preprocessed.param_count, statement.params().len())?;
        Ok(PgStatement::new(self.client.clone(), statement))
    }

    fn create_array(&self, type_name: &str, values: Vec<SqlValue>) -> Result<ArrayValue, Error> {
        match SqlType::from_name(type_name) {
            Some(element_type) => Ok(ArrayValue::new(element_type, values)),
            None => Err(Error::UnsupportedValue(format!("array of {}", type_name))),
        }
    }
}

pub struct PgStatement {
    client: Arc<Client>,
    statement: Statement,
    params: Vec<Option<SqlValue>>,
    batch: Vec<Vec<SqlValue>>,
}

/// Every renumbered `?` must be a parameter of the prepared statement.
/// Statements already written with `$n` are not counted.
fn check_param_count(placeholders: usize, params: usize) -> Result<(), Error> {
    if placeholders > 0 && placeholders != params {
        return Err(Error::delegate(format!(
            "Statement has {} placeholders but {} parameters",
            placeholders, params
        )));
    }
    Ok(())
}

impl PgStatement {
    fn new(client: Arc<Client>, statement: Statement) -> PgStatement {
        PgStatement {
            params: vec![None; statement.params().len()],
            client,
            statement,
            batch: Vec::new(),
        }
    }

    fn slot(&mut self, index: usize) -> Result<&mut Option<SqlValue>, Error> {
        let count = self.params.len();
        match index.checked_sub(1).and_then(|i| self.params.get_mut(i)) {
            Some(slot) => Ok(slot),
            None => Err(Error::delegate(format!(
                "Parameter index {} is out of range, the statement has {} parameters",
                index, count
            ))),
        }
    }

    fn bound(&self) -> Result<Vec<SqlValue>, Error> {
        self.params
            .iter()
            .enumerate()
            .map(|(i, param)| match param {
                Some(value) => Ok(value.clone()),
                None => Err(Error::MissingParameter { index: i + 1 }),
            })
            .collect()
    }

    async fn execute_row(&self, row: &[SqlValue]) -> Result<u64, Error> {
        let params: Vec<&(dyn ToSql + Sync)> =
            row.iter().map(|value| value as &(dyn ToSql + Sync)).collect();
        Ok(self.client.execute(&self.statement, &params).await?)
    }
}

fn read_stream(stream: Stream) -> std::io::Result<SqlValue> {
    match stream {
        Stream::Binary(mut reader) => {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(SqlValue::Bytes(buf))
        }
        Stream::Character(mut reader) => {
            let mut buf = String::new();
            reader.read_to_string(&mut buf)?;
            Ok(SqlValue::String(buf))
        }
    }
}

#[async_trait]
impl PreparedStatement for PgStatement {
    type Rows = Vec<Row>;

    fn bind(&mut self, index: usize, value: SqlValue) -> Result<(), Error> {
        *self.slot(index)? = Some(value);
        Ok(())
    }

    fn bind_stream(&mut self, index: usize, stream: Stream) -> Result<(), Error> {
        let value = read_stream(stream).map_err(|err| Error::delegate(err.to_string()))?;
        self.bind(index, value)
    }

    fn bind_object(&mut self, index: usize, _value: Box<dyn Any + Send>) -> Result<(), Error> {
        Err(Error::UnsupportedValue(format!(
            "value of an unknown type at parameter {}",
            index
        )))
    }

    fn clear_parameters(&mut self) -> Result<(), Error> {
        self.params.iter_mut().for_each(|param| *param = None);
        Ok(())
    }

    fn add_batch(&mut self) -> Result<(), Error> {
        let row = self.bound()?;
        self.batch.push(row);
        Ok(())
    }

    fn clear_batch(&mut self) -> Result<(), Error> {
        self.batch.clear();
        Ok(())
    }

    async fn execute_batch(&mut self) -> Result<Vec<BatchOutcome>, Error> {
        let rows = std::mem::take(&mut self.batch);
        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            outcomes.push(BatchOutcome::Updated(self.execute_row(&row).await?));
        }
        Ok(outcomes)
    }

    async fn execute_update(&mut self) -> Result<u64, Error> {
        let row = self.bound()?;
        self.execute_row(&row).await
    }

    async fn execute_query(&mut self) -> Result<Vec<Row>, Error> {
        let row = self.bound()?;
        let params: Vec<&(dyn ToSql + Sync)> =
            row.iter().map(|value| value as &(dyn ToSql + Sync)).collect();
        Ok(self.client.query(&self.statement, &params).await?)
    }

    async fn parameter_types(&mut self) -> Result<Vec<String>, Error> {
        Ok(self
            .statement
            .params()
            .iter()
            .map(|param| param.name().to_string())
            .collect())
    }

    // The server side statement is deallocated when the last handle to it
    // is dropped
    async fn close(&mut self) -> Result<(), Error> {
        self.params.clear();
        self.batch.clear();
        Ok(())
    }
}

fn encode<T: ToSql>(value: &T, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if !T::accepts(ty) {
        return Err(format!(
            "cannot bind {} to a parameter of type {}",
            std::any::type_name::<T>(),
            ty
        )
        .into());
    }
    value.to_sql(ty, out)
}

// Integers are bound with the width of the parameter they go to
fn encode_integer(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if *ty == Type::INT2 {
        encode(&i16::try_from(value)?, ty, out)
    } else if *ty == Type::INT4 {
        encode(&i32::try_from(value)?, ty, out)
    } else if *ty == Type::NUMERIC {
        encode(&Decimal::from(value), ty, out)
    } else if *ty == Type::FLOAT8 {
        encode(&(value as f64), ty, out)
    } else {
        encode(&value, ty, out)
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            SqlValue::Null(_) => Ok(IsNull::Yes),
            SqlValue::Bool(value) => encode(value, ty, out),
            SqlValue::Byte(value) => encode_integer(i64::from(*value), ty, out),
            SqlValue::Short(value) => encode_integer(i64::from(*value), ty, out),
            SqlValue::Int(value) => encode_integer(i64::from(*value), ty, out),
            SqlValue::Long(value) => encode_integer(*value, ty, out),
            SqlValue::Float(value) => {
                if *ty == Type::FLOAT8 {
                    encode(&f64::from(*value), ty, out)
                } else {
                    encode(value, ty, out)
                }
            }
            SqlValue::Double(value) => {
                if *ty == Type::FLOAT4 {
                    encode(&(*value as f32), ty, out)
                } else {
                    encode(value, ty, out)
                }
            }
            SqlValue::Decimal(value) => encode(value, ty, out),
            SqlValue::String(value) | SqlValue::Clob(Clob(value)) => encode(value, ty, out),
            SqlValue::Bytes(value) => encode(value, ty, out),
            SqlValue::Blob(Blob(value)) => encode(&&value[..], ty, out),
            SqlValue::Date(value) => encode(value, ty, out),
            SqlValue::Time(value) => encode(value, ty, out),
            SqlValue::Timestamp(value) => encode(value, ty, out),
            SqlValue::TimestampTz(value) => encode(value, ty, out),
            SqlValue::Uuid(value) => encode(value, ty, out),
            SqlValue::Array(value) => encode(value, ty, out),
        }
    }

    // The parameter type is checked per variant when encoding
    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl ToSql for ArrayValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match ty.kind() {
            Kind::Array(_) => self.elements.to_sql(ty, out),
            _ => Err(format!("cannot bind an array to a parameter of type {}", ty).into()),
        }
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Array(_))
    }

    to_sql_checked!();
}
