use std::any::Any;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::batch::{BindingTable, ColumnAccumulator, ColumnBatch, ParameterRecord};
use crate::connection::{BatchOutcome, Connection, PreparedStatement, Stream};
use crate::error::Error;
use crate::rewrite::{Rewrite, Rewriter, StatementKind};
use crate::settings::RewriteSettings;
use crate::value::{classify, SqlType, SqlValue};

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum ProxyState {
    /// No real statement exists yet, bound values are buffered
    Deferred,
    /// A real statement for the original SQL exists and gets every call
    Voided,
    /// The batch was executed as one rewritten bulk statement
    BatchRewritten,
    Closed,
}

enum State<S> {
    Deferred,
    Voided(S),
    BatchRewritten(S),
    Closed,
}

impl<S> State<S> {
    fn public(&self) -> ProxyState {
        match self {
            State::Deferred => ProxyState::Deferred,
            State::Voided(_) => ProxyState::Voided,
            State::BatchRewritten(_) => ProxyState::BatchRewritten,
            State::Closed => ProxyState::Closed,
        }
    }
}

fn not_allowed(operation: &'static str, state: ProxyState) -> Error {
    match state {
        ProxyState::Closed => Error::Closed,
        state => Error::StatementState { operation, state },
    }
}

// Brings a freshly created delegate up to date with everything buffered so
// far: rows already added go to its own batch, pending values are bound.
fn load<S: PreparedStatement>(
    delegate: &mut S,
    rows: Vec<Vec<SqlValue>>,
    bindings: &mut BindingTable,
) -> Result<(), Error> {
    for row in rows {
        for (i, value) in row.into_iter().enumerate() {
            delegate.bind(i + 1, value)?;
        }
        delegate.add_batch()?;
    }
    bindings.replay(delegate)
}

async fn execute_bulk<C: Connection>(
    connection: &C,
    delegate: &mut C::Statement,
    columns: Vec<ColumnAccumulator>,
    rows: usize,
) -> Result<Vec<BatchOutcome>, Error> {
    for (i, column) in columns.into_iter().enumerate() {
        trace!(
            index = i + 1,
            sql_type = %column.sql_type,
            values = column.values.len(),
            "binding column array"
        );
        let array = connection.create_array(column.sql_type.name(), column.values)?;
        delegate.bind(i + 1, SqlValue::Array(array))?;
    }

    let affected = delegate.execute_update().await?;
    // The bulk statement cannot tell which rows succeeded
    let outcome = if affected == rows as u64 {
        BatchOutcome::SuccessNoInfo
    } else {
        warn!(expected = rows, affected, "bulk statement row count mismatch");
        BatchOutcome::Failed
    };
    Ok(vec![outcome; rows])
}

/// A prepared statement that defers creating the real statement until it
/// knows how it is used. A batch of INSERT, UPSERT or UPDATE rows is
/// executed as one bulk statement over arrays when the SQL qualifies;
/// anything that needs the real statement earlier makes it a plain
/// pass-through for the rest of its life.
///
/// Not safe for concurrent use; one caller drives a statement at a time.
pub struct BatchStatement<C: Connection> {
    connection: Arc<C>,
    sql: String,
    kind: Option<StatementKind>,
    rewrite_enabled: bool,
    rewriter: Rewriter,
    state: State<C::Statement>,
    bindings: BindingTable,
    batch: ColumnBatch,
}

impl<C: Connection> BatchStatement<C> {
    pub fn new(connection: Arc<C>, sql: impl Into<String>, settings: &RewriteSettings) -> Self {
        let sql = sql.into();
        let kind = StatementKind::detect(&sql);
        BatchStatement {
            connection,
            kind,
            rewrite_enabled: kind.map_or(false, |kind| settings.is_enabled(kind)),
            rewriter: Rewriter::new(settings),
            sql,
            state: State::Deferred,
            bindings: BindingTable::default(),
            batch: ColumnBatch::default(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn state(&self) -> ProxyState {
        self.state.public()
    }

    /// Rows added to the pending batch
    pub fn batch_size(&self) -> usize {
        self.batch.rows()
    }

    pub fn set_value(&mut self, index: usize, value: impl Into<SqlValue>) -> Result<(), Error> {
        let value = value.into();
        match &mut self.state {
            State::Deferred => {
                self.bindings.set(ParameterRecord::new(index, value));
                Ok(())
            }
            State::Voided(delegate) => delegate.bind(index, value),
            state => Err(not_allowed("bind", state.public())),
        }
    }

    pub fn set_null(&mut self, index: usize, sql_type: SqlType) -> Result<(), Error> {
        self.set_value(index, SqlValue::Null(sql_type))
    }

    /// Binds a value by its runtime type, `None` binds an untyped NULL.
    /// A value that cannot be classified voids the statement and is handed
    /// to the real statement as it is.
    pub async fn set_object(
        &mut self,
        index: usize,
        value: Option<Box<dyn Any + Send>>,
    ) -> Result<(), Error> {
        let value = match value {
            Some(value) => value,
            None => return self.set_null(index, SqlType::Unknown),
        };
        match classify(value.as_ref()) {
            Some(value) => self.set_value(index, value),
            None => self.void().await?.bind_object(index, value),
        }
    }

    /// Streams are read by the real statement, so binding one voids the
    /// statement.
    pub async fn set_stream(&mut self, index: usize, stream: Stream) -> Result<(), Error> {
        self.void().await?.bind_stream(index, stream)
    }

    pub async fn parameter_types(&mut self) -> Result<Vec<String>, Error> {
        self.void().await?.parameter_types().await
    }

    pub fn clear_parameters(&mut self) -> Result<(), Error> {
        match &mut self.state {
            State::Deferred | State::BatchRewritten(_) => {
                self.bindings.clear();
                Ok(())
            }
            State::Voided(delegate) => delegate.clear_parameters(),
            State::Closed => Err(Error::Closed),
        }
    }

    /// Ends the current row. The bound values are cleared even if the row
    /// is rejected.
    pub fn add_batch(&mut self) -> Result<(), Error> {
        match &mut self.state {
            State::Deferred => {
                let row = self.bindings.take_row()?;
                self.batch.push_row(row)
            }
            State::Voided(delegate) => delegate.add_batch(),
            state => Err(not_allowed("add a row to", state.public())),
        }
    }

    pub fn clear_batch(&mut self) -> Result<(), Error> {
        match &mut self.state {
            State::Deferred | State::BatchRewritten(_) => {
                self.batch.clear();
                Ok(())
            }
            State::Voided(delegate) => delegate.clear_batch(),
            State::Closed => Err(Error::Closed),
        }
    }

    /// Executes the rows added so far. A qualifying statement runs once as
    /// a bulk statement and every row is reported as
    /// [`BatchOutcome::SuccessNoInfo`] if the affected row count matches the
    /// number of rows, or [`BatchOutcome::Failed`] otherwise.
    pub async fn execute_batch(&mut self) -> Result<Vec<BatchOutcome>, Error> {
        match &mut self.state {
            State::Deferred => {}
            State::Voided(delegate) => return delegate.execute_batch().await,
            state => return Err(not_allowed("execute a batch on", state.public())),
        }

        if self.batch.is_empty() {
            return Ok(Vec::new());
        }

        match self.bulk_rewrite() {
            Some(rewrite) => self.execute_rewritten(rewrite).await,
            None => self.execute_original().await,
        }
    }

    /// [`execute_batch`](Self::execute_batch) with outcomes in their numeric
    /// encoding
    pub async fn execute_large_batch(&mut self) -> Result<Vec<i64>, Error> {
        let outcomes = self.execute_batch().await?;
        Ok(outcomes.into_iter().map(BatchOutcome::code).collect())
    }

    pub async fn execute_update(&mut self) -> Result<u64, Error> {
        self.void().await?.execute_update().await
    }

    pub async fn execute_query(
        &mut self,
    ) -> Result<<C::Statement as PreparedStatement>::Rows, Error> {
        self.void().await?.execute_query().await
    }

    /// Releases the real statement, if one was created. Closing twice is
    /// allowed.
    pub async fn close(&mut self) -> Result<(), Error> {
        self.bindings.clear();
        self.batch.clear();
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Voided(mut delegate) | State::BatchRewritten(mut delegate) => {
                debug!(sql = %self.sql, "closing statement");
                delegate.close().await
            }
            State::Deferred | State::Closed => Ok(()),
        }
    }

    fn bulk_rewrite(&self) -> Option<Rewrite> {
        let kind = match self.kind {
            Some(kind) if self.rewrite_enabled => kind,
            _ => return None,
        };
        match self.rewriter.rewrite(&self.sql, kind) {
            // Nothing to unnest, every row is the same statement
            Ok(rewrite) if rewrite.parameter_count == 0 => None,
            Ok(rewrite) => Some(rewrite),
            Err(err) => {
                debug!(sql = %self.sql, error = %err, "batch not rewritten");
                None
            }
        }
    }

    async fn execute_rewritten(&mut self, rewrite: Rewrite) -> Result<Vec<BatchOutcome>, Error> {
        let (columns, rows) = self.batch.take();
        if columns.len() != rewrite.parameter_count {
            return Err(Error::InconsistentBatchShape {
                expected: rewrite.parameter_count,
                found: columns.len(),
            });
        }

        trace!(
            original = %self.sql,
            rewritten = %rewrite.sql,
            rows,
            "executing rewritten batch"
        );
        let mut delegate = self.connection.prepare_statement(&rewrite.sql).await?;
        let result = execute_bulk(self.connection.as_ref(), &mut delegate, columns, rows).await;
        self.state = State::BatchRewritten(delegate);
        debug!(sql = %self.sql, "statement batch rewritten");
        result
    }

    async fn execute_original(&mut self) -> Result<Vec<BatchOutcome>, Error> {
        let rows = self.batch.take_rows();
        debug!(sql = %self.sql, rows = rows.len(), "executing batch row by row");
        let mut delegate = self.connection.prepare_statement(&self.sql).await?;
        let result = match load(&mut delegate, rows, &mut self.bindings) {
            Ok(()) => delegate.execute_batch().await,
            Err(err) => Err(err),
        };
        self.state = State::Voided(delegate);
        result
    }

    // The delegate is stored before anything else can fail, so close()
    // always finds it.
    async fn void(&mut self) -> Result<&mut C::Statement, Error> {
        if let State::Deferred = self.state {
            let mut delegate = self.connection.prepare_statement(&self.sql).await?;
            let rows = self.batch.take_rows();
            let loaded = load(&mut delegate, rows, &mut self.bindings);
            self.state = State::Voided(delegate);
            debug!(sql = %self.sql, "statement voided");
            loaded?;
        }
        match &mut self.state {
            State::Voided(delegate) => Ok(delegate),
            state => Err(not_allowed("use the original statement of", state.public())),
        }
    }
}
