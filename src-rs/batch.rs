use std::collections::BTreeMap;

use crate::connection::PreparedStatement;
use crate::error::Error;
use crate::value::{SqlType, SqlValue};

/// A deferred `set` call: binding `value` at the 1-based `index`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterRecord {
    pub index: usize,
    pub sql_type: SqlType,
    pub value: SqlValue,
}

impl ParameterRecord {
    pub fn new(index: usize, value: SqlValue) -> Self {
        ParameterRecord {
            index,
            sql_type: value.sql_type(),
            value,
        }
    }

    /// Performs the deferred call against a real statement
    pub fn replay<S: PreparedStatement + ?Sized>(self, statement: &mut S) -> Result<(), Error> {
        statement.bind(self.index, self.value)
    }
}

/// Parameters bound for the row currently being built. Binding an index
/// twice keeps the last value.
#[derive(Debug, Default)]
pub struct BindingTable {
    records: BTreeMap<usize, ParameterRecord>,
}

impl BindingTable {
    pub fn set(&mut self, record: ParameterRecord) {
        self.records.insert(record.index, record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Ends the current row. The table is empty afterwards, even when the
    /// row is rejected for a gap in its parameter indices.
    pub fn take_row(&mut self) -> Result<Vec<ParameterRecord>, Error> {
        let records = std::mem::take(&mut self.records);
        for (expected, index) in (1..).zip(records.keys()) {
            if *index != expected {
                return Err(Error::MissingParameter { index: expected });
            }
        }
        Ok(records.into_values().collect())
    }

    /// Replays every pending record in index order
    pub fn replay<S: PreparedStatement + ?Sized>(&mut self, statement: &mut S) -> Result<(), Error> {
        for record in std::mem::take(&mut self.records).into_values() {
            record.replay(statement)?;
        }
        Ok(())
    }
}

/// One parameter position's values across all rows of a batch.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnAccumulator {
    pub sql_type: SqlType,
    pub values: Vec<SqlValue>,
}

/// Rows added to a batch, transposed into columns. All columns always hold
/// one value per row.
#[derive(Debug, Default)]
pub struct ColumnBatch {
    columns: Vec<ColumnAccumulator>,
    rows: usize,
}

impl ColumnBatch {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn columns(&self) -> &[ColumnAccumulator] {
        &self.columns
    }

    pub fn clear(&mut self) {
        self.columns.clear();
        self.rows = 0;
    }

    /// The first row fixes the number of columns, every later row must
    /// have as many. A column keeps one type family: an all-NULL prefix
    /// takes the type of the first typed value, and integers or floats
    /// widen to the largest width seen. A rejected row leaves the batch
    /// unchanged.
    pub fn push_row(&mut self, row: Vec<ParameterRecord>) -> Result<(), Error> {
        if self.rows == 0 {
            self.columns = row
                .into_iter()
                .map(|record| ColumnAccumulator {
                    sql_type: record.sql_type,
                    values: vec![record.value],
                })
                .collect();
        } else {
            if row.len() != self.columns.len() {
                return Err(Error::InconsistentBatchShape {
                    expected: self.columns.len(),
                    found: row.len(),
                });
            }
            let mut types = Vec::with_capacity(row.len());
            for (i, (column, record)) in self.columns.iter().zip(&row).enumerate() {
                match column.sql_type.unify(record.sql_type) {
                    Some(sql_type) => types.push(sql_type),
                    None => {
                        return Err(Error::InconsistentColumnType {
                            index: i + 1,
                            expected: column.sql_type,
                            found: record.sql_type,
                        })
                    }
                }
            }
            for ((column, record), sql_type) in self.columns.iter_mut().zip(row).zip(types) {
                column.sql_type = sql_type;
                column.values.push(record.value);
            }
        }
        self.rows += 1;
        Ok(())
    }

    /// Empties the batch, returning the columns and the row count
    pub fn take(&mut self) -> (Vec<ColumnAccumulator>, usize) {
        let rows = std::mem::replace(&mut self.rows, 0);
        (std::mem::take(&mut self.columns), rows)
    }

    /// Empties the batch, transposing it back into rows
    pub fn take_rows(&mut self) -> Vec<Vec<SqlValue>> {
        let (columns, rows) = self.take();
        let mut result: Vec<Vec<SqlValue>> = (0..rows)
            .map(|_| Vec::with_capacity(columns.len()))
            .collect();
        for column in columns {
            for (row, value) in result.iter_mut().zip(column.values) {
                row.push(value);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: Vec<SqlValue>) -> Vec<ParameterRecord> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| ParameterRecord::new(i + 1, value))
            .collect()
    }

    #[test]
    fn test_binding_table_orders_by_index() {
        let mut table = BindingTable::default();
        table.set(ParameterRecord::new(2, SqlValue::Int(2)));
        table.set(ParameterRecord::new(1, SqlValue::Int(0)));
        table.set(ParameterRecord::new(1, SqlValue::Int(1)));
        let row = table.take_row().unwrap();
        assert_eq!(
            row.iter().map(|r| r.value.clone()).collect::<Vec<_>>(),
            vec![SqlValue::Int(1), SqlValue::Int(2)]
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_binding_table_gap() {
        let mut table = BindingTable::default();
        table.set(ParameterRecord::new(1, SqlValue::Int(1)));
        table.set(ParameterRecord::new(3, SqlValue::Int(3)));
        assert!(matches!(
            table.take_row(),
            Err(Error::MissingParameter { index: 2 })
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_transpose() {
        let mut batch = ColumnBatch::default();
        batch
            .push_row(row(vec![SqlValue::Null(SqlType::Unknown), "a".into()]))
            .unwrap();
        batch.push_row(row(vec![SqlValue::Long(2), "b".into()])).unwrap();
        assert_eq!(batch.rows(), 2);
        assert_eq!(batch.columns()[0].sql_type, SqlType::Int8);
        assert_eq!(batch.columns()[1].sql_type, SqlType::Varchar);
        assert_eq!(
            batch.columns()[1].values,
            vec![SqlValue::from("a"), SqlValue::from("b")]
        );

        let rows = batch.take_rows();
        assert_eq!(
            rows,
            vec![
                vec![SqlValue::Null(SqlType::Unknown), "a".into()],
                vec![SqlValue::Long(2), "b".into()],
            ]
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn test_inconsistent_shape() {
        let mut batch = ColumnBatch::default();
        batch.push_row(row(vec![1i32.into(), 2i32.into()])).unwrap();
        let err = batch.push_row(row(vec![1i32.into()])).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentBatchShape {
                expected: 2,
                found: 1
            }
        ));
        assert_eq!(batch.rows(), 1);
    }

    #[test]
    fn test_column_type_widens() {
        let mut batch = ColumnBatch::default();
        batch
            .push_row(row(vec![SqlValue::Int(1), SqlValue::Float(1.5)]))
            .unwrap();
        batch
            .push_row(row(vec![SqlValue::Long(2), SqlValue::Double(2.5)]))
            .unwrap();
        batch
            .push_row(row(vec![SqlValue::Short(3), SqlValue::Null(SqlType::Unknown)]))
            .unwrap();
        assert_eq!(batch.columns()[0].sql_type, SqlType::Int8);
        assert_eq!(batch.columns()[1].sql_type, SqlType::Float8);
    }

    #[test]
    fn test_inconsistent_column_type() {
        let mut batch = ColumnBatch::default();
        batch.push_row(row(vec![1i64.into(), 1i32.into()])).unwrap();
        let err = batch.push_row(row(vec![2i64.into(), "two".into()])).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentColumnType {
                index: 2,
                expected: SqlType::Int4,
                found: SqlType::Varchar,
            }
        ));
        assert_eq!(batch.rows(), 1);
        assert_eq!(batch.columns()[0].values, vec![SqlValue::Long(1)]);

        // A typed NULL of another family is rejected too
        let err = batch
            .push_row(row(vec![SqlValue::Null(SqlType::Uuid), 3i32.into()]))
            .unwrap_err();
        assert!(matches!(err, Error::InconsistentColumnType { index: 1, .. }));
    }
}
