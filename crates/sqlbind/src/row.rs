//! Row mapping traits and the decoded-row type.

use crate::error::{DbError, DbResult};
use crate::value::{FromValue, Value};

/// A decoded result row: one [`Value`] per SELECT column, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Positional cursor over this row's values.
    pub fn reader(&self) -> RowReader<'_> {
        RowReader {
            values: &self.values,
            pos: 0,
        }
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

/// Positional cursor used by [`TableRow::from_row`] to consume a row's
/// values in mapped column order.
pub struct RowReader<'a> {
    values: &'a [Value],
    pos: usize,
}

impl RowReader<'_> {
    /// Take the next value and bind it as `T`, attributing failures to
    /// `column` in the resulting decode error.
    pub fn next<T: FromValue>(&mut self, column: &'static str) -> DbResult<T> {
        let Some(value) = self.values.get(self.pos) else {
            return Err(DbError::decode(column, "row has no value at this position"));
        };
        self.pos += 1;
        T::from_value(value.clone()).map_err(|e| DbError::decode(column, e.to_string()))
    }

    /// Number of values not yet consumed.
    pub fn remaining(&self) -> usize {
        self.values.len() - self.pos
    }
}

/// A struct type mappable to a table's columns.
///
/// This trait should typically be derived using `#[derive(TableRow)]`
/// from the `sqlbind-derive` crate. The derive flattens nested
/// `#[col(flatten)]` structs depth-first at the embedding position, maps
/// each field to the snake_case of its identifier unless overridden with
/// `#[col(rename = "...")]`, and leaves out `#[col(skip)]` fields (which
/// must implement `Default` for the bind direction).
///
/// The three methods walk the same flattened field order, so a single
/// mapping serves both the insert and the bind direction. Column order is
/// stable and deterministic for a given type.
///
/// # Example
///
/// ```ignore
/// use sqlbind::TableRow;
///
/// #[derive(TableRow, Default)]
/// struct User {
///     id: i64,
///     #[col(rename = "user_name")]
///     name: String,
///     #[col(skip)]
///     cached_score: f64,
/// }
/// ```
pub trait TableRow: Sized {
    /// Append the flattened column names, in mapped order.
    fn push_columns(cols: &mut Vec<&'static str>);

    /// Append this struct's field values, in the same order.
    fn push_values(&self, out: &mut Vec<Value>);

    /// Rebuild a struct by consuming one value per column, in the same order.
    fn from_row(r: &mut RowReader<'_>) -> DbResult<Self>;

    /// The flattened column list.
    fn columns() -> Vec<&'static str> {
        let mut cols = Vec::new();
        Self::push_columns(&mut cols);
        cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_consumes_in_order() {
        let row = Row::new(vec![Value::Int(1), Value::Text("a".into())]);
        let mut r = row.reader();
        assert_eq!(r.next::<i64>("id").unwrap(), 1);
        assert_eq!(r.next::<String>("name").unwrap(), "a");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_reader_reports_column_on_mismatch() {
        let row = Row::new(vec![Value::Text("a".into())]);
        let mut r = row.reader();
        let err = r.next::<i64>("id").unwrap_err();
        assert!(err.to_string().contains("column 'id'"));
    }

    #[test]
    fn test_reader_exhaustion_is_a_decode_error() {
        let row = Row::new(vec![]);
        let mut r = row.reader();
        assert!(r.next::<i64>("id").is_err());
    }
}
