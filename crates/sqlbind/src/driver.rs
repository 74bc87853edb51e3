//! Driver contract and the tokio-postgres adapter.
//!
//! The engine talks to the database through [`SqlDriver`]: execute a
//! statement with positional [`Value`] arguments, or run a query and get
//! decoded [`Row`]s back. Connection acquisition, pooling and
//! cancellation stay with the caller; the core imposes no timeout of its
//! own.

use crate::error::{DbError, DbResult};
use crate::row::Row;
use crate::value::Value;
use tokio_postgres::types::{FromSql, ToSql, Type};

/// A backend that can execute parameterized statements.
///
/// Statement text uses `?` placeholders (see [`crate::stmt`]); adapters
/// rewrite them to the backend's native form.
pub trait SqlDriver: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = DbResult<u64>> + Send;

    /// Execute a query and return all rows, decoded positionally.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = DbResult<Vec<Row>>> + Send;
}

impl<D: SqlDriver> SqlDriver for &D {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        (*self).execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        (*self).query(sql, params).await
    }
}

/// Rewrite `?` placeholders to Postgres `$1..$n` form, leaving quoted
/// literals untouched.
pub fn bind_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0usize;
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) => {
                out.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                }
                _ => out.push(c),
            },
        }
    }
    out
}

/// Map a tokio-postgres error into the engine taxonomy: unique violations
/// (SQLSTATE 23505) become [`DbError::Duplicated`], everything else is a
/// driver error.
pub fn map_db_error(err: tokio_postgres::Error) -> DbError {
    if let Some(db_err) = err.as_db_error() {
        if db_err.code().code() == "23505" {
            return DbError::Duplicated;
        }
    }
    DbError::Driver(err.to_string())
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn get_opt<'a, T>(row: &'a tokio_postgres::Row, idx: usize, name: &str) -> DbResult<Option<T>>
where
    T: FromSql<'a>,
{
    row.try_get(idx)
        .map_err(|e| DbError::decode(name, e.to_string()))
}

fn decode_column(row: &tokio_postgres::Row, idx: usize) -> DbResult<Value> {
    let column = &row.columns()[idx];
    let name = column.name();
    let value = match *column.type_() {
        Type::BOOL => get_opt::<bool>(row, idx, name)?.map(Value::Bool),
        Type::INT2 => get_opt::<i16>(row, idx, name)?.map(|v| Value::Int(i64::from(v))),
        Type::INT4 => get_opt::<i32>(row, idx, name)?.map(|v| Value::Int(i64::from(v))),
        Type::INT8 => get_opt::<i64>(row, idx, name)?.map(Value::Int),
        Type::FLOAT4 => get_opt::<f32>(row, idx, name)?.map(|v| Value::Float(f64::from(v))),
        Type::FLOAT8 => get_opt::<f64>(row, idx, name)?.map(Value::Float),
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            get_opt::<String>(row, idx, name)?.map(Value::Text)
        }
        Type::BYTEA => get_opt::<Vec<u8>>(row, idx, name)?.map(Value::Bytes),
        Type::TIMESTAMP => {
            get_opt::<chrono::NaiveDateTime>(row, idx, name)?.map(Value::Timestamp)
        }
        Type::TIMESTAMPTZ => {
            get_opt::<chrono::DateTime<chrono::Utc>>(row, idx, name)?.map(Value::TimestampTz)
        }
        Type::UUID => get_opt::<uuid::Uuid>(row, idx, name)?.map(Value::Uuid),
        Type::JSON | Type::JSONB => get_opt::<serde_json::Value>(row, idx, name)?.map(Value::Json),
        ref other => {
            return Err(DbError::decode(
                name,
                format!("unsupported column type {other}"),
            ));
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn decode_row(row: &tokio_postgres::Row) -> DbResult<Row> {
    let mut values = Vec::with_capacity(row.len());
    for idx in 0..row.len() {
        values.push(decode_column(row, idx)?);
    }
    Ok(Row::new(values))
}

impl SqlDriver for tokio_postgres::Client {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        let sql = bind_placeholders(sql);
        tokio_postgres::Client::execute(self, &sql, &param_refs(params))
            .await
            .map_err(map_db_error)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        let sql = bind_placeholders(sql);
        let rows = tokio_postgres::Client::query(self, &sql, &param_refs(params))
            .await
            .map_err(map_db_error)?;
        rows.iter().map(decode_row).collect()
    }
}

impl SqlDriver for tokio_postgres::Transaction<'_> {
    async fn execute(&self, sql: &str, params: &[Value]) -> DbResult<u64> {
        let sql = bind_placeholders(sql);
        tokio_postgres::Transaction::execute(self, &sql, &param_refs(params))
            .await
            .map_err(map_db_error)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        let sql = bind_placeholders(sql);
        let rows = tokio_postgres::Transaction::query(self, &sql, &param_refs(params))
            .await
            .map_err(map_db_error)?;
        rows.iter().map(decode_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_placeholders_sequential() {
        assert_eq!(
            bind_placeholders("SELECT name FROM users WHERE id = ? AND age > ?"),
            "SELECT name FROM users WHERE id = $1 AND age > $2"
        );
    }

    #[test]
    fn test_bind_placeholders_skips_literals() {
        assert_eq!(
            bind_placeholders("SELECT * FROM t WHERE a = '?' AND b = ?"),
            "SELECT * FROM t WHERE a = '?' AND b = $1"
        );
        assert_eq!(
            bind_placeholders(r#"WHERE a = "x?y" AND b = ?"#),
            r#"WHERE a = "x?y" AND b = $1"#
        );
    }

    #[test]
    fn test_bind_placeholders_no_params() {
        assert_eq!(bind_placeholders("SELECT 1"), "SELECT 1");
    }
}
