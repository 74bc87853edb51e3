//! Dynamic SQL values and their conversions.
//!
//! [`Value`] is the loosely-typed currency of the engine: insert values,
//! query arguments and decoded result cells all travel as `Value`s, so the
//! session can build and execute statements without a concrete row type.

use crate::error::{DbError, DbResult};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A dynamically-typed SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer (covers smaller integer columns)
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// Text string
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Timestamp without time zone
    Timestamp(NaiveDateTime),
    /// Timestamp with time zone (UTC)
    TimestampTz(DateTime<Utc>),
    /// UUID
    Uuid(uuid::Uuid),
    /// JSON value
    Json(serde_json::Value),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "BIGINT",
            Value::Float(_) => "DOUBLE",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BYTEA",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::TimestampTz(_) => "TIMESTAMPTZ",
            Value::Uuid(_) => "UUID",
            Value::Json(_) => "JSON",
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

// ==================== Into conversions ====================

macro_rules! value_from {
    ($($ty:ty => $variant:ident ($conv:expr)),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant($conv(v))
                }
            }
        )*
    };
}

value_from! {
    bool => Bool(|v| v),
    i16 => Int(i64::from),
    i32 => Int(i64::from),
    i64 => Int(|v| v),
    f32 => Float(f64::from),
    f64 => Float(|v| v),
    String => Text(|v| v),
    Vec<u8> => Bytes(|v| v),
    NaiveDateTime => Timestamp(|v| v),
    DateTime<Utc> => TimestampTz(|v| v),
    uuid::Uuid => Uuid(|v| v),
    serde_json::Value => Json(|v| v),
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// By-reference extraction into a [`Value`] (the insert direction).
///
/// Implemented for the same scalar set as `From<T> for Value`; derived
/// `TableRow` impls call this on each mapped field.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

macro_rules! to_value_cloned {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    self.clone().into()
                }
            }
        )*
    };
}

to_value_cloned!(
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    Vec<u8>,
    NaiveDateTime,
    DateTime<Utc>,
    uuid::Uuid,
    serde_json::Value,
    Value,
);

impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

// ==================== From conversions (bind direction) ====================

/// Conversion out of a [`Value`] into a concrete binding target.
pub trait FromValue: Sized {
    fn from_value(v: Value) -> DbResult<Self>;
}

fn mismatch<T>(expected: &'static str, got: &Value) -> DbResult<T> {
    Err(DbError::Other(format!(
        "cannot bind {} value as {}",
        got.type_name(),
        expected
    )))
}

impl FromValue for bool {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Bool(b) => Ok(b),
            Value::Int(n) => Ok(n != 0),
            other => mismatch("BOOLEAN", &other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Int(n) => Ok(n),
            other => mismatch("BIGINT", &other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Int(n) => i32::try_from(n)
                .map_err(|_| DbError::Other(format!("integer {n} out of range for i32"))),
            other => mismatch("INTEGER", &other),
        }
    }
}

impl FromValue for i16 {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Int(n) => i16::try_from(n)
                .map_err(|_| DbError::Other(format!("integer {n} out of range for i16"))),
            other => mismatch("SMALLINT", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Float(f) => Ok(f),
            Value::Int(n) => Ok(n as f64),
            other => mismatch("DOUBLE", &other),
        }
    }
}

impl FromValue for f32 {
    fn from_value(v: Value) -> DbResult<Self> {
        f64::from_value(v).map(|f| f as f32)
    }
}

impl FromValue for String {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Text(s) => Ok(s),
            other => mismatch("TEXT", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Bytes(b) => Ok(b),
            other => mismatch("BYTEA", &other),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Timestamp(t) => Ok(t),
            Value::TimestampTz(t) => Ok(t.naive_utc()),
            other => mismatch("TIMESTAMP", &other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::TimestampTz(t) => Ok(t),
            other => mismatch("TIMESTAMPTZ", &other),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Uuid(u) => Ok(u),
            other => mismatch("UUID", &other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Json(j) => Ok(j),
            other => mismatch("JSON", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(v: Value) -> DbResult<Self> {
        match v {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(v: Value) -> DbResult<Self> {
        Ok(v)
    }
}

// ==================== Postgres parameter binding ====================

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) => match *ty {
                Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
                Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Float(v) => match *ty {
                Type::FLOAT4 => (*v as f32).to_sql(ty, out),
                _ => v.to_sql(ty, out),
            },
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampTz(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Acceptance is decided per variant at bind time.
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_none_is_null() {
        assert_eq!(Value::from(Option::<i64>::None), Value::Null);
        assert_eq!(None::<String>.to_value(), Value::Null);
    }

    #[test]
    fn test_small_ints_widen() {
        assert_eq!(Value::from(7i16), Value::Int(7));
        assert_eq!(Value::from(7i32), Value::Int(7));
    }

    #[test]
    fn test_from_value_narrows_with_range_check() {
        assert_eq!(i32::from_value(Value::Int(42)).unwrap(), 42);
        assert!(i16::from_value(Value::Int(1 << 40)).is_err());
    }

    #[test]
    fn test_from_value_rejects_mismatched_kind() {
        let err = String::from_value(Value::Int(1)).unwrap_err();
        assert!(err.to_string().contains("BIGINT"));
    }

    #[test]
    fn test_option_binding() {
        assert_eq!(Option::<i64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_value(Value::Text("a".into())).unwrap(),
            Some("a".to_string())
        );
    }
}
