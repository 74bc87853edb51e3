//! Binding targets for expression/variable `ret` calls.
//!
//! An [`Outputs`] carries alternating (expression, target) pairs. Targets
//! are either scalar slots (exactly one row expected) or list slots (one
//! appended value per matched row); the two kinds cannot be mixed within a
//! single `ret`, since that would make the result cardinality ambiguous.

use crate::error::DbResult;
use crate::value::{FromValue, Value};

/// A target receiving exactly one column value.
pub trait ScalarSlot {
    fn set(&mut self, v: Value) -> DbResult<()>;
}

impl<T: FromValue> ScalarSlot for T {
    fn set(&mut self, v: Value) -> DbResult<()> {
        *self = T::from_value(v)?;
        Ok(())
    }
}

/// A target accumulating one column value per matched row.
pub trait ListSlot {
    fn push_value(&mut self, v: Value) -> DbResult<()>;
}

impl<T: FromValue> ListSlot for Vec<T> {
    fn push_value(&mut self, v: Value) -> DbResult<()> {
        self.push(T::from_value(v)?);
        Ok(())
    }
}

pub(crate) enum Slot<'a> {
    Scalar(&'a mut dyn ScalarSlot),
    List(&'a mut dyn ListSlot),
}

/// The cardinality shape of an [`Outputs`] set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputKind {
    Empty,
    Scalar,
    List,
    Mixed,
}

/// Ordered (expression, target) pairs for a `ret` call.
///
/// # Example
///
/// ```ignore
/// let mut name = String::new();
/// session.query("id = ?", vec![Arg::scalar(1)]);
/// session.ret_cols(Outputs::new().col("name", &mut name)).await?;
/// ```
#[must_use]
#[derive(Default)]
pub struct Outputs<'a> {
    items: Vec<(String, Slot<'a>)>,
}

impl<'a> Outputs<'a> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Bind `expr` to a scalar target: exactly one matching row expected.
    pub fn col<T: ScalarSlot>(mut self, expr: &str, target: &'a mut T) -> Self {
        self.items.push((expr.to_string(), Slot::Scalar(target)));
        self
    }

    /// Bind `expr` to a list target: one appended value per matched row.
    pub fn cols<T: FromValue>(mut self, expr: &str, target: &'a mut Vec<T>) -> Self {
        self.items.push((expr.to_string(), Slot::List(target)));
        self
    }

    pub(crate) fn kind(&self) -> OutputKind {
        let mut kind = OutputKind::Empty;
        for (_, slot) in &self.items {
            let this = match slot {
                Slot::Scalar(_) => OutputKind::Scalar,
                Slot::List(_) => OutputKind::List,
            };
            kind = match kind {
                OutputKind::Empty => this,
                k if k == this => k,
                _ => return OutputKind::Mixed,
            };
        }
        kind
    }

    pub(crate) fn split(self) -> (Vec<String>, Vec<Slot<'a>>) {
        self.items.into_iter().unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_scalar() {
        let mut a = 0i64;
        let mut b = String::new();
        let outs = Outputs::new().col("a", &mut a).col("b", &mut b);
        assert_eq!(outs.kind(), OutputKind::Scalar);
    }

    #[test]
    fn test_kind_list() {
        let mut xs: Vec<i64> = Vec::new();
        let outs = Outputs::new().cols("x", &mut xs);
        assert_eq!(outs.kind(), OutputKind::List);
    }

    #[test]
    fn test_kind_mixed() {
        let mut a = 0i64;
        let mut xs: Vec<i64> = Vec::new();
        let outs = Outputs::new().col("a", &mut a).cols("x", &mut xs);
        assert_eq!(outs.kind(), OutputKind::Mixed);
    }

    #[test]
    fn test_kind_empty() {
        assert_eq!(Outputs::new().kind(), OutputKind::Empty);
    }

    #[test]
    fn test_scalar_slot_overwrites() {
        let mut n = 5i64;
        ScalarSlot::set(&mut n, Value::Int(9)).unwrap();
        assert_eq!(n, 9);
    }

    #[test]
    fn test_list_slot_appends() {
        let mut xs: Vec<String> = Vec::new();
        xs.push_value(Value::Text("a".into())).unwrap();
        xs.push_value(Value::Text("b".into())).unwrap();
        assert_eq!(xs, vec!["a", "b"]);
    }
}
