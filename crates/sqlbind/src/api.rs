//! Named API registration and invocation.
//!
//! An API is a named callable with a declared result shape: a fixed tuple
//! arity, optionally ending in an error slot. Invocation runs under
//! `catch_unwind`, so an abrupt failure is captured and converted into an
//! ordinary error value rather than unwinding through the session.

use crate::error::{DbError, DbResult};
use crate::value::Value;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// The callable behind an API: plain argument values in, the non-error
/// result values out (the declared error slot, when present, is carried
/// separately through the `DbResult`).
pub type ApiFn = Arc<dyn Fn(&[Value]) -> DbResult<Vec<Value>> + Send + Sync>;

/// A registered API: a name plus a callable with a known result shape.
#[derive(Clone)]
pub struct ApiSpec {
    name: String,
    arity: usize,
    has_err_slot: bool,
    func: ApiFn,
}

impl std::fmt::Debug for ApiSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSpec")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("has_err_slot", &self.has_err_slot)
            .finish_non_exhaustive()
    }
}

/// Outcome of one invocation: the captured result tuple (always of the
/// declared arity) and the failure, if any, that produced it.
pub(crate) struct CallOutcome {
    pub result: Vec<Value>,
    pub error: Option<DbError>,
}

impl ApiSpec {
    /// Define an API. `arity` is the full result tuple size; when
    /// `has_err_slot` is true the last slot is the error position and
    /// `func` returns only the `arity - 1` ordinary values.
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        has_err_slot: bool,
        func: impl Fn(&[Value]) -> DbResult<Vec<Value>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            has_err_slot,
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the callable, converting a returned error or a panic into
    /// the declared trailing error slot when there is one.
    pub(crate) fn invoke(&self, args: &[Value]) -> CallOutcome {
        let func = Arc::clone(&self.func);
        let outcome = catch_unwind(AssertUnwindSafe(|| func(args)));
        let error = match outcome {
            Ok(Ok(mut result)) => {
                if self.has_err_slot {
                    result.push(Value::Null);
                }
                return CallOutcome {
                    result,
                    error: None,
                };
            }
            Ok(Err(err)) => err,
            Err(payload) => DbError::Api(panic_message(&payload)),
        };

        let result = if self.has_err_slot {
            let mut result = vec![Value::Null; self.arity.saturating_sub(1)];
            result.push(Value::Text(error.to_string()));
            result
        } else {
            Vec::new()
        };
        CallOutcome {
            result,
            error: Some(error),
        }
    }

    pub(crate) fn has_err_slot(&self) -> bool {
        self.has_err_slot
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic during api call".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_fills_err_slot_with_null() {
        let api = ApiSpec::new("add", 2, true, |args| {
            let a = args[0].as_i64().unwrap_or(0);
            let b = args[1].as_i64().unwrap_or(0);
            Ok(vec![Value::Int(a + b)])
        });
        let out = api.invoke(&[Value::Int(2), Value::Int(3)]);
        assert!(out.error.is_none());
        assert_eq!(out.result, vec![Value::Int(5), Value::Null]);
    }

    #[test]
    fn test_returned_error_lands_in_err_slot() {
        let api = ApiSpec::new("fail", 2, true, |_| Err(DbError::NoRows));
        let out = api.invoke(&[]);
        assert!(out.error.is_some());
        assert_eq!(out.result[0], Value::Null);
        assert_eq!(out.result[1], Value::Text("no rows in result set".into()));
    }

    #[test]
    fn test_panic_is_captured() {
        let api = ApiSpec::new("boom", 1, true, |_| panic!("went sideways"));
        let out = api.invoke(&[]);
        assert_eq!(out.result, vec![Value::Text("api error: went sideways".into())]);
        assert!(out.error.unwrap().to_string().contains("went sideways"));
    }

    #[test]
    fn test_no_err_slot_keeps_result_empty_on_failure() {
        let api = ApiSpec::new("fail", 1, false, |_| Err(DbError::Duplicated));
        let out = api.invoke(&[]);
        assert!(out.result.is_empty());
        assert!(out.error.unwrap().is_duplicated());
    }
}
