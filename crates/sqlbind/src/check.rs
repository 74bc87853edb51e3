//! Assertion context used by API `ret` result checking.

use crate::value::Value;

/// Test/assertion collaborator for [`crate::Session::ret_call`].
///
/// `fatal` halts the current check; the default `matches` rule is deep
/// structural equality on [`Value`]. Install a custom context with
/// [`crate::Session::with_check`] (test harnesses typically record
/// failures instead of aborting).
pub trait CheckT: Send {
    /// Fail the current check with a descriptive message.
    fn fatal(&mut self, msg: &str);

    /// Expected-vs-actual predicate.
    fn matches(&self, expected: &Value, actual: &Value) -> bool {
        expected == actual
    }
}

/// Default assertion context: logs the failure and panics.
#[derive(Debug, Default)]
pub struct LogCheck;

impl CheckT for LogCheck {
    fn fatal(&mut self, msg: &str) {
        tracing::error!(target: "sqlbind", "{msg}");
        panic!("{msg}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_match_is_equality() {
        let c = LogCheck;
        assert!(c.matches(&Value::Int(1), &Value::Int(1)));
        assert!(!c.matches(&Value::Int(1), &Value::Text("1".into())));
    }

    #[test]
    #[should_panic(expected = "boom")]
    fn test_log_check_fatal_panics() {
        LogCheck.fatal("boom");
    }
}
