//! Error types for sqlbind

use thiserror::Error;

/// Result type alias for sqlbind operations
pub type DbResult<T> = Result<T, DbError>;

/// Data-error taxonomy for statement execution and result binding.
///
/// These are runtime conditions and are routed through the session's
/// error handler when one is registered (see [`crate::Session::on_err`]).
/// Caller mistakes (missing table selection, malformed argument shapes,
/// ambiguous batch arguments) are *usage* errors and panic at the call
/// site instead of appearing here.
#[derive(Debug, Clone, Error)]
pub enum DbError {
    /// Query matched no rows where exactly one was required
    #[error("no rows in result set")]
    NoRows,

    /// Unique constraint violation
    #[error("duplicated")]
    Duplicated,

    /// Row-count guard failed (see [`crate::Session::limit_check`])
    #[error("out of limit")]
    OutOfLimit,

    /// Driver execution or query error
    #[error("driver error: {0}")]
    Driver(String),

    /// Row decode/mapping error
    #[error("decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// API invocation failure (returned error or caught panic)
    #[error("api error: {0}")]
    Api(String),

    /// An error annotated with the stage that produced it
    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<DbError>,
    },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl DbError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    /// Annotate this error with a stage label (the default error wrapper)
    pub fn stage(self, stage: &'static str) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Check if this is (or wraps) a no-rows error
    pub fn is_no_rows(&self) -> bool {
        match self {
            Self::NoRows => true,
            Self::Stage { source, .. } => source.is_no_rows(),
            _ => false,
        }
    }

    /// Check if this is (or wraps) a unique violation error
    pub fn is_duplicated(&self) -> bool {
        match self {
            Self::Duplicated => true,
            Self::Stage { source, .. } => source.is_duplicated(),
            _ => false,
        }
    }

    /// Check if this is (or wraps) an out-of-limit error
    pub fn is_out_of_limit(&self) -> bool {
        match self {
            Self::OutOfLimit => true,
            Self::Stage { source, .. } => source.is_out_of_limit(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_wrapping_preserves_kind() {
        let err = DbError::NoRows.stage("ret");
        assert!(err.is_no_rows());
        assert_eq!(err.to_string(), "ret: no rows in result set");
    }

    #[test]
    fn test_predicates_do_not_cross_kinds() {
        let err = DbError::Duplicated.stage("insert");
        assert!(err.is_duplicated());
        assert!(!err.is_no_rows());
        assert!(!err.is_out_of_limit());
    }
}
