use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy of the fixture harness.
///
/// Setup-time kinds (`SnapshotNotFound`, `SnapshotOpen`, `SetupTimeout`) are
/// fatal to a whole suite; the rest fail a single scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("snapshot not found: stage '{stage}' (looked for {path})")]
    SnapshotNotFound { stage: String, path: String },

    #[error("failed to open snapshot {path}: {message}")]
    SnapshotOpen { path: String, message: String },

    #[error("snapshot setup timed out after {0:?}")]
    SetupTimeout(Duration),

    #[error("query execution failed: {message}")]
    QueryExecution { query: String, message: String },

    #[error("expected exactly {expected} row(s), query returned {actual}")]
    ResultCardinality { expected: usize, actual: usize },

    #[error("result mismatch: {0}")]
    AssertionMismatch(String),

    #[error("scenario timed out after {0:?}")]
    Timeout(Duration),

    #[error("query template error: {0}")]
    Template(String),

    #[error("nondeterministic result: run {run} digest {actual} differs from {expected}")]
    Nondeterministic {
        run: u32,
        expected: String,
        actual: String,
    },

    #[error("suite is {0}, expected ready")]
    Lifecycle(&'static str),
}

impl HarnessError {
    /// Stable snake_case label stored with results and shown in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::SnapshotNotFound { .. } => "snapshot_not_found",
            HarnessError::SnapshotOpen { .. } => "snapshot_open",
            HarnessError::SetupTimeout(_) => "setup_timeout",
            HarnessError::QueryExecution { .. } => "query_execution",
            HarnessError::ResultCardinality { .. } => "result_cardinality",
            HarnessError::AssertionMismatch(_) => "assertion_mismatch",
            HarnessError::Timeout(_) => "timeout",
            HarnessError::Template(_) => "template",
            HarnessError::Nondeterministic { .. } => "nondeterministic",
            HarnessError::Lifecycle(_) => "lifecycle",
        }
    }

    /// Mismatches are test failures; everything else is an execution error.
    pub fn is_assertion(&self) -> bool {
        matches!(
            self,
            HarnessError::AssertionMismatch(_)
                | HarnessError::ResultCardinality { .. }
                | HarnessError::Nondeterministic { .. }
        )
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
