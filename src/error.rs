//! Error types for cqlkit.
//!
//! Error codes are organized by category:
//!
//! - **CQL-E100 to CQL-E199**: Query text and parsing errors
//! - **CQL-E200 to CQL-E299**: Rewrite and validation errors
//! - **CQL-E300 to CQL-E399**: Execution errors
//!
//! Rewrite errors are permanent: they describe a query the author has to
//! change, not a transient condition worth retrying.

use thiserror::Error;

/// Main error type for cqlkit operations.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Empty query string provided.
    #[error("Query cannot be empty")]
    EmptyQuery,

    /// Query text could not be parsed.
    #[error("Parse error at position {position}: {message}")]
    ParseFailed { message: String, position: usize },

    /// A sharing clause is placed where the rewrite cannot give it a
    /// meaning (MustNot sharing, range over the sharing field, or sharing
    /// and general clauses mixed inside one inner group).
    #[error("Invalid sharing query: {reason}")]
    InvalidSharingQuery { reason: String },

    /// A clause combination the rewrite pipeline deliberately does not
    /// support. Failing loudly here beats producing a silently wrong query.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// The backing search engine reported a genuine failure.
    #[error("Query execution failed: {reason}")]
    ExecutionFailed { reason: String },
}

impl QueryError {
    /// Returns the error code for this error.
    pub const fn error_code(&self) -> &'static str {
        match self {
            QueryError::EmptyQuery => "CQL-E101",
            QueryError::ParseFailed { .. } => "CQL-E102",
            QueryError::InvalidSharingQuery { .. } => "CQL-E201",
            QueryError::Unsupported { .. } => "CQL-E202",
            QueryError::ExecutionFailed { .. } => "CQL-E301",
        }
    }

    /// Returns the severity level for this error.
    pub const fn severity(&self) -> &'static str {
        "error"
    }

    /// Returns remediation hints for this error, if available.
    pub const fn remediation(&self) -> Option<&'static str> {
        match self {
            QueryError::EmptyQuery => Some("Provide a non-empty query string."),
            QueryError::ParseFailed { .. } => {
                Some("Check the query syntax near the reported position.")
            }
            QueryError::InvalidSharingQuery { .. } => Some(
                "Sharing clauses cannot be negated, used in ranges, or mixed \
                 with other fields inside a parenthesized group.",
            ),
            QueryError::Unsupported { .. } => {
                Some("Rephrase the query to avoid the unsupported clause combination.")
            }
            QueryError::ExecutionFailed { .. } => {
                Some("Check that the search index is reachable and consistent.")
            }
        }
    }
}
