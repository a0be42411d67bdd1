//! Error types for presto-stream.
//!
//! This module defines domain-specific error types organized by functional area.

use std::fmt;
use thiserror::Error;

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The server reported a failed query, or a deadline expired before submission finished
    #[error(transparent)]
    Query(#[from] QueryError),

    /// The caller used a batched response in a way the protocol does not allow
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Invalid constructor input, rejected before any I/O
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// Typed value resolution errors
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Transport errors raised by a `StatementClient`
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Location of a failure inside the submitted statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorLocation {
    pub line_number: i32,
    pub column_number: i32,
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{}", self.line_number, self.column_number)
    }
}

/// Errors reported by the engine for a query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The server attached a terminal error to a batch
    #[error("Query failed ({name} {code}): {message}")]
    Failed {
        name: String,
        code: i32,
        error_type: Option<String>,
        message: String,
        location: Option<ErrorLocation>,
    },

    /// The request deadline ran out before the initial batch was received
    #[error("Query timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Violations of the single-pass batch contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// Rows were requested after the query was closed
    #[error("cannot get batches: query already closed")]
    QueryClosed,

    /// No batch carrying columns was observed before the query closed
    #[error("cannot get columns: no batch with columns was observed before the query closed")]
    ColumnsUnavailable,

    /// No batch was observed before the query closed
    #[error("cannot get stats: no batch was observed before the query closed")]
    StatsUnavailable,
}

/// Invalid arguments supplied to a constructor or builder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    /// Query text is empty or only whitespace and semicolons
    #[error("The query cannot be empty")]
    EmptyQuery,

    /// A continuation pointer was empty
    #[error("The {name} pointer cannot be empty")]
    EmptyPointer { name: &'static str },

    /// A configuration value is out of range or malformed
    #[error("Invalid configuration parameter '{parameter}': {message}")]
    InvalidConfig { parameter: String, message: String },
}

/// Errors related to resolving raw cell values against declared column types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// The type tag could not be parsed
    #[error("Unsupported engine type: {type_tag}")]
    UnsupportedType { type_tag: String },

    /// Failed to convert value
    #[error("Failed to convert value at row {row}, column {column}: {message}")]
    ValueConversionFailed {
        row: usize,
        column: usize,
        message: String,
    },

    /// Row width differs from the column list
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

/// Errors raised by transport implementations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Non-success HTTP status
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Network I/O error
    #[error("Network I/O error: {0}")]
    IoError(String),

    /// The request was abandoned because its cancellation token fired
    #[error("Request cancelled")]
    Cancelled,
}

/// Coarse classification of a [`ClientError`], used in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Server-side query failure
    Query,
    /// Caller violated the batch protocol
    Usage,
    /// Invalid argument
    InvalidArgument,
    /// Value conversion failure
    Conversion,
    /// Network or decoding failure
    Transport,
    /// Deadline exhausted
    Timeout,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Query => write!(f, "QUERY"),
            ErrorCategory::Usage => write!(f, "USAGE"),
            ErrorCategory::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorCategory::Conversion => write!(f, "CONVERSION"),
            ErrorCategory::Transport => write!(f, "TRANSPORT"),
            ErrorCategory::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

impl ClientError {
    /// Map to an error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ClientError::Query(e) => e.category(),
            ClientError::Usage(_) => ErrorCategory::Usage,
            ClientError::Argument(_) => ErrorCategory::InvalidArgument,
            ClientError::Conversion(_) => ErrorCategory::Conversion,
            ClientError::Transport(_) => ErrorCategory::Transport,
        }
    }

    /// Whether this is a server-reported query failure.
    pub fn is_query_failure(&self) -> bool {
        matches!(self, ClientError::Query(QueryError::Failed { .. }))
    }
}

impl QueryError {
    /// Map to an error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            QueryError::Failed { .. } => ErrorCategory::Query,
            QueryError::Timeout { .. } => ErrorCategory::Timeout,
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::DeserializationError(err.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::IoError(err.to_string())
    }
}
