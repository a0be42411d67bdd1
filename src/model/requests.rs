//! Request and response value objects for the statement protocol.
//!
//! Every constructor validates its input so that malformed requests fail
//! before any I/O is attempted.

use crate::error::ArgumentError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::batch::Batch;

/// Server-supplied locator of the next batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationPointer(String);

impl ContinuationPointer {
    /// Create a pointer from a URI string.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// The URI as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ContinuationPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContinuationPointer {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ContinuationPointer {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Initial statement submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    query: String,
    options: HashMap<String, String>,
}

impl SubmitRequest {
    /// Create a submission for the given statement text.
    ///
    /// Trailing semicolons are stripped; the engine rejects them over this protocol.
    ///
    /// # Errors
    /// Returns `ArgumentError::EmptyQuery` if nothing remains after trimming.
    pub fn new(query: &str) -> Result<Self, ArgumentError> {
        let query = query.trim().trim_end_matches(';').trim_end();
        if query.is_empty() {
            return Err(ArgumentError::EmptyQuery);
        }

        Ok(Self {
            query: query.to_string(),
            options: HashMap::new(),
        })
    }

    /// Attach a transport-specific option (catalog, schema, session property...).
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// The normalized statement text.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Transport-specific options.
    pub fn options(&self) -> &HashMap<String, String> {
        &self.options
    }
}

/// Continuation request against a batch's `next_uri`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    next_uri: ContinuationPointer,
}

impl PollRequest {
    /// Create a poll request for an explicit pointer.
    pub fn new(next_uri: ContinuationPointer) -> Result<Self, ArgumentError> {
        if next_uri.is_blank() {
            return Err(ArgumentError::EmptyPointer { name: "next" });
        }
        Ok(Self { next_uri })
    }

    /// Create a poll request continuing from a previous batch.
    ///
    /// # Errors
    /// Returns `ArgumentError::EmptyPointer` if the batch is terminal.
    pub fn from_batch(previous: &Batch) -> Result<Self, ArgumentError> {
        let next_uri = previous
            .next_uri
            .clone()
            .ok_or(ArgumentError::EmptyPointer { name: "next" })?;
        Self::new(next_uri)
    }

    pub fn next_uri(&self) -> &ContinuationPointer {
        &self.next_uri
    }
}

/// Release request against the last known continuation pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseRequest {
    last_uri: ContinuationPointer,
}

impl CloseRequest {
    /// Create a close request.
    pub fn new(last_uri: ContinuationPointer) -> Result<Self, ArgumentError> {
        if last_uri.is_blank() {
            return Err(ArgumentError::EmptyPointer { name: "last" });
        }
        Ok(Self { last_uri })
    }

    pub fn last_uri(&self) -> &ContinuationPointer {
        &self.last_uri
    }
}

/// Outcome of a close request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CloseResponse {
    /// Whether the server acknowledged the release
    pub closed: bool,
}

impl CloseResponse {
    pub fn new(closed: bool) -> Self {
        Self { closed }
    }
}
