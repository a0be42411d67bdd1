//! The statement protocol response unit.

use crate::error::{ConversionError, ErrorLocation, QueryError};
use crate::types::{EngineType, Row, ValueResolver};
use serde::{Deserialize, Serialize};

use super::requests::ContinuationPointer;
use super::stats::Stats;

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Engine type tag, e.g. `varchar(25)` or `decimal(10,2)`
    #[serde(rename = "type")]
    pub type_tag: String,
}

impl Column {
    /// Create a column from a name and type tag.
    pub fn new(name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: type_tag.into(),
        }
    }

    /// Parse the declared type tag.
    pub fn engine_type(&self) -> Result<EngineType, ConversionError> {
        self.type_tag.parse()
    }
}

/// Position of a failure in the statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLocationInfo {
    pub line_number: i32,
    pub column_number: i32,
}

/// Terminal failure descriptor attached to a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryErrorInfo {
    pub message: String,
    #[serde(default)]
    pub sql_state: Option<String>,
    #[serde(default)]
    pub error_code: i32,
    #[serde(default)]
    pub error_name: String,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_location: Option<ErrorLocationInfo>,
}

impl From<&QueryErrorInfo> for QueryError {
    fn from(info: &QueryErrorInfo) -> Self {
        QueryError::Failed {
            name: info.error_name.clone(),
            code: info.error_code,
            error_type: info.error_type.clone(),
            message: info.message.clone(),
            location: info.error_location.map(|l| ErrorLocation {
                line_number: l.line_number,
                column_number: l.column_number,
            }),
        }
    }
}

/// Warning code attached to a [`Warning`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningCode {
    pub code: i32,
    pub name: String,
}

/// Non-fatal warning reported by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub warning_code: WarningCode,
    pub message: String,
}

/// One protocol response unit from submit or poll.
///
/// A batch is immutable once received. A batch with `error` set is the last
/// batch produced for its query, and a batch whose `next_uri` is absent is
/// terminal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    /// Query id
    pub id: String,
    /// Coordinator page describing the query
    pub info_uri: String,
    /// Continuation pointer; `None` marks the terminal batch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_uri: Option<ContinuationPointer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_cancel_uri: Option<String>,
    /// Result schema, present at most once per query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
    /// Raw rows; absent does not mean terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Vec<serde_json::Value>>>,
    #[serde(default)]
    pub stats: Stats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<QueryErrorInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    /// Statement kind for non-SELECT statements (e.g. `INSERT`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_count: Option<i64>,
}

impl Batch {
    /// Whether this batch carries a data section.
    pub fn has_rows(&self) -> bool {
        self.data.is_some()
    }

    /// Whether this batch carries the result schema.
    pub fn has_columns(&self) -> bool {
        self.columns.is_some()
    }

    /// Whether the server signalled that no further batch follows.
    pub fn is_terminal(&self) -> bool {
        self.next_uri.is_none()
    }

    /// Whether the server reported a failure on this batch.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Number of rows in the data section.
    pub fn row_count(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// The failure reported on this batch, as an error value.
    pub fn query_error(&self) -> Option<QueryError> {
        self.error.as_ref().map(QueryError::from)
    }

    /// Resolve the raw rows against a column list.
    ///
    /// # Errors
    /// Returns `ConversionError` if a type tag cannot be parsed, a row has the
    /// wrong width, or a cell does not match its declared type.
    pub fn typed_rows(&self, columns: &[Column]) -> Result<Vec<Row>, ConversionError> {
        let Some(data) = self.data.as_ref() else {
            return Ok(Vec::new());
        };

        let resolver = ValueResolver::for_columns(columns)?;
        data.iter()
            .enumerate()
            .map(|(index, raw)| resolver.resolve_row(index, raw))
            .collect()
    }
}
