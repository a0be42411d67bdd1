//! Fully materialized query results.

use crate::model::{Batch, Column, Stats, Warning};
use crate::types::{Row, Value};

/// Everything a finished query produced, collected in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    /// Result columns; empty for statements without a result set
    pub columns: Vec<Column>,
    /// Typed rows in server order
    pub rows: Vec<Row>,
    /// Statistics from the last batch observed
    pub stats: Stats,
    /// Warnings reported with the last batch
    pub warnings: Vec<Warning>,
    /// Statement kind for DDL/DML (e.g. "INSERT")
    pub update_type: Option<String>,
    /// Affected row count for DML
    pub update_count: Option<i64>,
}

impl QueryResults {
    pub(crate) fn new(columns: Vec<Column>, rows: Vec<Row>, last: &Batch) -> Self {
        Self {
            columns,
            rows,
            stats: last.stats.clone(),
            warnings: last.warnings.clone(),
            update_type: last.update_type.clone(),
            update_count: last.update_count,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column by case-insensitive name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Value at `row`, `column`.
    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Whether the statement produced a result set.
    pub fn has_result_set(&self) -> bool {
        !self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results() -> QueryResults {
        let last = Batch {
            update_type: Some("SELECT".to_string()),
            ..Default::default()
        };
        QueryResults::new(
            vec![Column::new("id", "bigint"), Column::new("Name", "varchar")],
            vec![
                vec![Value::BigInt(1), Value::Varchar("a".to_string())],
                vec![Value::BigInt(2), Value::Null],
            ],
            &last,
        )
    }

    #[test]
    fn test_accessors() {
        let r = results();
        assert_eq!(r.row_count(), 2);
        assert_eq!(r.column_count(), 2);
        assert_eq!(r.column_names(), vec!["id", "Name"]);
        assert_eq!(r.column_index("name"), Some(1));
        assert_eq!(r.column_index("missing"), None);
        assert_eq!(r.value(1, 0), Some(&Value::BigInt(2)));
        assert!(r.value(1, 1).unwrap().is_null());
        assert!(r.value(5, 0).is_none());
        assert!(r.has_result_set());
        assert_eq!(r.update_type.as_deref(), Some("SELECT"));
    }

    #[test]
    fn test_update_statement_has_no_result_set() {
        let last = Batch {
            update_type: Some("INSERT".to_string()),
            update_count: Some(3),
            ..Default::default()
        };
        let r = QueryResults::new(Vec::new(), Vec::new(), &last);
        assert!(!r.has_result_set());
        assert_eq!(r.update_count, Some(3));
    }
}
