//! Typed cell values resolved against declared column types.

use crate::error::ConversionError;
use crate::model::Column;
use serde_json::Value as JsonValue;

use super::mapping::EngineType;

/// A single typed cell.
///
/// Temporal, decimal and network types keep the engine's textual encoding so
/// no precision is lost.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    TinyInt(i8),
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Real(f32),
    Double(f64),
    Decimal(String),
    Varchar(String),
    Char(String),
    /// Base64 text as sent by the server
    Varbinary(String),
    Json(String),
    Date(String),
    Time(String),
    Timestamp(String),
    Interval(String),
    Uuid(String),
    IpAddress(String),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Row(Vec<Value>),
    /// Value of a type this crate does not model
    Unknown(JsonValue),
}

/// One result row, ordered like the column list.
pub type Row = Vec<Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integral value widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Integer(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Textual payload of string-encoded types.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Decimal(s)
            | Value::Varchar(s)
            | Value::Char(s)
            | Value::Varbinary(s)
            | Value::Json(s)
            | Value::Date(s)
            | Value::Time(s)
            | Value::Timestamp(s)
            | Value::Interval(s)
            | Value::Uuid(s)
            | Value::IpAddress(s) => Some(s),
            _ => None,
        }
    }
}

/// Resolves raw JSON rows against a fixed list of column types.
#[derive(Debug, Clone)]
pub struct ValueResolver {
    types: Vec<EngineType>,
}

impl ValueResolver {
    /// Create a resolver for explicit types.
    pub fn new(types: Vec<EngineType>) -> Self {
        Self { types }
    }

    /// Create a resolver by parsing each column's type tag.
    pub fn for_columns(columns: &[Column]) -> Result<Self, ConversionError> {
        let types = columns
            .iter()
            .map(Column::engine_type)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(types))
    }

    pub fn types(&self) -> &[EngineType] {
        &self.types
    }

    /// Resolve one raw row.
    ///
    /// # Errors
    /// Returns `ConversionError::SchemaMismatch` when the row width differs from
    /// the column count, and `ValueConversionFailed` for an incompatible cell.
    pub fn resolve_row(&self, row: usize, raw: &[JsonValue]) -> Result<Row, ConversionError> {
        if raw.len() != self.types.len() {
            return Err(ConversionError::SchemaMismatch(format!(
                "row {} has {} values but {} columns were declared",
                row,
                raw.len(),
                self.types.len()
            )));
        }

        raw.iter()
            .zip(&self.types)
            .enumerate()
            .map(|(column, (cell, ty))| {
                resolve(ty, cell).map_err(|message| ConversionError::ValueConversionFailed {
                    row,
                    column,
                    message,
                })
            })
            .collect()
    }
}

fn resolve(ty: &EngineType, raw: &JsonValue) -> Result<Value, String> {
    if raw.is_null() {
        return Ok(Value::Null);
    }

    match ty {
        EngineType::Boolean => raw
            .as_bool()
            .map(Value::Boolean)
            .ok_or_else(|| mismatch(ty, raw)),
        EngineType::TinyInt => integral(ty, raw).and_then(|v| {
            i8::try_from(v)
                .map(Value::TinyInt)
                .map_err(|_| format!("{} out of range for tinyint", v))
        }),
        EngineType::SmallInt => integral(ty, raw).and_then(|v| {
            i16::try_from(v)
                .map(Value::SmallInt)
                .map_err(|_| format!("{} out of range for smallint", v))
        }),
        EngineType::Integer => integral(ty, raw).and_then(|v| {
            i32::try_from(v)
                .map(Value::Integer)
                .map_err(|_| format!("{} out of range for integer", v))
        }),
        EngineType::BigInt => integral(ty, raw).map(Value::BigInt),
        EngineType::Real => floating(ty, raw).map(|v| Value::Real(v as f32)),
        EngineType::Double => floating(ty, raw).map(Value::Double),
        EngineType::Decimal { .. } => match raw {
            JsonValue::String(s) => Ok(Value::Decimal(s.clone())),
            JsonValue::Number(n) => Ok(Value::Decimal(n.to_string())),
            _ => Err(mismatch(ty, raw)),
        },
        EngineType::Varchar { .. } => text(ty, raw).map(Value::Varchar),
        EngineType::Char { .. } => text(ty, raw).map(Value::Char),
        EngineType::Varbinary => text(ty, raw).map(Value::Varbinary),
        EngineType::Json => Ok(Value::Json(match raw {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })),
        EngineType::Date => text(ty, raw).map(Value::Date),
        EngineType::Time { .. } => text(ty, raw).map(Value::Time),
        EngineType::Timestamp { .. } => text(ty, raw).map(Value::Timestamp),
        EngineType::IntervalYearToMonth | EngineType::IntervalDayToSecond => {
            text(ty, raw).map(Value::Interval)
        }
        EngineType::Uuid => text(ty, raw).map(Value::Uuid),
        EngineType::IpAddress => text(ty, raw).map(Value::IpAddress),
        EngineType::Array(element) => match raw {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| resolve(element, item))
                .collect::<Result<_, _>>()
                .map(Value::Array),
            _ => Err(mismatch(ty, raw)),
        },
        EngineType::Map(key_ty, value_ty) => match raw {
            JsonValue::Object(entries) => entries
                .iter()
                .map(|(key, value)| -> Result<(Value, Value), String> {
                    Ok((resolve_key(key_ty, key)?, resolve(value_ty, value)?))
                })
                .collect::<Result<_, _>>()
                .map(Value::Map),
            _ => Err(mismatch(ty, raw)),
        },
        EngineType::Row(fields) => match raw {
            JsonValue::Array(items) if items.len() == fields.len() => items
                .iter()
                .zip(fields)
                .map(|(item, (_, field_ty))| resolve(field_ty, item))
                .collect::<Result<_, _>>()
                .map(Value::Row),
            _ => Err(mismatch(ty, raw)),
        },
        EngineType::Unknown(_) => Ok(Value::Unknown(raw.clone())),
    }
}

/// Map keys always arrive as JSON object keys, i.e. strings.
fn resolve_key(ty: &EngineType, key: &str) -> Result<Value, String> {
    match ty {
        EngineType::Varchar { .. } | EngineType::Char { .. } => {
            resolve(ty, &JsonValue::String(key.to_string()))
        }
        _ => {
            let parsed = serde_json::from_str::<JsonValue>(key)
                .unwrap_or_else(|_| JsonValue::String(key.to_string()));
            resolve(ty, &parsed)
        }
    }
}

fn integral(ty: &EngineType, raw: &JsonValue) -> Result<i64, String> {
    match raw {
        JsonValue::Number(n) => n.as_i64().ok_or_else(|| mismatch(ty, raw)),
        JsonValue::String(s) => s.parse::<i64>().map_err(|_| mismatch(ty, raw)),
        _ => Err(mismatch(ty, raw)),
    }
}

/// Non-finite doubles are sent as the strings `NaN`, `Infinity` and `-Infinity`.
fn floating(ty: &EngineType, raw: &JsonValue) -> Result<f64, String> {
    match raw {
        JsonValue::Number(n) => n.as_f64().ok_or_else(|| mismatch(ty, raw)),
        JsonValue::String(s) => match s.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            other => other.parse::<f64>().map_err(|_| mismatch(ty, raw)),
        },
        _ => Err(mismatch(ty, raw)),
    }
}

fn text(ty: &EngineType, raw: &JsonValue) -> Result<String, String> {
    raw.as_str()
        .map(str::to_string)
        .ok_or_else(|| mismatch(ty, raw))
}

fn mismatch(ty: &EngineType, raw: &JsonValue) -> String {
    format!("expected {} but found {}", ty, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver(tags: &[&str]) -> ValueResolver {
        let columns: Vec<Column> = tags
            .iter()
            .enumerate()
            .map(|(i, tag)| Column::new(format!("c{}", i), *tag))
            .collect();
        ValueResolver::for_columns(&columns).unwrap()
    }

    #[test]
    fn test_resolve_scalars() {
        let r = resolver(&["boolean", "integer", "double", "decimal(10,2)", "varchar", "date"]);
        let row = r
            .resolve_row(
                0,
                &[
                    json!(true),
                    json!(42),
                    json!("NaN"),
                    json!("12.30"),
                    json!("abc"),
                    json!("2024-01-31"),
                ],
            )
            .unwrap();

        assert_eq!(row[0], Value::Boolean(true));
        assert_eq!(row[1].as_i64(), Some(42));
        assert!(row[2].as_f64().unwrap().is_nan());
        assert_eq!(row[3].as_str(), Some("12.30"));
        assert_eq!(row[4], Value::Varchar("abc".to_string()));
        assert_eq!(row[5], Value::Date("2024-01-31".to_string()));
    }

    #[test]
    fn test_resolve_nulls() {
        let r = resolver(&["bigint", "array(bigint)"]);
        let row = r.resolve_row(0, &[json!(null), json!(null)]).unwrap();
        assert!(row.iter().all(Value::is_null));
    }

    #[test]
    fn test_resolve_nested() {
        let r = resolver(&["array(integer)", "map(bigint, varchar)", "row(x bigint, y varchar)"]);
        let row = r
            .resolve_row(
                0,
                &[json!([1, 2, null]), json!({"7": "seven"}), json!([3, "three"])],
            )
            .unwrap();

        assert_eq!(
            row[0],
            Value::Array(vec![Value::Integer(1), Value::Integer(2), Value::Null])
        );
        assert_eq!(
            row[1],
            Value::Map(vec![(Value::BigInt(7), Value::Varchar("seven".to_string()))])
        );
        assert_eq!(
            row[2],
            Value::Row(vec![Value::BigInt(3), Value::Varchar("three".to_string())])
        );
    }

    #[test]
    fn test_width_mismatch() {
        let r = resolver(&["bigint", "bigint"]);
        let err = r.resolve_row(3, &[json!(1)]).unwrap_err();
        assert!(matches!(err, ConversionError::SchemaMismatch(_)));
    }

    #[test]
    fn test_value_mismatch_reports_position() {
        let r = resolver(&["varchar", "boolean"]);
        let err = r.resolve_row(4, &[json!("a"), json!("yes")]).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::ValueConversionFailed { row: 4, column: 1, .. }
        ));
    }

    #[test]
    fn test_range_checks() {
        let r = resolver(&["tinyint"]);
        assert!(r.resolve_row(0, &[json!(300)]).is_err());
        assert_eq!(r.resolve_row(0, &[json!(-5)]).unwrap()[0], Value::TinyInt(-5));
    }

    #[test]
    fn test_unknown_type_passthrough() {
        let r = resolver(&["HyperLogLog"]);
        let row = r.resolve_row(0, &[json!("AgwBAIADRAA=")]).unwrap();
        assert_eq!(row[0], Value::Unknown(json!("AgwBAIADRAA=")));
    }
}
