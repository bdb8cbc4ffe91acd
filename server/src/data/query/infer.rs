//! Filter value type inference
//!
//! List endpoints receive loosely-typed filter values (JSON scalars or query
//! strings). When a schema entry does not pin the type down, the semantic
//! type is inferred here. The precedence is a fixed contract: enum match,
//! null, array, numeric string, boolean string, embedded JSON, date string,
//! plain string. Numeric-looking strings are never treated as dates, and
//! operator selection depends on this ordering, so it must not be reordered.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde_json::Value;

static NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("numeric regex"));

/// Semantic type of a filter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
    Json,
    Array,
    Enum,
}

/// A typed filter value, produced from a loosely-typed JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    Json(Value),
    Null,
}

/// Parse a date string: RFC 3339 first, then bare `YYYY-MM-DD` at midnight UTC
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

/// Infer the semantic type of a filter value
///
/// Returns `None` for null values, which contribute nothing to a predicate.
pub fn infer_type(value: &Value, enum_values: &[String]) -> Option<DataType> {
    if let Value::String(s) = value
        && !enum_values.is_empty()
        && enum_values.iter().any(|e| e.eq_ignore_ascii_case(s))
    {
        return Some(DataType::Enum);
    }

    match value {
        Value::Null => None,
        Value::Array(_) => Some(DataType::Array),
        Value::Number(_) => Some(DataType::Number),
        Value::Bool(_) => Some(DataType::Boolean),
        Value::Object(_) => Some(DataType::Json),
        Value::String(s) => Some(infer_string_type(s)),
    }
}

fn infer_string_type(s: &str) -> DataType {
    if NUMERIC_RE.is_match(s) {
        return DataType::Number;
    }
    if s == "true" || s == "false" {
        return DataType::Boolean;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(s)
        && matches!(parsed, Value::Object(_) | Value::Array(_))
    {
        return DataType::Json;
    }
    if parse_date(s).is_some() {
        return DataType::Date;
    }
    DataType::String
}

/// Convert a JSON value to a typed scalar under a target type
///
/// Returns `None` when the value cannot be coerced; the caller drops the
/// clause rather than failing the request.
pub fn to_scalar(value: &Value, data_type: DataType, enum_values: &[String]) -> Option<Scalar> {
    match data_type {
        DataType::String => Some(Scalar::Text(stringify(value)?)),
        DataType::Number => number_of(value).map(Scalar::Number),
        DataType::Boolean => bool_of(value).map(Scalar::Bool),
        DataType::Date => date_of(value).map(Scalar::Date),
        DataType::Json => json_of(value).map(Scalar::Json),
        DataType::Enum => {
            let s = value.as_str()?;
            enum_values
                .iter()
                .find(|e| e.eq_ignore_ascii_case(s))
                .map(|e| Scalar::Text(e.clone()))
        }
        // Array values are converted element-wise by the predicate builder
        DataType::Array => None,
    }
}

/// Convert a JSON value to a scalar using its inferred type
pub fn to_scalar_inferred(value: &Value, enum_values: &[String]) -> Option<Scalar> {
    let data_type = infer_type(value, enum_values)?;
    to_scalar(value, data_type, enum_values)
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn bool_of(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if s == "true" => Some(true),
        Value::String(s) if s == "false" => Some(false),
        _ => None,
    }
}

fn date_of(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date(s),
        Value::Number(n) => DateTime::from_timestamp(n.as_i64()?, 0),
        _ => None,
    }
}

fn json_of(value: &Value) -> Option<Value> {
    match value {
        Value::Object(_) | Value::Array(_) => Some(value.clone()),
        Value::String(s) => serde_json::from_str(s).ok(),
        _ => None,
    }
}
