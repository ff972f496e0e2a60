//! Typed coercion of cell values into a column's declared type.

use crate::database::column::ColumnType;
use crate::database::value::parse_datetime;
use crate::database::value::parse_finite;
use crate::database::value::Value;
use crate::spreadsheet::cell::serial_to_datetime;
use thiserror::Error;

const TRUE_LITERALS: [&str; 5] = ["1", "true", "yes", "y", "是"];
const FALSE_LITERALS: [&str; 5] = ["0", "false", "no", "n", "否"];

/// A value that does not fit its column's declared type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot convert '{value}' at row {row}, column '{column}' to {target}")]
pub struct CoercionError {
    /// 1-based data row number
    pub row: usize,
    pub column: String,
    pub value: String,
    pub target: ColumnType,
}

/// Converts `value` to `target`, naming `row` and `column` on failure.
/// Null and blank input become null for every type except VARCHAR, which keeps blank text.
pub fn coerce(value: &Value, target: ColumnType, row: usize, column: &str) -> Result<Value, CoercionError> {
    convert(value, target).ok_or_else(|| CoercionError {
        row,
        column: column.to_owned(),
        value: value.to_string(),
        target,
    })
}

fn convert(value: &Value, target: ColumnType) -> Option<Value> {
    match (value, target) {
        (Value::Null, _) => Some(Value::Null),
        (Value::Text(text), ColumnType::Varchar) => Some(Value::Text(text.to_owned())),
        (Value::Text(text), _) if text.trim().is_empty() => Some(Value::Null),

        (Value::Int(value), ColumnType::Int) => Some(Value::Int(*value)),
        (Value::Float(value), ColumnType::Int) => truncate(*value).map(Value::Int),
        (Value::Bool(value), ColumnType::Int) => Some(Value::Int(*value as i64)),
        (Value::Text(text), ColumnType::Int) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| parse_finite(&normalize_number(text)).and_then(truncate))
                .map(Value::Int)
        }
        (Value::Date(_), ColumnType::Int) => None,

        (Value::Int(value), ColumnType::Double) => Some(Value::Float(*value as f64)),
        (Value::Float(value), ColumnType::Double) => Some(Value::Float(*value)),
        (Value::Bool(_), ColumnType::Double) => None,
        (Value::Text(text), ColumnType::Double) => parse_double(text).map(Value::Float),
        (Value::Date(_), ColumnType::Double) => None,

        (Value::Date(value), ColumnType::Date) => Some(Value::Date(*value)),
        (Value::Text(text), ColumnType::Date) => parse_datetime(text).map(Value::Date),
        (Value::Int(value), ColumnType::Date) => serial_to_datetime(*value as f64, false).map(Value::Date),
        (Value::Float(value), ColumnType::Date) => serial_to_datetime(*value, false).map(Value::Date),
        (Value::Bool(_), ColumnType::Date) => None,

        (Value::Bool(value), ColumnType::Boolean) => Some(Value::Bool(*value)),
        (Value::Int(1), ColumnType::Boolean) => Some(Value::Bool(true)),
        (Value::Int(0), ColumnType::Boolean) => Some(Value::Bool(false)),
        (Value::Int(_), ColumnType::Boolean) => None,
        (Value::Float(value), ColumnType::Boolean) if *value == 1.0 => Some(Value::Bool(true)),
        (Value::Float(value), ColumnType::Boolean) if *value == 0.0 => Some(Value::Bool(false)),
        (Value::Float(_), ColumnType::Boolean) => None,
        (Value::Text(text), ColumnType::Boolean) => parse_boolean(text).map(Value::Bool),
        (Value::Date(_), ColumnType::Boolean) => None,

        (value, ColumnType::Varchar) => Some(Value::Text(value.to_string())),
    }
}

/// Truncates toward zero, rejecting values outside the i64 range.
fn truncate(value: f64) -> Option<i64> {
    let value = value.trunc();
    if value.is_finite() && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

/// Parses a double, honoring a trailing percent sign and locale separators.
pub fn parse_double(text: &str) -> Option<f64> {
    let text = text.trim();
    match text.strip_suffix('%') {
        Some(number) => parse_finite(&normalize_number(number.trim())).map(|value| value / 100.0),
        None => parse_finite(&normalize_number(text)),
    }
}

/// A lone comma is a decimal separator; with a dot present commas group thousands.
fn normalize_number(text: &str) -> String {
    match (text.contains(','), text.contains('.')) {
        (true, false) => text.replace(',', "."),
        (true, true) => text.replace(',', ""),
        _ => text.to_owned(),
    }
}

pub fn parse_boolean(text: &str) -> Option<bool> {
    let text = text.trim().to_lowercase();
    if TRUE_LITERALS.contains(&text.as_str()) {
        Some(true)
    } else if FALSE_LITERALS.contains(&text.as_str()) {
        Some(false)
    } else {
        None
    }
}
