use crate::database::value::parse_datetime;
use crate::database::value::parse_finite;
use crate::database::value::Value;
use crate::error::SheetSqlError;
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

/// Errors related to column type parsing and validation.
#[derive(Error, Debug)]
pub enum ColumnError {
    #[error("Invalid column type '{0}'")]
    TypeError(String),
}

/// Semantic column types inferred from sheet data.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    /// 64-bit signed integers
    Int,
    /// Double-precision floating point numbers
    Double,
    /// Date and time, second precision
    Date,
    /// Boolean values, stored as 0/1
    Boolean,
    /// Free text
    Varchar,
}

/// A column of a sheet table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    /// Column name from the header row
    pub name: String,
    /// Position in the source grid (0-based)
    pub index: usize,
    /// Semantic type, fixed for a load cycle
    pub kind: ColumnType,
    /// Free-text description from the comment row
    pub comment: Option<String>,
}

impl Column {
    pub fn new(name: &str, index: usize, kind: ColumnType) -> Self {
        Self {
            name: name.to_owned(),
            index,
            kind,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_owned()).filter(|comment| !comment.trim().is_empty());
        self
    }
}

impl ColumnType {
    /// Name written to the type row and to `SHOW CREATE TABLE`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Date => "DATE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    /// Relational storage type used in the store.
    pub const fn storage_type(&self) -> &'static str {
        match self {
            ColumnType::Int => "BIGINT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Date => "VARCHAR",
            ColumnType::Boolean => "INTEGER",
            ColumnType::Varchar => "VARCHAR",
        }
    }

    /// Parses a column type from a string representation.
    /// Supports various aliases for each type.
    pub fn parse(name: &str) -> Result<Self, SheetSqlError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "BOOL" | "BOOLEAN" => Ok(Self::Boolean),
            "INT" | "BIGINT" | "INTEGER" | "LONG" => Ok(Self::Int),
            "FLOAT" | "DOUBLE" | "REAL" | "DECIMAL" | "NUMERIC" => Ok(Self::Double),
            "TEXT" | "STRING" | "VARCHAR" => Ok(Self::Varchar),
            "DATE" | "DATETIME" | "TIMESTAMP" => Ok(Self::Date),
            _ => Err(ColumnError::TypeError(name.to_string()))?,
        }
    }

    /// Type implied by a single sampled value.
    /// Precedence: integer, floating-point, date literal, then text.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Boolean),
            Value::Date(_) => Some(ColumnType::Date),
            Value::Int(_) => Some(ColumnType::Int),
            Value::Float(_) => Some(ColumnType::Double),
            Value::Text(text) if text.trim().is_empty() => None,
            Value::Text(text) => {
                let text = text.trim();
                if text.parse::<i64>().is_ok() {
                    Some(ColumnType::Int)
                } else if parse_finite(text).is_some() {
                    Some(ColumnType::Double)
                } else if parse_datetime(text).is_some() {
                    Some(ColumnType::Date)
                } else {
                    Some(ColumnType::Varchar)
                }
            }
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
