//! Statement execution over either the relational store or the in-memory tables.
//!
//! Both backends implement [`QueryBackend`] over the same AST, so callers never
//! branch on which one is active.

pub mod expression;
pub mod memory;
pub mod store;

use crate::database::coercion::coerce;
use crate::database::column::Column;
use crate::database::store::RebuildReport;
use crate::database::table::Row;
use crate::database::table::Table;
use crate::database::value::Value;
use crate::error::SheetSqlError;
use crate::sql::ast::DeleteStatement;
use crate::sql::ast::SelectStatement;
use crate::sql::ast::UpdateStatement;
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

pub use memory::MemoryBackend;
pub use store::StoreBackend;

/// A condition, projection or join that cannot be evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Cannot apply '{operator}' to {left} and {right}")]
    TypeMismatch {
        operator: String,
        left: String,
        right: String,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Invalid LIKE pattern '{0}'")]
    InvalidPattern(String),

    #[error("Unsupported join condition '{0}', expected equalities between columns joined by AND")]
    UnsupportedJoin(String),

    #[error("{0} requires the relational store")]
    Unsupported(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Store,
    Memory,
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            BackendKind::Store => "store",
            BackendKind::Memory => "memory",
        })
    }
}

pub trait QueryBackend {
    fn kind(&self) -> BackendKind;

    /// Replaces every table with `tables`.
    fn load(&mut self, tables: &[&Table]) -> Result<RebuildReport, SheetSqlError>;

    /// Table names, sorted.
    fn table_names(&self) -> Result<Vec<String>, SheetSqlError>;

    /// Columns of `table` with their semantic types and comments.
    fn columns(&self, table: &str) -> Result<Vec<Column>, SheetSqlError>;

    fn select(&self, statement: &SelectStatement) -> Result<Vec<Row>, SheetSqlError>;

    fn update(&mut self, statement: &UpdateStatement) -> Result<usize, SheetSqlError>;

    fn delete(&mut self, statement: &DeleteStatement) -> Result<usize, SheetSqlError>;

    /// Runs statement text that has no AST form (INSERT, CREATE TABLE, ALTER TABLE, ...).
    fn execute(&mut self, text: &str) -> Result<usize, SheetSqlError>;

    /// Current content of `table`, in insertion order.
    fn export(&self, table: &str) -> Result<Table, SheetSqlError>;

    /// Canonical name of `name`, matched case-insensitively.
    fn resolve_table(&self, name: &str) -> Result<Option<String>, SheetSqlError> {
        let names = self.table_names()?;
        Ok(names
            .iter()
            .find(|table| *table == name)
            .or_else(|| names.iter().find(|table| table.eq_ignore_ascii_case(name)))
            .cloned())
    }

    /// `SHOW CREATE TABLE` rendering, one line per column.
    fn create_table(&self, table: &str) -> Result<String, SheetSqlError> {
        Ok(render_create_table(table, &self.columns(table)?))
    }

    /// SET values coerced to the declared types of their columns.
    fn assignment_values(&self, statement: &UpdateStatement) -> Result<Vec<Value>, SheetSqlError> {
        let columns = self.columns(&statement.table_name)?;
        statement
            .assignments
            .iter()
            .map(|(name, value)| -> Result<Value, SheetSqlError> {
                let column = columns
                    .iter()
                    .find(|column| column.name == *name)
                    .or_else(|| columns.iter().find(|column| column.name.eq_ignore_ascii_case(name)))
                    .ok_or_else(|| EvaluationError::UnknownColumn(name.to_owned()))?;
                Ok(coerce(value, column.kind, 1, &column.name)?)
            })
            .collect()
    }
}

pub fn render_create_table(table: &str, columns: &[Column]) -> String {
    let mut sql = format!("CREATE TABLE {table} (\n");
    for (index, column) in columns.iter().enumerate() {
        sql.push_str(&format!("    {} {}", column.name, column.kind));
        if let Some(comment) = &column.comment {
            sql.push_str(&format!(" -- {}", comment.replace(['\r', '\n'], " ")));
        }
        if index + 1 < columns.len() {
            sql.push(',');
        }
        sql.push('\n');
    }
    sql.push_str(");");
    sql
}

/// Opens the preferred backend: the store unless disabled or unavailable.
pub fn open_backend(use_store: bool) -> Box<dyn QueryBackend> {
    if use_store {
        match StoreBackend::open() {
            Ok(backend) => return Box::new(backend),
            Err(error) => tracing::warn!("Relational store unavailable, using in-memory evaluation: {}", error),
        }
    }
    Box::new(MemoryBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::column::ColumnType;

    #[test]
    fn render_schema() {
        let columns = vec![
            Column::new("ID", 0, ColumnType::Int),
            Column::new("Price", 1, ColumnType::Double).with_comment("unit price"),
        ];
        assert_eq!(
            render_create_table("Items", &columns),
            "CREATE TABLE Items (\n    ID INT,\n    Price DOUBLE -- unit price\n);"
        );
    }

    #[test]
    fn backend_selection() {
        assert_eq!(open_backend(false).kind(), BackendKind::Memory);
        assert_eq!(open_backend(true).kind(), BackendKind::Store);
    }
}
