//! The statement language: classification, tokenizer, AST and parser.

pub mod ast;
pub mod lexer;
pub mod parser;

use serde::Serialize;
use thiserror::Error;

/// Statement text that does not match the supported grammar.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot parse statement '{statement}': {reason}")]
pub struct ParseError {
    pub statement: String,
    pub reason: String,
}

impl ParseError {
    pub fn new(statement: &str, reason: impl Into<String>) -> Self {
        Self {
            statement: statement.trim().to_owned(),
            reason: reason.into(),
        }
    }
}

/// Statement classes recognized by their leading keywords.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    AlterTable,
    ShowTables,
    ShowCreateTable,
    Refresh,
    Unknown,
}

/// Classifies a statement by case-insensitive prefix after trimming.
pub fn statement_type(text: &str) -> StatementKind {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    let starts = |prefix: &str| {
        normalized == prefix
            || normalized
                .strip_prefix(prefix)
                .map(|rest| rest.starts_with(|c: char| !c.is_ascii_alphanumeric() && c != '_'))
                .unwrap_or(false)
    };
    if starts("SELECT") {
        StatementKind::Select
    } else if starts("INSERT") {
        StatementKind::Insert
    } else if starts("UPDATE") {
        StatementKind::Update
    } else if starts("DELETE") {
        StatementKind::Delete
    } else if starts("CREATE TABLE") {
        StatementKind::CreateTable
    } else if starts("ALTER TABLE") {
        StatementKind::AlterTable
    } else if starts("SHOW TABLES") {
        StatementKind::ShowTables
    } else if starts("SHOW CREATE TABLE") {
        StatementKind::ShowCreateTable
    } else if starts("REFRESH") {
        StatementKind::Refresh
    } else {
        StatementKind::Unknown
    }
}

/// Double-quotes an identifier for the store.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quotes a string literal for the store.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
