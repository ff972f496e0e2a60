//! # Spreadsheet SQL
//!
//! Turns a directory of XLSX workbooks into relational tables, one per worksheet,
//! and answers SQL statements against them.
//!
//! ## Features
//!
//! - **Schema inference**: header, type and comment rows are detected per sheet,
//!   and column types are inferred from sampled values when no type row exists
//! - **Typed coercion**: every cell is coerced to its column type, and rows that
//!   cannot be coerced are skipped with a warning
//! - **Two backends**: an embedded DuckDB store, and an in-memory evaluator used
//!   when the store is unavailable
//! - **Write back**: modified tables are written into their workbooks with a
//!   names, types and comments header block
//! - **Tool server**: line-delimited JSON-RPC on stdio exposing listing, query,
//!   save, refresh and undo operations

pub mod database;
pub mod engine;
pub mod error;
pub(crate) mod helpers;
pub mod server;
pub mod spreadsheet;
pub mod sql;
pub mod workspace;

pub use error::SheetSqlError;
pub use spreadsheet::criteria::Criteria;
pub use workspace::StatementResult;
pub use workspace::Workspace;
