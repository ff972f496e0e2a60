//! The relational mirror of all sheet tables, held in an in-memory DuckDB database.

use crate::database::coercion::coerce;
use crate::database::column::Column;
use crate::database::column::ColumnType;
use crate::database::table::Row;
use crate::database::table::Table;
use crate::database::value::parse_datetime;
use crate::database::value::Value;
use crate::database::value::DATE_FORMAT;
use crate::error::SheetSqlError;
use crate::sql::quote_identifier;
use duckdb::params_from_iter;
use duckdb::types::Value as DuckValue;
use duckdb::Connection;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Side table holding semantic types and comments per (table, column).
pub const METADATA_TABLE: &str = "__sheet_columns";

/// Outcome of a rebuild.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub tables: usize,
    pub inserted_rows: usize,
    pub skipped_rows: usize,
}

pub struct Store {
    connection: Connection,
}

impl Store {
    pub fn open() -> Result<Self, SheetSqlError> {
        let connection = Connection::open_in_memory()?;
        Ok(Self { connection })
    }

    /// Drops every user table and recreates one table per model inside a single transaction.
    /// Rows with a cell that does not coerce to its column type are logged and skipped.
    pub fn rebuild(&mut self, tables: &[&Table]) -> Result<RebuildReport, SheetSqlError> {
        let existing = self.table_names_including_metadata()?;
        let transaction = self.connection.transaction()?;
        for name in existing {
            transaction.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_identifier(&name)))?;
        }
        transaction.execute_batch(&format!(
            "CREATE TABLE {} (table_name VARCHAR NOT NULL, column_name VARCHAR NOT NULL, ordinal INTEGER NOT NULL, column_type VARCHAR NOT NULL, comment VARCHAR, PRIMARY KEY (table_name, column_name))",
            quote_identifier(METADATA_TABLE)
        ))?;

        let mut report = RebuildReport::default();
        for table in tables {
            let definitions = table
                .columns
                .iter()
                .map(|column| format!("{} {}", quote_identifier(&column.name), column.kind.storage_type()))
                .collect::<Vec<_>>()
                .join(", ");
            transaction.execute_batch(&format!("CREATE TABLE {} ({})", quote_identifier(&table.name), definitions))?;

            {
                let mut statement = transaction.prepare(&format!(
                    "INSERT INTO {} VALUES (?, ?, ?, ?, ?)",
                    quote_identifier(METADATA_TABLE)
                ))?;
                for (ordinal, column) in table.columns.iter().enumerate() {
                    statement.execute(params_from_iter([
                        DuckValue::Text(table.name.to_owned()),
                        DuckValue::Text(column.name.to_owned()),
                        DuckValue::Int(ordinal as i32),
                        DuckValue::Text(column.kind.as_str().to_owned()),
                        column.comment.to_owned().map(DuckValue::Text).unwrap_or(DuckValue::Null),
                    ]))?;
                }
            }

            let placeholders = vec!["?"; table.columns.len()].join(", ");
            let mut statement = transaction.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quote_identifier(&table.name),
                placeholders
            ))?;
            for (index, row) in table.rows.iter().enumerate() {
                match storage_values(table, row, index + 1) {
                    Ok(values) => {
                        statement.execute(params_from_iter(values))?;
                        report.inserted_rows += 1;
                    }
                    Err(error) => {
                        warn!(
                            "Skipping row {} of table '{}': {}; row data: {}",
                            index + 1,
                            table.name,
                            error,
                            serde_json::to_string(row).unwrap_or_default()
                        );
                        report.skipped_rows += 1;
                    }
                }
            }
            report.tables += 1;
        }
        transaction.commit()?;
        info!(
            "Rebuilt store: {} table(s), {} row(s) inserted, {} row(s) skipped",
            report.tables, report.inserted_rows, report.skipped_rows
        );
        Ok(report)
    }

    fn table_names_including_metadata(&self) -> Result<Vec<String>, SheetSqlError> {
        let mut statement = self.connection.prepare(
            "SELECT table_name FROM information_schema.tables WHERE table_schema = 'main' AND table_type = 'BASE TABLE' ORDER BY table_name",
        )?;
        let names = statement
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// User tables, sorted by name.
    pub fn table_names(&self) -> Result<Vec<String>, SheetSqlError> {
        let names = self.table_names_including_metadata()?;
        Ok(names.into_iter().filter(|name| name != METADATA_TABLE).collect())
    }

    /// Columns of `table`, from the metadata table or, for tables created by statements, from the catalog.
    pub fn columns(&self, table: &str) -> Result<Vec<Column>, SheetSqlError> {
        let mut statement = self.connection.prepare(&format!(
            "SELECT column_name, column_type, comment FROM {} WHERE table_name = ? ORDER BY ordinal",
            quote_identifier(METADATA_TABLE)
        ))?;
        let described = statement
            .query_map([table], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, Option<String>>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut statement = self.connection.prepare(
            "SELECT column_name, data_type FROM information_schema.columns WHERE table_schema = 'main' AND table_name = ? ORDER BY ordinal_position",
        )?;
        let catalog = statement
            .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let columns = catalog
            .into_iter()
            .enumerate()
            .map(|(index, (name, data_type))| {
                match described.iter().find(|(described, _, _)| *described == name) {
                    Some((_, kind, comment)) => {
                        let kind = ColumnType::parse(kind).unwrap_or(ColumnType::Varchar);
                        let column = Column::new(&name, index, kind);
                        match comment {
                            Some(comment) => column.with_comment(comment),
                            None => column,
                        }
                    }
                    None => Column::new(&name, index, storage_to_column_type(&data_type)),
                }
            })
            .collect();
        Ok(columns)
    }

    /// Runs a query and returns its rows with storage values decoded.
    pub fn query(&self, sql: &str) -> Result<Vec<Row>, SheetSqlError> {
        debug!("Store query: {}", sql);
        let mut statement = self.connection.prepare(sql)?;
        let mut rows = statement.query([])?;
        let names: Vec<String> = rows.as_ref().map(|statement| statement.column_names()).unwrap_or_default();
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::with_capacity(names.len());
            for (index, name) in names.iter().enumerate() {
                let value: DuckValue = row.get(index)?;
                record.push(name.to_owned(), from_duck_value(value));
            }
            result.push(record);
        }
        Ok(result)
    }

    /// Runs a statement and returns the number of changed rows.
    pub fn execute(&self, sql: &str) -> Result<usize, SheetSqlError> {
        debug!("Store execute: {}", sql);
        Ok(self.connection.execute(sql, [])?)
    }

    /// Reads the current content of `table` back into a model, in insertion order.
    pub fn export(&self, table: &str) -> Result<Table, SheetSqlError> {
        let columns = self.columns(table)?;
        let projection = columns
            .iter()
            .map(|column| quote_identifier(&column.name))
            .collect::<Vec<_>>()
            .join(", ");
        let rows = self.query(&format!("SELECT {} FROM {} ORDER BY rowid", projection, quote_identifier(table)))?;
        let mut model = Table::new(table, columns);
        for row in rows {
            let values = model
                .columns
                .iter()
                .map(|column| from_storage(row.get(&column.name).cloned().unwrap_or_default(), column.kind))
                .collect();
            model.push_values(values);
        }
        Ok(model)
    }
}

/// Coerces one row to its storage values, in column order.
fn storage_values(table: &Table, row: &Row, number: usize) -> Result<Vec<DuckValue>, SheetSqlError> {
    table
        .columns
        .iter()
        .map(|column| {
            let raw = row.get(&column.name).cloned().unwrap_or_default();
            let value = coerce(&raw, column.kind, number, &column.name)?;
            Ok(to_duck_value(value))
        })
        .collect()
}

/// Storage form of a coerced value: booleans as 0/1, dates as canonical text.
pub(crate) fn to_duck_value(value: Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Int(value) => DuckValue::BigInt(value),
        Value::Float(value) => DuckValue::Double(value),
        Value::Text(value) => DuckValue::Text(value),
        Value::Bool(value) => DuckValue::Int(value as i32),
        Value::Date(value) => DuckValue::Text(value.format(DATE_FORMAT).to_string()),
    }
}

fn from_duck_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Int(value as i64),
        DuckValue::SmallInt(value) => Value::Int(value as i64),
        DuckValue::Int(value) => Value::Int(value as i64),
        DuckValue::BigInt(value) => Value::Int(value),
        DuckValue::HugeInt(value) => i64::try_from(value).map(Value::Int).unwrap_or(Value::Float(value as f64)),
        DuckValue::UTinyInt(value) => Value::Int(value as i64),
        DuckValue::USmallInt(value) => Value::Int(value as i64),
        DuckValue::UInt(value) => Value::Int(value as i64),
        DuckValue::UBigInt(value) => i64::try_from(value).map(Value::Int).unwrap_or(Value::Float(value as f64)),
        DuckValue::Float(value) => Value::Float(value as f64),
        DuckValue::Double(value) => Value::Float(value),
        DuckValue::Decimal(value) => value.to_string().parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        DuckValue::Text(value) => Value::Text(value),
        other => Value::Text(format!("{other:?}")),
    }
}

/// Reverses the storage encoding for a column of semantic type `kind`.
pub(crate) fn from_storage(value: Value, kind: ColumnType) -> Value {
    match (value, kind) {
        (Value::Int(value), ColumnType::Boolean) => Value::Bool(value != 0),
        (Value::Text(text), ColumnType::Date) => parse_datetime(&text).map(Value::Date).unwrap_or(Value::Text(text)),
        (value, _) => value,
    }
}

fn storage_to_column_type(data_type: &str) -> ColumnType {
    match data_type.to_ascii_uppercase().as_str() {
        "BOOLEAN" => ColumnType::Boolean,
        "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "HUGEINT" | "UTINYINT" | "USMALLINT" | "UINTEGER" | "UBIGINT" => ColumnType::Int,
        "FLOAT" | "DOUBLE" | "REAL" => ColumnType::Double,
        kind if kind.starts_with("DECIMAL") => ColumnType::Double,
        "DATE" | "TIMESTAMP" => ColumnType::Date,
        _ => ColumnType::Varchar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Table {
        let mut table = Table::new("Items", vec![
            Column::new("ID", 0, ColumnType::Int),
            Column::new("Name", 1, ColumnType::Varchar),
            Column::new("Price", 2, ColumnType::Double).with_comment("unit price"),
            Column::new("Added", 3, ColumnType::Date),
            Column::new("Active", 4, ColumnType::Boolean),
        ]);
        table.push_values(vec![Value::Int(1), "Widget".into(), "37%".into(), "2024-01-02".into(), "yes".into()]);
        table.push_values(vec!["oops".into(), "Broken".into(), Value::Float(1.0), Value::Null, Value::Null]);
        table.push_values(vec![Value::Float(2.0), "Gadget".into(), Value::Int(5), Value::Null, Value::Int(0)]);
        table
    }

    #[test]
    fn rebuild_skips_bad_rows() {
        let mut store = Store::open().unwrap();
        let table = items();
        let report = store.rebuild(&[&table]).unwrap();
        assert_eq!(report, RebuildReport { tables: 1, inserted_rows: 2, skipped_rows: 1 });
        assert_eq!(store.table_names().unwrap(), vec!["Items"]);

        let rows = store.query("SELECT \"ID\", \"Price\", \"Active\" FROM \"Items\" ORDER BY \"ID\"").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("ID"), Some(&Value::Int(1)));
        assert_eq!(rows[0].get("Price"), Some(&Value::Float(0.37)));
        assert_eq!(rows[0].get("Active"), Some(&Value::Int(1)));
        assert_eq!(rows[1].get("ID"), Some(&Value::Int(2)));
    }

    #[test]
    fn rebuild_replaces_previous_tables() {
        let mut store = Store::open().unwrap();
        store.rebuild(&[&items()]).unwrap();
        let mut other = Table::new("Users", vec![Column::new("id", 0, ColumnType::Int)]);
        other.push_values(vec![Value::Int(7)]);
        store.rebuild(&[&other]).unwrap();
        assert_eq!(store.table_names().unwrap(), vec!["Users"]);
    }

    #[test]
    fn columns_keep_semantic_types() {
        let mut store = Store::open().unwrap();
        store.rebuild(&[&items()]).unwrap();
        let columns = store.columns("Items").unwrap();
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[2].kind, ColumnType::Double);
        assert_eq!(columns[2].comment.as_deref(), Some("unit price"));
        assert_eq!(columns[3].kind, ColumnType::Date);
        assert_eq!(columns[4].kind, ColumnType::Boolean);
    }

    #[test]
    fn export_decodes_storage() {
        let mut store = Store::open().unwrap();
        store.rebuild(&[&items()]).unwrap();
        assert_eq!(store.execute("DELETE FROM \"Items\" WHERE \"ID\" = 2").unwrap(), 1);
        let table = store.export("Items").unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].get("Active"), Some(&Value::Bool(true)));
        assert_eq!(table.rows[0].get("Added").map(|value| value.to_string()), Some("2024-01-02 00:00:00".to_owned()));
        assert!(matches!(table.rows[0].get("Added"), Some(Value::Date(_))));
    }

    #[test]
    fn statement_created_tables_use_catalog_types() {
        let mut store = Store::open().unwrap();
        store.rebuild(&[]).unwrap();
        store.execute("CREATE TABLE scratch (n BIGINT, label VARCHAR)").unwrap();
        let columns = store.columns("scratch").unwrap();
        assert_eq!(columns[0].kind, ColumnType::Int);
        assert_eq!(columns[1].kind, ColumnType::Varchar);
    }
}
