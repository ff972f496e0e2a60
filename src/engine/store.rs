//! Statement execution on the relational store. Statements are rendered back
//! to SQL with quoted identifiers and run on DuckDB.

use crate::database::column::Column;
use crate::database::column::ColumnType;
use crate::database::store::from_storage;
use crate::database::store::RebuildReport;
use crate::database::store::Store;
use crate::database::table::Row;
use crate::database::table::Table;
use crate::database::value::Value;
use crate::database::value::DATE_FORMAT;
use crate::engine::BackendKind;
use crate::engine::QueryBackend;
use crate::error::SheetSqlError;
use crate::sql::ast::ColumnRef;
use crate::sql::ast::DeleteStatement;
use crate::sql::ast::SelectItem;
use crate::sql::ast::SelectStatement;
use crate::sql::ast::UpdateStatement;
use std::collections::HashMap;

pub struct StoreBackend {
    store: Store,
}

impl StoreBackend {
    pub fn open() -> Result<Self, SheetSqlError> {
        Ok(Self { store: Store::open()? })
    }

    /// Expands `*` over joins so joined columns come back as `Table.column`,
    /// the same field names the in-memory evaluator produces.
    fn expand(&self, statement: &SelectStatement) -> Result<SelectStatement, SheetSqlError> {
        let mut expanded = statement.to_owned();
        if statement.joins.is_empty() {
            return Ok(expanded);
        }
        let joined_columns = |table: &str| -> Result<Vec<SelectItem>, SheetSqlError> {
            Ok(self
                .store
                .columns(table)?
                .into_iter()
                .map(|column| SelectItem::Column {
                    column: ColumnRef::new(Some(table), &column.name),
                    alias: None,
                })
                .collect())
        };
        let mut columns = Vec::new();
        for item in &statement.columns {
            match item {
                SelectItem::Wildcard => {
                    columns.push(SelectItem::QualifiedWildcard(statement.table_name.to_owned()));
                    for join in &statement.joins {
                        columns.extend(joined_columns(&join.table)?);
                    }
                }
                SelectItem::QualifiedWildcard(table) if !table.eq_ignore_ascii_case(&statement.table_name) => {
                    columns.extend(joined_columns(table)?);
                }
                item => columns.push(item.to_owned()),
            }
        }
        expanded.columns = columns;
        Ok(expanded)
    }

    /// Semantic type of every output field name the statement can produce.
    fn output_types(&self, statement: &SelectStatement) -> Result<HashMap<String, ColumnType>, SheetSqlError> {
        let mut types = HashMap::new();
        for column in self.store.columns(&statement.table_name)? {
            types.insert(format!("{}.{}", statement.table_name, column.name), column.kind);
            types.insert(column.name.to_owned(), column.kind);
        }
        for join in &statement.joins {
            for column in self.store.columns(&join.table)? {
                types.insert(format!("{}.{}", join.table, column.name), column.kind);
                types.entry(column.name.to_owned()).or_insert(column.kind);
            }
        }
        for item in &statement.columns {
            if let SelectItem::Column { column, alias } = item {
                let kind = types.get(&column.key()).or_else(|| types.get(&column.name)).copied();
                if let Some(kind) = kind {
                    types.insert(alias.to_owned().unwrap_or_else(|| column.key()), kind);
                }
            }
        }
        Ok(types)
    }
}

/// Storage form of an UPDATE value.
fn storage_literal(value: Value) -> Value {
    match value {
        Value::Bool(value) => Value::Int(value as i64),
        Value::Date(value) => Value::Text(value.format(DATE_FORMAT).to_string()),
        value => value,
    }
}

impl QueryBackend for StoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Store
    }

    fn load(&mut self, tables: &[&Table]) -> Result<RebuildReport, SheetSqlError> {
        self.store.rebuild(tables)
    }

    fn table_names(&self) -> Result<Vec<String>, SheetSqlError> {
        self.store.table_names()
    }

    fn columns(&self, table: &str) -> Result<Vec<Column>, SheetSqlError> {
        self.store.columns(table)
    }

    fn select(&self, statement: &SelectStatement) -> Result<Vec<Row>, SheetSqlError> {
        let sql = self.expand(statement)?.to_sql();
        let types = self.output_types(statement)?;
        let rows = self.store.query(&sql)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|(name, value)| {
                        let value = match types.get(name) {
                            Some(kind) => from_storage(value.to_owned(), *kind),
                            None => value.to_owned(),
                        };
                        (name.to_owned(), value)
                    })
                    .collect()
            })
            .collect())
    }

    fn update(&mut self, statement: &UpdateStatement) -> Result<usize, SheetSqlError> {
        let values: Vec<Value> = self.assignment_values(statement)?.into_iter().map(storage_literal).collect();
        self.store.execute(&statement.to_sql(&values))
    }

    fn delete(&mut self, statement: &DeleteStatement) -> Result<usize, SheetSqlError> {
        self.store.execute(&statement.to_sql())
    }

    fn execute(&mut self, text: &str) -> Result<usize, SheetSqlError> {
        self.store.execute(text)
    }

    fn export(&self, table: &str) -> Result<Table, SheetSqlError> {
        self.store.export(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::value::parse_datetime;
    use crate::engine::MemoryBackend;
    use crate::sql::parser::parse_delete;
    use crate::sql::parser::parse_select;
    use crate::sql::parser::parse_update;

    fn tables() -> Vec<Table> {
        let mut orders = Table::new("Orders", vec![
            Column::new("id", 0, ColumnType::Int),
            Column::new("user_id", 1, ColumnType::Int),
        ]);
        orders.push_values(vec![Value::Int(1), Value::Int(10)]);
        orders.push_values(vec![Value::Int(2), Value::Int(20)]);
        orders.push_values(vec![Value::Int(3), Value::Int(99)]);
        let mut users = Table::new("Users", vec![
            Column::new("id", 0, ColumnType::Int),
            Column::new("name", 1, ColumnType::Varchar),
            Column::new("active", 2, ColumnType::Boolean),
            Column::new("seen", 3, ColumnType::Date),
        ]);
        users.push_values(vec![Value::Int(10), "alice".into(), "yes".into(), "2024-01-02".into()]);
        users.push_values(vec![Value::Int(20), "bob".into(), Value::Bool(false), Value::Null]);
        vec![orders, users]
    }

    fn backends() -> Vec<Box<dyn QueryBackend>> {
        let tables = tables();
        let refs: Vec<&Table> = tables.iter().collect();
        let mut store: Box<dyn QueryBackend> = Box::new(StoreBackend::open().unwrap());
        let mut memory: Box<dyn QueryBackend> = Box::new(MemoryBackend::new());
        store.load(&refs).unwrap();
        memory.load(&refs).unwrap();
        vec![store, memory]
    }

    #[test]
    fn both_backends_agree() {
        let statements = [
            "SELECT * FROM Users WHERE id = 10",
            "SELECT name FROM Users WHERE active = 1",
            "SELECT * FROM Orders INNER JOIN Users ON Orders.user_id = Users.id",
            "SELECT Orders.id, Users.name FROM Orders LEFT JOIN Users ON Orders.user_id = Users.id WHERE Orders.id = 3",
            "SELECT COUNT(*) FROM Orders WHERE user_id >= 20",
            "SELECT id FROM Orders WHERE user_id IN (10, 99) AND NOT id = 3",
            "SELECT Users.active, Users.seen FROM Users",
            "SELECT Users.seen AS day FROM Users WHERE id = 10",
        ];
        let backends = backends();
        for text in statements {
            let statement = parse_select(text).unwrap();
            let mut results: Vec<Vec<Row>> = backends.iter().map(|backend| backend.select(&statement).unwrap()).collect();
            for rows in results.iter_mut() {
                rows.sort_by_key(|row| serde_json::to_string(row).unwrap());
            }
            assert_eq!(results[0], results[1], "{text}");
        }
    }

    #[test]
    fn boolean_columns_decode() {
        let backends = backends();
        let statement = parse_select("SELECT active FROM Users WHERE id = 10").unwrap();
        for backend in &backends {
            assert_eq!(backend.select(&statement).unwrap()[0].get("active"), Some(&Value::Bool(true)));
        }
    }

    #[test]
    fn qualified_columns_decode() {
        let seen = parse_datetime("2024-01-02").unwrap();
        let statement = parse_select("SELECT Users.active, Users.seen FROM Users WHERE id = 10").unwrap();
        for backend in backends() {
            let rows = backend.select(&statement).unwrap();
            assert_eq!(rows[0].get("Users.active"), Some(&Value::Bool(true)));
            assert_eq!(rows[0].get("Users.seen"), Some(&Value::Date(seen)));
        }
    }

    #[test]
    fn mutations_report_affected_rows() {
        for mut backend in backends() {
            let update = parse_update("UPDATE Users SET active = 'no', name = \"Al\" WHERE id = 10").unwrap();
            assert_eq!(backend.update(&update).unwrap(), 1);
            let table = backend.export("Users").unwrap();
            assert_eq!(table.rows[0].get("active"), Some(&Value::Bool(false)));
            assert_eq!(table.rows[0].get("name"), Some(&Value::Text("Al".to_owned())));

            let delete = parse_delete("DELETE FROM Orders WHERE user_id > 15").unwrap();
            assert_eq!(backend.delete(&delete).unwrap(), 2);
        }
    }

    #[test]
    fn store_runs_grouping_and_raw_statements() {
        let mut backend = StoreBackend::open().unwrap();
        let tables = tables();
        backend.load(&tables.iter().collect::<Vec<_>>()).unwrap();
        let rows = backend
            .select(&parse_select("SELECT user_id, COUNT(*) AS n FROM Orders GROUP BY user_id ORDER BY user_id DESC").unwrap())
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("user_id"), Some(&Value::Int(99)));
        assert_eq!(backend.execute("INSERT INTO Orders VALUES (4, 10)").unwrap(), 1);
        assert_eq!(backend.export("Orders").unwrap().rows.len(), 4);
    }
}
