//! Fallback evaluation directly over table models, used when no relational store exists.

use crate::database::coercion::coerce;
use crate::database::column::Column;
use crate::database::store::RebuildReport;
use crate::database::table::Row;
use crate::database::table::Table;
use crate::database::value::Value;
use crate::engine::expression::lookup;
use crate::engine::expression::matches;
use crate::engine::BackendKind;
use crate::engine::EvaluationError;
use crate::engine::QueryBackend;
use crate::error::SheetSqlError;
use crate::sql::ast::BinaryOperator;
use crate::sql::ast::DeleteStatement;
use crate::sql::ast::Expr;
use crate::sql::ast::Join;
use crate::sql::ast::JoinKind;
use crate::sql::ast::SelectItem;
use crate::sql::ast::SelectStatement;
use crate::sql::ast::UpdateStatement;
use crate::sql::statement_type;
use std::cmp::Ordering;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Default)]
pub struct MemoryBackend {
    tables: Vec<Table>,
}

/// Joined rows plus the field names each contributing table owns, in output order.
struct Relation {
    sources: Vec<(String, Vec<String>)>,
    rows: Vec<Row>,
}

impl Relation {
    fn null_row(&self) -> Row {
        self.sources
            .iter()
            .flat_map(|(_, names)| names.iter())
            .map(|name| (name.to_owned(), Value::Null))
            .collect()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Result<usize, SheetSqlError> {
        self.tables
            .iter()
            .position(|table| table.name == name)
            .or_else(|| self.tables.iter().position(|table| table.name.eq_ignore_ascii_case(name)))
            .ok_or_else(|| SheetSqlError::TableNotFound {
                name: name.to_owned(),
                tables: self.tables.iter().map(|table| table.name.to_owned()).collect(),
                files: vec![],
            })
    }

    fn table(&self, name: &str) -> Result<&Table, SheetSqlError> {
        Ok(&self.tables[self.position(name)?])
    }

    /// The base table joined with every JOIN clause, in clause order.
    fn relation(&self, statement: &SelectStatement) -> Result<Relation, SheetSqlError> {
        let base = self.table(&statement.table_name)?;
        let mut relation = Relation {
            sources: vec![(base.name.to_owned(), base.column_names())],
            rows: base.rows.to_owned(),
        };
        for join in &statement.joins {
            let right = self.table(&join.table)?;
            relation = nested_loop_join(relation, right, join)?;
        }
        Ok(relation)
    }
}

/// Equality pairs of an ON condition; anything but `a = b AND c = d ...` over columns is rejected.
fn equalities(condition: &Expr) -> Result<Vec<(&Expr, &Expr)>, EvaluationError> {
    condition
        .conjuncts()
        .into_iter()
        .map(|conjunct| match conjunct {
            Expr::Binary { left, op: BinaryOperator::Equal, right }
                if matches!(**left, Expr::Column(_)) && matches!(**right, Expr::Column(_)) =>
            {
                Ok((left.as_ref(), right.as_ref()))
            }
            _ => Err(EvaluationError::UnsupportedJoin(condition.to_string())),
        })
        .collect()
}

fn joined(left: &Row, right: &Row) -> Row {
    left.iter()
        .chain(right.iter())
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect()
}

fn is_match(row: &Row, pairs: &[(&Expr, &Expr)]) -> Result<bool, EvaluationError> {
    for (left, right) in pairs {
        let (Expr::Column(left), Expr::Column(right)) = (left, right) else {
            return Ok(false);
        };
        let left = lookup(row, left)?;
        let right = lookup(row, right)?;
        if left.compare(right) != Some(Ordering::Equal) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Nested-loop join. Each row takes its first matching partner only.
fn nested_loop_join(left: Relation, right: &Table, join: &Join) -> Result<Relation, SheetSqlError> {
    let pairs = equalities(&join.condition)?;
    let right_names: Vec<String> = right
        .columns
        .iter()
        .map(|column| format!("{}.{}", right.name, column.name))
        .collect();
    let right_rows: Vec<Row> = right
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|(name, value)| (format!("{}.{}", right.name, name), value.to_owned()))
                .collect()
        })
        .collect();
    let null_left = left.null_row();
    let null_right: Row = right_names.iter().map(|name| (name.to_owned(), Value::Null)).collect();

    let mut rows = Vec::new();
    let mut matched_right = vec![false; right_rows.len()];
    match join.kind {
        JoinKind::Inner | JoinKind::Left | JoinKind::Full => {
            for left_row in &left.rows {
                let mut found = false;
                for (index, right_row) in right_rows.iter().enumerate() {
                    let row = joined(left_row, right_row);
                    if is_match(&row, &pairs)? {
                        matched_right[index] = true;
                        rows.push(row);
                        found = true;
                        break;
                    }
                }
                if !found && join.kind != JoinKind::Inner {
                    rows.push(joined(left_row, &null_right));
                }
            }
            if join.kind == JoinKind::Full {
                for (right_row, _) in right_rows.iter().zip(&matched_right).filter(|(_, matched)| !**matched) {
                    rows.push(joined(&null_left, right_row));
                }
            }
        }
        JoinKind::Right => {
            for right_row in &right_rows {
                let mut found = false;
                for left_row in &left.rows {
                    let row = joined(left_row, right_row);
                    if is_match(&row, &pairs)? {
                        rows.push(row);
                        found = true;
                        break;
                    }
                }
                if !found {
                    rows.push(joined(&null_left, right_row));
                }
            }
        }
    }

    let mut sources = left.sources;
    sources.push((right.name.to_owned(), right_names));
    Ok(Relation { sources, rows })
}

fn project(relation: &Relation, row: &Row, columns: &[SelectItem]) -> Result<Row, SheetSqlError> {
    let mut output = Row::with_capacity(row.len());
    for item in columns {
        match item {
            SelectItem::Wildcard => {
                for (name, value) in row.iter() {
                    output.set(name, value.to_owned());
                }
            }
            SelectItem::QualifiedWildcard(table) => {
                let (_, names) = relation
                    .sources
                    .iter()
                    .find(|(source, _)| source.eq_ignore_ascii_case(table))
                    .ok_or_else(|| EvaluationError::UnknownColumn(format!("{table}.*")))?;
                for name in names {
                    output.set(name, row.get(name).cloned().unwrap_or_default());
                }
            }
            SelectItem::Column { column, .. } => {
                let value = lookup(row, column)?.to_owned();
                output.set(&item.output_name().unwrap_or_default(), value);
            }
            SelectItem::CountAll { .. } => Err(EvaluationError::Unsupported("COUNT(*) mixed with other columns".to_owned()))?,
            SelectItem::Expression { .. } => Err(EvaluationError::Unsupported(format!(
                "Column expression '{}'",
                item.output_name().unwrap_or_default()
            )))?,
        }
    }
    Ok(output)
}

impl QueryBackend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    /// Keeps coerced copies of the tables; rows that fail coercion are skipped as the store does.
    fn load(&mut self, tables: &[&Table]) -> Result<RebuildReport, SheetSqlError> {
        let mut report = RebuildReport::default();
        self.tables = Vec::with_capacity(tables.len());
        for table in tables {
            let mut coerced = Table::new(&table.name, table.columns.to_owned());
            for (index, row) in table.rows.iter().enumerate() {
                let values: Result<Vec<Value>, _> = table
                    .columns
                    .iter()
                    .map(|column| coerce(row.get(&column.name).unwrap_or(&Value::Null), column.kind, index + 1, &column.name))
                    .collect();
                match values {
                    Ok(values) => {
                        coerced.push_values(values);
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
            self.tables.push(coerced);
            report.tables += 1;
        }
        info!(
            "Loaded in-memory tables: {} table(s), {} row(s) loaded, {} row(s) skipped",
            report.tables, report.inserted_rows, report.skipped_rows
        );
        Ok(report)
    }

    fn table_names(&self) -> Result<Vec<String>, SheetSqlError> {
        let mut names: Vec<String> = self.tables.iter().map(|table| table.name.to_owned()).collect();
        names.sort();
        Ok(names)
    }

    fn columns(&self, table: &str) -> Result<Vec<Column>, SheetSqlError> {
        Ok(self.table(table)?.columns.to_owned())
    }

    fn select(&self, statement: &SelectStatement) -> Result<Vec<Row>, SheetSqlError> {
        if !statement.group_by.is_empty() || !statement.having.is_empty() || !statement.order_by.is_empty() {
            debug!("Ignoring GROUP BY, HAVING and ORDER BY without the relational store");
        }
        let relation = self.relation(statement)?;

        let mut filtered = Vec::new();
        for row in &relation.rows {
            match &statement.where_clause {
                None => filtered.push(row),
                Some(condition) => match matches(condition, row) {
                    Ok(true) => filtered.push(row),
                    Ok(false) => (),
                    Err(error) => debug!("Excluding row from '{}': {}", statement.table_name, error),
                },
            }
        }

        let limit = statement.limit.unwrap_or(usize::MAX);
        if statement.is_count_all() {
            let name = statement.columns[0].output_name().unwrap_or_default();
            let count = Row::from_iter([(name, Value::Int(filtered.len() as i64))]);
            return Ok(if limit == 0 { vec![] } else { vec![count] });
        }

        let mut rows: Vec<Row> = Vec::new();
        for row in filtered {
            if rows.len() >= limit {
                break;
            }
            let projected = project(&relation, row, &statement.columns)?;
            if statement.distinct && rows.contains(&projected) {
                continue;
            }
            rows.push(projected);
        }
        Ok(rows)
    }

    fn update(&mut self, statement: &UpdateStatement) -> Result<usize, SheetSqlError> {
        let values = self.assignment_values(statement)?;
        let position = self.position(&statement.table_name)?;
        let table = &mut self.tables[position];
        let names: Vec<String> = statement
            .assignments
            .iter()
            .filter_map(|(name, _)| table.find_column(name).map(|column| column.name.to_owned()))
            .collect();

        let mut affected = 0;
        for row in table.rows.iter_mut() {
            let selected = match &statement.where_clause {
                None => true,
                Some(condition) => matches(condition, row).unwrap_or_else(|error| {
                    debug!("Excluding row from update of '{}': {}", statement.table_name, error);
                    false
                }),
            };
            if selected {
                for (name, value) in names.iter().zip(&values) {
                    row.set(name, value.to_owned());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    fn delete(&mut self, statement: &DeleteStatement) -> Result<usize, SheetSqlError> {
        let position = self.position(&statement.table_name)?;
        let table = &mut self.tables[position];
        let before = table.rows.len();
        table.rows.retain(|row| match &statement.where_clause {
            None => false,
            Some(condition) => !matches(condition, row).unwrap_or_else(|error| {
                debug!("Keeping row of '{}': {}", statement.table_name, error);
                false
            }),
        });
        Ok(before - table.rows.len())
    }

    fn execute(&mut self, text: &str) -> Result<usize, SheetSqlError> {
        Err(EvaluationError::Unsupported(format!("{:?} statement", statement_type(text))).into())
    }

    fn export(&self, table: &str) -> Result<Table, SheetSqlError> {
        Ok(self.table(table)?.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::column::ColumnType;
    use crate::sql::parser::parse_delete;
    use crate::sql::parser::parse_select;
    use crate::sql::parser::parse_update;

    fn backend() -> MemoryBackend {
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
        ]);
        users.push_values(vec![Value::Int(10), "alice".into()]);
        users.push_values(vec![Value::Int(20), "bob".into()]);
        users.push_values(vec![Value::Int(30), "carol".into()]);
        let mut items = Table::new("Items", vec![
            Column::new("ID", 0, ColumnType::Int),
            Column::new("Name", 1, ColumnType::Varchar),
            Column::new("Price", 2, ColumnType::Double),
        ]);
        items.push_values(vec![Value::Int(1), "Widget".into(), Value::Float(9.99)]);
        items.push_values(vec![Value::Int(2), "Gadget".into(), "37%".into()]);
        items.push_values(vec!["bad".into(), "Broken".into(), Value::Float(1.0)]);

        let mut backend = MemoryBackend::new();
        let report = backend.load(&[&orders, &users, &items]).unwrap();
        assert_eq!(report.skipped_rows, 1);
        backend
    }

    fn select(backend: &MemoryBackend, text: &str) -> Vec<Row> {
        backend.select(&parse_select(text).unwrap()).unwrap()
    }

    #[test]
    fn select_where() {
        let backend = backend();
        let rows = select(&backend, "SELECT * FROM Items WHERE ID = 1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Name"), Some(&Value::Text("Widget".to_owned())));
        assert_eq!(rows[0].get("Price"), Some(&Value::Float(9.99)));

        let rows = select(&backend, "SELECT Name FROM Items WHERE Price < 1");
        assert_eq!(rows, vec![Row::from_iter([("Name".to_owned(), Value::Text("Gadget".to_owned()))])]);
    }

    #[test]
    fn count_and_limit() {
        let backend = backend();
        let rows = select(&backend, "SELECT COUNT(*) FROM Orders WHERE user_id > 10");
        assert_eq!(rows[0].get("COUNT(*)"), Some(&Value::Int(2)));
        let rows = select(&backend, "SELECT COUNT(*) AS n FROM Orders");
        assert_eq!(rows[0].get("n"), Some(&Value::Int(3)));
        assert_eq!(select(&backend, "SELECT * FROM Orders LIMIT 2").len(), 2);
    }

    #[test]
    fn where_is_fail_open() {
        let backend = backend();
        let rows = select(&backend, "SELECT * FROM Items WHERE Name / 2 = 1 OR ID = 2");
        assert!(rows.is_empty());
        let rows = select(&backend, "SELECT * FROM Items WHERE ID = 2 OR Name / 2 = 1");
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn inner_join_prefixes_right_columns() {
        let backend = backend();
        let rows = select(&backend, "SELECT * FROM Orders INNER JOIN Users ON Orders.user_id = Users.id");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].names().collect::<Vec<_>>(), vec!["id", "user_id", "Users.id", "Users.name"]);
        assert_eq!(rows[1].get("Users.name"), Some(&Value::Text("bob".to_owned())));
    }

    #[test]
    fn outer_joins() {
        let backend = backend();
        let rows = select(&backend, "SELECT * FROM Orders LEFT JOIN Users ON user_id = Users.id");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get("Users.name"), Some(&Value::Null));

        let rows = select(&backend, "SELECT Users.name, id FROM Orders RIGHT JOIN Users ON Orders.user_id = Users.id");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get("Users.name"), Some(&Value::Text("carol".to_owned())));
        assert_eq!(rows[2].get("id"), Some(&Value::Null));

        let rows = select(&backend, "SELECT * FROM Orders FULL JOIN Users ON Orders.user_id = Users.id");
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn unsupported_join_is_fatal() {
        let backend = backend();
        let statement = parse_select("SELECT * FROM Orders JOIN Users ON Orders.user_id > Users.id").unwrap();
        assert!(matches!(
            backend.select(&statement),
            Err(SheetSqlError::EvaluationError(EvaluationError::UnsupportedJoin(_)))
        ));
    }

    #[test]
    fn update_coerces_literals() {
        let mut backend = backend();
        let affected = backend.update(&parse_update("UPDATE Items SET Price = \"12.50\" WHERE ID = 1").unwrap()).unwrap();
        assert_eq!(affected, 1);
        let rows = select(&backend, "SELECT Price FROM Items WHERE ID = 1");
        assert_eq!(rows[0].get("Price"), Some(&Value::Float(12.5)));

        let error = backend.update(&parse_update("UPDATE Items SET Price = 'cheap'").unwrap()).unwrap_err();
        assert!(matches!(error, SheetSqlError::CoercionError(_)));
        let error = backend.update(&parse_update("UPDATE Items SET Colour = 'red'").unwrap()).unwrap_err();
        assert!(matches!(error, SheetSqlError::EvaluationError(EvaluationError::UnknownColumn(_))));
    }

    #[test]
    fn delete_rows() {
        let mut backend = backend();
        assert_eq!(backend.delete(&parse_delete("DELETE FROM Orders WHERE user_id = 99").unwrap()).unwrap(), 1);
        assert_eq!(backend.export("Orders").unwrap().rows.len(), 2);
        assert_eq!(backend.delete(&parse_delete("DELETE FROM Orders").unwrap()).unwrap(), 2);
    }

    #[test]
    fn show_create_table_and_unknown_tables() {
        let backend = backend();
        assert!(backend.create_table("Items").unwrap().contains("    Price DOUBLE\n"));
        assert_eq!(backend.resolve_table("items").unwrap(), Some("Items".to_owned()));
        assert!(matches!(
            backend.select(&parse_select("SELECT * FROM Nope").unwrap()),
            Err(SheetSqlError::TableNotFound { .. })
        ));
    }
}
