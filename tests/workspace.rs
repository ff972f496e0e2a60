use rusty_sheet_sql::database::table::Row;
use rusty_sheet_sql::database::value::Value;
use rusty_sheet_sql::engine::BackendKind;
use rusty_sheet_sql::spreadsheet::sheet::Sheet;
use rusty_sheet_sql::spreadsheet::write_workbook;
use rusty_sheet_sql::Criteria;
use rusty_sheet_sql::SheetSqlError;
use rusty_sheet_sql::StatementResult;
use rusty_sheet_sql::Workspace;
use tempfile::TempDir;

fn fixtures() -> TempDir {
    let directory = tempfile::tempdir().unwrap();
    let items = Sheet::from_rows("Items", vec![
        vec!["ID".into(), "Name".into(), "Price".into()],
        vec!["INT".into(), "VARCHAR".into(), "DOUBLE".into()],
        vec!["identifier".into(), Value::Null, "unit price".into()],
        vec![Value::Int(1), "Widget".into(), Value::Float(9.99)],
        vec![Value::Int(2), "Gadget".into(), "37%".into()],
    ]);
    let tiny = Sheet::from_rows("Tiny", vec![
        vec!["a".into(), "b".into()],
        vec![Value::Int(1), Value::Int(2)],
        vec![Value::Int(3), Value::Int(4)],
    ]);
    write_workbook(&directory.path().join("shop.xlsx"), &[items, tiny]).unwrap();

    let orders = Sheet::from_rows("Orders", vec![
        vec!["id".into(), "user_id".into()],
        vec![Value::Int(1), Value::Int(10)],
        vec![Value::Int(2), Value::Int(20)],
        vec![Value::Int(3), Value::Int(99)],
    ]);
    let users = Sheet::from_rows("Users", vec![
        vec!["id".into(), "name".into()],
        vec![Value::Int(10), "alice".into()],
        vec![Value::Int(20), "bob".into()],
        vec![Value::Int(30), "carol".into()],
    ]);
    write_workbook(&directory.path().join("people.xlsx"), &[orders, users]).unwrap();
    directory
}

fn open(directory: &TempDir, use_store: bool) -> Workspace {
    let criteria = Criteria {
        use_store,
        ..Criteria::default()
    };
    Workspace::open(directory.path(), criteria).unwrap()
}

fn rows(workspace: &mut Workspace, text: &str) -> Vec<Row> {
    match workspace.run_statement(text).unwrap() {
        StatementResult::Rows(rows) => rows,
        other => panic!("expected rows from '{text}', got {other:?}"),
    }
}

fn affected(workspace: &mut Workspace, text: &str) -> usize {
    match workspace.run_statement(text).unwrap() {
        StatementResult::Affected { affected_rows, .. } => affected_rows,
        other => panic!("expected affected rows from '{text}', got {other:?}"),
    }
}

#[test]
fn select_inferred_table() {
    let directory = fixtures();
    for use_store in [true, false] {
        let mut workspace = open(&directory, use_store);
        let rows = rows(&mut workspace, "SELECT * FROM Items WHERE ID = 1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("ID"), Some(&Value::Int(1)));
        assert_eq!(rows[0].get("Name"), Some(&Value::Text("Widget".to_owned())));
        assert_eq!(rows[0].get("Price"), Some(&Value::Float(9.99)));
    }
}

#[test]
fn join_prefixes_joined_columns() {
    let directory = fixtures();
    for use_store in [true, false] {
        let mut workspace = open(&directory, use_store);
        let mut rows = rows(&mut workspace, "SELECT * FROM Orders INNER JOIN Users ON Orders.user_id = Users.id");
        rows.sort_by_key(|row| serde_json::to_string(row).unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Users.name"), Some(&Value::Text("alice".to_owned())));
        assert_eq!(rows[1].get("user_id"), Some(&Value::Int(20)));
    }
}

#[test]
fn update_coerces_and_marks_modified() {
    let directory = fixtures();
    for use_store in [true, false] {
        let mut workspace = open(&directory, use_store);
        assert_eq!(affected(&mut workspace, "UPDATE Items SET Price = \"12.50\" WHERE ID = 1"), 1);
        let rows = rows(&mut workspace, "SELECT Price FROM Items WHERE ID = 1");
        assert_eq!(rows[0].get("Price"), Some(&Value::Float(12.5)));
        assert_eq!(workspace.modified_tables(), vec!["Items".to_owned()]);
    }
}

#[test]
fn percent_text_becomes_fraction() {
    let directory = fixtures();
    for use_store in [true, false] {
        let mut workspace = open(&directory, use_store);
        let rows = rows(&mut workspace, "SELECT Price FROM Items WHERE ID = 2");
        match rows[0].get("Price") {
            Some(Value::Float(price)) => assert!((price - 0.37).abs() < 1e-9),
            other => panic!("unexpected price {other:?}"),
        }
    }
}

#[test]
fn show_statements() {
    let directory = fixtures();
    for use_store in [true, false] {
        let mut workspace = open(&directory, use_store);
        match workspace.run_statement("SHOW CREATE TABLE items").unwrap() {
            StatementResult::CreateTable { table, create_table } => {
                assert_eq!(table, "Items");
                assert!(create_table.contains("    Price DOUBLE -- unit price"), "{create_table}");
                assert!(create_table.starts_with("CREATE TABLE Items ("));
            }
            other => panic!("unexpected result {other:?}"),
        }
        let expected: Vec<String> = ["Items", "Orders", "Users"].iter().map(|name| name.to_string()).collect();
        assert_eq!(workspace.run_statement("SHOW TABLES").unwrap(), StatementResult::Tables(expected));
    }
}

#[test]
fn unknown_table_lists_candidates() {
    let directory = fixtures();
    let mut workspace = open(&directory, true);
    match workspace.run_statement("SELECT * FROM Nope") {
        Err(SheetSqlError::TableNotFound { name, tables, files }) => {
            assert_eq!(name, "Nope");
            assert_eq!(tables, vec!["Items", "Orders", "Users"]);
            assert_eq!(files, vec!["people.xlsx", "shop.xlsx"]);
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn saved_changes_survive_reload() {
    let directory = fixtures();
    for use_store in [true, false] {
        let mut workspace = open(&directory, use_store);
        affected(&mut workspace, "UPDATE Users SET name = 'bobby' WHERE id = 20");
        affected(&mut workspace, "DELETE FROM Users WHERE id = 30");
        assert_eq!(workspace.save_all().unwrap(), 1);
        assert!(workspace.modified_tables().is_empty());

        let mut reopened = open(&directory, use_store);
        let rows = rows(&mut reopened, "SELECT name FROM Users");
        let names: Vec<&Value> = rows.iter().filter_map(|row| row.get("name")).collect();
        assert_eq!(names, vec![&Value::Text("alice".to_owned()), &Value::Text("bobby".to_owned())]);
        match reopened.run_statement("SHOW CREATE TABLE Users").unwrap() {
            StatementResult::CreateTable { create_table, .. } => assert!(create_table.contains("    id INT,")),
            other => panic!("unexpected result {other:?}"),
        }
    }
}

#[test]
fn save_one_file() {
    let directory = fixtures();
    let mut workspace = open(&directory, false);
    affected(&mut workspace, "UPDATE Items SET Name = 'Thing' WHERE ID = 2");
    assert!(matches!(workspace.save_one("missing.xlsx"), Err(SheetSqlError::FileNotFound { .. })));
    assert_eq!(workspace.save_one("people.xlsx").unwrap(), 0);
    assert_eq!(workspace.save_one("SHOP.xlsx").unwrap(), 1);
}

#[test]
fn undo_discards_unsaved_changes() {
    let directory = fixtures();
    for use_store in [true, false] {
        let mut workspace = open(&directory, use_store);
        assert_eq!(affected(&mut workspace, "DELETE FROM Orders WHERE id = 1"), 1);
        assert_eq!(rows(&mut workspace, "SELECT * FROM Orders").len(), 2);
        assert_eq!(workspace.undo().unwrap(), vec!["Orders".to_owned()]);
        assert_eq!(rows(&mut workspace, "SELECT * FROM Orders").len(), 3);
        assert!(workspace.modified_tables().is_empty());
    }
}

#[test]
fn stats_describe_the_directory() {
    let directory = fixtures();
    let workspace = open(&directory, false);
    let stats = workspace.get_stats().unwrap();
    assert_eq!(stats.backend, BackendKind::Memory);
    assert_eq!(stats.file_count, 2);
    assert_eq!(stats.table_count, 3);
    assert_eq!(stats.row_count, 8);
    assert_eq!(stats.files[1].tables, vec!["Items".to_owned()]);
}

#[test]
fn change_directory_keeps_state_on_failure() {
    let directory = fixtures();
    let mut workspace = open(&directory, true);
    let error = workspace.change_directory(&directory.path().join("missing")).unwrap_err();
    assert!(matches!(error, SheetSqlError::DirectoryNotFound(_)));
    assert_eq!(workspace.list_tables().unwrap().len(), 3);

    let other = tempfile::tempdir().unwrap();
    let change = workspace.change_directory(other.path()).unwrap();
    assert_eq!(change.old_directory, Some(directory.path().display().to_string()));
    assert!(workspace.list_tables().unwrap().is_empty());
}

#[test]
fn text_keys_survive_save_and_reload() {
    let directory = tempfile::tempdir().unwrap();
    let codes = Sheet::from_rows("Codes", vec![
        vec!["Code".into(), "Qty".into()],
        vec!["VARCHAR".into(), "INT".into()],
        vec!["code".into(), "qty".into()],
        vec!["abc".into(), Value::Int(1)],
        vec!["def".into(), Value::Int(2)],
        vec!["5".into(), Value::Int(3)],
    ]);
    write_workbook(&directory.path().join("codes.xlsx"), &[codes]).unwrap();
    for use_store in [true, false] {
        let mut workspace = open(&directory, use_store);
        assert_eq!(rows(&mut workspace, "SELECT * FROM Codes").len(), 3);
        assert_eq!(affected(&mut workspace, "UPDATE Codes SET Qty = 4 WHERE Code = 'def'"), 1);
        assert_eq!(workspace.save_all().unwrap(), 1);

        let mut reopened = open(&directory, use_store);
        let rows = rows(&mut reopened, "SELECT Code FROM Codes");
        let codes: Vec<&Value> = rows.iter().filter_map(|row| row.get("Code")).collect();
        assert_eq!(codes, vec![&Value::Text("abc".to_owned()), &Value::Text("def".to_owned()), &Value::Text("5".to_owned())]);
    }
}

#[test]
fn reserved_sheet_name_is_skipped() {
    let directory = tempfile::tempdir().unwrap();
    let reserved = Sheet::from_rows("__sheet_columns", vec![
        vec!["id".into(), "note".into()],
        vec![Value::Int(1), "x".into()],
        vec![Value::Int(2), "y".into()],
        vec![Value::Int(3), "z".into()],
    ]);
    let orders = Sheet::from_rows("Orders", vec![
        vec!["id".into(), "user_id".into()],
        vec![Value::Int(1), Value::Int(10)],
        vec![Value::Int(2), Value::Int(20)],
        vec![Value::Int(3), Value::Int(99)],
    ]);
    write_workbook(&directory.path().join("mixed.xlsx"), &[reserved, orders]).unwrap();
    let workspace = open(&directory, true);
    let stats = workspace.get_stats().unwrap();
    assert_eq!(stats.backend, BackendKind::Store);
    assert_eq!(stats.table_count, 1);
    assert_eq!(stats.files[0].tables, vec!["Orders".to_owned()]);
}
