//! The loaded directory: workbooks, their tables, and the backend answering statements.
//!
//! Loading always builds a complete new state and swaps it in, so a failed
//! reload leaves the previous state untouched.

use crate::database::column::Column;
use crate::database::inference::infer_table;
use crate::database::inference::Layout;
use crate::database::store::METADATA_TABLE;
use crate::database::table::Row;
use crate::database::table::Table;
use crate::database::value::Value;
use crate::database::value::DATE_FORMAT;
use crate::engine::open_backend;
use crate::engine::BackendKind;
use crate::engine::QueryBackend;
use crate::error::SheetSqlError;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::open_workbook;
use crate::spreadsheet::save_sheets;
use crate::spreadsheet::sheet::Sheet;
use crate::sql::ast::Statement;
use crate::sql::parser::parse;
use chrono::DateTime;
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// A table materialized from one sheet, with what is needed to write it back.
#[derive(Clone, Debug)]
struct SheetTable {
    name: String,
    sheet_index: usize,
    layout: Layout,
    columns: Vec<Column>,
}

/// One workbook file and the sheets it contributed.
#[derive(Clone, Debug)]
pub struct Workbook {
    pub path: PathBuf,
    pub file_name: String,
    pub last_modified: Option<SystemTime>,
    sheets: Vec<Sheet>,
    tables: Vec<SheetTable>,
}

impl Workbook {
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.name.to_owned()).collect()
    }

    fn table(&self, name: &str) -> Option<&SheetTable> {
        self.tables.iter().find(|table| table.name == name)
    }
}

/// Result of one statement, shaped for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatementResult {
    Rows(Vec<Row>),
    Affected {
        #[serde(rename = "affectedRows")]
        affected_rows: usize,
        message: String,
    },
    Tables(Vec<String>),
    CreateTable {
        table: String,
        #[serde(rename = "createTable")]
        create_table: String,
    },
    Message {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryChange {
    pub old_directory: Option<String>,
    pub new_directory: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileStats {
    pub name: String,
    pub tables: Vec<String>,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub directory: Option<String>,
    pub backend: BackendKind,
    pub file_count: usize,
    pub table_count: usize,
    pub row_count: usize,
    pub files: Vec<FileStats>,
    pub modified_tables: Vec<String>,
}

pub struct Workspace {
    criteria: Criteria,
    directory: Option<PathBuf>,
    workbooks: Vec<Workbook>,
    backend: Box<dyn QueryBackend>,
    modified: BTreeSet<String>,
}

impl Workspace {
    /// A workspace with no directory; only `change_directory` is useful until one is set.
    pub fn new(criteria: Criteria) -> Self {
        let backend = open_backend(criteria.use_store);
        Self {
            criteria,
            directory: None,
            workbooks: vec![],
            backend,
            modified: BTreeSet::new(),
        }
    }

    pub fn open(directory: &Path, criteria: Criteria) -> Result<Self, SheetSqlError> {
        let mut workspace = Self::new(criteria);
        workspace.change_directory(directory)?;
        Ok(workspace)
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    fn require_directory(&self) -> Result<&Path, SheetSqlError> {
        self.directory.as_deref().ok_or(SheetSqlError::DirectoryNotSet)
    }

    /// Reads every matching workbook in `directory` into a fresh state.
    fn load(&self, directory: &Path) -> Result<(Vec<Workbook>, Box<dyn QueryBackend>), SheetSqlError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(directory)? {
            let path = entry?.path();
            let accepted = path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| self.criteria.accept_file(name));
            if accepted {
                paths.push(path);
            }
        }
        paths.sort();

        let mut workbooks = Vec::new();
        let mut models = Vec::<Table>::new();
        for path in paths {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let sheets = match open_workbook(&path) {
                Ok(sheets) => sheets,
                Err(error) => {
                    warn!("Skipping workbook '{}': {}", file_name, error);
                    continue;
                }
            };
            let mut tables = Vec::new();
            for (sheet_index, sheet) in sheets.iter().enumerate() {
                if !self.criteria.accept(&sheet.name) {
                    debug!("Sheet '{}' of '{}' is excluded", sheet.name, file_name);
                    continue;
                }
                if sheet.name.eq_ignore_ascii_case(METADATA_TABLE) {
                    warn!("Sheet '{}' of '{}' uses a reserved table name, skipped", sheet.name, file_name);
                    continue;
                }
                if models.iter().any(|model| model.name.eq_ignore_ascii_case(&sheet.name)) {
                    warn!("Sheet '{}' of '{}' duplicates an existing table name, skipped", sheet.name, file_name);
                    continue;
                }
                match infer_table(sheet, &self.criteria) {
                    Ok((table, layout)) => {
                        tables.push(SheetTable {
                            name: table.name.to_owned(),
                            sheet_index,
                            layout,
                            columns: table.columns.to_owned(),
                        });
                        models.push(table);
                    }
                    Err(error) => {
                        debug!("Sheet '{}' of '{}' skipped: {}", sheet.name, file_name, error);
                    }
                }
            }
            let last_modified = fs::metadata(&path).and_then(|metadata| metadata.modified()).ok();
            workbooks.push(Workbook {
                path,
                file_name,
                last_modified,
                sheets,
                tables,
            });
        }

        let mut backend = open_backend(self.criteria.use_store);
        let refs: Vec<&Table> = models.iter().collect();
        let report = match backend.load(&refs) {
            Ok(report) => report,
            Err(error) if backend.kind() == BackendKind::Store => {
                warn!("Rebuilding the relational store failed, using in-memory evaluation: {}", error);
                backend = open_backend(false);
                backend.load(&refs)?
            }
            Err(error) => Err(error)?,
        };
        info!(
            "Loaded {} workbook(s) and {} table(s) from '{}' ({} row(s) skipped)",
            workbooks.len(),
            report.tables,
            directory.display(),
            report.skipped_rows
        );
        Ok((workbooks, backend))
    }

    /// Loads `directory` and makes it current. The previous state stays when loading fails.
    pub fn change_directory(&mut self, directory: &Path) -> Result<DirectoryChange, SheetSqlError> {
        if !directory.is_dir() {
            Err(SheetSqlError::DirectoryNotFound(directory.display().to_string()))?
        }
        let (workbooks, backend) = self.load(directory)?;
        let old_directory = self.directory.replace(directory.to_path_buf());
        self.workbooks = workbooks;
        self.backend = backend;
        self.modified.clear();
        Ok(DirectoryChange {
            old_directory: old_directory.map(|path| path.display().to_string()),
            new_directory: directory.display().to_string(),
            message: "Directory changed".to_owned(),
        })
    }

    /// Reloads the current directory from disk, discarding unsaved changes.
    pub fn refresh(&mut self) -> Result<usize, SheetSqlError> {
        let directory = self.require_directory()?.to_path_buf();
        let (workbooks, backend) = self.load(&directory)?;
        self.workbooks = workbooks;
        self.backend = backend;
        self.modified.clear();
        self.backend.table_names().map(|names| names.len())
    }

    /// Discards unsaved changes; returns the tables whose changes were dropped.
    pub fn undo(&mut self) -> Result<Vec<String>, SheetSqlError> {
        let discarded: Vec<String> = self.modified.iter().cloned().collect();
        self.refresh()?;
        Ok(discarded)
    }

    pub fn list_tables(&self) -> Result<Vec<String>, SheetSqlError> {
        self.require_directory()?;
        self.backend.table_names()
    }

    pub fn list_files(&self) -> Vec<String> {
        self.workbooks.iter().map(|workbook| workbook.file_name.to_owned()).collect()
    }

    pub fn workbooks(&self) -> &[Workbook] {
        &self.workbooks
    }

    fn not_found(&self, name: &str) -> SheetSqlError {
        SheetSqlError::TableNotFound {
            name: name.to_owned(),
            tables: self.backend.table_names().unwrap_or_default(),
            files: self.list_files(),
        }
    }

    /// Canonical table name, or NotFound naming every table and file.
    fn resolve(&self, name: &str) -> Result<String, SheetSqlError> {
        self.backend.resolve_table(name)?.ok_or_else(|| self.not_found(name))
    }

    pub fn get_create_table(&self, name: &str) -> Result<String, SheetSqlError> {
        self.require_directory()?;
        let table = self.resolve(name)?;
        self.backend.create_table(&table)
    }

    /// Parses and runs one statement on the active backend.
    pub fn run_statement(&mut self, text: &str) -> Result<StatementResult, SheetSqlError> {
        self.require_directory()?;
        debug!("Running statement: {}", text.trim());
        match parse(text)? {
            Statement::Select(mut statement) => {
                statement.table_name = self.resolve(&statement.table_name)?;
                for join in statement.joins.iter_mut() {
                    join.table = self.resolve(&join.table)?;
                }
                Ok(StatementResult::Rows(self.backend.select(&statement)?))
            }
            Statement::Update(mut statement) => {
                statement.table_name = self.resolve(&statement.table_name)?;
                let affected = self.backend.update(&statement)?;
                self.mark_modified(&statement.table_name, affected);
                Ok(StatementResult::Affected {
                    affected_rows: affected,
                    message: format!("{affected} row(s) updated"),
                })
            }
            Statement::Delete(mut statement) => {
                statement.table_name = self.resolve(&statement.table_name)?;
                let affected = self.backend.delete(&statement)?;
                self.mark_modified(&statement.table_name, affected);
                Ok(StatementResult::Affected {
                    affected_rows: affected,
                    message: format!("{affected} row(s) deleted"),
                })
            }
            Statement::ShowTables => Ok(StatementResult::Tables(self.backend.table_names()?)),
            Statement::ShowCreateTable(name) => {
                let table = self.resolve(&name)?;
                let create_table = self.backend.create_table(&table)?;
                Ok(StatementResult::CreateTable { table, create_table })
            }
            Statement::Refresh => {
                let tables = self.refresh()?;
                Ok(StatementResult::Message {
                    message: format!("Reloaded {tables} table(s)"),
                })
            }
            Statement::Passthrough { kind, table, text } => {
                let affected = self.backend.execute(&text)?;
                if let Some(table) = table.and_then(|table| self.backend.resolve_table(&table).ok().flatten()) {
                    self.mark_modified(&table, 1);
                }
                Ok(StatementResult::Affected {
                    affected_rows: affected,
                    message: format!("{kind:?} statement executed"),
                })
            }
        }
    }

    /// Records a change to a table that belongs to a workbook.
    fn mark_modified(&mut self, table: &str, affected: usize) {
        let owned = self.workbooks.iter().any(|workbook| workbook.table(table).is_some());
        if affected > 0 && owned {
            self.modified.insert(table.to_owned());
        }
    }

    pub fn modified_tables(&self) -> Vec<String> {
        self.modified.iter().cloned().collect()
    }

    /// Writes every workbook holding modified tables; returns the number of files written.
    pub fn save_all(&mut self) -> Result<usize, SheetSqlError> {
        self.require_directory()?;
        let mut saved = 0;
        for index in 0..self.workbooks.len() {
            if self.save_workbook(index)? > 0 {
                saved += 1;
            }
        }
        Ok(saved)
    }

    /// Writes the modified tables of one workbook; returns the number of tables written.
    pub fn save_one(&mut self, file_name: &str) -> Result<usize, SheetSqlError> {
        self.require_directory()?;
        let index = self
            .workbooks
            .iter()
            .position(|workbook| workbook.file_name == file_name)
            .or_else(|| self.workbooks.iter().position(|workbook| workbook.file_name.eq_ignore_ascii_case(file_name)))
            .ok_or_else(|| SheetSqlError::FileNotFound {
                name: file_name.to_owned(),
                files: self.list_files(),
            })?;
        self.save_workbook(index)
    }

    fn save_workbook(&mut self, index: usize) -> Result<usize, SheetSqlError> {
        let workbook = &self.workbooks[index];
        let dirty: Vec<SheetTable> = workbook
            .tables
            .iter()
            .filter(|table| self.modified.contains(&table.name))
            .cloned()
            .collect();
        if dirty.is_empty() {
            return Ok(0);
        }

        let mut exported = Vec::with_capacity(dirty.len());
        for table in &dirty {
            let model = self.backend.export(&table.name)?;
            let original = &workbook.sheets[table.sheet_index];
            exported.push((table.sheet_index, export_sheet(original, table, &model)));
        }
        let sheets: Vec<&Sheet> = exported.iter().map(|(_, sheet)| sheet).collect();
        save_sheets(&workbook.path, &sheets)?;
        info!("Saved {} table(s) to '{}'", dirty.len(), workbook.file_name);

        let workbook = &mut self.workbooks[index];
        for (sheet_index, sheet) in exported {
            workbook.sheets[sheet_index] = sheet;
        }
        for table in workbook.tables.iter_mut() {
            if self.modified.remove(&table.name) {
                table.layout = METADATA_LAYOUT;
            }
        }
        workbook.last_modified = fs::metadata(&workbook.path).and_then(|metadata| metadata.modified()).ok();
        Ok(dirty.len())
    }

    pub fn get_stats(&self) -> Result<Stats, SheetSqlError> {
        let tables = match self.directory {
            Some(_) => self.backend.table_names()?,
            None => vec![],
        };
        let mut row_count = 0;
        for table in &tables {
            row_count += self.backend.export(table)?.rows.len();
        }
        Ok(Stats {
            directory: self.directory.as_ref().map(|path| path.display().to_string()),
            backend: self.backend.kind(),
            file_count: self.workbooks.len(),
            table_count: tables.len(),
            row_count,
            files: self
                .workbooks
                .iter()
                .map(|workbook| FileStats {
                    name: workbook.file_name.to_owned(),
                    tables: workbook.table_names(),
                    last_modified: workbook
                        .last_modified
                        .map(|time| DateTime::<Local>::from(time).format(DATE_FORMAT).to_string()),
                })
                .collect(),
            modified_tables: self.modified_tables(),
        })
    }
}

/// Layout of every exported sheet: names, types, comments, then data.
const METADATA_LAYOUT: Layout = Layout {
    header_row: 0,
    type_row: Some(1),
    comment_row: Some(2),
    data_start: 3,
};

/// Writes `model` into a copy of the sheet it came from. An existing
/// names/types/comments block is kept as is; otherwise the sheet is rewritten
/// with that block followed by the data.
fn export_sheet(original: &Sheet, source: &SheetTable, model: &Table) -> Sheet {
    let (mut sheet, layout, positions) = if source.layout.has_metadata() {
        let mut sheet = original.to_owned();
        sheet.truncate_rows(source.layout.data_start);
        let mut next = source.columns.iter().map(|column| column.index + 1).max().unwrap_or(0);
        let positions: Vec<usize> = model
            .columns
            .iter()
            .map(|column| match source.columns.iter().find(|known| known.name == column.name) {
                Some(known) => known.index,
                None => {
                    next += 1;
                    next - 1
                }
            })
            .collect();
        (sheet, source.layout, positions)
    } else {
        (Sheet::new(&original.name), METADATA_LAYOUT, (0..model.columns.len()).collect())
    };

    for (column, position) in model.columns.iter().zip(&positions) {
        let known = source.layout.has_metadata() && source.columns.iter().any(|known| known.name == column.name);
        if known {
            continue;
        }
        sheet.set(layout.header_row, *position, Value::Text(column.name.to_owned()));
        if let Some(row) = layout.type_row {
            sheet.set(row, *position, Value::Text(column.kind.as_str().to_owned()));
        }
        if let (Some(row), Some(comment)) = (layout.comment_row, &column.comment) {
            sheet.set(row, *position, Value::Text(comment.to_owned()));
        }
    }

    for (offset, row) in model.rows.iter().enumerate() {
        for (column, position) in model.columns.iter().zip(&positions) {
            let value = row.get(&column.name).cloned().unwrap_or_default();
            sheet.set(layout.data_start + offset, *position, value);
        }
    }
    sheet
}
