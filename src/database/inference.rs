//! Schema inference: locates the header, metadata and data rows of a sheet
//! and derives typed columns from the cells below the header.

use crate::database::column::Column;
use crate::database::column::ColumnType;
use crate::database::table::Table;
use crate::database::value::Value;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::sheet::Sheet;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Sheets that cannot become tables. Callers skip them rather than fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Sheet '{sheet}' has {rows} row(s), at least {required} required")]
    InsufficientRows { sheet: String, rows: usize, required: usize },

    #[error("Sheet '{0}' has no header cells")]
    NoColumns(String),
}

/// Where the header block and the data sit inside a sheet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    pub header_row: usize,
    pub type_row: Option<usize>,
    pub comment_row: Option<usize>,
    pub data_start: usize,
}

impl Layout {
    /// Whether the sheet follows the names/types/comments header convention.
    pub fn has_metadata(&self) -> bool {
        self.type_row.is_some() && self.comment_row.is_some()
    }
}

/// Infers a table from `sheet`. Pure: the same grid always yields the same table.
pub fn infer_table(sheet: &Sheet, criteria: &Criteria) -> Result<(Table, Layout), SchemaError> {
    if sheet.row_count() < criteria.min_rows {
        Err(SchemaError::InsufficientRows {
            sheet: sheet.name.to_owned(),
            rows: sheet.row_count(),
            required: criteria.min_rows,
        })?
    }

    let layout = detect_layout(sheet);
    debug!("Sheet '{}' layout: {:?}", sheet.name, layout);

    let mut columns = Vec::<Column>::new();
    let mut names = HashSet::<String>::new();
    for (index, header) in sheet.row_cells(layout.header_row) {
        let base = header.to_string().trim().to_owned();
        if base.is_empty() {
            continue;
        }
        let mut name = base.to_owned();
        let mut suffix = 2;
        while names.contains(&name.to_lowercase()) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        names.insert(name.to_lowercase());

        let declared = layout
            .type_row
            .and_then(|row| text_of(sheet.get(row, index)))
            .and_then(|text| ColumnType::parse(&text).ok());
        let kind = declared.unwrap_or_else(|| infer_type(sheet, index, layout.data_start, criteria.analyze_rows));
        let mut column = Column::new(&name, index, kind);
        if let Some(comment) = layout.comment_row.and_then(|row| text_of(sheet.get(row, index))) {
            column = column.with_comment(&comment);
        }
        columns.push(column);
    }
    if columns.is_empty() {
        Err(SchemaError::NoColumns(sheet.name.to_owned()))?
    }

    let mut table = Table::new(&sheet.name, columns);
    for row in layout.data_start..sheet.row_count() {
        let values: Vec<Value> = table
            .columns
            .iter()
            .map(|column| sheet.get(row, column.index).to_owned())
            .collect();
        if values.iter().all(Value::is_empty) {
            continue;
        }
        table.push_values(values);
    }
    Ok((table, layout))
}

/// Header, metadata and data rows, from the first two rows of column A.
pub fn detect_layout(sheet: &Sheet) -> Layout {
    let first = sheet.get(0, 0);
    let second = sheet.get(1, 0);
    let (header_row, explicit_type_row) = if !first.is_empty() && !second.is_empty() && first.is_numeric() != second.is_numeric() {
        (if first.is_numeric() { 1 } else { 0 }, None)
    } else if is_int_token(first) {
        (1, Some(0))
    } else if is_int_token(second) {
        (0, Some(1))
    } else {
        (0, None)
    };

    let type_row = explicit_type_row.or_else(|| {
        let candidate = header_row + 1;
        is_type_row(sheet, header_row, candidate).then_some(candidate)
    });
    let metadata_block = type_row == Some(header_row + 1);
    let data_start = if metadata_block {
        header_row + 3
    } else {
        (header_row + 1..sheet.row_count())
            .find(|row| sheet.get(*row, 0).is_numeric())
            .unwrap_or(header_row + 1)
    };
    let comment_row = metadata_block.then_some(header_row + 2);
    Layout {
        header_row,
        type_row,
        comment_row,
        data_start,
    }
}

/// Type of the first non-empty value among the sampled rows, VARCHAR when none.
fn infer_type(sheet: &Sheet, col: usize, data_start: usize, analyze_rows: usize) -> ColumnType {
    (data_start..data_start + analyze_rows)
        .find_map(|row| ColumnType::from_value(sheet.get(row, col)))
        .unwrap_or(ColumnType::Varchar)
}

fn is_int_token(value: &Value) -> bool {
    matches!(value, Value::Text(text) if text.trim().eq_ignore_ascii_case("int"))
}

/// A row qualifies as a type row when every header column's cell there names a known type.
fn is_type_row(sheet: &Sheet, header_row: usize, row: usize) -> bool {
    let mut found = false;
    for (col, _) in sheet.row_cells(header_row) {
        match sheet.get(row, col) {
            Value::Text(text) if text.trim().is_empty() => (),
            Value::Null => (),
            Value::Text(text) if ColumnType::parse(text).is_ok() => found = true,
            _ => return false,
        }
    }
    found
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        value => Some(value.to_string()).filter(|text| !text.trim().is_empty()),
    }
}
