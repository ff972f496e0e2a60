//! Workbook codec: reads XLSX packages into cell grids and writes grids back.

pub(crate) mod cell;
pub mod criteria;
pub(crate) mod excel;
pub mod sheet;
pub(crate) mod writer;
pub(crate) mod xlsx;

use crate::error::SheetSqlError;
use crate::error::ResultMessage;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxWorkbook;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub use writer::write_workbook;

/// Errors raised while opening or navigating a workbook package
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    /// A required part is missing from the package
    #[error("Missing workbook part '{0}'")]
    FileError(String),

    /// The workbook declares no worksheets
    #[error("Workbook '{0}' has no sheets")]
    SpreadsheetEmptyError(String),

    /// A sheet to be saved does not exist in the workbook
    #[error("Sheet '{sheet}' not found in '{file}'")]
    SheetNotFound { file: String, sheet: String },
}

/// Opens a workbook and decodes every sheet, in workbook order.
pub fn open_workbook(path: &Path) -> Result<Vec<Sheet>, SheetSqlError> {
    let name = path.display().to_string();
    XlsxWorkbook::open(path)
        .and_then(|mut workbook| workbook.read_sheets())
        .with_prefix(&name)
}

/// Replaces the named sheets of an existing workbook, keeping every other part.
pub fn save_sheets(path: &Path, sheets: &[&Sheet]) -> Result<(), SheetSqlError> {
    let name = path.display().to_string();
    let workbook = XlsxWorkbook::open(path).with_prefix(&name)?;
    let mut parts = HashMap::new();
    for sheet in sheets {
        let zip_path = workbook
            .sheets
            .iter()
            .find(|(sheet_name, _)| *sheet_name == sheet.name)
            .map(|(_, zip_path)| zip_path.to_owned())
            .ok_or_else(|| SpreadsheetError::SheetNotFound {
                file: name.to_owned(),
                sheet: sheet.name.to_owned(),
            })?;
        parts.insert(zip_path, writer::sheet_xml(sheet)?);
    }
    drop(workbook);
    writer::update_workbook(path, &parts).with_prefix(&name)
}
