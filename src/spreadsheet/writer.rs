//! Writes cell grids back into XLSX packages.

use crate::database::value::Value;
use crate::error::SheetSqlError;
use crate::helpers::zip::same_part;
use crate::helpers::xml::XmlWriter;
use crate::spreadsheet::cell::index_to_reference;
use crate::spreadsheet::sheet::Sheet;
use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const TYPE_OFFICE_DOCUMENT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const TYPE_WORKSHEET: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const TYPE_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const CONTENT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CONTENT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CONTENT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const CONTENT_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";

const MINIMAL_STYLES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>"#,
    r#"<fills count="1"><fill><patternFill patternType="none"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
    r#"</styleSheet>"#,
);

fn options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Serializes a grid into a worksheet part.
/// Text and dates become inline strings, numbers stay numeric, booleans use `t="b"`.
pub(crate) fn sheet_xml(sheet: &Sheet) -> Result<Vec<u8>, SheetSqlError> {
    let mut writer = XmlWriter::new()?;
    writer.start("worksheet", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    writer.start("sheetData", &[])?;
    for row in 0..sheet.row_count() {
        let cells = sheet.row_cells(row);
        if cells.is_empty() {
            continue;
        }
        let row_reference = (row + 1).to_string();
        writer.start("row", &[("r", row_reference.as_str())])?;
        for (col, value) in cells {
            let reference = index_to_reference(row, col);
            match value {
                Value::Null => (),
                Value::Int(number) => write_number(&mut writer, &reference, &number.to_string())?,
                Value::Float(number) => write_number(&mut writer, &reference, &number.to_string())?,
                Value::Bool(flag) => {
                    writer.start("c", &[("r", reference.as_str()), ("t", "b")])?;
                    writer.element("v", &[], if *flag { "1" } else { "0" })?;
                    writer.end("c")?;
                }
                Value::Text(_) | Value::Date(_) => {
                    writer.start("c", &[("r", reference.as_str()), ("t", "inlineStr")])?;
                    writer.start("is", &[])?;
                    writer.element("t", &[("xml:space", "preserve")], &value.to_string())?;
                    writer.end("is")?;
                    writer.end("c")?;
                }
            }
        }
        writer.end("row")?;
    }
    writer.end("sheetData")?;
    writer.end("worksheet")?;
    Ok(writer.finish())
}

fn write_number(writer: &mut XmlWriter, reference: &str, number: &str) -> Result<(), SheetSqlError> {
    writer.start("c", &[("r", reference)])?;
    writer.element("v", &[], number)?;
    writer.end("c")
}

/// Sibling path used while a package is being rewritten.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(".saving");
    path.with_file_name(name)
}

/// Rewrites the given worksheet parts of an existing workbook, copying every other entry verbatim.
/// `parts` maps archive paths (e.g. `xl/worksheets/sheet1.xml`) to replacement content.
pub(crate) fn update_workbook(path: &Path, parts: &HashMap<String, Vec<u8>>) -> Result<(), SheetSqlError> {
    let staging = staging_path(path);
    {
        let mut source = ZipArchive::new(BufReader::new(File::open(path)?))?;
        let mut target = ZipWriter::new(BufWriter::new(File::create(&staging)?));
        for index in 0..source.len() {
            let entry = source.by_index_raw(index)?;
            let name = entry.name().to_owned();
            match parts.iter().find(|(part, _)| same_part(part, &name)) {
                Some((_, content)) => {
                    drop(entry);
                    target.start_file(name.as_str(), options())?;
                    target.write_all(content)?;
                }
                None => target.raw_copy_file(entry)?,
            }
        }
        target.finish()?.flush()?;
    }
    fs::rename(&staging, path)?;
    debug!("Rewrote {} sheet part(s) of {}", parts.len(), path.display());
    Ok(())
}

/// Creates a new workbook holding `sheets` in order.
pub fn write_workbook(path: &Path, sheets: &[Sheet]) -> Result<(), SheetSqlError> {
    let staging = staging_path(path);
    {
        let mut target = ZipWriter::new(BufWriter::new(File::create(&staging)?));

        let mut content_types = XmlWriter::new()?;
        content_types.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
        content_types.empty("Default", &[("Extension", "rels"), ("ContentType", CONTENT_RELATIONSHIPS)])?;
        content_types.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
        content_types.empty("Override", &[("PartName", "/xl/workbook.xml"), ("ContentType", CONTENT_WORKBOOK)])?;
        content_types.empty("Override", &[("PartName", "/xl/styles.xml"), ("ContentType", CONTENT_STYLES)])?;
        for index in 1..=sheets.len() {
            let part = format!("/xl/worksheets/sheet{index}.xml");
            content_types.empty("Override", &[("PartName", part.as_str()), ("ContentType", CONTENT_WORKSHEET)])?;
        }
        content_types.end("Types")?;
        target.start_file("[Content_Types].xml", options())?;
        target.write_all(&content_types.finish())?;

        let mut root = XmlWriter::new()?;
        root.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
        root.empty("Relationship", &[("Id", "rId1"), ("Type", TYPE_OFFICE_DOCUMENT), ("Target", "xl/workbook.xml")])?;
        root.end("Relationships")?;
        target.start_file("_rels/.rels", options())?;
        target.write_all(&root.finish())?;

        let mut workbook = XmlWriter::new()?;
        let mut relationships = XmlWriter::new()?;
        workbook.start("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
        workbook.start("sheets", &[])?;
        relationships.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
        for (index, sheet) in sheets.iter().enumerate() {
            let number = (index + 1).to_string();
            let id = format!("rId{number}");
            let target_path = format!("worksheets/sheet{number}.xml");
            workbook.empty("sheet", &[("name", sheet.name.as_str()), ("sheetId", number.as_str()), ("r:id", id.as_str())])?;
            relationships.empty("Relationship", &[("Id", id.as_str()), ("Type", TYPE_WORKSHEET), ("Target", target_path.as_str())])?;
        }
        let styles_id = format!("rId{}", sheets.len() + 1);
        relationships.empty("Relationship", &[("Id", styles_id.as_str()), ("Type", TYPE_STYLES), ("Target", "styles.xml")])?;
        workbook.end("sheets")?;
        workbook.end("workbook")?;
        relationships.end("Relationships")?;
        target.start_file("xl/workbook.xml", options())?;
        target.write_all(&workbook.finish())?;
        target.start_file("xl/_rels/workbook.xml.rels", options())?;
        target.write_all(&relationships.finish())?;

        target.start_file("xl/styles.xml", options())?;
        target.write_all(MINIMAL_STYLES.as_bytes())?;

        for (index, sheet) in sheets.iter().enumerate() {
            target.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options())?;
            target.write_all(&sheet_xml(sheet)?)?;
        }
        target.finish()?.flush()?;
    }
    fs::rename(&staging, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::open_workbook;
    use chrono::NaiveDate;

    #[test]
    fn sheet_xml_cells() {
        let sheet = Sheet::from_rows("Items", vec![
            vec!["ID".into(), "Flag".into()],
            vec![Value::Int(1), Value::Bool(true)],
        ]);
        let xml = String::from_utf8(sheet_xml(&sheet).unwrap()).unwrap();
        assert!(xml.contains(r#"<c r="A1" t="inlineStr"><is><t xml:space="preserve">ID</t></is></c>"#));
        assert!(xml.contains(r#"<c r="A2"><v>1</v></c>"#));
        assert!(xml.contains(r#"<c r="B2" t="b"><v>1</v></c>"#));
    }

    #[test]
    fn write_then_read_workbook() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("shop.xlsx");
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        let items = Sheet::from_rows("Items & Co", vec![
            vec!["ID".into(), "Name".into(), "Price".into(), "Added".into()],
            vec![Value::Int(1), "Widget <1>".into(), Value::Float(9.99), Value::Date(date)],
        ]);
        let empty = Sheet::new("Struct");
        write_workbook(&path, &[items, empty]).unwrap();

        let sheets = open_workbook(&path).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Items & Co");
        assert_eq!(sheets[0].get(1, 0), &Value::Int(1));
        assert_eq!(sheets[0].get(1, 1), &Value::Text("Widget <1>".to_owned()));
        assert_eq!(sheets[0].get(1, 2), &Value::Float(9.99));
        assert_eq!(sheets[0].get(1, 3), &Value::Text("2024-05-01 09:00:00".to_owned()));
        assert!(sheets[1].is_empty());
    }

    #[test]
    fn update_replaces_only_named_parts() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("shop.xlsx");
        let first = Sheet::from_rows("First", vec![vec!["a".into()]]);
        let second = Sheet::from_rows("Second", vec![vec!["b".into()]]);
        write_workbook(&path, &[first, second]).unwrap();

        let replacement = Sheet::from_rows("Second", vec![vec!["c".into()], vec![Value::Int(2)]]);
        let mut parts = HashMap::new();
        parts.insert("xl/worksheets/sheet2.xml".to_owned(), sheet_xml(&replacement).unwrap());
        update_workbook(&path, &parts).unwrap();

        let sheets = open_workbook(&path).unwrap();
        assert_eq!(sheets[0].get(0, 0), &Value::Text("a".to_owned()));
        assert_eq!(sheets[1].get(0, 0), &Value::Text("c".to_owned()));
        assert_eq!(sheets[1].get(1, 0), &Value::Int(2));
        assert!(!staging_path(&path).exists());
    }
}
