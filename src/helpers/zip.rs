//! Part lookup inside XLSX packages. Part names match case-insensitively,
//! with `\` accepted as a separator.

use crate::error::SheetSqlError;
use crate::helpers::xml::XmlReader;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// Whether two part names denote the same package entry.
pub(crate) fn same_part(left: &str, right: &str) -> bool {
    left.trim_start_matches('/').replace('\\', "/").eq_ignore_ascii_case(right.trim_start_matches('/'))
}

pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Stored name of the entry matching `name`, if the package has one.
    fn part_name(&self, name: &str) -> Option<String>;

    fn part(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetSqlError>;

    /// XML reader over a package part; `None` when the part is absent.
    fn xml_reader(&'_ mut self, name: &str) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetSqlError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    fn part_name(&self, name: &str) -> Option<String> {
        self.file_names().find(|stored| same_part(name, stored)).map(str::to_owned)
    }

    fn part(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, SheetSqlError> {
        let Some(stored) = self.part_name(name) else {
            return Ok(None);
        };
        match self.by_name(&stored) {
            Ok(file) => Ok(Some(file)),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(&'_ mut self, name: &str) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, SheetSqlError> {
        Ok(self.part(name)?.map(|file| XmlReader::new(BufReader::new(file))))
    }
}
