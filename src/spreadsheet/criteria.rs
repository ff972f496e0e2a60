use crate::error::SheetSqlError;
use glob::Pattern;

/// Criteria for selecting workbooks and sheets and for shaping inference.
#[derive(Clone, Debug)]
pub struct Criteria {
    /// File name patterns selecting workbooks inside the directory.
    pub file_patterns: Vec<Pattern>,

    /// Sheet name patterns reserved for metadata and never materialized.
    pub excluded_sheets: Vec<Pattern>,

    /// Rows sampled per column when inferring its type.
    pub analyze_rows: usize,

    /// Sheets with fewer populated rows are skipped.
    pub min_rows: usize,

    /// Build the relational store; when false every statement runs in memory.
    pub use_store: bool,
}

impl Default for Criteria {
    fn default() -> Self {
        Self {
            file_patterns: vec![Pattern::new("*.xlsx").unwrap_or_default()],
            excluded_sheets: vec![Pattern::new("Struct").unwrap_or_default()],
            analyze_rows: 10,
            min_rows: 4,
            use_store: true,
        }
    }
}

impl Criteria {
    /// Replaces the excluded sheet patterns.
    pub fn with_excluded_sheets(mut self, patterns: &[String]) -> Result<Self, SheetSqlError> {
        self.excluded_sheets = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self)
    }

    /// Checks if a file name matches any workbook pattern.
    pub fn accept_file(&self, file_name: &str) -> bool {
        !file_name.starts_with("~$") && self.file_patterns.iter().any(|pattern| pattern.matches(file_name))
    }

    /// Checks if a sheet should become a table.
    pub fn accept(&self, sheet_name: &str) -> bool {
        !self.excluded_sheets.iter().any(|pattern| pattern.matches(sheet_name))
    }
}
