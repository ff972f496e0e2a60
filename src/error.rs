use thiserror::Error;

/// Main error type for the sheet SQL service.
/// Aggregates errors from the standard library, dependencies, and internal modules.
#[derive(Error, Debug)]
pub enum SheetSqlError {
    #[error("{0}")]
    WithContextError(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    // Third-party library errors
    #[error("{0}")]
    ParseDateTimeError(#[from] chrono::ParseError),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    #[error("{0}")]
    DuckDBError(#[from] duckdb::Error),

    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    JsonError(#[from] serde_json::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Spreadsheet module errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    // Database module errors
    #[error("{0}")]
    ColumnError(#[from] crate::database::column::ColumnError),

    #[error("{0}")]
    CoercionError(#[from] crate::database::coercion::CoercionError),

    #[error("{0}")]
    SchemaError(#[from] crate::database::inference::SchemaError),

    // Statement and evaluation errors
    #[error("{0}")]
    ParseError(#[from] crate::sql::ParseError),

    #[error("{0}")]
    EvaluationError(#[from] crate::engine::EvaluationError),

    #[error("{0}")]
    ServerError(#[from] crate::server::ServerError),

    // Workspace errors
    #[error("Table '{name}' not found. Available tables: [{}]. Available files: [{}]", .tables.join(", "), .files.join(", "))]
    TableNotFound {
        name: String,
        tables: Vec<String>,
        files: Vec<String>,
    },

    #[error("File '{name}' not found. Available files: [{}]", .files.join(", "))]
    FileNotFound { name: String, files: Vec<String> },

    #[error("Directory not set")]
    DirectoryNotSet,

    #[error("Directory '{0}' does not exist")]
    DirectoryNotFound(String),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, SheetSqlError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| SheetSqlError::WithContextError(format!("{}: {}", message, e)))
    }
}
