use thiserror::Error;

pub type SheetcalcResult<T> = Result<T, SheetcalcError>;

#[derive(Error, Debug)]
pub enum SheetcalcError {
    /// A file record, workbook file, or sheet does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to open workbook {path}: {message}")]
    OpenFailure { path: String, message: String },

    #[error("Failed to read sheet '{sheet}': {message}")]
    ReadFailure { sheet: String, message: String },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid column identifier: '{0}'")]
    InvalidColumn(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// An explicitly-addressed merge entry carried no destination row.
    #[error("Missing target row for entry {index} of column {column}")]
    MissingAddress { column: String, index: usize },

    #[error("Merge target not found in template: {0}")]
    TargetNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SheetcalcError {
    /// Short machine-readable kind, reported alongside API error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            SheetcalcError::NotFound(_) => "not_found",
            SheetcalcError::OpenFailure { .. } => "open_failure",
            SheetcalcError::ReadFailure { .. } => "read_failure",
            SheetcalcError::InvalidRange(_) => "invalid_range",
            SheetcalcError::NoData(_) => "no_data",
            SheetcalcError::UnsupportedOperation(_) => "unsupported_operation",
            SheetcalcError::InvalidColumn(_) => "invalid_column",
            SheetcalcError::InvalidRequest(_) => "invalid_request",
            SheetcalcError::WriteFailure(_) => "write_failure",
            SheetcalcError::MissingAddress { .. } => "missing_address",
            SheetcalcError::TargetNotFound(_) => "target_not_found",
            SheetcalcError::Io(_) => "io",
            SheetcalcError::Yaml(_) => "yaml",
            SheetcalcError::Json(_) => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_address_names_column_and_entry() {
        let err = SheetcalcError::MissingAddress {
            column: "L".to_string(),
            index: 3,
        };
        assert_eq!(err.to_string(), "Missing target row for entry 3 of column L");
        assert_eq!(err.kind(), "missing_address");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SheetcalcError = io.into();
        assert!(matches!(err, SheetcalcError::Io(_)));
        assert_eq!(err.kind(), "io");
    }
}
