use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the attendance report pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A delimited text file could not be parsed.
    #[error("Failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// A spreadsheet workbook could not be opened or has no usable sheet.
    #[error("Failed to read spreadsheet {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The input table lacks one or more required columns.
    #[error("Input is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The input file extension is not one of the supported formats.
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(PathBuf),

    /// No `.csv` / `.xlsx` files were found under the given directory.
    #[error("No input files found in {0}")]
    NoInputFiles(PathBuf),

    /// The input contained a header but no data rows.
    #[error("Input contains no data rows: {0}")]
    EmptyInput(PathBuf),

    /// Duration bucket edges are not finite and strictly increasing.
    #[error("Invalid bucket edges: {0}")]
    InvalidBucketEdges(String),

    /// A region lookup failed (only surfaced inside resolvers; the pipeline
    /// degrades these to `"Unknown"`).
    #[error("Region lookup failed: {0}")]
    Lookup(String),

    /// A chart or report document could not be rendered.
    #[error("Render error: {0}")]
    Render(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the report crates.
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ReportError::FileRead {
            path: PathBuf::from("/some/attendance.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/attendance.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_missing_columns() {
        let err = ReportError::MissingColumns(vec!["Meeting ID".to_string(), "Phone".to_string()]);
        assert_eq!(
            err.to_string(),
            "Input is missing required columns: Meeting ID, Phone"
        );
    }

    #[test]
    fn test_error_display_unsupported_format() {
        let err = ReportError::UnsupportedFormat(PathBuf::from("data.pdf"));
        assert_eq!(err.to_string(), "Unsupported input format: data.pdf");
    }

    #[test]
    fn test_error_display_no_input_files() {
        let err = ReportError::NoInputFiles(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No input files found in /empty/dir");
    }

    #[test]
    fn test_error_display_invalid_bucket_edges() {
        let err = ReportError::InvalidBucketEdges("5 after 20".to_string());
        assert_eq!(err.to_string(), "Invalid bucket edges: 5 after 20");
    }

    #[test]
    fn test_error_display_config() {
        let err = ReportError::Config("missing ipinfo token".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing ipinfo token");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ReportError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: ReportError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
