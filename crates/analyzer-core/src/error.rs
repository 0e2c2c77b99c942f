use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the box-office analyzer.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A raw export does not have the expected tabular shape.
    ///
    /// This is the only error the normalizer recovers from, by repairing the
    /// file once and parsing it again.
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// The spreadsheet library rejected a workbook.
    #[error("Spreadsheet error in {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },

    /// No raw exports were present when the analysis was triggered.
    #[error("No spreadsheet files found in {0}")]
    EmptyInput(PathBuf),

    /// The registry configuration could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// The office suite used for repairs and PDF export failed.
    #[error("Office suite error: {0}")]
    Office(String),

    /// A report could not be assembled or written.
    #[error("Render error: {0}")]
    Render(String),

    /// Another analysis currently holds the workspace.
    #[error("Workspace {0} is busy with another analysis")]
    Busy(PathBuf),

    /// The analysis was cancelled before it completed.
    #[error("Analysis cancelled")]
    Cancelled,

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

impl AnalyzerError {
    /// Shorthand for a [`AnalyzerError::Parse`] about `path`.
    pub fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// `true` for errors the normalizer may retry after a repair pass.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

/// Convenience alias used throughout the analyzer crates.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AnalyzerError::FileRead {
            path: PathBuf::from("/some/0.xlsx"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/0.xlsx"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_parse() {
        let err = AnalyzerError::parse("/ws/1.xlsx", "missing column Cinema");
        assert_eq!(
            err.to_string(),
            "Failed to parse /ws/1.xlsx: missing column Cinema"
        );
        assert!(err.is_parse());
    }

    #[test]
    fn test_error_display_empty_input() {
        let err = AnalyzerError::EmptyInput(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No spreadsheet files found in /empty/dir");
        assert!(!err.is_parse());
    }

    #[test]
    fn test_error_display_busy() {
        let err = AnalyzerError::Busy(PathBuf::from("/ws"));
        assert_eq!(err.to_string(), "Workspace /ws is busy with another analysis");
    }

    #[test]
    fn test_error_display_config() {
        let err = AnalyzerError::Config("unknown timezone".to_string());
        assert_eq!(err.to_string(), "Configuration error: unknown timezone");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AnalyzerError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: AnalyzerError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
