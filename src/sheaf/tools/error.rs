use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Error type covering the different failure cases that can occur while a
/// merge run reads its inputs, consolidates them, or writes the result.
#[derive(Debug, Error)]
pub enum MergeError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when a configuration file cannot be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input bytes are not a readable workbook container.
    #[error("workbook parse error: {0}")]
    Parse(#[from] calamine::XlsxError),

    /// Raised when a readable workbook cannot be stacked as requested.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// One page-based input could not be read.
    #[error("failed to read document '{name}': {source}")]
    DocumentRead {
        name: String,
        #[source]
        source: lopdf::Error,
    },

    /// A word-processor document could not be converted to PDF.
    #[error("failed to convert '{name}': {reason}")]
    Conversion { name: String, reason: String },

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    SheetWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Raised when the consolidated page document cannot be written.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The batch output name is not a bare file name inside the scanned
    /// directory.
    #[error("output name must be a plain file name, got '{0}'")]
    InvalidOutputName(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl MergeError {
    /// Whether the failure is confined to a single input and may be skipped
    /// under a partial-success policy.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            MergeError::DocumentRead { .. } | MergeError::Conversion { .. }
        )
    }
}
