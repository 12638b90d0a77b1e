use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sheaf::tools::error::Result;

/// Default name of the provenance column inserted by the stacking engine.
pub const DEFAULT_PROVENANCE_COLUMN: &str = "__sheet__";
/// Default sheet name of the stacked output workbook.
pub const DEFAULT_OUTPUT_SHEET: &str = "merged";
/// Default file name written by the batch variant.
pub const DEFAULT_BATCH_OUTPUT: &str = "merged.pdf";
/// Default program used to convert word-processor documents.
pub const DEFAULT_CONVERTER_PROGRAM: &str = "soffice";

/// Options shared by both merge engines. Every section falls back to its
/// defaults so partial configuration files are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub stack: StackOptions,
    pub concat: ConcatOptions,
    pub batch: BatchOptions,
}

impl MergeOptions {
    /// Loads options from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// Controls how sheets are stacked into one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackOptions {
    /// Insert a leading column holding the originating sheet name.
    pub add_provenance_column: bool,
    pub provenance_column_name: String,
    /// Keep every column seen in any sheet; otherwise keep only the shared ones.
    pub union_columns: bool,
    /// Read every cell as text so sheets with different typing stack cleanly.
    pub coerce_to_text: bool,
    pub output_sheet_name: String,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            add_provenance_column: true,
            provenance_column_name: DEFAULT_PROVENANCE_COLUMN.to_string(),
            union_columns: true,
            coerce_to_text: true,
            output_sheet_name: DEFAULT_OUTPUT_SHEET.to_string(),
        }
    }
}

/// What to do when a single input cannot be read or converted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole run; no partial output is produced.
    #[default]
    Abort,
    /// Record the failure, leave the input out, and keep going.
    SkipFailed,
}

/// Controls page document concatenation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcatOptions {
    pub failure_policy: FailurePolicy,
    /// Compress content streams of the merged document.
    pub compress: bool,
}

impl Default for ConcatOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Abort,
            compress: true,
        }
    }
}

/// Controls the directory-scanning batch variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// File name of the merged output, written inside the scanned directory.
    pub output_name: String,
    pub failure_policy: FailurePolicy,
    pub converter_program: PathBuf,
    pub compress: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            output_name: DEFAULT_BATCH_OUTPUT.to_string(),
            failure_policy: FailurePolicy::SkipFailed,
            converter_program: PathBuf::from(DEFAULT_CONVERTER_PROGRAM),
            compress: true,
        }
    }
}

impl BatchOptions {
    pub(crate) fn concat_options(&self) -> ConcatOptions {
        ConcatOptions {
            failure_policy: self.failure_policy,
            compress: self.compress,
        }
    }
}
