use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::sheaf::tools::concat::{ConcatOutcome, DocumentSource, Progress, concatenate};
use crate::sheaf::tools::config::{ConcatOptions, StackOptions};
use crate::sheaf::tools::convert::display_name;
use crate::sheaf::tools::error::{MergeError, Result};
use crate::sheaf::tools::io::{excel_read, excel_write};
use crate::sheaf::tools::model::MergedTable;
use crate::sheaf::tools::stack::stack;

/// A stacked workbook together with the table it was written from.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedWorkbook {
    /// Names of every sheet read from the input, empty ones included.
    pub sheet_names: Vec<String>,
    pub table: MergedTable,
    pub bytes: Vec<u8>,
}

/// Reads a workbook, stacks its sheets, and serialises the result.
#[instrument(level = "info", skip_all, fields(bytes_len = bytes.len()))]
pub fn stack_workbook(bytes: &[u8], options: &StackOptions) -> Result<StackedWorkbook> {
    let workbook = excel_read::read_workbook(bytes, options.coerce_to_text)?;
    let sheet_names = workbook.sheet_names().map(str::to_string).collect();
    let table = stack(&workbook, options)?;
    let bytes = excel_write::serialize(&table, &options.output_sheet_name)?;
    Ok(StackedWorkbook {
        sheet_names,
        table,
        bytes,
    })
}

/// Stacks the sheets of the workbook at `input` into a one-sheet workbook at
/// `output`.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display())
)]
pub fn stack_file(input: &Path, output: &Path, options: &StackOptions) -> Result<StackedWorkbook> {
    if !input.exists() {
        return Err(MergeError::MissingInput(input.to_path_buf()));
    }
    let source = fs::read(input)?;
    let stacked = stack_workbook(&source, options)?;
    fs::write(output, &stacked.bytes)?;
    info!(
        sheets = stacked.sheet_names.len(),
        rows = stacked.table.row_count(),
        "stacked workbook written"
    );
    Ok(stacked)
}

/// Concatenates the PDFs at `inputs`, in the order given, into `output`.
///
/// Nothing is written unless the merge succeeds.
#[instrument(
    level = "info",
    skip_all,
    fields(inputs = inputs.len(), output = %output.display())
)]
pub fn concat_files<F>(
    inputs: &[PathBuf],
    output: &Path,
    options: &ConcatOptions,
    progress: F,
) -> Result<ConcatOutcome>
where
    F: FnMut(Progress),
{
    let sources = inputs
        .iter()
        .map(|path| load_source(path))
        .collect::<Result<Vec<_>>>()?;
    let outcome = concatenate(&sources, options, progress)?;
    fs::write(output, &outcome.bytes)?;
    debug!(bytes_len = outcome.bytes.len(), "merged document written");
    Ok(outcome)
}

fn load_source(path: &Path) -> Result<DocumentSource> {
    if !path.exists() {
        return Err(MergeError::MissingInput(path.to_path_buf()));
    }
    Ok(DocumentSource::new(display_name(path), fs::read(path)?))
}
