use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, instrument};

use crate::sheaf::tools::config::DEFAULT_OUTPUT_SHEET;
use crate::sheaf::tools::error::Result;
use crate::sheaf::tools::model::{CellValue, MergedTable};

/// Longest sheet name the xlsx format accepts.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

const DATETIME_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Writes the table as the only sheet of a new workbook and returns its bytes.
///
/// Names longer than [`MAX_SHEET_NAME_CHARS`] are cut silently; a blank name
/// falls back to `merged`.
#[instrument(
    level = "info",
    skip_all,
    fields(rows = table.row_count(), columns = table.column_count())
)]
pub fn serialize(table: &MergedTable, sheet_name: &str) -> Result<Vec<u8>> {
    let mut workbook_writer = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATETIME_NUM_FORMAT);

    let worksheet = workbook_writer.add_worksheet();
    worksheet.set_name(safe_sheet_name(sheet_name))?;

    for (col_idx, header) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col_idx as u16, header, &header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            let excel_col = col_idx as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(value) => {
                    worksheet.write_string(excel_row, excel_col, value)?;
                }
                CellValue::Number(value) => {
                    worksheet.write_number(excel_row, excel_col, *value)?;
                }
                CellValue::Bool(value) => {
                    worksheet.write_boolean(excel_row, excel_col, *value)?;
                }
                CellValue::DateTime(serial) => {
                    worksheet.write_number_with_format(
                        excel_row,
                        excel_col,
                        *serial,
                        &date_format,
                    )?;
                }
            }
        }
    }

    if !table.columns.is_empty() {
        let col_end = (table.columns.len() as u16).saturating_sub(1);
        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofilter(0, 0, table.rows.len() as u32, col_end)?;
    }

    let bytes = workbook_writer.save_to_buffer()?;
    debug!(bytes_len = bytes.len(), "workbook serialized");
    Ok(bytes)
}

/// Applies the default and the length limit to an output sheet name.
pub fn safe_sheet_name(requested: &str) -> String {
    let name = if requested.is_empty() {
        DEFAULT_OUTPUT_SHEET
    } else {
        requested
    };
    name.chars().take(MAX_SHEET_NAME_CHARS).collect()
}
