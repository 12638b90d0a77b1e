use std::collections::HashSet;
use std::io::Cursor;

use calamine::{DataType, Reader, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument};

use crate::sheaf::tools::error::{MergeError, Result};
use crate::sheaf::tools::model::{CellValue, Sheet, Workbook};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const TIME_FORMAT: &str = "%H:%M:%S";
/// Serial number of 9999-12-31, the last day Excel can represent.
const MAX_SERIAL: f64 = 2_958_465.0;

/// Reads every sheet of an `.xlsx` workbook with all cells coerced to text.
pub fn load_sheets(bytes: &[u8]) -> Result<Workbook> {
    read_workbook(bytes, true)
}

/// Reads every sheet of an `.xlsx` workbook in workbook order.
///
/// The first row of each sheet is its header. Columns are counted from
/// column A even when the leading ones are blank. With `coerce_to_text` set every
/// non-empty cell is rendered as text; otherwise numbers, booleans, and dates
/// keep their native type. Rows whose cells are all empty are dropped.
#[instrument(level = "info", skip_all, fields(bytes_len = bytes.len(), coerce_to_text = coerce_to_text))]
pub fn read_workbook(bytes: &[u8], coerce_to_text: bool) -> Result<Workbook> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let names = workbook.sheet_names().to_vec();

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = read_required_sheet(&mut workbook, &name)?;
        let sheet = ingest_sheet(&name, &range, coerce_to_text);
        debug!(
            sheet = %sheet.name,
            columns = sheet.columns.len(),
            rows = sheet.rows.len(),
            "sheet read"
        );
        sheets.push(sheet);
    }

    info!(sheet_count = sheets.len(), "workbook read");
    Ok(Workbook::new(sheets))
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<calamine::Range<DataType>> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| MergeError::InvalidWorkbook(format!("missing sheet '{name}'")))?;
    let range = range_result.map_err(MergeError::from)?;
    Ok(range)
}

fn ingest_sheet(name: &str, range: &calamine::Range<DataType>, coerce_to_text: bool) -> Sheet {
    // The used range may start right of column A; blank leading columns still
    // count, so headers and cells are indexed from the sheet's first column.
    let leading = range.start().map_or(0, |(_, col)| col as usize);

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first_row) => std::iter::repeat_n(String::new(), leading)
            .chain(first_row.iter().map(|cell| cell_to_string(Some(cell))))
            .collect(),
        None => Vec::new(),
    };
    let columns = normalize_headers(headers);

    let rows = rows
        .map(|row| {
            std::iter::repeat_n(CellValue::Empty, leading)
                .chain(row.iter().map(|cell| convert_cell(cell, coerce_to_text)))
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.iter().any(|cell| !cell.is_empty()))
        .collect();

    Sheet::new(name, columns, rows)
}

/// Gives blank headers a positional name and suffixes repeated ones with
/// `.1`, `.2`, ... so every column of a sheet is addressable by name.
pub(crate) fn normalize_headers(headers: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut columns = Vec::with_capacity(headers.len());

    for (index, header) in headers.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {index}")
        } else {
            header
        };

        let mut candidate = base.clone();
        let mut counter = 1;
        while used.contains(&candidate) {
            candidate = format!("{base}.{counter}");
            counter += 1;
        }
        used.insert(candidate.clone());
        columns.push(candidate);
    }

    columns
}

fn convert_cell(cell: &DataType, coerce_to_text: bool) -> CellValue {
    if coerce_to_text {
        return match cell {
            DataType::Empty => CellValue::Empty,
            other => CellValue::Text(cell_to_string(Some(other))),
        };
    }

    match cell {
        DataType::Empty => CellValue::Empty,
        DataType::String(value) => CellValue::Text(value.clone()),
        DataType::Float(value) => CellValue::Number(*value),
        DataType::Int(value) => CellValue::Number(*value as f64),
        DataType::Bool(value) => CellValue::Bool(*value),
        DataType::DateTime(serial) => CellValue::DateTime(*serial),
        other => CellValue::Text(other.to_string()),
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(true)) => "True".to_string(),
        Some(DataType::Bool(false)) => "False".to_string(),
        Some(DataType::DateTime(serial)) => format_serial_datetime(*serial),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Renders an Excel serial day number (1900 date system) as text.
pub(crate) fn format_serial_datetime(serial: f64) -> String {
    match serial_to_datetime(serial) {
        Some(datetime) if serial < 1.0 => datetime.format(TIME_FORMAT).to_string(),
        Some(datetime) => datetime.format(DATETIME_FORMAT).to_string(),
        None => serial.to_string(),
    }
}

fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}
