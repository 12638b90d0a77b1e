use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument};

use crate::sheaf::tools::config::StackOptions;
use crate::sheaf::tools::error::{MergeError, Result};
use crate::sheaf::tools::model::{CellValue, MergedTable, Sheet, Workbook};

/// Stacks the rows of every non-empty sheet into one table.
///
/// Row order is sheet order, then each sheet's own row order. With
/// `union_columns` the output keeps every column seen, in first-seen order,
/// and fills cells a sheet lacks with [`CellValue::Empty`]. Without it only the
/// columns shared by all contributing sheets are kept, in the first sheet's
/// order. A workbook without data rows yields an empty table.
#[instrument(
    level = "info",
    skip_all,
    fields(sheets = workbook.len(), union = options.union_columns, provenance = options.add_provenance_column)
)]
pub fn stack(workbook: &Workbook, options: &StackOptions) -> Result<MergedTable> {
    let mut frames = Vec::with_capacity(workbook.len());
    for sheet in &workbook.sheets {
        if sheet.is_empty() {
            debug!(sheet = %sheet.name, "skipping empty sheet");
            continue;
        }
        frames.push(Frame::from_sheet(sheet, options)?);
    }

    if frames.is_empty() {
        info!("no sheet contributed rows");
        return Ok(MergedTable::default());
    }

    let columns = if options.union_columns {
        union_columns(&frames)
    } else {
        intersect_columns(&frames)
    };

    let mut table = MergedTable {
        columns,
        rows: Vec::with_capacity(frames.iter().map(|frame| frame.rows.len()).sum()),
    };
    for frame in frames {
        frame.project_into(&mut table);
    }

    info!(
        rows = table.row_count(),
        columns = table.column_count(),
        "sheets stacked"
    );
    Ok(table)
}

/// A sheet prepared for stacking, with the provenance column already in place.
struct Frame<'a> {
    columns: Vec<&'a str>,
    rows: Vec<Vec<CellValue>>,
}

impl<'a> Frame<'a> {
    fn from_sheet(sheet: &'a Sheet, options: &'a StackOptions) -> Result<Self> {
        if !options.add_provenance_column {
            return Ok(Self {
                columns: sheet.columns.iter().map(String::as_str).collect(),
                rows: sheet.rows.clone(),
            });
        }

        let provenance = options.provenance_column_name.as_str();
        if sheet.columns.iter().any(|column| column == provenance) {
            return Err(MergeError::InvalidWorkbook(format!(
                "sheet '{}' already has a column named '{provenance}'",
                sheet.name
            )));
        }

        let mut columns = Vec::with_capacity(sheet.columns.len() + 1);
        columns.push(provenance);
        columns.extend(sheet.columns.iter().map(String::as_str));

        let rows = sheet
            .rows
            .iter()
            .map(|row| {
                let mut cells = Vec::with_capacity(row.len() + 1);
                cells.push(CellValue::text(sheet.name.as_str()));
                cells.extend(row.iter().cloned());
                cells
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Appends this frame's rows to `table`, reordered to the table's columns.
    fn project_into(self, table: &mut MergedTable) {
        let positions: HashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| (*column, index))
            .collect();
        let sources: Vec<Option<usize>> = table
            .columns
            .iter()
            .map(|column| positions.get(column.as_str()).copied())
            .collect();

        for mut row in self.rows {
            let cells = sources
                .iter()
                .map(|source| match source {
                    Some(index) => row.get_mut(*index).map(std::mem::take).unwrap_or_default(),
                    None => CellValue::Empty,
                })
                .collect();
            table.rows.push(cells);
        }
    }
}

fn union_columns(frames: &[Frame<'_>]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut columns = Vec::new();
    for frame in frames {
        for column in &frame.columns {
            if seen.insert(*column) {
                columns.push(column.to_string());
            }
        }
    }
    columns
}

fn intersect_columns(frames: &[Frame<'_>]) -> Vec<String> {
    let Some((first, rest)) = frames.split_first() else {
        return Vec::new();
    };
    let mut common: HashSet<&str> = first.columns.iter().copied().collect();
    for frame in rest {
        let present: HashSet<&str> = frame.columns.iter().copied().collect();
        common.retain(|column| present.contains(column));
    }
    first
        .columns
        .iter()
        .filter(|column| common.contains(*column))
        .map(|column| column.to_string())
        .collect()
}
