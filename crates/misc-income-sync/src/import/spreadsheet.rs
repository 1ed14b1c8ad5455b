use std::path::Path;

use anyhow::Context;
use calamine::{Data, Range, Reader, open_workbook_auto};

use super::{SourceRow, check_headers};
use crate::Result;

/// Read the rows of the first worksheet, the first of which is the header.
pub(super) fn read_rows(path: &Path) -> Result<Vec<SourceRow>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .context("Workbook has no worksheets")??;

    if range.is_empty() {
        tracing::warn!("{} is empty", path.display());
        return Ok(Vec::new());
    }
    rows_from_range(&range)
}

fn rows_from_range(range: &Range<Data>) -> Result<Vec<SourceRow>> {
    // the used range may start below the first sheet row
    let first_row = range.start().map_or(0, |(row, _)| row as usize);

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_text(cell).trim().to_owned())
        .collect();
    check_headers(&headers)?;

    let rows = sheet_rows
        .enumerate()
        .filter(|(_, cells)| !cells.iter().all(|cell| matches!(cell, Data::Empty)))
        .map(|(index, cells)| {
            let cells: Vec<String> = cells.iter().map(cell_text).collect();
            SourceRow::new(first_row + index + 2, &headers, cells.iter().map(String::as_str))
        })
        .collect();
    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) | Data::DateTimeIso(text) | Data::DurationIso(text) => text.clone(),
        Data::Float(value) => value.to_string(),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => if *value { "TRUE" } else { "FALSE" }.to_owned(),
        // serial number, understood by the date parser
        Data::DateTime(value) => value.as_f64().to_string(),
        Data::Error(error) => {
            tracing::debug!("cell error {error:?}");
            String::new()
        }
    }
}
