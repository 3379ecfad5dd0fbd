// Primitives for reading spreadsheet files.

use calamine::{open_workbook_auto, DataType, Reader};
use chrono::Timelike;

use crate::aadt::*;

/// The extensions handled by calamine.
pub const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Reads all the rows of a worksheet, without interpreting any of them as a header.
///
/// The first worksheet is used unless a name is given.
pub fn read_spreadsheet(path: &Path, worksheet_name: Option<&str>) -> AadtResult<Vec<Vec<Cell>>> {
    let p = path.display().to_string();
    let mut workbook =
        open_workbook_auto(path).context(OpeningSpreadsheetSnafu { path: p.clone() })?;
    let wrange = match worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu {
                name,
                path: p.clone(),
            })?
            .context(OpeningSpreadsheetSnafu { path: p.clone() })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptySpreadsheetSnafu { path: p.clone() })?
            .context(OpeningSpreadsheetSnafu { path: p.clone() })?,
    };

    let mut res: Vec<Vec<Cell>> = Vec::new();
    for row in wrange.rows() {
        res.push(row.iter().map(read_cell).collect());
    }
    debug!("read_spreadsheet: {}: {} rows", p, res.len());
    Ok(res)
}

fn read_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::String(s) => Cell::Text(s.clone()),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        DataType::DateTime(serial) => Cell::Text(date_text(cell, *serial)),
        DataType::Empty => Cell::Empty,
        _ => Cell::Empty,
    }
}

/// Dates read as ISO text, with the time only when it is not midnight.
fn date_text(cell: &DataType, serial: f64) -> String {
    match cell.as_datetime() {
        Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format_plain_number(serial),
    }
}
