mod config;
mod filter;
mod forecast;
mod header;
mod query;
mod schema;
mod validity;

use log::{debug, info};

pub use crate::config::*;
pub use crate::filter::{retain_usable_rows, NO_VALUE_SENTINEL};
pub use crate::forecast::{forecast, GrowthModel};
pub use crate::header::locate_header;
pub use crate::query::{
    clamp_non_negative, clamp_target_year, format_thousands, route_options, run_query,
    QueryFilter, QueryRow, QueryTable,
};
pub use crate::schema::{extract_year, reconcile, ReconciledRow, ReconciledSheet};
pub use crate::validity::{check_records, row_validity};

/// The keywords that identify the header row in the published spreadsheets.
pub const DEFAULT_HEADER_KEYWORDS: [&str; 2] = ["BMP", "EMP"];

/// Runs a raw sheet through the ingestion pipeline.
///
/// Arguments:
/// * `source_name` the name of the sheet, used for logging and kept in the dataset
/// * `rows` all the rows of the sheet, read without a header
/// * `keywords` the words that identify the header row
/// * `mapping` the schema mapping used to resolve the canonical fields
///
/// The returned dataset may be invalid: the caller decides what to do with
/// it (see `Dataset::ensure_valid`).
pub fn ingest_sheet(
    source_name: &str,
    rows: &[Vec<Cell>],
    keywords: &[String],
    mapping: &SchemaMapping,
) -> Result<Dataset, PipelineError> {
    info!("Processing {} raw rows from {}", rows.len(), source_name);
    let header_row = locate_header(rows, keywords)?;
    debug!("ingest_sheet: {}: header at row {}", source_name, header_row);

    let sheet = reconcile(rows, header_row, mapping)?;
    let usable = retain_usable_rows(sheet.rows, mapping);

    let mut records: Vec<CanonicalRecord> = Vec::with_capacity(usable.len());
    for row in usable.iter() {
        records.push(CanonicalRecord::from_row(row, mapping)?);
    }
    info!("{}: data filtering complete, {} records", source_name, records.len());

    Ok(Dataset::new(
        source_name,
        sheet.present_year,
        sheet.future_year,
        records,
    ))
}
