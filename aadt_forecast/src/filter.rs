use log::debug;

use crate::config::*;
use crate::schema::ReconciledRow;

/// The text published in place of a milepost when the segment has none.
pub const NO_VALUE_SENTINEL: &str = "-";

/// Drops the rows without a usable segment start.
///
/// Only the segment start is inspected.
pub fn retain_usable_rows(rows: Vec<ReconciledRow>, mapping: &SchemaMapping) -> Vec<ReconciledRow> {
    let start_pos = mapping.position(FieldRole::SegmentStart);
    let before = rows.len();
    let res: Vec<ReconciledRow> = rows
        .into_iter()
        .filter(|row| match row.cells.get(start_pos) {
            None => false,
            Some(c) if c.is_blank() => false,
            Some(Cell::Text(s)) => s.trim() != NO_VALUE_SENTINEL,
            Some(_) => true,
        })
        .collect();
    debug!(
        "retain_usable_rows: kept {} of {} rows",
        res.len(),
        before
    );
    res
}

impl CanonicalRecord {
    /// Converts a reconciled row into a record.
    ///
    /// Mileposts must be numeric. Counts and distribution factors that do
    /// not parse are kept as missing; a record with a missing count fails
    /// the validity check.
    pub fn from_row(
        row: &ReconciledRow,
        mapping: &SchemaMapping,
    ) -> Result<CanonicalRecord, PipelineError> {
        let cell = |role: FieldRole| -> Cell {
            row.cells
                .get(mapping.position(role))
                .cloned()
                .unwrap_or(Cell::Empty)
        };
        let number = |role: FieldRole| -> Result<f64, PipelineError> {
            let c = cell(role);
            c.as_number().ok_or_else(|| PipelineError::MalformedValue {
                row: row.index,
                field: role.canonical_name().to_string(),
                content: c.as_text(),
            })
        };
        let text = |role: FieldRole| -> String { cell(role).as_text().trim().to_string() };

        Ok(CanonicalRecord {
            location_id: text(FieldRole::LocationId),
            route: text(FieldRole::Route),
            segment_start: number(FieldRole::SegmentStart)?,
            segment_end: number(FieldRole::SegmentEnd)?,
            start_description: text(FieldRole::StartDescription),
            end_description: text(FieldRole::EndDescription),
            k_factor_pct: cell(FieldRole::KFactor).as_number(),
            d_factor_pct: cell(FieldRole::DFactor).as_number(),
            t_factor_pct: cell(FieldRole::TFactor).as_number(),
            present_count: cell(FieldRole::PresentCount).as_number(),
            future_count: cell(FieldRole::FutureCount).as_number(),
        })
    }
}
