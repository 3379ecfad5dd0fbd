use log::debug;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::*;

/// A data row, with one cell per canonical field in mapping order.
#[derive(PartialEq, Debug, Clone)]
pub struct ReconciledRow {
    /// Zero-based index of the row among the data rows following the header.
    pub index: usize,
    pub cells: Vec<Cell>,
}

/// The outcome of reconciling one sheet with the canonical schema.
#[derive(PartialEq, Debug, Clone)]
pub struct ReconciledSheet {
    pub present_year: i32,
    pub future_year: i32,
    pub rows: Vec<ReconciledRow>,
}

/// A column of the sheet resolved for a field.
#[derive(Eq, PartialEq, Debug, Clone)]
struct ColumnMatch {
    column: usize,
    label: String,
    via_alternate: bool,
}

/// Maps the columns of a sheet onto the canonical fields.
///
/// The row at `header_row` provides the labels; every row after it is data.
pub fn reconcile(
    rows: &[Vec<Cell>],
    header_row: usize,
    mapping: &SchemaMapping,
) -> Result<ReconciledSheet, PipelineError> {
    let header: &[Cell] = rows.get(header_row).map(|r| r.as_slice()).unwrap_or(&[]);
    // The first occurrence of a label wins.
    let mut labels: HashMap<String, usize> = HashMap::new();
    for (idx, cell) in header.iter().enumerate() {
        labels.entry(cell.as_text()).or_insert(idx);
    }
    debug!("reconcile: header labels: {:?}", labels);

    let mut matches: Vec<ColumnMatch> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    for spec in mapping.fields() {
        match match_field(spec, &labels) {
            Some(m) => matches.push(m),
            None => missing.push(spec.canonical.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(PipelineError::MissingRequiredColumns(missing));
    }

    let mut present_year: Option<i32> = None;
    let mut future_year: Option<i32> = None;
    for (spec, m) in mapping.fields().iter().zip(matches.iter()) {
        if !spec.extract_year {
            continue;
        }
        let year = if m.via_alternate {
            extract_year(&m.label)
        } else {
            None
        };
        let year = year.ok_or_else(|| PipelineError::ReferenceYearNotFound {
            field: spec.canonical.clone(),
            column: m.label.clone(),
        })?;
        match spec.role {
            FieldRole::PresentCount => present_year = Some(year),
            FieldRole::FutureCount => future_year = Some(year),
            _ => {}
        }
    }
    let present_year = present_year.ok_or_else(|| PipelineError::ReferenceYearNotFound {
        field: FieldRole::PresentCount.canonical_name().to_string(),
        column: "".to_string(),
    })?;
    let future_year = future_year.ok_or_else(|| PipelineError::ReferenceYearNotFound {
        field: FieldRole::FutureCount.canonical_name().to_string(),
        column: "".to_string(),
    })?;
    debug!(
        "reconcile: present year {}, future year {}",
        present_year, future_year
    );

    let mut res: Vec<ReconciledRow> = Vec::new();
    for (index, row) in rows.iter().skip(header_row + 1).enumerate() {
        if row.iter().all(|c| c.is_blank()) {
            continue;
        }
        let cells: Vec<Cell> = matches
            .iter()
            .map(|m| row.get(m.column).cloned().unwrap_or(Cell::Empty))
            .collect();
        res.push(ReconciledRow { index, cells });
    }
    Ok(ReconciledSheet {
        present_year,
        future_year,
        rows: res,
    })
}

fn match_field(spec: &FieldSpec, labels: &HashMap<String, usize>) -> Option<ColumnMatch> {
    if let Some(column) = labels.get(&spec.canonical) {
        return Some(ColumnMatch {
            column: *column,
            label: spec.canonical.clone(),
            via_alternate: false,
        });
    }
    spec.alternates.iter().find_map(|alt| {
        labels.get(alt).map(|column| ColumnMatch {
            column: *column,
            label: alt.clone(),
            via_alternate: true,
        })
    })
}

/// The first run of digits in a column label, read as a year.
pub fn extract_year(label: &str) -> Option<i32> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("static pattern"));
    re.find(label).and_then(|m| m.as_str().parse::<i32>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(xs: &[&str]) -> Vec<Cell> {
        xs.iter().map(|s| Cell::Text(s.to_string())).collect()
    }

    const STANDARD_HEADER: [&str; 11] = [
        "LocID",
        "Road",
        "BMP",
        "FromRoad",
        "EMP",
        "ToRoad",
        "K Factor %",
        "D Factor %",
        "T Factor %",
        "AADT 2022",
        "2042 Future AADT",
    ];

    #[test]
    fn alternates_and_years() {
        let rows = vec![
            text_row(&["title"]),
            text_row(&STANDARD_HEADER),
            text_row(&["7", "I-5", "0", "A", "1.5", "B", "9", "55", "12", "1000", "2000"]),
        ];
        let sheet = reconcile(&rows, 1, &SchemaMapping::standard()).unwrap();
        assert_eq!(sheet.present_year, 2022);
        assert_eq!(sheet.future_year, 2042);
        assert_eq!(sheet.rows.len(), 1);
        let row = &sheet.rows[0];
        assert_eq!(row.index, 0);
        assert_eq!(row.cells[1], Cell::Text("I-5".to_string()));
        assert_eq!(row.cells[9], Cell::Text("1000".to_string()));
        assert_eq!(row.cells[10], Cell::Text("2000".to_string()));
    }

    #[test]
    fn canonical_name_preferred_over_alternate() {
        let mut header: Vec<&str> = STANDARD_HEADER.to_vec();
        header.push("Route");
        let mut data = vec!["7", "Road value", "0", "A", "1", "B", "9", "55", "12", "1", "2"];
        data.push("Route value");
        let rows = vec![text_row(&header), text_row(&data)];
        let sheet = reconcile(&rows, 0, &SchemaMapping::standard()).unwrap();
        assert_eq!(sheet.rows[0].cells[1], Cell::Text("Route value".to_string()));
    }

    #[test]
    fn first_listed_alternate_wins() {
        let header = vec![
            "Location", "Loc_ID", "Road", "BMP", "FromRoad", "EMP", "ToRoad", "K Factor %",
            "D Factor %", "T Factor %", "AADT 2021", "2041 Future AADT",
        ];
        let data = vec!["L", "LID", "R", "0", "A", "1", "B", "1", "2", "3", "5", "6"];
        let rows = vec![text_row(&header), text_row(&data)];
        let sheet = reconcile(&rows, 0, &SchemaMapping::standard()).unwrap();
        // Loc_ID comes before Location in the alternates.
        assert_eq!(sheet.rows[0].cells[0], Cell::Text("LID".to_string()));
        assert_eq!(sheet.present_year, 2021);
    }

    #[test]
    fn missing_columns_are_all_reported() {
        let rows = vec![text_row(&["Route", "BMP", "EMP", "AADT 2022"])];
        let err = reconcile(&rows, 0, &SchemaMapping::standard()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingRequiredColumns(vec![
                "Loc ID".to_string(),
                "Start".to_string(),
                "End".to_string(),
                "K Factor %".to_string(),
                "D Factor %".to_string(),
                "T Factor %".to_string(),
                "AADT_2".to_string(),
            ])
        );
    }

    #[test]
    fn verbatim_count_column_has_no_year() {
        let mut header: Vec<&str> = STANDARD_HEADER.to_vec();
        header[9] = "AADT_1";
        let rows = vec![text_row(&header)];
        let err = reconcile(&rows, 0, &SchemaMapping::standard()).unwrap_err();
        assert_eq!(
            err,
            PipelineError::ReferenceYearNotFound {
                field: "AADT_1".to_string(),
                column: "AADT_1".to_string()
            }
        );
    }

    #[test]
    fn short_and_blank_rows() {
        let rows = vec![
            text_row(&STANDARD_HEADER),
            vec![Cell::Empty, Cell::Text("  ".to_string())],
            text_row(&["7", "I-5", "3"]),
        ];
        let sheet = reconcile(&rows, 0, &SchemaMapping::standard()).unwrap();
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].index, 1);
        assert_eq!(sheet.rows[0].cells[2], Cell::Text("3".to_string()));
        assert_eq!(sheet.rows[0].cells[10], Cell::Empty);
    }

    #[test]
    fn numeric_header_labels() {
        let mut header: Vec<Cell> = text_row(&STANDARD_HEADER[..9]);
        header.push(Cell::Text("AADT 2023".to_string()));
        header.push(Cell::Text("2043 Future AADT".to_string()));
        header.push(Cell::Number(2050.0));
        let rows = vec![header];
        let sheet = reconcile(&rows, 0, &SchemaMapping::standard()).unwrap();
        assert_eq!((sheet.present_year, sheet.future_year), (2023, 2043));
    }

    #[test]
    fn year_from_label() {
        assert_eq!(extract_year("AADT 2027"), Some(2027));
        assert_eq!(extract_year("2045 Future AADT"), Some(2045));
        assert_eq!(extract_year("Future AADT"), None);
    }
}
