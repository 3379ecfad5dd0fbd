// Primitives for reading and writing CSV files.

use regex::Regex;
use std::collections::HashMap;

use crate::aadt::*;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Reads a CSV file as a raw sheet: no header, rows of uneven length accepted.
pub fn read_csv_sheet(path: &Path) -> AadtResult<Vec<Vec<Cell>>> {
    let p = path.display().to_string();
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path: p.clone() })?;
    let mut res: Vec<Vec<Cell>> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let line = line_r.context(CsvLineParseSnafu {
            path: p.clone(),
            lineno: idx + 1,
        })?;
        res.push(line.iter().map(read_field).collect());
    }
    debug!("read_csv_sheet: {}: {} rows", p, res.len());
    Ok(res)
}

fn read_field(s: &str) -> Cell {
    let s = s.trim_start_matches('\u{feff}');
    if s.is_empty() {
        Cell::Empty
    } else {
        Cell::Text(s.to_string())
    }
}

fn present_count_label(present_year: i32) -> String {
    format!("AADT_1-AADT {}", present_year)
}

fn future_count_label(future_year: i32) -> String {
    format!("AADT_2-AADT {}", future_year)
}

fn descriptive_headers() -> Vec<String> {
    FieldRole::ALL[..9]
        .iter()
        .map(|r| r.canonical_name().to_string())
        .collect()
}

fn optional_number(x: Option<f64>) -> String {
    x.map(format_plain_number).unwrap_or_default()
}

fn descriptive_values(r: &CanonicalRecord) -> Vec<String> {
    vec![
        r.location_id.clone(),
        r.route.clone(),
        format_plain_number(r.segment_start),
        r.start_description.clone(),
        format_plain_number(r.segment_end),
        r.end_description.clone(),
        optional_number(r.k_factor_pct),
        optional_number(r.d_factor_pct),
        optional_number(r.t_factor_pct),
    ]
}

fn render_rows(headers: &[String], rows: &[Vec<String>]) -> AadtResult<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut buf);
        wtr.write_record(headers).context(CsvWriteSnafu {})?;
        for row in rows.iter() {
            wtr.write_record(row).context(CsvWriteSnafu {})?;
        }
        wtr.flush().context(CsvFlushSnafu {})?;
    }
    Ok(buf)
}

/// The table of a valid dataset, as persisted for serving.
///
/// The reference years are carried by the labels of the two count columns.
pub fn render_table(dataset: &Dataset) -> AadtResult<Vec<u8>> {
    let mut headers = descriptive_headers();
    headers.push(present_count_label(dataset.present_year));
    headers.push(future_count_label(dataset.future_year));
    let rows: Vec<Vec<String>> = dataset
        .records
        .iter()
        .map(|r| {
            let mut values = descriptive_values(r);
            values.push(optional_number(r.present_count));
            values.push(optional_number(r.future_count));
            values
        })
        .collect();
    render_rows(&headers, &rows)
}

/// The issue report of a dataset: only the records that fail the check.
pub fn render_issue_report(dataset: &Dataset) -> AadtResult<Vec<u8>> {
    let mut headers = descriptive_headers();
    headers.push(present_count_label(dataset.present_year));
    headers.push(format!("AADT {}", dataset.present_year));
    headers.push(future_count_label(dataset.future_year));
    headers.push(format!("AADT {}", dataset.future_year));
    headers.push("Validity".to_string());
    let rows: Vec<Vec<String>> = dataset
        .bad_records()
        .iter()
        .map(|(_, r)| {
            let present = optional_number(r.present_count);
            let future = optional_number(r.future_count);
            let mut values = descriptive_values(r);
            values.push(present.clone());
            values.push(present);
            values.push(future.clone());
            values.push(future);
            values.push(row_validity(r).to_string());
            values
        })
        .collect();
    render_rows(&headers, &rows)
}

/// The exported query result. The byte-order mark lets spreadsheet
/// programs detect the encoding.
pub fn render_export(table: &QueryTable) -> AadtResult<Vec<u8>> {
    let rows: Vec<Vec<String>> = table.rows.iter().map(|r| r.values()).collect();
    let body = render_rows(&table.headers(), &rows)?;
    let mut res: Vec<u8> = UTF8_BOM.to_vec();
    res.extend(body);
    Ok(res)
}

fn table_year(labels: &[String], pattern: &Regex) -> Option<(usize, i32)> {
    labels.iter().enumerate().find_map(|(idx, l)| {
        pattern
            .captures(l.trim())
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .map(|y| (idx, y))
    })
}

/// Reads back a table written by `render_table`.
pub fn read_table(path: &Path) -> AadtResult<Dataset> {
    let p = path.display().to_string();
    let mut rows = read_csv_sheet(path)?.into_iter();
    let labels: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|c| c.as_text()).collect(),
        None => return MissingTableYearsSnafu { path: p }.fail(),
    };

    let present_re = Regex::new(r"^AADT_1-AADT\s+(\d+)$").expect("static pattern");
    let future_re = Regex::new(r"^AADT_2-AADT\s+(\d+)$").expect("static pattern");
    let (present_col, present_year) = match table_year(&labels, &present_re) {
        Some(x) => x,
        None => return MissingTableYearsSnafu { path: p }.fail(),
    };
    let (future_col, future_year) = match table_year(&labels, &future_re) {
        Some(x) => x,
        None => return MissingTableYearsSnafu { path: p }.fail(),
    };

    let mut columns: HashMap<String, usize> = HashMap::new();
    for (idx, l) in labels.iter().enumerate() {
        columns.entry(l.clone()).or_insert(idx);
    }
    let mut positions: Vec<usize> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    for role in FieldRole::ALL[..9].iter() {
        match columns.get(role.canonical_name()) {
            Some(idx) => positions.push(*idx),
            None => missing.push(role.canonical_name().to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(PipelineError::MissingRequiredColumns(missing))
            .context(PipelineSnafu { path: p });
    }
    positions.push(present_col);
    positions.push(future_col);

    let mapping = SchemaMapping::standard();
    let mut records: Vec<CanonicalRecord> = Vec::new();
    for (index, row) in rows.enumerate() {
        let cells: Vec<Cell> = positions
            .iter()
            .map(|i| row.get(*i).cloned().unwrap_or(Cell::Empty))
            .collect();
        let rr = ReconciledRow { index, cells };
        let rec = CanonicalRecord::from_row(&rr, &mapping)
            .context(PipelineSnafu { path: p.clone() })?;
        records.push(rec);
    }
    Ok(Dataset::new(
        &simplify_file_name(path),
        present_year,
        future_year,
        records,
    ))
}
