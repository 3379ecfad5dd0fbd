use log::{debug, warn};
use std::collections::HashSet;

use crate::config::*;
use crate::forecast::GrowthModel;

/// The selection made by the user on a dataset.
#[derive(PartialEq, Debug, Clone)]
pub struct QueryFilter {
    /// All the routes when not set.
    pub route: Option<String>,
    pub bmp: f64,
    pub emp: f64,
    pub year_1: i32,
    pub year_2: i32,
}

/// One displayed row. All the values are already formatted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QueryRow {
    pub location_id: String,
    pub route: String,
    pub bmp: String,
    pub start_description: String,
    pub emp: String,
    pub end_description: String,
    pub k_factor_pct: i64,
    pub d_factor_pct: i64,
    pub t_factor_pct: i64,
    pub present_count: String,
    pub future_count: String,
    /// Blank when the record cannot be projected.
    pub forecast_1: String,
    pub forecast_2: String,
}

impl QueryRow {
    pub fn values(&self) -> Vec<String> {
        vec![
            self.location_id.clone(),
            self.route.clone(),
            self.bmp.clone(),
            self.start_description.clone(),
            self.emp.clone(),
            self.end_description.clone(),
            self.k_factor_pct.to_string(),
            self.d_factor_pct.to_string(),
            self.t_factor_pct.to_string(),
            self.present_count.clone(),
            self.future_count.clone(),
            self.forecast_1.clone(),
            self.forecast_2.clone(),
        ]
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QueryTable {
    pub present_year: i32,
    pub future_year: i32,
    pub year_1: i32,
    pub year_2: i32,
    pub rows: Vec<QueryRow>,
}

impl QueryTable {
    pub fn headers(&self) -> Vec<String> {
        let mut res: Vec<String> = FieldRole::ALL[..9]
            .iter()
            .map(|r| r.canonical_name().to_string())
            .collect();
        res.push(format!("AADT {}", self.present_year));
        res.push(format!("AADT {}", self.future_year));
        res.push(format!("Future AADT {}", self.year_1));
        res.push(format!("Future AADT {}", self.year_2));
        res
    }
}

/// Selects the records of a dataset and projects them to the two requested years.
///
/// A record is kept when it overlaps the requested segment range. Both
/// bounds are strict: a segment that only touches the range is left out.
/// The dataset itself is never modified.
pub fn run_query(dataset: &Dataset, filter: &QueryFilter) -> QueryTable {
    let rows: Vec<QueryRow> = dataset
        .records
        .iter()
        .filter(|r| match &filter.route {
            Some(route) => r.route == *route,
            None => true,
        })
        .filter(|r| r.segment_start < filter.emp && r.segment_end > filter.bmp)
        .map(|r| format_row(dataset, r, filter))
        .collect();
    debug!(
        "run_query: {:?}: {} of {} records selected",
        filter,
        rows.len(),
        dataset.records.len()
    );
    QueryTable {
        present_year: dataset.present_year,
        future_year: dataset.future_year,
        year_1: filter.year_1,
        year_2: filter.year_2,
        rows,
    }
}

fn format_row(dataset: &Dataset, r: &CanonicalRecord, filter: &QueryFilter) -> QueryRow {
    let model = match (r.present_count, r.future_count) {
        (Some(present), Some(future)) => {
            GrowthModel::new(dataset.present_year, present, dataset.future_year, future)
        }
        _ => Err(PipelineError::InvalidForecastInput {
            reason: "missing reference count".to_string(),
        }),
    };
    let (forecast_1, forecast_2) = match model {
        Ok(m) => (
            format_thousands(m.project(filter.year_1) as f64),
            format_thousands(m.project(filter.year_2) as f64),
        ),
        Err(e) => {
            warn!(
                "Route {} BMP {}: cannot project: {}",
                r.route, r.segment_start, e
            );
            ("".to_string(), "".to_string())
        }
    };
    QueryRow {
        location_id: r.location_id.clone(),
        route: r.route.clone(),
        bmp: format_plain_number(r.segment_start),
        start_description: r.start_description.clone(),
        emp: format_plain_number(r.segment_end),
        end_description: r.end_description.clone(),
        k_factor_pct: round_factor(r.k_factor_pct),
        d_factor_pct: round_factor(r.d_factor_pct),
        t_factor_pct: round_factor(r.t_factor_pct),
        present_count: r.present_count.map(format_thousands).unwrap_or_default(),
        future_count: r.future_count.map(format_thousands).unwrap_or_default(),
        forecast_1,
        forecast_2,
    }
}

/// Halves go to the even neighbour.
fn round_factor(x: Option<f64>) -> i64 {
    x.map(|f| f.round_ties_even() as i64).unwrap_or(0)
}

/// Formats a count with no decimals and comma thousands separators.
pub fn format_thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(d) => ("-", d),
        None => ("", rounded.as_str()),
    };
    let mut res = String::new();
    for (idx, c) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            res.push(',');
        }
        res.push(c);
    }
    if res == "0" {
        return res;
    }
    format!("{}{}", sign, res)
}

/// The distinct routes of a dataset, in the order they first appear.
pub fn route_options(dataset: &Dataset) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    dataset
        .records
        .iter()
        .filter(|r| seen.insert(r.route.as_str()))
        .map(|r| r.route.clone())
        .collect()
}

/// Negative segment bounds are brought back to zero.
pub fn clamp_non_negative(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        0.0
    } else {
        x
    }
}

/// Target years are floored at zero and capped at the maximum, if any.
pub fn clamp_target_year(year: i32, max_year: Option<i32>) -> i32 {
    let year = year.max(0);
    match max_year {
        Some(m) if year > m => m,
        _ => year,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(route: &str, start: f64, end: f64, present: f64, future: f64) -> CanonicalRecord {
        CanonicalRecord {
            location_id: "12".to_string(),
            route: route.to_string(),
            segment_start: start,
            segment_end: end,
            start_description: "From".to_string(),
            end_description: "To".to_string(),
            k_factor_pct: Some(9.6),
            d_factor_pct: Some(54.4),
            t_factor_pct: None,
            present_count: Some(present),
            future_count: Some(future),
        }
    }

    fn filter(route: Option<&str>, bmp: f64, emp: f64) -> QueryFilter {
        QueryFilter {
            route: route.map(|s| s.to_string()),
            bmp,
            emp,
            year_1: 2032,
            year_2: 2052,
        }
    }

    #[test]
    fn overlap_is_strict() {
        let ds = Dataset::new("x", 2022, 2042, vec![record("I-5", 5.0, 10.0, 1.0, 2.0)]);
        assert_eq!(run_query(&ds, &filter(None, 0.0, 6.0)).rows.len(), 1);
        assert_eq!(run_query(&ds, &filter(None, 10.0, 20.0)).rows.len(), 0);
        assert_eq!(run_query(&ds, &filter(None, 0.0, 5.0)).rows.len(), 0);
        assert_eq!(run_query(&ds, &filter(None, 6.0, 7.0)).rows.len(), 1);
    }

    #[test]
    fn route_filter() {
        let ds = Dataset::new(
            "x",
            2022,
            2042,
            vec![
                record("I-5", 0.0, 1.0, 1.0, 2.0),
                record("SR 20", 0.0, 1.0, 1.0, 2.0),
                record("I-5", 1.0, 2.0, 1.0, 2.0),
            ],
        );
        assert_eq!(run_query(&ds, &filter(Some("I-5"), 0.0, 100.0)).rows.len(), 2);
        assert_eq!(run_query(&ds, &filter(Some("US 2"), 0.0, 100.0)).rows.len(), 0);
        assert_eq!(run_query(&ds, &filter(None, 0.0, 100.0)).rows.len(), 3);
        assert_eq!(route_options(&ds), vec!["I-5".to_string(), "SR 20".to_string()]);
    }

    #[test]
    fn end_to_end_projection() {
        let ds = Dataset::new("x", 2022, 2042, vec![record("I-5", 0.0, 1.5, 1000.0, 2000.0)]);
        let table = run_query(&ds, &filter(None, 0.0, 1000.0));
        let row = &table.rows[0];
        assert_eq!(row.present_count, "1,000");
        assert_eq!(row.future_count, "2,000");
        assert_eq!(row.forecast_1, "1,414");
        assert_eq!(row.forecast_2, "2,828");
        assert_eq!(row.bmp, "0");
        assert_eq!(row.emp, "1.5");
        assert_eq!((row.k_factor_pct, row.d_factor_pct, row.t_factor_pct), (10, 54, 0));
        assert_eq!(
            table.headers()[9..].to_vec(),
            vec![
                "AADT 2022".to_string(),
                "AADT 2042".to_string(),
                "Future AADT 2032".to_string(),
                "Future AADT 2052".to_string(),
            ]
        );
        // The stored records keep their raw values.
        assert_eq!(ds.records[0].k_factor_pct, Some(9.6));
    }

    #[test]
    fn unprojectable_rows_stay_blank() {
        let ds = Dataset::new("x", 2022, 2042, vec![record("I-5", 0.0, 1.0, 0.0, 250.0)]);
        let row = &run_query(&ds, &filter(None, 0.0, 10.0)).rows[0];
        assert_eq!(row.present_count, "0");
        assert_eq!(row.forecast_1, "");
        assert_eq!(row.forecast_2, "");
    }

    #[test]
    fn factors_round_half_to_even() {
        let mut r = record("I-5", 0.0, 1.0, 10.0, 20.0);
        r.k_factor_pct = Some(12.5);
        r.d_factor_pct = Some(10.5);
        r.t_factor_pct = Some(9.5);
        let ds = Dataset::new("x", 2022, 2042, vec![r]);
        let row = &run_query(&ds, &filter(None, 0.0, 10.0)).rows[0];
        assert_eq!((row.k_factor_pct, row.d_factor_pct, row.t_factor_pct), (12, 10, 10));
        assert_eq!(round_factor(Some(9.51)), 10);
        assert_eq!(round_factor(None), 0);
    }

    #[test]
    fn missing_count_leaves_blank_cells() {
        let mut r = record("I-5", 0.0, 1.0, 700.0, 0.0);
        r.future_count = None;
        let ds = Dataset::new("x", 2022, 2042, vec![r]);
        let row = &run_query(&ds, &filter(None, 0.0, 10.0)).rows[0];
        assert_eq!(row.present_count, "700");
        assert_eq!(row.future_count, "");
        assert_eq!(row.forecast_1, "");
    }

    #[test]
    fn thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
        assert_eq!(format_thousands(12345.6), "12,346");
        assert_eq!(format_thousands(-4321.0), "-4,321");
    }

    #[test]
    fn input_guards() {
        assert_eq!(clamp_non_negative(-3.0), 0.0);
        assert_eq!(clamp_non_negative(4.5), 4.5);
        assert_eq!(clamp_target_year(2075, Some(2050)), 2050);
        assert_eq!(clamp_target_year(2075, None), 2075);
        assert_eq!(clamp_target_year(-1, Some(2050)), 0);
    }
}
