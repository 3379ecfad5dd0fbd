use log::{info, warn};

use crate::config::*;

/// A record is good when its traffic does not decrease from the present
/// reference year to the future one. A missing count makes it bad.
pub fn row_validity(record: &CanonicalRecord) -> RowValidity {
    match (record.present_count, record.future_count) {
        (Some(p), Some(f)) if p <= f => RowValidity::Good,
        _ => RowValidity::Bad,
    }
}

pub fn check_records(records: &[CanonicalRecord]) -> Vec<RowValidity> {
    records.iter().map(row_validity).collect()
}

impl Dataset {
    /// Builds a dataset and decides its validity.
    ///
    /// A single bad record makes the whole dataset invalid.
    pub fn new(
        source_name: &str,
        present_year: i32,
        future_year: i32,
        records: Vec<CanonicalRecord>,
    ) -> Dataset {
        let bad = check_records(&records)
            .iter()
            .filter(|v| **v == RowValidity::Bad)
            .count();
        let validity = if bad == 0 {
            info!(
                "{}: {} records, AADT {} to {}: valid",
                source_name,
                records.len(),
                present_year,
                future_year
            );
            Validity::Valid
        } else {
            warn!(
                "{}: invalid data detected in {} of {} records",
                source_name,
                bad,
                records.len()
            );
            Validity::Invalid
        };
        Dataset {
            source_name: source_name.to_string(),
            present_year,
            future_year,
            records,
            validity,
        }
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn is_valid(&self) -> bool {
        self.validity == Validity::Valid
    }

    /// The records that fail the check, with their position in the dataset.
    pub fn bad_records(&self) -> Vec<(usize, &CanonicalRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| row_validity(r) == RowValidity::Bad)
            .collect()
    }

    pub fn ensure_valid(&self) -> Result<(), PipelineError> {
        match self.validity {
            Validity::Valid => Ok(()),
            Validity::Invalid => Err(PipelineError::DatasetInvalid {
                present_year: self.present_year,
                bad_rows: self.bad_records().len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(present: f64, future: f64) -> CanonicalRecord {
        CanonicalRecord {
            location_id: "1".to_string(),
            route: "I-5".to_string(),
            segment_start: 0.0,
            segment_end: 1.0,
            start_description: "".to_string(),
            end_description: "".to_string(),
            k_factor_pct: None,
            d_factor_pct: None,
            t_factor_pct: None,
            present_count: Some(present),
            future_count: Some(future),
        }
    }

    #[test]
    fn equal_counts_are_good() {
        assert_eq!(row_validity(&record(500.0, 500.0)), RowValidity::Good);
        assert_eq!(row_validity(&record(500.0, 501.0)), RowValidity::Good);
        assert_eq!(row_validity(&record(501.0, 500.0)), RowValidity::Bad);
    }

    #[test]
    fn missing_counts_are_bad() {
        let mut r = record(500.0, 700.0);
        r.future_count = None;
        assert_eq!(row_validity(&r), RowValidity::Bad);
        r.present_count = None;
        assert_eq!(row_validity(&r), RowValidity::Bad);
        let ds = Dataset::new("x", 2024, 2044, vec![record(1.0, 2.0), r]);
        assert_eq!(ds.validity(), Validity::Invalid);
        assert_eq!(ds.bad_records().len(), 1);
    }

    #[test]
    fn one_bad_record_invalidates_the_dataset() {
        let mut records: Vec<CanonicalRecord> =
            (0..999).map(|i| record(i as f64, i as f64 + 10.0)).collect();
        records.insert(500, record(2000.0, 1000.0));
        let ds = Dataset::new("AADT.xlsx", 2022, 2042, records);
        assert_eq!(ds.validity(), Validity::Invalid);
        let bad = ds.bad_records();
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].0, 500);
        assert_eq!(
            ds.ensure_valid(),
            Err(PipelineError::DatasetInvalid {
                present_year: 2022,
                bad_rows: 1
            })
        );
    }

    #[test]
    fn all_good_records() {
        let ds = Dataset::new("x", 2022, 2042, vec![record(1.0, 2.0), record(3.0, 3.0)]);
        assert!(ds.is_valid());
        assert!(ds.bad_records().is_empty());
        assert_eq!(ds.ensure_valid(), Ok(()));
    }

    #[test]
    fn empty_dataset_is_valid() {
        let ds = Dataset::new("x", 2022, 2042, vec![]);
        assert!(ds.is_valid());
    }
}
