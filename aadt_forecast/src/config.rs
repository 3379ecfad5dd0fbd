// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The content of a single spreadsheet cell, as handed over by the readers.
///
/// Readers convert their native representation into this enum, so that the
/// pipeline does not depend on a particular spreadsheet library.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Empty cells and cells with only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(_) => false,
            Cell::Text(s) => s.trim().is_empty(),
        }
    }

    /// The cell rendered as text. Whole numbers are rendered without a
    /// fractional part, so that a header cell typed as the number 2022 reads
    /// "2022".
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => "".to_string(),
            Cell::Number(f) => format_plain_number(*f),
            Cell::Text(s) => s.clone(),
        }
    }

    /// The numeric value of the cell, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(f) if f.is_finite() => Some(*f),
            Cell::Number(_) => None,
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        }
    }
}

/// Formats a number the way a person would type it: no trailing ".0" for whole numbers.
pub fn format_plain_number(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        format!("{}", f)
    }
}

// ********* Schema mapping **********

/// The logical columns every ingested record resolves to.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum FieldRole {
    LocationId,
    Route,
    SegmentStart,
    StartDescription,
    SegmentEnd,
    EndDescription,
    KFactor,
    DFactor,
    TFactor,
    PresentCount,
    FutureCount,
}

impl FieldRole {
    /// All the roles, in canonical column order.
    pub const ALL: [FieldRole; 11] = [
        FieldRole::LocationId,
        FieldRole::Route,
        FieldRole::SegmentStart,
        FieldRole::StartDescription,
        FieldRole::SegmentEnd,
        FieldRole::EndDescription,
        FieldRole::KFactor,
        FieldRole::DFactor,
        FieldRole::TFactor,
        FieldRole::PresentCount,
        FieldRole::FutureCount,
    ];

    /// The default column label for this role.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            FieldRole::LocationId => "Loc ID",
            FieldRole::Route => "Route",
            FieldRole::SegmentStart => "BMP",
            FieldRole::StartDescription => "Start",
            FieldRole::SegmentEnd => "EMP",
            FieldRole::EndDescription => "End",
            FieldRole::KFactor => "K Factor %",
            FieldRole::DFactor => "D Factor %",
            FieldRole::TFactor => "T Factor %",
            FieldRole::PresentCount => "AADT_1",
            FieldRole::FutureCount => "AADT_2",
        }
    }
}

/// How one canonical field is looked up in a sheet header.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldSpec {
    pub role: FieldRole,
    /// Preferred over any alternate when present verbatim.
    pub canonical: String,
    /// Tried in order when the canonical name is absent.
    pub alternates: Vec<String>,
    /// The matched alternate carries the reference year of the column.
    pub extract_year: bool,
}

impl FieldSpec {
    pub fn new(role: FieldRole, alternates: &[String], extract_year: bool) -> FieldSpec {
        FieldSpec {
            role,
            canonical: role.canonical_name().to_string(),
            alternates: alternates.to_vec(),
            extract_year,
        }
    }
}

/// The declarative table mapping observed header spellings onto the
/// canonical fields.
///
/// Invariant: every role appears exactly once, in the order of `FieldRole::ALL`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SchemaMapping {
    pub(crate) fields: Vec<FieldSpec>,
}

impl SchemaMapping {
    /// Builds a mapping from a set of field specifications.
    ///
    /// The specifications can be given in any order. Fails if a role is
    /// missing or repeated.
    pub fn new(specs: &[FieldSpec]) -> Result<SchemaMapping, PipelineError> {
        let mut fields: Vec<FieldSpec> = Vec::new();
        let mut missing: Vec<String> = Vec::new();
        for role in FieldRole::ALL.iter() {
            let matching: Vec<&FieldSpec> = specs.iter().filter(|s| s.role == *role).collect();
            match matching.as_slice() {
                [spec] => fields.push((*spec).clone()),
                _ => missing.push(role.canonical_name().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(PipelineError::MissingRequiredColumns(missing));
        }
        Ok(SchemaMapping { fields })
    }

    /// The mapping observed across the published AADT spreadsheets.
    pub fn standard() -> SchemaMapping {
        let names = |xs: &[&str]| -> Vec<String> { xs.iter().map(|s| s.to_string()).collect() };
        let present: Vec<String> = (2020..2040).map(|y| format!("AADT {}", y)).collect();
        let future: Vec<String> = (2040..2070).map(|y| format!("{} Future AADT", y)).collect();
        SchemaMapping {
            fields: vec![
                FieldSpec::new(
                    FieldRole::LocationId,
                    &names(&["LocID", "Loc_ID", "LocID_1", "Location"]),
                    false,
                ),
                FieldSpec::new(
                    FieldRole::Route,
                    &names(&["Road", "Road1", "Road_1", "RouteID", "Route_ID", "RouteID_1"]),
                    false,
                ),
                FieldSpec::new(FieldRole::SegmentStart, &[], false),
                FieldSpec::new(
                    FieldRole::StartDescription,
                    &names(&["FromRoad", "FromRoad1"]),
                    false,
                ),
                FieldSpec::new(FieldRole::SegmentEnd, &[], false),
                FieldSpec::new(FieldRole::EndDescription, &names(&["ToRoad", "ToRoad1"]), false),
                FieldSpec::new(FieldRole::KFactor, &[], false),
                FieldSpec::new(FieldRole::DFactor, &[], false),
                FieldSpec::new(FieldRole::TFactor, &[], false),
                FieldSpec::new(FieldRole::PresentCount, &present, true),
                FieldSpec::new(FieldRole::FutureCount, &future, true),
            ],
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Position of a role inside a reconciled row.
    pub fn position(&self, role: FieldRole) -> usize {
        // The constructor guarantees the canonical order.
        role as usize
    }
}

// ******** Records and datasets *********

/// One road segment observation, after reconciliation and filtering.
#[derive(PartialEq, Debug, Clone)]
pub struct CanonicalRecord {
    pub location_id: String,
    pub route: String,
    pub segment_start: f64,
    pub segment_end: f64,
    pub start_description: String,
    pub end_description: String,
    pub k_factor_pct: Option<f64>,
    pub d_factor_pct: Option<f64>,
    pub t_factor_pct: Option<f64>,
    /// The count at the dataset's present year. Missing when the cell does
    /// not hold a number.
    pub present_count: Option<f64>,
    /// The count at the dataset's future year.
    pub future_count: Option<f64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Validity {
    Valid,
    Invalid,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RowValidity {
    Good,
    Bad,
}

impl Display for RowValidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowValidity::Good => write!(f, "Good"),
            RowValidity::Bad => write!(f, "Bad"),
        }
    }
}

/// One ingested spreadsheet. The validity is computed once, at construction.
#[derive(PartialEq, Debug, Clone)]
pub struct Dataset {
    pub source_name: String,
    pub present_year: i32,
    pub future_year: i32,
    pub records: Vec<CanonicalRecord>,
    pub(crate) validity: Validity,
}

// ******** Errors *********

/// Errors raised by the ingestion pipeline and the forecasting engine.
#[derive(PartialEq, Debug, Clone)]
pub enum PipelineError {
    /// No row of the sheet contains one of the header keywords.
    HeaderNotFound,
    /// Canonical fields for which no column could be found.
    MissingRequiredColumns(Vec<String>),
    /// The column matched for a reference count does not contain a year.
    ReferenceYearNotFound { field: String, column: String },
    /// A value that must be numeric is not. The row is zero-based, relative
    /// to the first data row.
    MalformedValue {
        row: usize,
        field: String,
        content: String,
    },
    InvalidForecastInput { reason: String },
    /// The dataset contains records whose count decreases over time.
    DatasetInvalid { present_year: i32, bad_rows: usize },
}

impl Error for PipelineError {}

impl Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::HeaderNotFound => write!(f, "no header row matches the keywords"),
            PipelineError::MissingRequiredColumns(fields) => write!(
                f,
                "column header with a matching name for {:?} was not found",
                fields
            ),
            PipelineError::ReferenceYearNotFound { field, column } => write!(
                f,
                "column {:?} matched for {} does not contain a year",
                column, field
            ),
            PipelineError::MalformedValue {
                row,
                field,
                content,
            } => write!(
                f,
                "row {}: expected a number for {}, found {:?}",
                row, field, content
            ),
            PipelineError::InvalidForecastInput { reason } => {
                write!(f, "invalid forecast input: {}", reason)
            }
            PipelineError::DatasetInvalid {
                present_year,
                bad_rows,
            } => write!(
                f,
                "AADT {} dataset has {} row(s) where traffic does not increase",
                present_year, bad_rows
            ),
        }
    }
}
