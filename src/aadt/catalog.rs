use std::sync::Arc;

use crate::aadt::io_csv::*;
use crate::aadt::io_excel::*;
use crate::aadt::*;

/// What happened to one input file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum IngestOutcome {
    /// The dataset is cataloged under this label.
    Valid { label: String },
    /// The dataset is held back; its bad rows are listed in the report.
    Invalid { issue_path: PathBuf, bad_rows: usize },
}

/// The datasets available for querying.
///
/// The table files on disk are the source of truth: a dataset is loaded
/// from its table each time it is selected.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DatasetCatalog {
    filtered_dir: PathBuf,
    labels: Vec<String>,
}

impl DatasetCatalog {
    /// Runs every file of the input directory through the pipeline.
    ///
    /// A file that cannot be read or reconciled is skipped; only problems
    /// with the directories themselves stop the batch.
    pub fn ingest(settings: &Settings) -> AadtResult<DatasetCatalog> {
        ensure_dir(&settings.filtered_dir)?;
        ensure_dir(&settings.issues_dir)?;
        let files = list_files(&settings.input_dir)?;
        info!(
            "Ingesting {} files from {}",
            files.len(),
            settings.input_dir.display()
        );

        let mut labels: Vec<String> = Vec::new();
        for path in files.iter() {
            let name = simplify_file_name(path);
            info!("Reading {}...", name);
            match ingest_file(path, settings) {
                Ok(IngestOutcome::Valid { label }) => labels.push(label),
                Ok(IngestOutcome::Invalid {
                    issue_path,
                    bad_rows,
                }) => {
                    warn!(
                        "{}: {} invalid rows, filtered data not saved, see {}",
                        name,
                        bad_rows,
                        issue_path.display()
                    );
                }
                Err(e) => {
                    warn!("Skipping {}: {}", name, e);
                }
            }
        }
        labels.sort();
        labels.dedup();
        Ok(DatasetCatalog {
            filtered_dir: settings.filtered_dir.clone(),
            labels,
        })
    }

    /// The catalog made of the tables already written by an earlier ingestion.
    pub fn open(filtered_dir: &Path) -> AadtResult<DatasetCatalog> {
        let mut labels: Vec<String> = Vec::new();
        for p in list_files(filtered_dir)? {
            let name = simplify_file_name(&p);
            match name.strip_suffix(".csv") {
                Some(label) if label.starts_with("AADT ") && label.ends_with(" Table") => {
                    labels.push(label.to_string())
                }
                _ => debug!("DatasetCatalog::open: ignoring {}", name),
            }
        }
        labels.sort();
        Ok(DatasetCatalog {
            filtered_dir: filtered_dir.to_path_buf(),
            labels,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The most recent dataset.
    pub fn default_label(&self) -> Option<&String> {
        self.labels.last()
    }

    /// Reads a dataset back from its table file.
    pub fn load(&self, label: &str) -> AadtResult<Dataset> {
        if !self.labels.iter().any(|l| l == label) {
            return UnknownDatasetSnafu { label }.fail();
        }
        read_table(&self.filtered_dir.join(format!("{}.csv", label)))
    }
}

/// Reads one input file into raw rows, according to its extension.
pub fn read_raw_sheet(path: &Path, worksheet_name: Option<&str>) -> AadtResult<Vec<Vec<Cell>>> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => read_csv_sheet(path),
        x if SPREADSHEET_EXTENSIONS.contains(&x) => read_spreadsheet(path, worksheet_name),
        _ => UnsupportedFileSnafu {
            path: path.display().to_string(),
        }
        .fail(),
    }
}

/// Drives one file through the pipeline and persists the outcome.
pub fn ingest_file(path: &Path, settings: &Settings) -> AadtResult<IngestOutcome> {
    let p = path.display().to_string();
    let rows = read_raw_sheet(path, settings.worksheet_name.as_deref())?;
    let dataset = ingest_sheet(
        &simplify_file_name(path),
        &rows,
        &settings.keywords,
        &settings.mapping,
    )
    .context(PipelineSnafu { path: p })?;
    persist_validation(&dataset, settings)
}

/// Writes the issue report of an invalid dataset, or the table of a valid
/// one. Whichever of the two files no longer applies is removed, so that
/// the tables on disk only ever hold valid datasets.
pub fn persist_validation(dataset: &Dataset, settings: &Settings) -> AadtResult<IngestOutcome> {
    let issue_path = settings
        .issues_dir
        .join(issue_file_name(dataset.present_year));
    let table_path = settings
        .filtered_dir
        .join(table_file_name(dataset.present_year));
    match dataset.validity() {
        Validity::Invalid => {
            let report = render_issue_report(dataset)?;
            if write_if_changed(&issue_path, &report)? {
                info!("Issue report written to {}", issue_path.display());
            }
            if remove_if_exists(&table_path)? {
                info!("Withdrawn filtered data {}", table_path.display());
            }
            Ok(IngestOutcome::Invalid {
                issue_path,
                bad_rows: dataset.bad_records().len(),
            })
        }
        Validity::Valid => {
            let table = render_table(dataset)?;
            if write_if_changed(&table_path, &table)? {
                info!("Filtered data saved to {}", table_path.display());
            }
            if remove_if_exists(&issue_path)? {
                info!("Removed stale issue report {}", issue_path.display());
            }
            Ok(IngestOutcome::Valid {
                label: table_label(dataset.present_year),
            })
        }
    }
}

/// A CSV export, ready to be handed over for download.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ExportBlob {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl ExportBlob {
    /// The contents without the byte-order mark.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents)
            .trim_start_matches('\u{feff}')
            .to_string()
    }
}

pub fn export_file_name(
    present_year: i32,
    route: Option<&str>,
    bmp: f64,
    emp: f64,
    year_1: i32,
    year_2: i32,
) -> String {
    format!(
        "AADT-{}-Table {} BMP-{} EMP-{} PY-{}-{}.csv",
        present_year,
        route.unwrap_or("All-Routes"),
        format_bound(bmp),
        format_bound(emp),
        year_1,
        year_2
    )
}

/// The serving state: the catalog and the dataset currently selected.
///
/// Selecting a dataset replaces the shared reference as a whole. A query
/// holds on to the dataset it started with.
pub struct Session {
    catalog: DatasetCatalog,
    selected: Option<Arc<Dataset>>,
    max_target_year: Option<i32>,
}

impl Session {
    pub fn new(catalog: DatasetCatalog, max_target_year: Option<i32>) -> Session {
        Session {
            catalog,
            selected: None,
            max_target_year,
        }
    }

    pub fn catalog(&self) -> &DatasetCatalog {
        &self.catalog
    }

    pub fn selected(&self) -> Option<Arc<Dataset>> {
        self.selected.clone()
    }

    /// Loads a dataset and makes it the current one. On failure the
    /// previous selection stays in place.
    pub fn select_dataset(&mut self, label: &str) -> AadtResult<Arc<Dataset>> {
        let dataset = Arc::new(self.catalog.load(label)?);
        info!(
            "Selected {}: {} records, AADT {} and {}",
            label,
            dataset.records.len(),
            dataset.present_year,
            dataset.future_year
        );
        self.selected = Some(dataset.clone());
        Ok(dataset)
    }

    /// Applies the input guards to the values typed by the user.
    pub fn filter(
        &self,
        route: Option<&str>,
        bmp: f64,
        emp: f64,
        year_1: i32,
        year_2: i32,
    ) -> QueryFilter {
        QueryFilter {
            route: route.map(|s| s.to_string()),
            bmp: clamp_non_negative(bmp),
            emp: clamp_non_negative(emp),
            year_1: clamp_target_year(year_1, self.max_target_year),
            year_2: clamp_target_year(year_2, self.max_target_year),
        }
    }

    pub fn query(
        &self,
        route: Option<&str>,
        bmp: f64,
        emp: f64,
        year_1: i32,
        year_2: i32,
    ) -> AadtResult<QueryTable> {
        let dataset = self.selected().context(NoDatasetSelectedSnafu {})?;
        let filter = self.filter(route, bmp, emp, year_1, year_2);
        Ok(run_query(&dataset, &filter))
    }

    pub fn export(
        &self,
        table: &QueryTable,
        route: Option<&str>,
        bmp: f64,
        emp: f64,
        year_1: i32,
        year_2: i32,
    ) -> AadtResult<ExportBlob> {
        let filter = self.filter(route, bmp, emp, year_1, year_2);
        Ok(ExportBlob {
            file_name: export_file_name(
                table.present_year,
                filter.route.as_deref(),
                filter.bmp,
                filter.emp,
                filter.year_1,
                filter.year_2,
            ),
            contents: render_export(table)?,
        })
    }
}
