use log::{debug, info, warn};

use aadt_forecast::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use text_diff::print_diff;

use crate::aadt::catalog::*;
use crate::aadt::config_reader::*;
use crate::aadt::io_common::*;
use crate::args::Args;

pub mod catalog;
pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_excel;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AadtError {
    #[snafu(display("Error opening spreadsheet {path}"))]
    OpeningSpreadsheet {
        source: calamine::Error,
        path: String,
    },
    #[snafu(display("Spreadsheet {path} has no worksheet"))]
    EmptySpreadsheet { path: String },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error writing CSV content"))]
    CsvWrite { source: csv::Error },
    #[snafu(display("Error flushing CSV content"))]
    CsvFlush { source: std::io::Error },
    #[snafu(display("Error reading {path}"))]
    ReadingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error removing {path}"))]
    RemovingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error listing directory {path}"))]
    ListingDirectory {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening configuration {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing configuration"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("{path}: {source}"))]
    Pipeline {
        source: PipelineError,
        path: String,
    },
    #[snafu(display("Unsupported file type: {path}"))]
    UnsupportedFile { path: String },
    #[snafu(display("Dataset {label:?} is not available"))]
    UnknownDataset { label: String },
    #[snafu(display("No dataset is selected"))]
    NoDatasetSelected {},
    #[snafu(display("Table {path} does not carry the reference years in its header"))]
    MissingTableYears { path: String },
    #[snafu(display("Difference detected between the exported table and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AadtResult<T> = Result<T, AadtError>;

fn load_settings(args: &Args) -> AadtResult<Settings> {
    match &args.config {
        Some(config_path) => {
            info!("Reading configuration {:?}", config_path);
            let config = read_config(config_path)?;
            let config_dir = Path::new(config_path.as_str()).parent();
            Settings::resolve(&config, config_dir, args)
        }
        None => Settings::resolve(&AadtConfig::default(), None, args),
    }
}

/// Where the exported table goes.
enum OutputTarget {
    Stdout,
    Directory(PathBuf),
    File(PathBuf),
}

fn output_target(out: &Option<String>) -> OutputTarget {
    match out.as_deref() {
        None | Some("") | Some("stdout") => OutputTarget::Stdout,
        Some(p) if Path::new(p).is_dir() => OutputTarget::Directory(PathBuf::from(p)),
        Some(p) => OutputTarget::File(PathBuf::from(p)),
    }
}

/// Ingests the input directory (unless skipped), then runs one query on the
/// selected dataset and exports the result.
pub fn run(args: &Args) -> AadtResult<()> {
    let settings = load_settings(args)?;
    debug!("run: settings: {:?}", settings);

    let catalog = if args.skip_ingest {
        DatasetCatalog::open(&settings.filtered_dir)?
    } else {
        DatasetCatalog::ingest(&settings)?
    };

    if catalog.is_empty() {
        warn!("There are no available datasets");
        return Ok(());
    }
    info!("Available datasets: {:?}", catalog.labels());

    let label = match (&args.dataset, catalog.default_label()) {
        (Some(l), _) => l.clone(),
        (None, Some(l)) => l.clone(),
        (None, None) => return NoDatasetSelectedSnafu {}.fail(),
    };

    let mut session = Session::new(catalog, settings.max_target_year);
    let dataset = session.select_dataset(&label)?;

    if args.list {
        for l in session.catalog().labels() {
            println!("{}", l);
        }
        println!("Routes in {}:", label);
        for route in route_options(&dataset) {
            println!("  {}", route);
        }
        return Ok(());
    }

    let route = args.route.as_deref();
    let table = session.query(route, args.bmp, args.emp, args.year1, args.year2)?;
    let blob = session.export(&table, route, args.bmp, args.emp, args.year1, args.year2)?;
    info!(
        "Selected {} rows from {}, export name {:?}",
        table.rows.len(),
        label,
        blob.file_name
    );

    match output_target(&args.out) {
        OutputTarget::Stdout => print!("{}", blob.text()),
        OutputTarget::Directory(dir) => {
            let p = dir.join(&blob.file_name);
            write_file(&p, &blob.contents)?;
            info!("Table exported to {}", p.display());
        }
        OutputTarget::File(p) => {
            write_file(&p, &blob.contents)?;
            info!("Table exported to {}", p.display());
        }
    }

    // The reference table, if provided for comparison
    if let Some(reference_p) = &args.reference {
        let reference = fs::read_to_string(reference_p).context(ReadingFileSnafu {
            path: reference_p.clone(),
        })?;
        let reference = reference.trim_start_matches('\u{feff}');
        let computed = blob.text();
        if reference != computed {
            warn!("Found differences with the reference table");
            print_diff(reference, computed.as_str(), "\n");
            return ReferenceMismatchSnafu {
                path: reference_p.clone(),
            }
            .fail();
        }
        info!("Exported table matches the reference {}", reference_p);
    }

    Ok(())
}
