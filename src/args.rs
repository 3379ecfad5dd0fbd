use clap::Parser;

/// Ingests AADT traffic count spreadsheets and forecasts traffic volumes per road segment.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file: directories, header keywords, schema mapping
    /// and the maximum target year. Relative directories are resolved against the location of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory) The directory holding the raw AADT spreadsheets. Overrides the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (directory) Where the tables of the valid datasets are written and read back from.
    #[clap(long, value_parser)]
    pub filtered: Option<String>,

    /// (directory) Where the issue reports of the invalid datasets are written.
    #[clap(long, value_parser)]
    pub issues: Option<String>,

    /// (default: the first worksheet) When reading Excel files, the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// If passed as an argument, serve the tables written by a previous run without reading the
    /// raw spreadsheets again.
    #[clap(long, takes_value = false)]
    pub skip_ingest: bool,

    /// If passed as an argument, list the available datasets and the routes of the selected one.
    #[clap(long, takes_value = false)]
    pub list: bool,

    /// (dataset label, e.g. "AADT 2022 Table") The dataset to query. Defaults to the most recent one.
    #[clap(short, long, value_parser)]
    pub dataset: Option<String>,

    /// (route, optional) Only keep the segments of this route. All the routes are kept if not specified.
    #[clap(long, value_parser)]
    pub route: Option<String>,

    /// Beginning milepost of the range of interest.
    #[clap(long, value_parser, default_value_t = 0.0)]
    pub bmp: f64,

    /// Ending milepost of the range of interest.
    #[clap(long, value_parser, default_value_t = 1000.0)]
    pub emp: f64,

    /// The first year to forecast (construction year).
    #[clap(long, value_parser, default_value_t = 2030)]
    pub year1: i32,

    /// The second year to forecast (design year).
    #[clap(long, value_parser, default_value_t = 2050)]
    pub year2: i32,

    /// (file path, directory, 'stdout' or empty) Where the exported table is written. When a directory
    /// is given, the export is named after the query.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference CSV export. If provided, aadtcast checks that the exported table
    /// matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
