use crate::aadt::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One entry of the schema mapping, as written in the configuration file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFieldConfig {
    pub field: String,
    pub canonical: Option<String>,
    #[serde(default)]
    pub alternates: Vec<String>,
    #[serde(rename = "extractYear")]
    pub extract_year: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AadtConfig {
    #[serde(rename = "inputDirectory")]
    pub input_directory: Option<String>,
    #[serde(rename = "filteredDirectory")]
    pub filtered_directory: Option<String>,
    #[serde(rename = "issuesDirectory")]
    pub issues_directory: Option<String>,
    #[serde(rename = "headerKeywords")]
    pub header_keywords: Option<Vec<String>>,
    /// An explicit null removes the cap.
    #[serde(rename = "maxTargetYear", default = "default_max_target_year")]
    pub max_target_year: Option<i32>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    pub schema: Option<Vec<SchemaFieldConfig>>,
}

pub const DEFAULT_INPUT_DIRECTORY: &str = "./AADT data/";
pub const DEFAULT_FILTERED_DIRECTORY: &str = "./AADT filtered data/";
pub const DEFAULT_ISSUES_DIRECTORY: &str = "./AADT issues/";
pub const DEFAULT_MAX_TARGET_YEAR: i32 = 2050;

fn default_max_target_year() -> Option<i32> {
    Some(DEFAULT_MAX_TARGET_YEAR)
}

impl Default for AadtConfig {
    fn default() -> Self {
        AadtConfig {
            input_directory: None,
            filtered_directory: None,
            issues_directory: None,
            header_keywords: None,
            max_target_year: default_max_target_year(),
            excel_worksheet_name: None,
            schema: None,
        }
    }
}

/// The configuration once validated and merged with the command line.
#[derive(PartialEq, Debug, Clone)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub filtered_dir: PathBuf,
    pub issues_dir: PathBuf,
    pub keywords: Vec<String>,
    pub max_target_year: Option<i32>,
    pub worksheet_name: Option<String>,
    pub mapping: SchemaMapping,
}

impl Settings {
    /// Relative directories of the configuration file are resolved against
    /// the directory holding it. Command line values are taken as given.
    pub fn resolve(
        config: &AadtConfig,
        config_dir: Option<&Path>,
        args: &Args,
    ) -> AadtResult<Settings> {
        let from_config = |value: &Option<String>, default: &str| -> PathBuf {
            match (value, config_dir) {
                (Some(v), Some(dir)) => dir.join(v),
                (Some(v), None) => PathBuf::from(v),
                (None, _) => PathBuf::from(default),
            }
        };
        let pick = |arg: &Option<String>, value: &Option<String>, default: &str| -> PathBuf {
            arg.clone()
                .map(PathBuf::from)
                .unwrap_or_else(|| from_config(value, default))
        };

        let keywords: Vec<String> = match &config.header_keywords {
            Some(ks) if ks.iter().any(|k| !k.is_empty()) => ks.clone(),
            Some(_) => whatever!("headerKeywords must contain at least one keyword"),
            None => DEFAULT_HEADER_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        let mapping = match &config.schema {
            Some(fields) => validate_schema(fields)?,
            None => SchemaMapping::standard(),
        };

        Ok(Settings {
            input_dir: pick(&args.input, &config.input_directory, DEFAULT_INPUT_DIRECTORY),
            filtered_dir: pick(
                &args.filtered,
                &config.filtered_directory,
                DEFAULT_FILTERED_DIRECTORY,
            ),
            issues_dir: pick(&args.issues, &config.issues_directory, DEFAULT_ISSUES_DIRECTORY),
            keywords,
            max_target_year: config.max_target_year,
            worksheet_name: args
                .excel_worksheet_name
                .clone()
                .or_else(|| config.excel_worksheet_name.clone()),
            mapping,
        })
    }
}

pub fn read_config(path: &str) -> AadtResult<AadtConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: AadtConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

fn field_role(name: &str) -> AadtResult<FieldRole> {
    let role = match name {
        "locationId" => FieldRole::LocationId,
        "route" => FieldRole::Route,
        "segmentStart" => FieldRole::SegmentStart,
        "startDescription" => FieldRole::StartDescription,
        "segmentEnd" => FieldRole::SegmentEnd,
        "endDescription" => FieldRole::EndDescription,
        "kFactor" => FieldRole::KFactor,
        "dFactor" => FieldRole::DFactor,
        "tFactor" => FieldRole::TFactor,
        "presentCount" => FieldRole::PresentCount,
        "futureCount" => FieldRole::FutureCount,
        x => whatever!("Unknown schema field {:?}", x),
    };
    Ok(role)
}

/// Turns the schema section of the configuration into a mapping.
///
/// Every field must be listed exactly once.
pub fn validate_schema(fields: &[SchemaFieldConfig]) -> AadtResult<SchemaMapping> {
    let mut specs: Vec<FieldSpec> = Vec::new();
    for f in fields.iter() {
        let role = field_role(&f.field)?;
        if specs.iter().any(|s| s.role == role) {
            whatever!("Schema field {:?} is listed more than once", f.field)
        }
        let default_extract = matches!(role, FieldRole::PresentCount | FieldRole::FutureCount);
        specs.push(FieldSpec {
            role,
            canonical: f
                .canonical
                .clone()
                .unwrap_or_else(|| role.canonical_name().to_string()),
            alternates: f.alternates.clone(),
            extract_year: f.extract_year.unwrap_or(default_extract),
        });
    }
    match SchemaMapping::new(&specs) {
        Ok(m) => Ok(m),
        Err(e) => whatever!("Incomplete schema in configuration: {}", e),
    }
}
