//! # CLI Module
//!
//! This module provides the command-line interface for ncextract, including:
//! - Argument parsing with clap
//! - Job configuration loading (JSON/YAML) with command-line overrides
//! - Environment variable support with the NCEXTRACT_ prefix
//! - Location DSL parsing for `--cell label:rows:columns`
//! - Job templates

use crate::input::JobConfig;
use crate::values::{CellIndices, IndexRequest};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extract time series at grid-cell indices from NetCDF files
#[derive(Parser, Debug)]
#[command(name = "ncextract")]
#[command(about = "Extract time series at grid-cell indices from NetCDF files")]
#[command(version)]
#[command(long_about = "
ncextract reads a gridded NetCDF variable laid out as [time, row, column] and pulls
out the full time series of the grid cells listed for each named location. Results
are printed or written to an HDF5 file with one group per location.

FEATURES:
  • Index-driven extraction: exact row/column indices, no interpolation
  • HDF5 output: time axis, units and calendar carried over from the source
  • Coordinate listing: dump the X/Y coordinate arrays to compute indices
  • Configuration files: JSON and YAML jobs, with templates
  • Shell completions: bash, zsh, fish, and PowerShell

EXAMPLES:
  # Extract two locations into memory and print them as JSON
  ncextract --output-format json extract pr_day.nc -n pr -t time \\
    --cell 'A:1,2:1,1' --cell 'B:3:4'

  # Extract locations listed in a file into HDF5
  ncextract extract pr_day.nc pr_catchments.h5 -n pr -t time -l catchments.yaml

  # Using a job file
  ncextract --config job.yaml extract

  # List the coordinates of a grid
  ncextract coords pr_day.nc -x lon -y lat
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Job configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "NCEXTRACT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract time series for a set of locations
    #[command(long_about = "
Extract the time series of the grid cells of each location.

Without OUTPUT the results are kept in memory and printed. With an OUTPUT ending in
.h5 or .hdf5 they are written to that file, replacing any existing file.

Row and column indices must be greater than zero and smaller than the grid size;
pass --allow-origin-index to accept index 0.

EXAMPLES:
  # Single location, printed
  ncextract extract tas.nc -n tas -t time --cell 'station:12:40'

  # Locations from file, into HDF5
  ncextract extract tas.nc tas_stations.h5 -n tas -t time -l stations.json

  # Validate without reading data
  ncextract extract tas.nc -n tas -t time -l stations.json --dry-run
")]
    Extract {
        /// Input NetCDF file path
        #[arg(value_name = "INPUT", env = "NCEXTRACT_INPUT")]
        input: Option<String>,

        /// Output HDF5 file path (results are printed when omitted)
        #[arg(value_name = "OUTPUT", env = "NCEXTRACT_OUTPUT")]
        output: Option<String>,

        /// Name of the [time, row, column] variable
        #[arg(short = 'n', long, env = "NCEXTRACT_VARIABLE")]
        variable: Option<String>,

        /// Name of the time variable
        #[arg(short = 't', long, env = "NCEXTRACT_TIME")]
        time: Option<String>,

        /// File with locations (JSON or YAML mapping label -> {rows, columns})
        #[arg(short = 'l', long, env = "NCEXTRACT_LOCATIONS")]
        locations: Option<PathBuf>,

        /// Add a location: label:row1,row2,...:col1,col2,...
        #[arg(long = "cell", value_parser = parse_location)]
        cells: Vec<LocationArg>,

        /// Accept row/column index 0
        #[arg(long, env = "NCEXTRACT_ALLOW_ORIGIN_INDEX")]
        allow_origin_index: bool,

        /// Show a progress bar over locations
        #[arg(long)]
        progress: bool,

        /// Dry run - validate configuration without extracting
        #[arg(long, env = "NCEXTRACT_DRY_RUN")]
        dry_run: bool,
    },

    /// Print the X and Y coordinate arrays of a dataset
    #[command(long_about = "
Read the one-dimensional X and Y coordinate variables of a dataset.

Masked coordinates are unwrapped to their raw values. Use the printed arrays to
work out the row (Y) and column (X) indices of the cells to extract.

EXAMPLES:
  ncextract coords pr_day.nc -x lon -y lat
  ncextract --output-format json coords pr_day.nc -x rlon -y rlat
")]
    Coords {
        /// NetCDF file path
        file: String,

        /// Label of the X coordinate variable
        #[arg(short = 'x', long = "x-label", default_value = "lon")]
        x_label: String,

        /// Label of the Y coordinate variable
        #[arg(short = 'y', long = "y-label", default_value = "lat")]
        y_label: String,
    },

    /// Show information about a NetCDF file
    #[command(long_about = "
Inspect a NetCDF file and list its dimensions, variables and attributes.

Variables with three dimensions are marked as [grid]; those are the ones that can
be extracted.

EXAMPLES:
  ncextract info data.nc
  ncextract info data.nc --detailed
  ncextract info data.nc -n pr --format json
")]
    Info {
        /// NetCDF file path
        file: String,

        /// Include global attributes
        #[arg(long)]
        detailed: bool,

        /// Show only specific variable info
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Validate a job configuration file
    #[command(long_about = "
Validate a job configuration without reading any data.

Checks labels, the output extension, and that every location has paired, non-empty
and non-negative indices. With --detailed the input file is also checked for
existence.

EXAMPLES:
  ncextract validate job.json
  ncextract validate job.yaml --detailed
")]
    Validate {
        /// Configuration file to validate
        config_file: Option<PathBuf>,

        /// Also check that the input file exists
        #[arg(long)]
        detailed: bool,
    },

    /// Generate job configuration templates
    #[command(long_about = "
Generate job configuration templates.

Available templates:
• basic: in-memory extraction of one location
• hdf5: extraction of several locations into an HDF5 file

EXAMPLES:
  ncextract template basic
  ncextract template hdf5 --format yaml -o job.yaml
")]
    Template {
        /// Template type to generate
        #[arg(value_enum)]
        template_type: TemplateType,

        /// Configuration format
        #[arg(short, long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    #[command(long_about = "
Generate shell completion scripts.

EXAMPLES:
  ncextract completions bash > ~/.bash_completion.d/ncextract
  ncextract completions zsh -o _ncextract
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum TemplateType {
    /// In-memory extraction template
    Basic,
    /// HDF5 output template
    Hdf5,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON configuration format
    Json,
    /// YAML configuration format
    Yaml,
}

/// Location given on the command line
#[derive(Clone, Debug, PartialEq)]
pub struct LocationArg {
    pub label: String,
    pub cells: CellIndices,
}

/// Command-line values of the `extract` subcommand that override a job file
#[derive(Clone, Debug, Default)]
pub struct ExtractOverrides {
    pub input: Option<String>,
    pub output: Option<String>,
    pub variable: Option<String>,
    pub time: Option<String>,
    pub locations: Option<IndexRequest>,
    pub cells: Vec<LocationArg>,
    pub allow_origin_index: bool,
}

/// Parse a location from a command line argument
/// Format: label:row1,row2,...:col1,col2,...
fn parse_location(s: &str) -> Result<LocationArg, String> {
    let parts: Vec<&str> = s.rsplitn(3, ':').collect();
    if parts.len() != 3 {
        return Err(format!(
            "Location must be 'label:rows:columns', got '{}'",
            s
        ));
    }
    let (label, rows, columns) = (parts[2], parts[1], parts[0]);
    if label.is_empty() {
        return Err("Location label must not be empty".to_string());
    }

    Ok(LocationArg {
        label: label.to_string(),
        cells: CellIndices::new(parse_index_list(rows)?, parse_index_list(columns)?),
    })
}

fn parse_index_list(s: &str) -> Result<Vec<i64>, String> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .map_err(|_| format!("Invalid index: '{}'", v))
        })
        .collect()
}

/// Loads a locations file: a JSON or YAML mapping of label to `{rows, columns}`.
pub fn load_locations<P: AsRef<Path>>(path: P) -> Result<IndexRequest, String> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read locations file {}: {}", path.display(), e))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if yaml {
        serde_yaml::from_str(&content).map_err(|e| format!("Invalid locations YAML: {}", e))
    } else {
        serde_json::from_str(&content).map_err(|e| format!("Invalid locations JSON: {}", e))
    }
}

/// Merge a job file with command-line values
/// Priority: command line > environment variables (via clap) > job file
pub fn resolve_job(base: Option<JobConfig>, overrides: ExtractOverrides) -> Result<JobConfig, String> {
    let has_base = base.is_some();
    let mut locations = base
        .as_ref()
        .map(|b| b.locations.clone())
        .unwrap_or_default();
    if let Some(extra) = overrides.locations {
        locations.extend(extra);
    }
    for arg in overrides.cells {
        locations.insert(arg.label, arg.cells);
    }

    let pick = |cli: Option<String>, file: Option<&String>, what: &str| -> Result<String, String> {
        cli.or_else(|| file.cloned()).ok_or_else(|| {
            if has_base {
                format!("{} missing from both command line and job file", what)
            } else {
                format!("{} is required (or pass --config)", what)
            }
        })
    };

    let config = JobConfig {
        input_path: pick(overrides.input, base.as_ref().map(|b| &b.input_path), "Input path")?,
        variable_name: pick(
            overrides.variable,
            base.as_ref().map(|b| &b.variable_name),
            "Variable name (-n)",
        )?,
        time_name: pick(
            overrides.time,
            base.as_ref().map(|b| &b.time_name),
            "Time name (-t)",
        )?,
        output_path: overrides
            .output
            .or_else(|| base.as_ref().and_then(|b| b.output_path.clone())),
        allow_origin_index: overrides.allow_origin_index
            || base.as_ref().is_some_and(|b| b.allow_origin_index),
        locations,
    };

    if config.locations.is_empty() {
        return Err("No locations given (use --cell, --locations or a job file)".to_string());
    }
    Ok(config)
}

/// Example job for the given template type
pub fn template_job(template_type: &TemplateType) -> JobConfig {
    let mut locations = IndexRequest::new();
    match template_type {
        TemplateType::Basic => {
            locations.insert("station".to_string(), CellIndices::new(vec![12], vec![40]));
            JobConfig {
                input_path: "tas_day.nc".to_string(),
                variable_name: "tas".to_string(),
                time_name: "time".to_string(),
                output_path: None,
                locations,
                allow_origin_index: false,
            }
        }
        TemplateType::Hdf5 => {
            locations.insert(
                "catchment_1".to_string(),
                CellIndices::new(vec![10, 10, 11], vec![4, 5, 4]),
            );
            locations.insert(
                "catchment_2".to_string(),
                CellIndices::new(vec![20, 21], vec![7, 7]),
            );
            JobConfig {
                input_path: "pr_day.nc".to_string(),
                variable_name: "pr".to_string(),
                time_name: "time".to_string(),
                output_path: Some("pr_catchments.h5".to_string()),
                locations,
                allow_origin_index: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_location() {
        let arg = parse_location("A:1,2:1,1").unwrap();
        assert_eq!(arg.label, "A");
        assert_eq!(arg.cells, CellIndices::new(vec![1, 2], vec![1, 1]));

        // labels may contain colons, the last two fields are the indices
        let arg = parse_location("site:north:3:4").unwrap();
        assert_eq!(arg.label, "site:north");
        assert_eq!(arg.cells, CellIndices::new(vec![3], vec![4]));

        assert!(parse_location("A:1,2").is_err());
        assert!(parse_location(":1:1").is_err());
        assert!(parse_location("A:1,x:1").is_err());
    }

    #[test]
    fn test_resolve_job_without_file() {
        let overrides = ExtractOverrides {
            input: Some("in.nc".to_string()),
            variable: Some("pr".to_string()),
            time: Some("time".to_string()),
            cells: vec![parse_location("A:1:1").unwrap()],
            ..Default::default()
        };
        let job = resolve_job(None, overrides).unwrap();
        assert_eq!(job.input_path, "in.nc");
        assert_eq!(job.output_path, None);
        assert_eq!(job.locations.len(), 1);
    }

    #[test]
    fn test_resolve_job_requires_fields() {
        let overrides = ExtractOverrides {
            input: Some("in.nc".to_string()),
            cells: vec![parse_location("A:1:1").unwrap()],
            ..Default::default()
        };
        let err = resolve_job(None, overrides).unwrap_err();
        assert!(err.contains("Variable name"));

        let overrides = ExtractOverrides {
            input: Some("in.nc".to_string()),
            variable: Some("pr".to_string()),
            time: Some("time".to_string()),
            ..Default::default()
        };
        assert!(resolve_job(None, overrides).unwrap_err().contains("No locations"));
    }

    #[test]
    fn test_resolve_job_priority() {
        let base = template_job(&TemplateType::Hdf5);
        let overrides = ExtractOverrides {
            variable: Some("pr_adjusted".to_string()),
            cells: vec![parse_location("catchment_1:5:5").unwrap()],
            ..Default::default()
        };
        let job = resolve_job(Some(base), overrides).unwrap();

        assert_eq!(job.input_path, "pr_day.nc");
        assert_eq!(job.variable_name, "pr_adjusted");
        assert_eq!(job.output_path.as_deref(), Some("pr_catchments.h5"));
        // command line location replaces the file's entry in place
        let labels: Vec<&String> = job.locations.keys().collect();
        assert_eq!(labels, vec!["catchment_1", "catchment_2"]);
        assert_eq!(job.locations["catchment_1"], CellIndices::new(vec![5], vec![5]));
    }

    #[test]
    fn test_templates_are_valid() {
        for template in [TemplateType::Basic, TemplateType::Hdf5] {
            assert!(template_job(&template).problems().is_empty());
        }
    }

    #[test]
    fn test_load_locations_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.json");
        std::fs::write(&path, r#"{"B": {"rows": [2], "columns": [3]}, "A": {"y": [1], "x": [1]}}"#)
            .unwrap();
        let locations = load_locations(&path).unwrap();
        let labels: Vec<&String> = locations.keys().collect();
        assert_eq!(labels, vec!["B", "A"]);

        assert!(load_locations(dir.path().join("missing.json")).is_err());
    }
}
