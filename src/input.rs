//! # Input Configuration Module
//!
//! Job configuration for ncextract runs. A job names the input dataset, the data
//! and time variables to read, an optional HDF5 output path and the locations to
//! extract.
//!
//! Configuration files may be JSON or YAML; the format is picked from the file
//! extension (`.yaml` / `.yml` for YAML, anything else is read as JSON).
//!
//! ```rust
//! use ncextract::input::JobConfig;
//!
//! let json = r#"
//! {
//!   "input_path": "pr_day.nc",
//!   "variable_name": "pr",
//!   "time_name": "time",
//!   "output_path": "pr_catchments.h5",
//!   "locations": {
//!     "catchment_1": { "rows": [1, 2], "columns": [1, 1] }
//!   }
//! }"#;
//! let config = JobConfig::from_json(json)?;
//! assert_eq!(config.locations.len(), 1);
//! # Ok::<(), ncextract::ExtractError>(())
//! ```

use crate::error::{ExtractError, ExtractResult};
use crate::values::{CellIndices, IndexRequest};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration structure for an extraction job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Path to the input NetCDF file
    pub input_path: String,
    /// Name of the 3-D `[time, row, column]` variable
    pub variable_name: String,
    /// Name of the 1-D time variable
    pub time_name: String,
    /// HDF5 output path; results stay in memory when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Locations to extract, in extraction order
    pub locations: IndexRequest,
    /// Accept row/column index 0
    #[serde(default)]
    pub allow_origin_index: bool,
}

impl JobConfig {
    /// Loads a job configuration from a JSON or YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ExtractResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if is_yaml(path) {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn from_json(json_str: &str) -> ExtractResult<Self> {
        Ok(serde_json::from_str(json_str)?)
    }

    pub fn from_yaml(yaml_str: &str) -> ExtractResult<Self> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    pub fn to_json(&self) -> ExtractResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> ExtractResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks everything that can be checked without opening the dataset.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.input_path.trim().is_empty() {
            problems.push("input_path is empty".to_string());
        }
        if self.variable_name.is_empty() {
            problems.push("variable_name is empty".to_string());
        }
        if self.time_name.is_empty() {
            problems.push("time_name is empty".to_string());
        }
        if let Some(output) = &self.output_path {
            let ext = Path::new(output).extension().and_then(|e| e.to_str());
            if !matches!(ext, Some("h5") | Some("hdf5")) {
                problems.push(format!("output_path '{}' must end in .h5 or .hdf5", output));
            }
        }
        if self.locations.is_empty() {
            problems.push("locations is empty".to_string());
        }
        for (label, cells) in &self.locations {
            problems.extend(location_problems(label, cells, self.allow_origin_index));
        }
        problems
    }

    /// Like [`JobConfig::problems`], failing with a configuration error on the first.
    pub fn validate(&self) -> ExtractResult<()> {
        match self.problems().into_iter().next() {
            Some(problem) => Err(ExtractError::Config(problem)),
            None => Ok(()),
        }
    }

    /// Total number of grid cells across all locations.
    pub fn cell_count(&self) -> usize {
        self.locations.values().map(CellIndices::len).sum()
    }
}

fn location_problems(label: &str, cells: &CellIndices, allow_origin: bool) -> Vec<String> {
    let mut problems = Vec::new();
    if cells.rows.is_empty() || cells.columns.is_empty() {
        problems.push(format!("location '{}' has no indices", label));
    }
    if cells.rows.len() != cells.columns.len() {
        problems.push(format!(
            "location '{}' has {} rows but {} columns",
            label,
            cells.rows.len(),
            cells.columns.len()
        ));
    }
    let lowest = if allow_origin { 0 } else { 1 };
    if cells.rows.iter().chain(&cells.columns).any(|i| *i < lowest) {
        problems.push(format!("location '{}' has indices below {}", label, lowest));
    }
    problems
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &str = r#"
    {
        "input_path": "data.nc",
        "variable_name": "pr",
        "time_name": "time",
        "locations": {
            "B": { "rows": [1, 2], "columns": [3, 3] },
            "A": { "y": [2], "x": [1] }
        }
    }"#;

    #[test]
    fn test_from_json_keeps_location_order() {
        let config = JobConfig::from_json(JSON).unwrap();
        assert_eq!(config.output_path, None);
        assert!(!config.allow_origin_index);
        let labels: Vec<&String> = config.locations.keys().collect();
        assert_eq!(labels, vec!["B", "A"]);
        assert_eq!(config.locations["A"], CellIndices::new(vec![2], vec![1]));
        assert_eq!(config.cell_count(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
input_path: data.nc
variable_name: tas
time_name: time
output_path: out.hdf5
locations:
  station:
    rows: [4]
    columns: [5]
"#;
        let config = JobConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.variable_name, "tas");
        assert_eq!(config.output_path.as_deref(), Some("out.hdf5"));
        assert!(config.problems().is_empty());
    }

    #[test]
    fn test_json_yaml_round_trip() {
        let config = JobConfig::from_json(JSON).unwrap();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(JobConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_problems_are_collected() {
        let mut config = JobConfig::from_json(JSON).unwrap();
        config.variable_name = String::new();
        config.output_path = Some("out.csv".to_string());
        config
            .locations
            .insert("C".to_string(), CellIndices::new(vec![0, 1], vec![1]));

        let problems = config.problems();
        assert_eq!(problems.len(), 4);
        assert!(matches!(config.validate(), Err(ExtractError::Config(_))));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(JobConfig::from_json("{ not json").is_err());
        assert!(JobConfig::from_json(r#"{"input_path": "x.nc"}"#).is_err());
    }
}
