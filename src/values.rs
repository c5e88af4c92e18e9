//! # Grid Value Extraction
//!
//! Pulls full time series out of a 3-D `[time, row, column]` variable at the grid
//! cells listed for each location of an [`IndexRequest`], and stages the result
//! either in memory or in an HDF5 file.
//!
//! The extractor is a small state machine:
//!
//! ```text
//! Unconfigured --set_input--> InputSet --set_output--> OutputSet --extract--> Extracted
//! ```
//!
//! Each step requires the previous one; calling out of order yields
//! [`ExtractError::State`].
//!
//! ```rust,no_run
//! use ncextract::values::{CellIndices, GridValueExtractor, IndexRequest};
//!
//! let mut request = IndexRequest::new();
//! request.insert("catchment_1".to_string(), CellIndices::new(vec![1, 2], vec![1, 1]));
//!
//! let mut extractor = GridValueExtractor::new();
//! extractor.set_input("precipitation.nc", "pr", "time")?;
//! extractor.set_output(None::<&str>)?;
//! extractor.extract_data_for_indices(&request)?;
//!
//! for (label, series) in extractor.get_extracted_data()? {
//!     println!("{}: {} steps", label, series.len());
//! }
//! # Ok::<(), ncextract::ExtractError>(())
//! ```

use crate::dataset::{
    existing_input_path, is_numeric, read_unpacked, require_label, require_variable, shape_of,
    string_attribute,
};
use crate::error::{ExtractError, ExtractResult};
use crate::output::Hdf5Sink;
use crate::time::TimeAxis;
use indexmap::IndexMap;
use indicatif::ProgressBar;
use log::{debug, info};
use ndarray::{Array1, Array2, Array3, Ix3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Row and column indices of the grid cells belonging to one location.
///
/// `rows[k]` and `columns[k]` together address the k-th cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellIndices {
    #[serde(alias = "y")]
    pub rows: Vec<i64>,
    #[serde(alias = "x")]
    pub columns: Vec<i64>,
}

impl CellIndices {
    pub fn new(rows: Vec<i64>, columns: Vec<i64>) -> Self {
        CellIndices { rows, columns }
    }

    /// Number of index pairs.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Location label to cell indices, iterated in insertion order.
pub type IndexRequest = IndexMap<String, CellIndices>;

/// Values of one location at a single time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStep {
    pub time: f64,
    pub values: Array1<f64>,
}

/// Time series of one location: one entry per time step, in time-axis order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LocationSeries {
    steps: Vec<TimeStep>,
}

impl LocationSeries {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Values at the first step whose time equals `time`.
    pub fn get(&self, time: f64) -> Option<&Array1<f64>> {
        self.steps.iter().find(|s| s.time == time).map(|s| &s.values)
    }

    pub fn steps(&self) -> &[TimeStep] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &Array1<f64>)> {
        self.steps.iter().map(|s| (s.time, &s.values))
    }

    pub fn times(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.time).collect()
    }

    /// Stacks the steps into a `(time, cell)` block.
    pub fn to_array2(&self) -> Array2<f64> {
        let cells = self.steps.first().map_or(0, |s| s.values.len());
        Array2::from_shape_fn((self.steps.len(), cells), |(t, k)| self.steps[t].values[k])
    }
}

/// In-memory extraction result keyed by location label.
pub type ExtractedData = IndexMap<String, LocationSeries>;

/// Where extraction results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    InMemory,
    Hdf5(PathBuf),
}

impl OutputTarget {
    /// Chooses the target from an optional output path.
    ///
    /// `None` selects in-memory output. A path must live in an existing directory
    /// and end in `.h5` or `.hdf5`.
    pub fn from_path(path: Option<&Path>) -> ExtractResult<Self> {
        let Some(path) = path else {
            return Ok(OutputTarget::InMemory);
        };
        let path = std::path::absolute(path)?;

        let parent_exists = path.parent().is_some_and(|p| p.is_dir());
        if !parent_exists {
            return Err(ExtractError::Config(format!(
                "Output directory does not exist for {}",
                path.display()
            )));
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some("h5") | Some("hdf5") => Ok(OutputTarget::Hdf5(path)),
            other => Err(ExtractError::Unsupported(format!(
                "Output format '{}' is not supported, use .h5 or .hdf5",
                other.unwrap_or("")
            ))),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            OutputTarget::InMemory => "raw",
            OutputTarget::Hdf5(_) => "h5",
        }
    }
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    InMemory(ExtractedData),
    Written(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
struct ValueInput {
    path: PathBuf,
    variable_label: String,
    time_label: String,
}

#[derive(Debug, Clone, Default)]
enum ExtractorState {
    #[default]
    Unconfigured,
    InputSet(ValueInput),
    OutputSet {
        input: ValueInput,
        output: OutputTarget,
    },
    Extracted {
        input: ValueInput,
        output: OutputTarget,
        result: Extraction,
    },
}

/// Extracts time series at grid-cell indices from a 3-D NetCDF variable.
#[derive(Debug, Clone, Default)]
pub struct GridValueExtractor {
    state: ExtractorState,
    allow_origin_index: bool,
    show_progress: bool,
}

impl GridValueExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept index 0 as a valid row or column.
    ///
    /// Off by default: the first row and column are rejected together with
    /// negative indices.
    pub fn set_allow_origin_index(&mut self, allow: bool) -> &mut Self {
        self.allow_origin_index = allow;
        self
    }

    /// Show a progress bar over locations while extracting.
    pub fn set_progress(&mut self, show: bool) -> &mut Self {
        self.show_progress = show;
        self
    }

    /// Records the dataset path and the labels of the data and time variables.
    ///
    /// A previously configured output is kept; earlier results are discarded.
    pub fn set_input<P: AsRef<Path>>(
        &mut self,
        path: P,
        variable_label: &str,
        time_label: &str,
    ) -> ExtractResult<()> {
        let input = ValueInput {
            path: existing_input_path(path.as_ref())?,
            variable_label: require_label("Variable", variable_label)?,
            time_label: require_label("Time", time_label)?,
        };

        info!("Input dataset: {}", input.path.display());
        info!("  Variable label: {}", input.variable_label);
        info!("  Time label: {}", input.time_label);

        self.state = match std::mem::take(&mut self.state) {
            ExtractorState::OutputSet { output, .. } | ExtractorState::Extracted { output, .. } => {
                ExtractorState::OutputSet { input, output }
            }
            ExtractorState::Unconfigured | ExtractorState::InputSet(_) => {
                ExtractorState::InputSet(input)
            }
        };
        Ok(())
    }

    /// Selects in-memory output for `None`, otherwise an HDF5 file at `path`.
    pub fn set_output<P: AsRef<Path>>(&mut self, path: Option<P>) -> ExtractResult<()> {
        let input = match &self.state {
            ExtractorState::Unconfigured => {
                return Err(ExtractError::State(
                    "set_input must be called before set_output".to_string(),
                ));
            }
            ExtractorState::InputSet(input)
            | ExtractorState::OutputSet { input, .. }
            | ExtractorState::Extracted { input, .. } => input.clone(),
        };
        let output = OutputTarget::from_path(path.as_ref().map(|p| -> &Path { p.as_ref() }))?;

        match &output {
            OutputTarget::InMemory => info!("Output: in memory (format: {})", output.describe()),
            OutputTarget::Hdf5(path) => {
                info!("Output: {} (format: {})", path.display(), output.describe())
            }
        }

        self.state = ExtractorState::OutputSet { input, output };
        Ok(())
    }

    /// Extracts every location of `request` across all time steps.
    ///
    /// All indices are validated before any output is produced, so a failing call
    /// leaves neither an in-memory result nor an output file behind.
    pub fn extract_data_for_indices(&mut self, request: &IndexRequest) -> ExtractResult<()> {
        let (input, output) = match &self.state {
            ExtractorState::OutputSet { input, output }
            | ExtractorState::Extracted { input, output, .. } => (input.clone(), output.clone()),
            _ => {
                return Err(ExtractError::State(
                    "set_input and set_output must be called before extraction".to_string(),
                ));
            }
        };
        // a failed call must not leave the previous result retrievable
        self.state = ExtractorState::OutputSet {
            input: input.clone(),
            output: output.clone(),
        };

        if request.is_empty() {
            return Err(ExtractError::Config(
                "Index request must contain at least one location".to_string(),
            ));
        }
        if let OutputTarget::Hdf5(_) = output {
            for label in request.keys() {
                check_group_name(label)?;
            }
        }

        let source = SourceGrid::read(&input, request, self.allow_origin_index)?;

        let result = match &output {
            OutputTarget::InMemory => {
                Extraction::InMemory(self.stage_in_memory(&source, request)?)
            }
            OutputTarget::Hdf5(path) => {
                Extraction::Written(self.write_structured(path, &input, &source, request)?)
            }
        };

        info!("Extraction of {} location(s) complete", request.len());
        self.state = ExtractorState::Extracted {
            input,
            output,
            result,
        };
        Ok(())
    }

    /// In-memory result of the last extraction.
    pub fn get_extracted_data(&self) -> ExtractResult<&ExtractedData> {
        match &self.state {
            ExtractorState::Extracted {
                result: Extraction::InMemory(data),
                ..
            } => Ok(data),
            ExtractorState::Extracted { .. }
            | ExtractorState::OutputSet {
                output: OutputTarget::Hdf5(_),
                ..
            } => Err(ExtractError::State(
                "extracted data is only retrievable with in-memory output".to_string(),
            )),
            _ => Err(ExtractError::State(
                "no extraction has been performed".to_string(),
            )),
        }
    }

    /// Consumes the extractor and returns the outcome of the last extraction.
    pub fn into_extraction(self) -> ExtractResult<Extraction> {
        match self.state {
            ExtractorState::Extracted { result, .. } => Ok(result),
            _ => Err(ExtractError::State(
                "no extraction has been performed".to_string(),
            )),
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self.state, ExtractorState::Extracted { .. })
    }

    fn progress(&self, len: usize) -> ProgressBar {
        if self.show_progress {
            ProgressBar::new(len as u64)
        } else {
            ProgressBar::hidden()
        }
    }

    fn stage_in_memory(
        &self,
        source: &SourceGrid,
        request: &IndexRequest,
    ) -> ExtractResult<ExtractedData> {
        let progress = self.progress(request.len());
        let mut data = ExtractedData::with_capacity(request.len());

        for (label, cells) in request.keys().zip(&source.cells) {
            progress.set_message(label.clone());
            let steps: Vec<TimeStep> = source
                .time
                .values
                .iter()
                .enumerate()
                .map(|(t, time)| TimeStep {
                    time: *time,
                    values: cells.iter().map(|&(r, c)| source.grid[[t, r, c]]).collect(),
                })
                .collect();

            if steps.is_empty() {
                return Err(ExtractError::Shape(format!(
                    "No time steps extracted for location '{}'",
                    label
                )));
            }
            debug!("Location '{}': {} steps x {} cells", label, steps.len(), cells.len());
            data.insert(label.clone(), LocationSeries { steps });
            progress.inc(1);
        }
        progress.finish_and_clear();

        Ok(data)
    }

    fn write_structured(
        &self,
        path: &Path,
        input: &ValueInput,
        source: &SourceGrid,
        request: &IndexRequest,
    ) -> ExtractResult<PathBuf> {
        let progress = self.progress(request.len());
        let written = (|| -> ExtractResult<PathBuf> {
            let sink = Hdf5Sink::create(
                path,
                &source.time,
                &input.variable_label,
                source.units.as_deref(),
            )?;
            for ((label, indices), cells) in request.iter().zip(&source.cells) {
                progress.set_message(label.clone());
                let block = source.block(cells);
                sink.write_location(label, &indices.rows, &indices.columns, &block)?;
                progress.inc(1);
            }
            sink.finish()
        })();
        progress.finish_and_clear();

        if written.is_err() && path.exists() {
            // best effort, the write error is what gets reported
            let _ = std::fs::remove_file(path);
        }
        written
    }
}

/// Source data read once per extraction call and shared by all locations.
struct SourceGrid {
    grid: Array3<f64>,
    time: TimeAxis,
    units: Option<String>,
    /// Validated `(row, column)` pairs per location, in request order.
    cells: Vec<Vec<(usize, usize)>>,
}

impl SourceGrid {
    /// Opens the dataset, validates variable, time axis and indices, and reads the
    /// whole variable. The dataset is closed on every path out of this function.
    fn read(input: &ValueInput, request: &IndexRequest, allow_origin: bool) -> ExtractResult<Self> {
        let file = netcdf::open(&input.path)?;
        let var = require_variable(&file, &input.variable_label)?;
        let time_var = require_variable(&file, &input.time_label)?;

        let shape = shape_of(&var);
        if shape.len() != 3 {
            return Err(ExtractError::Shape(format!(
                "Variable '{}' must be 3-dimensional (time, row, column), found {} dimensions",
                input.variable_label,
                shape.len()
            )));
        }
        if shape.iter().any(|n| *n == 0) {
            return Err(ExtractError::Shape(format!(
                "Variable '{}' has an empty dimension: {:?}",
                input.variable_label, shape
            )));
        }
        if !is_numeric(&var) {
            return Err(ExtractError::Unsupported(format!(
                "Variable '{}' has non-numeric type {:?}",
                input.variable_label,
                var.vartype()
            )));
        }

        let time = TimeAxis::read(&time_var)?;
        if time.len() != shape[0] {
            return Err(ExtractError::Shape(format!(
                "Time length {} does not match the time dimension of '{}' ({})",
                time.len(),
                input.variable_label,
                shape[0]
            )));
        }

        info!("Variable '{}' properties:", input.variable_label);
        info!("  Dimensions of variable: {}", shape.len());
        info!("  Shape of variable: {:?}", shape);
        info!("  Shape of time: ({},)", time.len());

        let cells = request
            .iter()
            .map(|(label, indices)| validate_indices(label, indices, shape[1], shape[2], allow_origin))
            .collect::<ExtractResult<Vec<_>>>()?;

        let units = string_attribute(&var, "units")?;
        let grid = read_unpacked(&var)?
            .into_dimensionality::<Ix3>()
            .map_err(|e| ExtractError::Shape(format!("Variable '{}': {}", input.variable_label, e)))?;

        drop((var, time_var));
        file.close()?;

        Ok(SourceGrid {
            grid,
            time,
            units,
            cells,
        })
    }

    /// Values of all time steps at `cells`, shape `(time, cells)`.
    fn block(&self, cells: &[(usize, usize)]) -> Array2<f64> {
        Array2::from_shape_fn((self.grid.shape()[0], cells.len()), |(t, k)| {
            let (r, c) = cells[k];
            self.grid[[t, r, c]]
        })
    }
}

/// Checks one location's indices against the grid and pairs them up.
///
/// Indices must lie in `(0, n_rows)` / `(0, n_columns)`, or `[0, n)` when
/// `allow_origin` is set.
fn validate_indices(
    label: &str,
    indices: &CellIndices,
    n_rows: usize,
    n_columns: usize,
    allow_origin: bool,
) -> ExtractResult<Vec<(usize, usize)>> {
    let lowest = if allow_origin { 0 } else { 1 };
    let check = |kind: &str, values: &[i64], limit: usize| -> ExtractResult<()> {
        let (Some(min), Some(max)) = (values.iter().min(), values.iter().max()) else {
            return Err(ExtractError::index_bounds(label, format!("{} indices are empty", kind)));
        };
        if *min < lowest {
            return Err(ExtractError::index_bounds(
                label,
                format!("{} index {} is below {}", kind, min, lowest),
            ));
        }
        if *max as u64 >= limit as u64 {
            return Err(ExtractError::index_bounds(
                label,
                format!("{} index {} is not below the dimension length {}", kind, max, limit),
            ));
        }
        Ok(())
    };

    check("column", &indices.columns, n_columns)?;
    check("row", &indices.rows, n_rows)?;
    if indices.rows.len() != indices.columns.len() {
        return Err(ExtractError::index_bounds(
            label,
            format!(
                "{} row indices but {} column indices",
                indices.rows.len(),
                indices.columns.len()
            ),
        ));
    }

    Ok(indices
        .rows
        .iter()
        .zip(&indices.columns)
        .map(|(r, c)| (*r as usize, *c as usize))
        .collect())
}

/// Rejects labels that cannot name an HDF5 group.
fn check_group_name(label: &str) -> ExtractResult<()> {
    if label.is_empty() || label == "." || label.contains('/') || label.contains('\0') {
        return Err(ExtractError::Config(format!(
            "Location label '{}' cannot be used as an HDF5 group name",
            label
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_validate_indices_pairs_up() {
        let cells = validate_indices("A", &CellIndices::new(vec![1, 2], vec![1, 4]), 3, 5, false).unwrap();
        assert_eq!(cells, vec![(1, 1), (2, 4)]);
    }

    #[test]
    fn test_validate_indices_rejects_zero_by_default() {
        let indices = CellIndices::new(vec![0, 1], vec![1, 1]);
        assert!(matches!(
            validate_indices("A", &indices, 3, 5, false),
            Err(ExtractError::IndexBounds { .. })
        ));
        assert_eq!(
            validate_indices("A", &indices, 3, 5, true).unwrap(),
            vec![(0, 1), (1, 1)]
        );
    }

    #[test]
    fn test_validate_indices_rejects_negative_and_upper_bound() {
        let negative = CellIndices::new(vec![-1], vec![1]);
        assert!(validate_indices("A", &negative, 3, 5, true).is_err());

        let too_high_row = CellIndices::new(vec![3], vec![1]);
        assert!(validate_indices("A", &too_high_row, 3, 5, false).is_err());

        let too_high_column = CellIndices::new(vec![1], vec![5]);
        assert!(validate_indices("A", &too_high_column, 3, 5, false).is_err());
    }

    #[test]
    fn test_validate_indices_rejects_malformed() {
        let empty = CellIndices::new(vec![], vec![]);
        assert!(matches!(
            validate_indices("A", &empty, 3, 5, false),
            Err(ExtractError::IndexBounds { .. })
        ));

        let mismatched = CellIndices::new(vec![1, 2], vec![1]);
        assert!(matches!(
            validate_indices("A", &mismatched, 3, 5, false),
            Err(ExtractError::IndexBounds { .. })
        ));
    }

    #[test]
    fn test_output_target_selection() {
        assert_eq!(OutputTarget::from_path(None).unwrap(), OutputTarget::InMemory);
        assert_eq!(OutputTarget::InMemory.describe(), "raw");

        let dir = tempfile::tempdir().unwrap();
        for name in ["out.h5", "out.hdf5"] {
            let target = OutputTarget::from_path(Some(&dir.path().join(name))).unwrap();
            assert_eq!(target, OutputTarget::Hdf5(dir.path().join(name)));
            assert_eq!(target.describe(), "h5");
        }
        assert!(matches!(
            OutputTarget::from_path(Some(&dir.path().join("out.csv"))),
            Err(ExtractError::Unsupported(_))
        ));
        assert!(matches!(
            OutputTarget::from_path(Some(Path::new("/nonexistent/dir/out.h5"))),
            Err(ExtractError::Config(_))
        ));
    }

    #[test]
    fn test_group_name_check() {
        assert!(check_group_name("basin 12").is_ok());
        assert!(check_group_name("").is_err());
        assert!(check_group_name(".").is_err());
        assert!(check_group_name("a/b").is_err());
    }

    #[test]
    fn test_location_series_accessors() {
        let series = LocationSeries {
            steps: vec![
                TimeStep { time: 0.0, values: array![1.0, 2.0] },
                TimeStep { time: 1.0, values: array![3.0, 4.0] },
            ],
        };
        assert_eq!(series.len(), 2);
        assert_eq!(series.get(1.0), Some(&array![3.0, 4.0]));
        assert_eq!(series.get(2.0), None);
        assert_eq!(series.times(), vec![0.0, 1.0]);
        assert_eq!(series.to_array2(), array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_state_gating() {
        let mut extractor = GridValueExtractor::new();
        assert!(matches!(
            extractor.set_output(None::<&str>),
            Err(ExtractError::State(_))
        ));
        let mut request = IndexRequest::new();
        request.insert("A".to_string(), CellIndices::new(vec![1], vec![1]));
        assert!(matches!(
            extractor.extract_data_for_indices(&request),
            Err(ExtractError::State(_))
        ));
        assert!(matches!(
            extractor.get_extracted_data(),
            Err(ExtractError::State(_))
        ));
    }
}
