//! # Coordinate Extraction
//!
//! Reads the one-dimensional X and Y coordinate variables of a gridded dataset so
//! that callers can map real-world positions to row and column indices.
//!
//! ```rust,no_run
//! use ncextract::coords::CoordinateExtractor;
//!
//! let mut extractor = CoordinateExtractor::new();
//! extractor.set_input("precipitation.nc", "lon", "lat")?;
//! extractor.extract_coordinates()?;
//! println!("{} columns", extractor.get_x_coordinates()?.len());
//! # Ok::<(), ncextract::ExtractError>(())
//! ```

use crate::dataset::{existing_input_path, require_label, require_variable};
use crate::error::{ExtractError, ExtractResult};
use crate::masked::MaskedArray;
use log::{info, warn};
use ndarray::{Array1, ArrayD, Ix1};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
struct CoordinateInput {
    path: PathBuf,
    x_label: String,
    y_label: String,
}

#[derive(Debug, Clone, Default)]
enum CoordinateState {
    #[default]
    Unconfigured,
    InputSet(CoordinateInput),
    Extracted {
        input: CoordinateInput,
        x: Array1<f64>,
        y: Array1<f64>,
    },
}

/// Extracts the X and Y coordinate arrays of a NetCDF dataset.
#[derive(Debug, Clone, Default)]
pub struct CoordinateExtractor {
    state: CoordinateState,
}

impl CoordinateExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the dataset path and the labels of the coordinate variables.
    ///
    /// Any previously extracted coordinates are discarded.
    pub fn set_input<P: AsRef<Path>>(
        &mut self,
        path: P,
        x_label: &str,
        y_label: &str,
    ) -> ExtractResult<()> {
        let input = CoordinateInput {
            path: existing_input_path(path.as_ref())?,
            x_label: require_label("X coordinates", x_label)?,
            y_label: require_label("Y coordinates", y_label)?,
        };

        info!("Coordinate input: {}", input.path.display());
        info!("  X coordinates' label: {}", input.x_label);
        info!("  Y coordinates' label: {}", input.y_label);

        self.state = CoordinateState::InputSet(input);
        Ok(())
    }

    /// Opens the dataset and reads both coordinate arrays fully into memory.
    ///
    /// Masked coordinates are unwrapped to their raw values. The dataset is closed
    /// before returning, also when validation fails.
    pub fn extract_coordinates(&mut self) -> ExtractResult<()> {
        let input = match &self.state {
            CoordinateState::Unconfigured => {
                return Err(ExtractError::State(
                    "set_input must be called before extract_coordinates".to_string(),
                ));
            }
            CoordinateState::InputSet(input) | CoordinateState::Extracted { input, .. } => {
                input.clone()
            }
        };
        // a failed call must not leave earlier coordinates retrievable
        self.state = CoordinateState::InputSet(input.clone());

        let (x, y) = {
            let file = netcdf::open(&input.path)?;
            let x_var = require_variable(&file, &input.x_label)?;
            let y_var = require_variable(&file, &input.y_label)?;

            let x = MaskedArray::read(&x_var)?;
            let y = MaskedArray::read(&y_var)?;
            drop((x_var, y_var));
            file.close()?;
            (x, y)
        };

        if x.is_masked() || y.is_masked() {
            warn!(
                "X and Y coordinate arrays were masked ({} and {} cells), took the raw data",
                x.masked_count(),
                y.masked_count()
            );
        }

        let x = validate_coordinates(&input.x_label, x.into_data())?;
        let y = validate_coordinates(&input.y_label, y.into_data())?;

        info!("Coordinates extracted: 1 dimension each");
        info!("  Shape of X coordinates: ({},)", x.len());
        info!("  Shape of Y coordinates: ({},)", y.len());

        self.state = CoordinateState::Extracted { input, x, y };
        Ok(())
    }

    pub fn get_x_coordinates(&self) -> ExtractResult<&Array1<f64>> {
        self.extracted().map(|(x, _)| x)
    }

    pub fn get_y_coordinates(&self) -> ExtractResult<&Array1<f64>> {
        self.extracted().map(|(_, y)| y)
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self.state, CoordinateState::Extracted { .. })
    }

    fn extracted(&self) -> ExtractResult<(&Array1<f64>, &Array1<f64>)> {
        match &self.state {
            CoordinateState::Extracted { x, y, .. } => Ok((x, y)),
            _ => Err(ExtractError::State(
                "coordinates are only available after extract_coordinates".to_string(),
            )),
        }
    }
}

fn validate_coordinates(label: &str, values: ArrayD<f64>) -> ExtractResult<Array1<f64>> {
    if values.ndim() != 1 {
        return Err(ExtractError::Shape(format!(
            "Coordinates '{}' must be 1-dimensional, found {} dimensions",
            label,
            values.ndim()
        )));
    }
    if values.is_empty() {
        return Err(ExtractError::Shape(format!("Coordinates '{}' are empty", label)));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(ExtractError::Shape(format!(
            "Coordinates '{}' contain non-finite value {}",
            label, bad
        )));
    }
    values
        .into_dimensionality::<Ix1>()
        .map_err(|e| ExtractError::Shape(format!("Coordinates '{}': {}", label, e)))
}
