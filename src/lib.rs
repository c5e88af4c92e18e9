//! # ncextract
//!
//! Extracts time series at grid-cell indices from gridded NetCDF datasets.
//!
//! ## Features
//!
//! - **Coordinate extraction**: read the 1-D X and Y coordinate arrays of a grid,
//!   unwrapping masked coordinates to their raw values
//! - **Index-driven extraction**: pull the full time series of every cell listed
//!   for a location out of a `[time, row, column]` variable
//! - **Two outputs**: keep results in memory, or write them to an HDF5 file with
//!   one group per location
//! - **Strict validation**: labels, ranks, lengths and index bounds are checked up
//!   front; a failing call produces no output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ncextract::{process_extraction_job, input::JobConfig};
//!
//! let config = JobConfig::from_file("job.yaml").expect("Failed to load config");
//! process_extraction_job(&config).expect("Failed to extract values");
//! ```
//!
//! ## Configuration Example
//!
//! ```json
//! {
//!   "input_path": "pr_day.nc",
//!   "variable_name": "pr",
//!   "time_name": "time",
//!   "output_path": "pr_catchments.h5",
//!   "locations": {
//!     "catchment_1": { "rows": [10, 10, 11], "columns": [4, 5, 4] }
//!   }
//! }
//! ```

pub mod cli;
pub mod coords;
mod dataset;
pub mod error;
pub mod info;
pub mod input;
pub mod log;
pub mod masked;
pub mod output;
pub mod time;
pub mod values;

#[cfg(test)]
mod cli_tests;

pub use crate::coords::CoordinateExtractor;
pub use crate::error::{ErrorKind, ExtractError, ExtractResult};
pub use crate::values::{CellIndices, Extraction, GridValueExtractor, IndexRequest};

use crate::input::JobConfig;

/// Runs the extraction described by `config`.
///
/// Configures a [`GridValueExtractor`] with the job's input and output, extracts
/// all locations and returns either the in-memory data or the written file path.
///
/// # Errors
///
/// Fails if a path or label is invalid, the dataset does not match the job
/// (missing labels, wrong ranks, indices out of bounds) or the output cannot be
/// written.
pub fn process_extraction_job(config: &JobConfig) -> ExtractResult<Extraction> {
    process_extraction_job_with_progress(config, false)
}

/// Same as [`process_extraction_job`], optionally drawing a progress bar.
pub fn process_extraction_job_with_progress(
    config: &JobConfig,
    progress: bool,
) -> ExtractResult<Extraction> {
    let mut extractor = GridValueExtractor::new();
    extractor
        .set_allow_origin_index(config.allow_origin_index)
        .set_progress(progress);
    extractor.set_input(&config.input_path, &config.variable_name, &config.time_name)?;
    extractor.set_output(config.output_path.as_deref())?;
    extractor.extract_data_for_indices(&config.locations)?;
    extractor.into_extraction()
}
