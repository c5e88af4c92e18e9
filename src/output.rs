//! # HDF5 Output Module
//!
//! Persists extraction results to an HDF5 file with the layout
//!
//! ```text
//! /<time_label>                      @units, @calendar (when present on the source)
//! /<time_label>/<time_label>         raw time values
//! /<variable_label>                  @units (when present on the source)
//! /<variable_label>/<location>/rows     row indices
//! /<variable_label>/<location>/columns  column indices
//! /<variable_label>/<location>/data     values, shape (time, cells)
//! ```

use crate::error::{ExtractError, ExtractResult};
use crate::time::TimeAxis;
use hdf5::types::VarLenUnicode;
use log::debug;
use ndarray::{Array2, aview1, arr0};
use std::path::{Path, PathBuf};

/// Open HDF5 output file positioned at the variable group.
///
/// Dropping the sink closes the file; [`Hdf5Sink::finish`] flushes and closes it
/// explicitly so that close errors are reported.
pub struct Hdf5Sink {
    path: PathBuf,
    file: hdf5::File,
    variable_group: hdf5::Group,
}

impl Hdf5Sink {
    /// Creates (truncating) the output file with its time and variable groups.
    pub fn create(
        path: &Path,
        time: &TimeAxis,
        variable_label: &str,
        variable_units: Option<&str>,
    ) -> ExtractResult<Self> {
        debug!("Creating HDF5 output: {}", path.display());
        let file = hdf5::File::create(path)?;

        let time_group = file.create_group(&time.label)?;
        time_group
            .new_dataset_builder()
            .with_data(aview1(&time.values))
            .create(time.label.as_str())?;
        if let Some(units) = &time.units {
            write_text_attribute(&time_group, "units", units)?;
        }
        if let Some(calendar) = &time.calendar {
            write_text_attribute(&time_group, "calendar", calendar)?;
        }

        let variable_group = file.create_group(variable_label)?;
        if let Some(units) = variable_units {
            write_text_attribute(&variable_group, "units", units)?;
        }

        Ok(Hdf5Sink {
            path: path.to_path_buf(),
            file,
            variable_group,
        })
    }

    /// Writes one location sub-group and flushes the file.
    pub fn write_location(
        &self,
        label: &str,
        rows: &[i64],
        columns: &[i64],
        data: &Array2<f64>,
    ) -> ExtractResult<()> {
        let group = self.variable_group.create_group(label)?;
        group
            .new_dataset_builder()
            .with_data(aview1(columns))
            .create("columns")?;
        group
            .new_dataset_builder()
            .with_data(aview1(rows))
            .create("rows")?;
        group.new_dataset_builder().with_data(data).create("data")?;

        self.file.flush()?;
        debug!(
            "Wrote location '{}' with shape {:?} to {}",
            label,
            data.shape(),
            self.path.display()
        );
        Ok(())
    }

    /// Flushes and closes the file.
    pub fn finish(self) -> ExtractResult<PathBuf> {
        let Hdf5Sink {
            path,
            file,
            variable_group,
        } = self;
        drop(variable_group);
        file.flush()?;
        file.close()?;
        Ok(path)
    }
}

fn write_text_attribute(group: &hdf5::Group, name: &str, value: &str) -> ExtractResult<()> {
    let value: VarLenUnicode = value.parse().map_err(|e| {
        ExtractError::Unsupported(format!("Attribute '{}' cannot be stored: {:?}", name, e))
    })?;
    group
        .new_attr_builder()
        .with_data(&arr0(value))
        .create(name)?;
    Ok(())
}
