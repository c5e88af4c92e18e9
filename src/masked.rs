//! # Masked Arrays
//!
//! NetCDF variables mark missing cells through `_FillValue` or `missing_value`
//! attributes. [`MaskedArray`] pairs the raw values with an optional validity mask
//! derived from those attributes. Callers that only want the raw numbers use
//! [`MaskedArray::into_data`]; the mask is never applied to the values.
//! Packed variables (`scale_factor` / `add_offset`) are unpacked on read, fill
//! cells excepted.

use crate::dataset::{fill_sentinels, is_numeric, read_unpacked};
use crate::error::{ExtractError, ExtractResult};
use ndarray::ArrayD;

#[derive(Debug, Clone, PartialEq)]
pub struct MaskedArray {
    data: ArrayD<f64>,
    /// `true` marks a masked (missing) cell.
    mask: Option<ArrayD<bool>>,
}

impl MaskedArray {
    pub fn plain(data: ArrayD<f64>) -> Self {
        MaskedArray { data, mask: None }
    }

    /// Builds a masked array, masking every cell equal to one of `sentinels`.
    ///
    /// If no sentinel is given, or none matches, the array is plain.
    pub fn with_sentinels(data: ArrayD<f64>, sentinels: &[f64]) -> Self {
        if sentinels.is_empty() {
            return Self::plain(data);
        }
        let mask = data.mapv(|v| sentinels.iter().any(|s| *s == v));
        if mask.iter().any(|m| *m) {
            MaskedArray {
                data,
                mask: Some(mask),
            }
        } else {
            Self::plain(data)
        }
    }

    /// Reads a whole numeric variable, unpacking `scale_factor` / `add_offset`, and
    /// derives its mask from the fill attributes.
    pub fn read(var: &netcdf::Variable) -> ExtractResult<Self> {
        if !is_numeric(var) {
            return Err(ExtractError::Unsupported(format!(
                "Variable '{}' has non-numeric type {:?}",
                var.name(),
                var.vartype()
            )));
        }
        let data = read_unpacked(var)?;
        let sentinels = fill_sentinels(var)?;
        Ok(Self::with_sentinels(data, &sentinels))
    }

    /// Whether the array carries a validity mask.
    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    pub fn masked_count(&self) -> usize {
        self.mask
            .as_ref()
            .map_or(0, |m| m.iter().filter(|v| **v).count())
    }

    /// Drops the mask and returns the underlying values unchanged.
    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }
}
