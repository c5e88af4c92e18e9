//! Thin helpers over the `netcdf` reader: opening files, resolving labels and
//! pulling scalar attributes out of variables.

use crate::error::{ExtractError, ExtractResult};
use ndarray::{Array, Dimension};
use netcdf::AttributeValue;
use netcdf::types::NcVariableType;
use std::path::{Path, PathBuf};

/// Resolves `path` to an absolute path and checks that it exists.
pub(crate) fn existing_input_path(path: &Path) -> ExtractResult<PathBuf> {
    let path = std::path::absolute(path)?;
    if !path.exists() {
        return Err(ExtractError::Config(format!(
            "Input dataset does not exist: {}",
            path.display()
        )));
    }
    Ok(path)
}

pub(crate) fn require_label(kind: &str, label: &str) -> ExtractResult<String> {
    if label.is_empty() {
        return Err(ExtractError::Config(format!("{} label must not be empty", kind)));
    }
    Ok(label.to_string())
}

pub(crate) fn require_variable<'f>(
    file: &'f netcdf::File,
    label: &str,
) -> ExtractResult<netcdf::Variable<'f>> {
    file.variable(label)
        .ok_or_else(|| ExtractError::Schema(label.to_string()))
}

pub(crate) fn shape_of(var: &netcdf::Variable) -> Vec<usize> {
    var.dimensions().iter().map(|d| d.len()).collect()
}

/// True for plain integer and floating point variables.
pub(crate) fn is_numeric(var: &netcdf::Variable) -> bool {
    matches!(var.vartype(), NcVariableType::Int(_) | NcVariableType::Float(_))
}

/// Reads a text attribute, returning `None` when it is absent or not a string.
pub(crate) fn string_attribute(var: &netcdf::Variable, name: &str) -> ExtractResult<Option<String>> {
    let Some(attr) = var.attribute(name) else {
        return Ok(None);
    };
    match attr.value()? {
        AttributeValue::Str(s) => Ok(Some(s)),
        AttributeValue::Strs(mut v) if !v.is_empty() => Ok(Some(v.swap_remove(0))),
        _ => Ok(None),
    }
}

/// Reads a numeric attribute as `f64`; vector attributes yield their first element.
pub(crate) fn numeric_attribute(var: &netcdf::Variable, name: &str) -> ExtractResult<Option<f64>> {
    let Some(attr) = var.attribute(name) else {
        return Ok(None);
    };
    let value = match attr.value()? {
        AttributeValue::Uchar(v) => Some(v as f64),
        AttributeValue::Schar(v) => Some(v as f64),
        AttributeValue::Ushort(v) => Some(v as f64),
        AttributeValue::Short(v) => Some(v as f64),
        AttributeValue::Uint(v) => Some(v as f64),
        AttributeValue::Int(v) => Some(v as f64),
        AttributeValue::Ulonglong(v) => Some(v as f64),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Float(v) => Some(v as f64),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Floats(v) => v.first().map(|x| *x as f64),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Shorts(v) => v.first().map(|x| *x as f64),
        AttributeValue::Ints(v) => v.first().map(|x| *x as f64),
        _ => None,
    };
    Ok(value)
}

/// Attributes whose value marks a cell as missing.
const FILL_ATTRIBUTES: [&str; 2] = ["_FillValue", "missing_value"];

/// Values of `_FillValue` and `missing_value`, in stored (packed) units.
pub(crate) fn fill_sentinels(var: &netcdf::Variable) -> ExtractResult<Vec<f64>> {
    let mut sentinels = Vec::new();
    for name in FILL_ATTRIBUTES {
        if let Some(value) = numeric_attribute(var, name)? {
            sentinels.push(value);
        }
    }
    Ok(sentinels)
}

/// CF packing of a variable: `unpacked = packed * scale_factor + add_offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Packing {
    pub scale_factor: f64,
    pub add_offset: f64,
}

impl Packing {
    /// `None` unless the variable carries `scale_factor` or `add_offset`.
    pub(crate) fn read(var: &netcdf::Variable) -> ExtractResult<Option<Self>> {
        let scale_factor = numeric_attribute(var, "scale_factor")?;
        let add_offset = numeric_attribute(var, "add_offset")?;
        if scale_factor.is_none() && add_offset.is_none() {
            return Ok(None);
        }
        Ok(Some(Packing {
            scale_factor: scale_factor.unwrap_or(1.0),
            add_offset: add_offset.unwrap_or(0.0),
        }))
    }

    pub(crate) fn unpack(&self, value: f64) -> f64 {
        value * self.scale_factor + self.add_offset
    }

    /// Unpacks every value except those equal to one of `fills`.
    pub(crate) fn unpack_array<D: Dimension>(&self, data: &mut Array<f64, D>, fills: &[f64]) {
        data.mapv_inplace(|v| if fills.contains(&v) { v } else { self.unpack(v) });
    }
}

/// Reads a whole numeric variable as `f64`, unpacked when the variable is packed.
/// Fill values are passed through in stored units.
pub(crate) fn read_unpacked(var: &netcdf::Variable) -> ExtractResult<ndarray::ArrayD<f64>> {
    let mut data = var.get::<f64, _>(..)?;
    if let Some(packing) = Packing::read(var)? {
        packing.unpack_array(&mut data, &fill_sentinels(var)?);
    }
    Ok(data)
}
