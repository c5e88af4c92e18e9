//! # Dataset Information Module
//!
//! Lists the dimensions, variables and attributes of a NetCDF file so that users
//! can find the variable, time and coordinate labels an extraction needs.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Information about a NetCDF dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// Information about a NetCDF variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub attributes: BTreeMap<String, String>,
}

impl VariableInfo {
    /// Whether the variable has the `[time, row, column]` rank extraction expects.
    pub fn is_grid(&self) -> bool {
        self.shape.len() == 3
    }
}

/// Summary of a whole NetCDF file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub path: String,
    pub file_size: Option<u64>,
    pub dimensions: Vec<DimensionInfo>,
    pub variables: Vec<VariableInfo>,
    pub global_attributes: BTreeMap<String, String>,
}

/// Reads the structure of `path`.
///
/// With `variable` set only that variable is listed. Global attributes are only
/// collected when `detailed` is set.
pub fn inspect<P: AsRef<Path>>(path: P, variable: Option<&str>, detailed: bool) -> Result<DatasetInfo> {
    let path = path.as_ref();
    debug!("Inspecting NetCDF file: {}", path.display());
    let file = netcdf::open(path)
        .with_context(|| format!("Failed to open NetCDF file: {}", path.display()))?;

    let dimensions = file
        .dimensions()
        .map(|dim| DimensionInfo {
            name: dim.name(),
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let mut variables = Vec::new();
    for var in file.variables() {
        if variable.is_some_and(|name| var.name() != name) {
            continue;
        }
        variables.push(VariableInfo {
            name: var.name(),
            data_type: format!("{:?}", var.vartype()),
            dimensions: var.dimensions().iter().map(|d| d.name()).collect(),
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
            attributes: var
                .attributes()
                .filter_map(|attr| attr.value().ok().map(|v| (attr.name().to_string(), format_value(&v))))
                .collect(),
        });
    }
    if let Some(name) = variable {
        if variables.is_empty() {
            anyhow::bail!("Variable '{}' not found in {}", name, path.display());
        }
    }

    let global_attributes = if detailed {
        file.attributes()
            .filter_map(|attr| attr.value().ok().map(|v| (attr.name().to_string(), format_value(&v))))
            .collect()
    } else {
        BTreeMap::new()
    };

    file.close().context("Failed to close NetCDF file")?;

    Ok(DatasetInfo {
        path: path.display().to_string(),
        file_size: std::fs::metadata(path).ok().map(|m| m.len()),
        dimensions,
        variables,
        global_attributes,
    })
}

fn format_value(value: &netcdf::AttributeValue) -> String {
    match value {
        netcdf::AttributeValue::Str(s) => s.clone(),
        other => format!("{:?}", other),
    }
}

/// Print dataset info in human-readable format
pub fn print_info_human(info: &DatasetInfo) {
    println!("NetCDF File Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!("  Dimensions: {} total", info.dimensions.len());
    for dim in &info.dimensions {
        println!(
            "    {} ({}{})",
            dim.name,
            dim.length,
            if dim.is_unlimited { ", unlimited" } else { "" }
        );
    }
    println!("  Variables: {} total", info.variables.len());
    for var in &info.variables {
        println!(
            "    {} ({}) - dimensions: [{}]{}",
            var.name,
            var.data_type,
            var.dimensions.join(", "),
            if var.is_grid() { " [grid]" } else { "" }
        );
        for (name, value) in &var.attributes {
            println!("      @{}: {}", name, value);
        }
    }
    if !info.global_attributes.is_empty() {
        println!("  Global Attributes:");
        for (name, value) in &info.global_attributes {
            println!("    @{}: {}", name, value);
        }
    }
}

pub fn print_info_json(info: &DatasetInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

pub fn print_info_yaml(info: &DatasetInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize dataset info to YAML")?;
    println!("{}", yaml);
    Ok(())
}
