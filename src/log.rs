use crate::input::JobConfig;
use crate::time::TimeAxis;
use crate::values::{ExtractedData, Extraction};
use std::time::Duration;

pub fn show_greeting(config_source: &str) {
    println!("=== NetCDF Grid Value Extractor ===");
    println!("Job source: {}", config_source);
}

pub fn config_echo(config: &JobConfig) {
    println!("\nConfiguration:");
    println!("  Input NetCDF: {}", config.input_path);
    println!("  Variable: {}", config.variable_name);
    println!("  Time: {}", config.time_name);
    match &config.output_path {
        Some(path) => println!("  Output HDF5: {}", path),
        None => println!("  Output: in memory"),
    }
    println!(
        "  Locations: {} ({} cells)",
        config.locations.len(),
        config.cell_count()
    );
    for (label, cells) in &config.locations {
        println!("    {}: {} cells", label, cells.len());
    }
}

/// One line per location with its step count and time span.
pub fn show_extracted_summary(data: &ExtractedData, time: Option<&TimeAxis>) {
    println!("\nExtracted data:");
    for (label, series) in data {
        let cells = series.steps().first().map_or(0, |s| s.values.len());
        println!("  {}: {} steps x {} cells", label, series.len(), cells);
    }
    if let Some(dates) = time.and_then(TimeAxis::decode) {
        if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
            println!("  Time span: {} to {}", first, last);
        }
    }
}

pub fn show_outcome(outcome: &Extraction) {
    match outcome {
        Extraction::InMemory(data) => show_extracted_summary(data, None),
        Extraction::Written(path) => println!("\nWrote {}", path.display()),
    }
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    println!(
        "\n=== Extraction completed successfully in {:.2?} ===",
        elapsed
    );
}
