use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser};
use ncextract::cli::{
    Cli, Commands, ConfigFormat, ExtractOverrides, OutputFormat, load_locations, resolve_job,
    template_job,
};
use ncextract::coords::CoordinateExtractor;
use ncextract::info::{inspect, print_info_human, print_info_json, print_info_yaml};
use ncextract::input::JobConfig;
use ncextract::log::{config_echo, show_extracted_summary, show_farewell_with_timing, show_greeting, show_outcome};
use ncextract::time::TimeAxis;
use ncextract::{Extraction, process_extraction_job_with_progress};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Commands::Extract {
            input,
            output,
            variable,
            time,
            locations,
            cells,
            allow_origin_index,
            progress,
            dry_run,
        } => {
            let base = cli
                .config
                .as_deref()
                .map(JobConfig::from_file)
                .transpose()
                .context("Failed to load job configuration")?;
            let locations = locations
                .as_deref()
                .map(load_locations)
                .transpose()
                .map_err(anyhow::Error::msg)?;
            let overrides = ExtractOverrides {
                input,
                output,
                variable,
                time,
                locations,
                cells,
                allow_origin_index,
            };
            let job = resolve_job(base, overrides).map_err(anyhow::Error::msg)?;
            let source = cli
                .config
                .as_deref()
                .map_or("command line".to_string(), |p| p.display().to_string());
            run_extract(&job, &source, &cli.output_format, !cli.quiet, progress, dry_run)
        }
        Commands::Coords { file, x_label, y_label } => {
            run_coords(&file, &x_label, &y_label, &cli.output_format)
        }
        Commands::Info {
            file,
            detailed,
            variable,
            format,
        } => {
            let info = inspect(&file, variable.as_deref(), detailed)?;
            match format.unwrap_or(cli.output_format) {
                OutputFormat::Human => print_info_human(&info),
                OutputFormat::Json => print_info_json(&info)?,
                OutputFormat::Yaml => print_info_yaml(&info)?,
            }
            Ok(())
        }
        Commands::Validate {
            config_file,
            detailed,
        } => {
            let path = config_file
                .or(cli.config)
                .context("No configuration file given")?;
            run_validate(&path, detailed)
        }
        Commands::Template {
            template_type,
            format,
            output,
        } => {
            let job = template_job(&template_type);
            let text = match format {
                ConfigFormat::Json => job.to_json()?,
                ConfigFormat::Yaml => job.to_yaml()?,
            };
            write_text(output.as_deref(), &text)
        }
        Commands::Completions { shell, output } => {
            let mut command = Cli::command();
            let mut buffer = Vec::new();
            clap_complete::generate(shell, &mut command, "ncextract", &mut buffer);
            write_text(output.as_deref(), &String::from_utf8(buffer)?)
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run_extract(
    job: &JobConfig,
    source: &str,
    format: &OutputFormat,
    chatty: bool,
    progress: bool,
    dry_run: bool,
) -> Result<()> {
    let start_time = Instant::now();
    let human = *format == OutputFormat::Human;

    if human && chatty {
        show_greeting(source);
        config_echo(job);
    }
    if dry_run {
        let problems = job.problems();
        if !problems.is_empty() {
            bail!("Invalid job configuration:\n  {}", problems.join("\n  "));
        }
        if human && chatty {
            println!("\nDry run: configuration is valid, nothing extracted");
        }
        return Ok(());
    }

    let outcome = process_extraction_job_with_progress(job, progress)?;
    match (&outcome, format) {
        (Extraction::InMemory(data), OutputFormat::Human) => {
            let time = TimeAxis::open(&job.input_path, &job.time_name).ok();
            show_extracted_summary(data, time.as_ref());
        }
        (Extraction::InMemory(data), OutputFormat::Json) => print_json(data)?,
        (Extraction::InMemory(data), OutputFormat::Yaml) => print_yaml(data)?,
        (Extraction::Written(_), OutputFormat::Human) => show_outcome(&outcome),
        (Extraction::Written(path), _) => print_json(&serde_json::json!({ "output": path }))?,
    }

    if human && chatty {
        show_farewell_with_timing(start_time.elapsed());
    }
    Ok(())
}

#[derive(Serialize)]
struct CoordinatesReport<'a> {
    x_label: &'a str,
    y_label: &'a str,
    x: Vec<f64>,
    y: Vec<f64>,
}

fn run_coords(file: &str, x_label: &str, y_label: &str, format: &OutputFormat) -> Result<()> {
    let mut extractor = CoordinateExtractor::new();
    extractor.set_input(file, x_label, y_label)?;
    extractor.extract_coordinates()?;
    let x = extractor.get_x_coordinates()?;
    let y = extractor.get_y_coordinates()?;

    match format {
        OutputFormat::Human => {
            for (label, values) in [(x_label, x), (y_label, y)] {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                println!("{}: {} values, range {} to {}", label, values.len(), min, max);
                println!("  {:?}", values.as_slice().unwrap_or(&[]));
            }
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let report = CoordinatesReport {
                x_label,
                y_label,
                x: x.to_vec(),
                y: y.to_vec(),
            };
            if *format == OutputFormat::Json {
                print_json(&report)?;
            } else {
                print_yaml(&report)?;
            }
        }
    }
    Ok(())
}

fn run_validate(path: &Path, detailed: bool) -> Result<()> {
    let job = JobConfig::from_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let mut problems = job.problems();
    if detailed && !Path::new(&job.input_path).exists() {
        problems.push(format!("input_path '{}' does not exist", job.input_path));
    }

    if problems.is_empty() {
        println!(
            "{} is valid: {} location(s), {} cell(s)",
            path.display(),
            job.locations.len(),
            job.cell_count()
        );
        Ok(())
    } else {
        for problem in &problems {
            eprintln!("  - {}", problem);
        }
        bail!("{} has {} problem(s)", path.display(), problems.len())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_yaml<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_yaml::to_string(value)?);
    Ok(())
}

fn write_text(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => std::io::stdout().write_all(text.as_bytes())?,
    }
    Ok(())
}
