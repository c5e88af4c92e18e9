//! # CLI Tests
//!
//! Argument parsing for every subcommand, location parsing and environment
//! variable fallbacks.

#[cfg(test)]
mod tests {
    use clap::Parser;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use crate::cli::{Cli, Commands, ConfigFormat, OutputFormat, TemplateType};

    // Serializes tests that parse `extract`, whose arguments read NCEXTRACT_* variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Test basic CLI argument parsing
    #[test]
    fn test_cli_help() {
        let result = Cli::try_parse_from(["ncextract", "--help"]);
        assert!(result.is_err()); // --help causes early exit with "error"

        let error = result.unwrap_err();
        assert!(error
            .to_string()
            .contains("Extract time series at grid-cell indices from NetCDF files"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["ncextract", "--version"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "ncextract",
            "--verbose",
            "--output-format",
            "json",
            "--config",
            "/path/to/job.json",
            "template",
            "basic",
        ]);

        assert!(cli.verbose);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/job.json")));
    }

    /// Test extract command argument parsing
    #[test]
    fn test_extract_command_basic() {
        let _guard = ENV_LOCK.lock().unwrap();
        let cli = Cli::parse_from([
            "ncextract", "extract", "pr.nc", "pr.h5", "-n", "pr", "-t", "time",
        ]);

        if let Commands::Extract {
            input,
            output,
            variable,
            time,
            cells,
            dry_run,
            ..
        } = &cli.command
        {
            assert_eq!(input, &Some("pr.nc".to_string()));
            assert_eq!(output, &Some("pr.h5".to_string()));
            assert_eq!(variable, &Some("pr".to_string()));
            assert_eq!(time, &Some("time".to_string()));
            assert!(cells.is_empty());
            assert!(!dry_run);
        } else {
            panic!("Expected Extract command");
        }
    }

    #[test]
    fn test_extract_command_with_cells() {
        let _guard = ENV_LOCK.lock().unwrap();
        let cli = Cli::parse_from([
            "ncextract",
            "extract",
            "pr.nc",
            "-n",
            "pr",
            "-t",
            "time",
            "--cell",
            "A:1,2:1,1",
            "--cell",
            "station:north:10:4",
            "--allow-origin-index",
            "--progress",
            "--dry-run",
        ]);

        if let Commands::Extract {
            output,
            cells,
            allow_origin_index,
            progress,
            dry_run,
            ..
        } = &cli.command
        {
            assert_eq!(output, &None);
            assert_eq!(cells.len(), 2);
            assert_eq!(cells[0].label, "A");
            assert_eq!(cells[0].cells.rows, vec![1, 2]);
            assert_eq!(cells[0].cells.columns, vec![1, 1]);
            // only the last two colons separate indices
            assert_eq!(cells[1].label, "station:north");
            assert_eq!(cells[1].cells.rows, vec![10]);
            assert!(allow_origin_index);
            assert!(progress);
            assert!(dry_run);
        } else {
            panic!("Expected Extract command");
        }
    }

    #[test]
    fn test_invalid_cell_arguments() {
        let _guard = ENV_LOCK.lock().unwrap();
        for cell in ["A:1,2", ":1:1", "A:one:1", "A:1,:1", "A:1:"] {
            let result = Cli::try_parse_from(["ncextract", "extract", "pr.nc", "--cell", cell]);
            assert!(result.is_err(), "accepted {}", cell);
        }
    }

    #[test]
    fn test_coords_command() {
        let cli = Cli::parse_from(["ncextract", "coords", "pr.nc", "-x", "rlon", "-y", "rlat"]);

        if let Commands::Coords {
            file,
            x_label,
            y_label,
        } = &cli.command
        {
            assert_eq!(file, "pr.nc");
            assert_eq!(x_label, "rlon");
            assert_eq!(y_label, "rlat");
        } else {
            panic!("Expected Coords command");
        }

        let cli = Cli::parse_from(["ncextract", "coords", "pr.nc"]);
        if let Commands::Coords { x_label, y_label, .. } = &cli.command {
            assert_eq!(x_label, "lon");
            assert_eq!(y_label, "lat");
        } else {
            panic!("Expected Coords command");
        }
    }

    /// Test info command parsing
    #[test]
    fn test_info_command() {
        let cli = Cli::parse_from([
            "ncextract",
            "info",
            "test.nc",
            "--detailed",
            "-n",
            "pr",
            "--format",
            "yaml",
        ]);

        if let Commands::Info {
            file,
            detailed,
            variable,
            format,
        } = &cli.command
        {
            assert_eq!(file, "test.nc");
            assert!(detailed);
            assert_eq!(variable, &Some("pr".to_string()));
            assert_eq!(format, &Some(OutputFormat::Yaml));
        } else {
            panic!("Expected Info command");
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["ncextract", "validate", "job.json", "--detailed"]);

        if let Commands::Validate {
            config_file,
            detailed,
        } = &cli.command
        {
            assert_eq!(config_file, &Some(PathBuf::from("job.json")));
            assert!(detailed);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_template_command() {
        let cli = Cli::parse_from([
            "ncextract",
            "template",
            "hdf5",
            "--output",
            "job.yaml",
            "--format",
            "yaml",
        ]);

        if let Commands::Template {
            template_type,
            output,
            format,
        } = &cli.command
        {
            assert_eq!(template_type, &TemplateType::Hdf5);
            assert_eq!(output, &Some(PathBuf::from("job.yaml")));
            assert_eq!(format, &ConfigFormat::Yaml);
        } else {
            panic!("Expected Template command");
        }

        assert!(Cli::try_parse_from(["ncextract", "template", "s3"]).is_err());
    }

    #[test]
    fn test_completions_command() {
        let cli = Cli::parse_from(["ncextract", "completions", "bash"]);
        assert!(matches!(cli.command, Commands::Completions { output: None, .. }));

        assert!(Cli::try_parse_from(["ncextract", "completions", "tcsh"]).is_err());
    }

    #[test]
    fn test_output_format_values() {
        for (name, expected) in [
            ("human", OutputFormat::Human),
            ("json", OutputFormat::Json),
            ("yaml", OutputFormat::Yaml),
        ] {
            let cli = Cli::parse_from(["ncextract", "--output-format", name, "template", "basic"]);
            assert_eq!(cli.output_format, expected);
        }

        let result =
            Cli::try_parse_from(["ncextract", "--output-format", "csv", "template", "basic"]);
        assert!(result.is_err());
    }

    /// Test conflicting verbose and quiet flags
    #[test]
    fn test_verbose_quiet_conflict() {
        let result = Cli::try_parse_from(["ncextract", "--verbose", "--quiet", "info", "test.nc"]);
        assert!(result.is_err());

        let cli = Cli::parse_from(["ncextract", "--quiet", "info", "test.nc"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_environment_variables() {
        let _guard = ENV_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("NCEXTRACT_INPUT", "/data/env_pr.nc");
            std::env::set_var("NCEXTRACT_VARIABLE", "env_pr");
        }

        let cli = Cli::parse_from(["ncextract", "extract", "-t", "time"]);

        unsafe {
            std::env::remove_var("NCEXTRACT_INPUT");
            std::env::remove_var("NCEXTRACT_VARIABLE");
        }

        if let Commands::Extract {
            input, variable, ..
        } = &cli.command
        {
            assert_eq!(input, &Some("/data/env_pr.nc".to_string()));
            assert_eq!(variable, &Some("env_pr".to_string()));
        } else {
            panic!("Expected Extract command");
        }
    }
}
