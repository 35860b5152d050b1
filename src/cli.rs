//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// wildfire-costs - session-scoped wildfire cost reports
///
/// Aggregates cost records by region and category, keeps the costliest
/// buckets, and renders a table with a short narrative summary.
///
/// Examples:
///   wildfire-costs --year 2024
///   wildfire-costs --input costs.json --max-rows 4 --format json
///   wildfire-costs --search "wildfire suppression costs 2024"
///   wildfire-costs --script calls.jsonl --session review
///   wildfire-costs --list-tools
///   wildfire-costs --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// JSON file holding an array of cost records
    ///
    /// Each record has region, category, cost and hours. Without this flag
    /// the built-in synthetic dataset is used.
    #[arg(short, long, value_name = "FILE", conflicts_with = "year")]
    pub input: Option<PathBuf>,

    /// Year of the synthetic dataset
    #[arg(short, long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Session identifier scoping stored results
    #[arg(short, long, value_name = "ID", env = "WILDFIRE_COSTS_SESSION")]
    pub session: Option<String>,

    /// Number of costliest buckets kept in the report
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub max_rows: Option<usize>,

    /// Report every bucket instead of the costliest ones
    #[arg(long)]
    pub no_compact: bool,

    /// Web search query whose results are appended to the report
    ///
    /// Requires GOOGLE_SEARCH_API_KEY (or GOOGLE_API_KEY) and
    /// GOOGLE_SEARCH_CX (or GOOGLE_CSE_ID).
    #[arg(long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Web search request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub search_timeout: Option<u64>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report
    ///
    /// The report is printed to stdout when not given.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .wildfire-costs.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Replay a JSON-lines file of tool calls against one session store
    #[arg(long, value_name = "FILE", conflicts_with_all = ["input", "search"])]
    pub script: Option<PathBuf>,

    /// Print the tool definitions as JSON and exit
    #[arg(long)]
    pub list_tools: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .wildfire-costs.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown table and narrative (default)
    #[default]
    Markdown,
    /// JSON document with metadata
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config || self.list_tools {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.max_rows == Some(0) {
            return Err("Max rows must be at least 1".to_string());
        }

        if let Some(year) = self.year {
            if !(1900..=2100).contains(&year) {
                return Err(format!("Year out of range (1900-2100): {}", year));
            }
        }

        if let Some(ref session) = self.session {
            if session.is_empty() {
                return Err("Session identifier must not be empty".to_string());
            }
        }

        if let Some(ref query) = self.search {
            if query.trim().is_empty() {
                return Err("Search query must not be empty".to_string());
            }
        }

        if self.search_timeout == Some(0) {
            return Err("Search timeout must be at least 1 second".to_string());
        }

        for (flag, path) in [("--input", &self.input), ("--script", &self.script)] {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(format!("{} file does not exist: {}", flag, path.display()));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose` is the merged setting from the config file and `--verbose`;
    /// `--quiet` wins over both.
    pub fn log_level(&self, verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if verbose || self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_args() -> Args {
        Args {
            input: None,
            year: None,
            session: None,
            max_rows: None,
            no_compact: false,
            search: None,
            search_timeout: None,
            format: OutputFormat::Markdown,
            output: None,
            config: None,
            script: None,
            list_tools: false,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_defaults_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_max_rows() {
        let mut args = make_args();
        args.max_rows = Some(0);
        assert!(args.validate().is_err());

        args.max_rows = Some(1);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_input_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = make_args();
        args.input = Some(temp_dir.path().join("missing.json"));
        assert!(args.validate().is_err());

        let path = temp_dir.path().join("records.json");
        std::fs::write(&path, "[]").unwrap();
        args.input = Some(path);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_year_and_query() {
        let mut args = make_args();
        args.year = Some(1066);
        assert!(args.validate().is_err());

        args.year = Some(2024);
        args.search = Some("   ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "wildfire-costs",
            "--year",
            "2023",
            "-n",
            "4",
            "--session",
            "review",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(args.year, Some(2023));
        assert_eq!(args.max_rows, Some(4));
        assert_eq!(args.session.as_deref(), Some("review"));
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_input_conflicts_with_year() {
        let result =
            Args::try_parse_from(["wildfire-costs", "--input", "a.json", "--year", "2024"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_log_level_from_config_verbose() {
        let mut args = make_args();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
