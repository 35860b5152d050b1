//! wildfire-costs - session-scoped wildfire cost reports
//!
//! A CLI tool that aggregates wildfire cost records by region and
//! category, keeps the costliest buckets, and renders a table with a
//! short narrative summary. Stage results are remembered per session.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid input, config, I/O, etc.)

mod analysis;
mod cli;
mod config;
mod dataset;
mod error;
mod lookup;
mod models;
mod pipeline;
mod report;
mod session;
mod tools;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use error::ReportInputError;
use lookup::WebSearch;
use models::{ReportDocument, ReportMetadata};
use pipeline::CostPipeline;
use session::{InMemorySessionStore, SessionStore};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tools::{ToolCall, ToolExecutor};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Handle --list-tools early (stdout must stay pure JSON)
    if args.list_tools {
        let json = serde_json::to_string_pretty(&tools::get_tool_definitions())
            .context("Failed to serialize tool definitions")?;
        println!("{}", json);
        return Ok(());
    }

    // Load configuration before logging so `[general] verbose` applies
    let (mut config, source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("wildfire-costs v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    source.log();

    if let Err(e) = run(args, config).await {
        error!("Run failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default configuration file.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    println!("Edit it to customize the session, year, max rows, categories and search.");
    Ok(())
}

/// Initialize logging at the given level.
///
/// Logs go to stderr; stdout carries the report.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the pipeline (or a tool script) with the merged configuration.
async fn run(args: Args, mut config: Config) -> Result<()> {
    config.search.apply_env();

    let pipeline = Arc::new(CostPipeline::with_categories(
        InMemorySessionStore::new(),
        config.report.categories.clone(),
    ));
    let search = WebSearch::new(config.search.clone())?;
    if !search.is_configured() {
        debug!("Web search credentials not set");
    }

    if let Some(ref script) = args.script {
        let executor = ToolExecutor::new(
            pipeline,
            search,
            config.pipeline.year,
            config.pipeline.max_rows,
        );
        return run_script(&executor, script, &config.general.session_id).await;
    }

    let output = run_report(&args, &config, &pipeline, &search).await?;

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path))?;
            info!("Report saved to: {}", path);
        }
        None => println!("{}", output),
    }

    Ok(())
}

/// Load, aggregate, compact and render one report.
async fn run_report(
    args: &Args,
    config: &Config,
    pipeline: &CostPipeline,
    search: &WebSearch,
) -> Result<String> {
    let session_id = config.general.session_id.as_str();

    let records = match args.input {
        Some(ref path) => {
            let records = dataset::load_records_file(path)?;
            pipeline.ingest_records(records.clone(), None, session_id);
            records
        }
        None => pipeline.load_mock_costs(config.pipeline.year, session_id),
    };

    let aggregated = pipeline.aggregate(&records, session_id);
    let rows = if config.pipeline.compact {
        pipeline.compact(&aggregated, config.pipeline.max_rows, session_id)
    } else {
        aggregated.clone()
    };

    let summary = match pipeline.render_report(rows.clone(), session_id) {
        Ok(report) => report.text(),
        Err(ReportInputError::EmptyInput) => {
            warn!("No records to report (session_id={})", session_id);
            report::EMPTY_INPUT_TEXT.to_string()
        }
        Err(ReportInputError::MalformedInput(reason)) => {
            error!("Failed to render report: {}", reason);
            report::MALFORMED_INPUT_TEXT.to_string()
        }
    };

    let search_results = match args.search {
        Some(ref query) => Some(search.search(pipeline, query, session_id).await),
        None => None,
    };

    let output = match args.format {
        OutputFormat::Markdown => match search_results {
            Some(results) => format!("{}\n\n{}", summary, results),
            None => summary,
        },
        OutputFormat::Json => {
            let document = ReportDocument {
                metadata: ReportMetadata {
                    session_id: session_id.to_string(),
                    year: pipeline.session(session_id).last_year,
                    generated_at: Utc::now(),
                    records_ingested: records.len(),
                    buckets_total: aggregated.len(),
                    buckets_reported: rows.len(),
                },
                summary,
                search_results,
            };
            report::generate_json_report(&document)?
        }
    };

    Ok(output)
}

/// Replay a JSON-lines file of tool calls, printing each result.
///
/// Blank lines and lines starting with `#` are skipped. A call without a
/// `session_id` argument runs in the configured session.
async fn run_script(
    executor: &ToolExecutor,
    path: &std::path::Path,
    session_id: &str,
) -> Result<()> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open script: {}", path.display()))?;

    let mut failures = 0;
    for (index, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read script: {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut call: ToolCall = serde_json::from_str(line)
            .with_context(|| format!("Invalid tool call on line {}", index + 1))?;
        if let Some(args) = call.function.arguments.as_object_mut() {
            args.entry("session_id")
                .or_insert_with(|| serde_json::Value::String(session_id.to_string()));
        } else if call.function.arguments.is_null() {
            call.function.arguments = serde_json::json!({ "session_id": session_id });
        }

        info!("Line {}: {}", index + 1, call.function.name);
        let result = executor.execute(&call).await;

        if result.success {
            println!("{}", result.output);
        } else {
            failures += 1;
            let message = result.error.unwrap_or_default();
            warn!("Tool {} failed: {}", call.function.name, message);
            println!("Error: {}", message);
        }
    }

    let store = executor.pipeline().store();
    info!(
        "Script finished (failed_calls={}, sessions={})",
        failures,
        store.len()
    );
    debug!("Sessions: {:?}", store.session_ids());
    Ok(())
}

/// Where the configuration came from.
enum ConfigSource {
    Explicit(PathBuf),
    DefaultFile,
    Defaults,
    Fallback(anyhow::Error),
}

impl ConfigSource {
    fn log(&self) {
        match self {
            ConfigSource::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::DefaultFile => {
                info!("Loaded default config from {}", CONFIG_FILE_NAME)
            }
            ConfigSource::Defaults => debug!("No config file found, using defaults"),
            ConfigSource::Fallback(e) => warn!("Failed to load config: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::Explicit(config_path.clone())));
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::DefaultFile)),
        Ok(None) => Ok((Config::default(), ConfigSource::Defaults)),
        Err(e) => Ok((Config::default(), ConfigSource::Fallback(e))),
    }
}
