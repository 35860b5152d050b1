//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.wildfire-costs.toml` files.

use crate::analysis::DEFAULT_MAX_ROWS;
use crate::dataset::DEFAULT_YEAR;
use crate::models::CostCategory;
use crate::session::DEFAULT_SESSION_ID;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".wildfire-costs.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Pipeline stage settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Web search settings.
    #[serde(default)]
    pub search: SearchConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Session identifier used when none is given.
    #[serde(default = "default_session_id")]
    pub session_id: String,

    /// Report output file. Printed to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            session_id: default_session_id(),
            output: None,
            verbose: false,
        }
    }
}

fn default_session_id() -> String {
    DEFAULT_SESSION_ID.to_string()
}

/// Pipeline stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Year of the synthetic dataset.
    #[serde(default = "default_year")]
    pub year: i32,

    /// Buckets kept by compaction.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,

    /// Run the compaction stage before rendering.
    #[serde(default = "default_true")]
    pub compact: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year: default_year(),
            max_rows: default_max_rows(),
            compact: true,
        }
    }
}

fn default_year() -> i32 {
    DEFAULT_YEAR
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

fn default_true() -> bool {
    true
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Categories given a subtotal in the narrative.
    #[serde(default = "default_categories")]
    pub categories: Vec<CostCategory>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
        }
    }
}

fn default_categories() -> Vec<CostCategory> {
    CostCategory::CANONICAL.to_vec()
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Custom Search JSON API endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Number of retries on transport errors and 5xx responses.
    #[serde(default = "default_retries")]
    pub retries: usize,

    /// Results requested from the API.
    #[serde(default = "default_num")]
    pub num: usize,

    /// Results kept in the formatted output.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// API key. Overridden by `GOOGLE_SEARCH_API_KEY` or `GOOGLE_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Search engine id. Overridden by `GOOGLE_SEARCH_CX` or `GOOGLE_CSE_ID`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cx: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            num: default_num(),
            max_results: default_max_results(),
            api_key: None,
            cx: None,
        }
    }
}

fn default_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> usize {
    1
}

fn default_num() -> usize {
    5
}

fn default_max_results() -> usize {
    3
}

impl SearchConfig {
    /// Apply credentials from the environment.
    pub fn apply_env(&mut self) {
        self.apply_credentials(
            first_env(&["GOOGLE_SEARCH_API_KEY", "GOOGLE_API_KEY"]),
            first_env(&["GOOGLE_SEARCH_CX", "GOOGLE_CSE_ID"]),
        );
    }

    fn apply_credentials(&mut self, api_key: Option<String>, cx: Option<String>) {
        if api_key.is_some() {
            self.api_key = api_key;
        }
        if cx.is_some() {
            self.cx = cx;
        }
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref session) = args.session {
            self.general.session_id = session.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(year) = args.year {
            self.pipeline.year = year;
        }
        if let Some(max_rows) = args.max_rows {
            self.pipeline.max_rows = max_rows;
        }
        if args.no_compact {
            self.pipeline.compact = false;
        }

        if let Some(timeout) = args.search_timeout {
            self.search.timeout_seconds = timeout;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
