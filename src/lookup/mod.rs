//! Web search lookup.
//!
//! Queries the Google Custom Search JSON API and formats the top results as
//! a bulleted list. Successful lookups are recorded in the caller's session.
//! Failures come back as diagnostic text, never as errors.

use crate::config::SearchConfig;
use crate::pipeline::CostPipeline;
use crate::session::SessionStore;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Returned when no credentials are available.
pub const NOT_CONFIGURED_TEXT: &str = "Web search is not configured. \
Set GOOGLE_SEARCH_API_KEY (or GOOGLE_API_KEY) and GOOGLE_SEARCH_CX (or GOOGLE_CSE_ID).";

/// Returned when the search succeeds with zero items.
pub const NO_RESULTS_TEXT: &str = "No search results found.";

const RESULTS_HEADER: &str = "Top results from web search:";

/// Lookup failures.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("web search is not configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unreadable search response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One search result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Web search client.
pub struct WebSearch {
    config: SearchConfig,
    http_client: reqwest::Client,
}

impl WebSearch {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.config.api_key.as_deref(), self.config.cx.as_deref()) {
            (Some(key), Some(cx)) if !key.is_empty() && !cx.is_empty() => Some((key, cx)),
            _ => None,
        }
    }

    /// Run the query and return the raw result items.
    pub async fn fetch(&self, query: &str) -> Result<Vec<SearchItem>, LookupError> {
        let (key, cx) = self.credentials().ok_or(LookupError::NotConfigured)?;
        let num = self.config.num.to_string();
        let params = [
            ("key", key),
            ("cx", cx),
            ("q", query),
            ("num", num.as_str()),
            ("safe", "off"),
        ];

        let mut attempt = 0;
        loop {
            let result = self
                .http_client
                .get(&self.config.endpoint)
                .query(&params)
                .send()
                .await;

            let retryable = match &result {
                Ok(response) => response.status().is_server_error(),
                Err(e) => e.is_timeout() || e.is_connect(),
            };

            if retryable && attempt < self.config.retries {
                attempt += 1;
                warn!("Web search attempt {} failed, retrying", attempt);
                tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
                continue;
            }

            let response = result?;
            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(LookupError::Status { status, body });
            }

            let body = response.text().await?;
            let items = parse_response(&body)?;
            debug!("Web search returned {} items", items.len());
            return Ok(items);
        }
    }

    /// Search and record the formatted result in the session.
    pub async fn search<S: SessionStore>(
        &self,
        pipeline: &CostPipeline<S>,
        query: &str,
        session_id: &str,
    ) -> String {
        info!(
            "Calling web search (query={:?}, session_id={})",
            query, session_id
        );

        let items = match self.fetch(query).await {
            Ok(items) => items,
            Err(LookupError::NotConfigured) => {
                warn!("Web search missing credentials (session_id={})", session_id);
                return NOT_CONFIGURED_TEXT.to_string();
            }
            Err(e) => {
                error!("Error calling web search: {}", e);
                return format!("Error calling web search: {}", e);
            }
        };

        let Some(text) = format_results(&items, self.config.max_results) else {
            info!("Web search returned no items (session_id={})", session_id);
            return NO_RESULTS_TEXT.to_string();
        };

        pipeline.record_search(query, &text, session_id);
        info!(
            "Web search succeeded (results={}, session_id={})",
            items.len().min(self.config.max_results),
            session_id
        );
        text
    }
}

fn parse_response(body: &str) -> Result<Vec<SearchItem>, LookupError> {
    let response: SearchResponse = serde_json::from_str(body)?;
    Ok(response.items)
}

/// Format up to `max_results` items as a bulleted list.
pub fn format_results(items: &[SearchItem], max_results: usize) -> Option<String> {
    let bullets: Vec<String> = items
        .iter()
        .take(max_results)
        .map(|item| {
            let title = item
                .title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or("Untitled result");
            let snippet = item
                .snippet
                .as_deref()
                .unwrap_or("")
                .replace('\n', " ")
                .trim()
                .to_string();
            let link = item.link.as_deref().unwrap_or("");
            format!("- **{}** - {} ({})", title, snippet, link)
        })
        .collect();

    if bullets.is_empty() {
        return None;
    }

    Some(format!("{}\n\n{}", RESULTS_HEADER, bullets.join("\n")))
}
