//! Pipeline coordinator.
//!
//! `CostPipeline` runs the aggregation, compaction and reporting stages and
//! records each stage's output in the session store. Every read-modify-write
//! of a session happens while holding that session's lock, so concurrent
//! callers sharing a session identifier are serialized.

use crate::analysis::{aggregate_costs, compact_rows, total_cost};
use crate::dataset;
use crate::error::{PipelineError, ReportInputError};
use crate::models::{AggregatedRow, CostCategory, CostReport, Record, RowsInput};
use crate::report::{self, EMPTY_INPUT_TEXT, MALFORMED_INPUT_TEXT};
use crate::session::{
    InMemorySessionStore, SessionMemory, SessionStore, NO_PREVIOUS_SUMMARY_TEXT,
};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The session-scoped cost pipeline.
pub struct CostPipeline<S: SessionStore = InMemorySessionStore> {
    store: S,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    categories: Vec<CostCategory>,
}

impl Default for CostPipeline<InMemorySessionStore> {
    fn default() -> Self {
        Self::new(InMemorySessionStore::new())
    }
}

#[cfg(test)]
impl CostPipeline<InMemorySessionStore> {
    /// Create a pipeline backed by a process-local store.
    pub fn in_memory() -> Self {
        Self::default()
    }
}

impl<S: SessionStore> CostPipeline<S> {
    /// Create a pipeline summarizing all canonical categories.
    pub fn new(store: S) -> Self {
        Self::with_categories(store, CostCategory::CANONICAL.to_vec())
    }

    /// Create a pipeline summarizing the given categories in its reports.
    pub fn with_categories(store: S, categories: Vec<CostCategory>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
            categories,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the synthetic dataset for `year` into the session.
    pub fn load_mock_costs(&self, year: i32, session_id: &str) -> Vec<Record> {
        let records = dataset::mock_wildfire_costs(year);
        self.ingest_records(records.clone(), Some(year), session_id);

        info!(
            "Loaded mock wildfire costs for year={} (records={}, session_id={})",
            year,
            records.len(),
            session_id
        );
        records
    }

    /// Store raw records as the session's latest input.
    pub fn ingest_records(&self, records: Vec<Record>, year: Option<i32>, session_id: &str) {
        self.with_session(session_id, |memory| {
            if year.is_some() {
                memory.last_year = year;
            }
            memory.last_raw_records = Some(records);
        });
    }

    /// Aggregate records by (region, category) and store the result.
    pub fn aggregate(&self, records: &[Record], session_id: &str) -> Vec<AggregatedRow> {
        info!(
            "Aggregating costs (input_records={}, session_id={})",
            records.len(),
            session_id
        );

        let rows = aggregate_costs(records);
        self.with_session(session_id, |memory| {
            memory.last_aggregated = Some(rows.clone());
            memory.last_compacted = None;
        });

        info!(
            "Aggregation complete (groups={}, total_cost={:.2}, session_id={})",
            rows.len(),
            total_cost(&rows),
            session_id
        );
        rows
    }

    /// Aggregate loosely typed JSON records.
    ///
    /// A numeric field that cannot be coerced fails the whole call and
    /// leaves the session untouched.
    pub fn aggregate_values(
        &self,
        values: &[Value],
        session_id: &str,
    ) -> Result<Vec<AggregatedRow>, PipelineError> {
        let records = Record::from_values(values).map_err(|e| {
            error!("Rejected records (session_id={}): {}", session_id, e);
            e
        })?;
        Ok(self.aggregate(&records, session_id))
    }

    /// Aggregate the raw records stored in the session.
    pub fn aggregate_from_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<AggregatedRow>, PipelineError> {
        self.try_with_session(session_id, |memory| {
            let records = memory
                .last_raw_records
                .as_deref()
                .ok_or_else(|| missing("raw records", session_id))?;

            info!(
                "Aggregating stored records (input_records={}, session_id={})",
                records.len(),
                session_id
            );
            let rows = aggregate_costs(records);
            memory.last_aggregated = Some(rows.clone());
            memory.last_compacted = None;
            Ok(rows)
        })
    }

    /// Keep the `max_rows` costliest buckets and store the result.
    pub fn compact(
        &self,
        aggregated: &[AggregatedRow],
        max_rows: usize,
        session_id: &str,
    ) -> Vec<AggregatedRow> {
        info!(
            "Compacting aggregated costs (input_rows={}, max_rows={}, session_id={})",
            aggregated.len(),
            max_rows,
            session_id
        );

        let compacted = compact_rows(aggregated, max_rows);
        self.with_session(session_id, |memory| {
            memory.last_compacted = Some(compacted.clone());
        });

        info!(
            "Compaction complete (output_rows={}, session_id={})",
            compacted.len(),
            session_id
        );
        compacted
    }

    /// Compact the aggregated rows stored in the session.
    pub fn compact_from_session(
        &self,
        max_rows: usize,
        session_id: &str,
    ) -> Result<Vec<AggregatedRow>, PipelineError> {
        self.try_with_session(session_id, |memory| {
            let aggregated = memory
                .last_aggregated
                .as_deref()
                .ok_or_else(|| missing("aggregated costs", session_id))?;

            let compacted = compact_rows(aggregated, max_rows);
            info!(
                "Compacted stored rows (input_rows={}, output_rows={}, session_id={})",
                aggregated.len(),
                compacted.len(),
                session_id
            );
            memory.last_compacted = Some(compacted.clone());
            Ok(compacted)
        })
    }

    /// Render rows into report text and store it as the last report.
    ///
    /// Unparseable or empty input yields fixed diagnostic text and leaves
    /// the session untouched.
    pub fn render(&self, input: impl Into<RowsInput>, session_id: &str) -> String {
        match self.render_report(input, session_id) {
            Ok(report) => report.text(),
            Err(ReportInputError::MalformedInput(reason)) => {
                error!(
                    "Failed to parse aggregated input (session_id={}): {}",
                    session_id, reason
                );
                MALFORMED_INPUT_TEXT.to_string()
            }
            Err(ReportInputError::EmptyInput) => {
                warn!("Render called with empty data (session_id={})", session_id);
                EMPTY_INPUT_TEXT.to_string()
            }
        }
    }

    /// Structured form of [`render`](Self::render).
    pub fn render_report(
        &self,
        input: impl Into<RowsInput>,
        session_id: &str,
    ) -> Result<CostReport, ReportInputError> {
        let rows = report::resolve_rows(input.into())?;
        let cost_report = report::build_cost_report(&rows, &self.categories)?;
        let text = cost_report.text();

        info!(
            "Built cost table summary (rows={}, summary_chars={}, session_id={})",
            rows.len(),
            text.len(),
            session_id
        );

        self.with_session(session_id, |memory| {
            memory.last_summary = Some(text);
        });
        Ok(cost_report)
    }

    /// Render the session's compacted rows, or its aggregated rows when
    /// nothing has been compacted since the last aggregation.
    pub fn render_from_session(&self, session_id: &str) -> Result<String, PipelineError> {
        let rows = {
            let lock = self.session_lock(session_id);
            let _guard = lock.lock();
            self.store
                .get(session_id)
                .and_then(|memory| memory.last_compacted.or(memory.last_aggregated))
        }
        .ok_or_else(|| missing("aggregated costs", session_id))?;

        Ok(self.render(rows, session_id))
    }

    /// The last report rendered in this session, or a fixed sentinel.
    pub fn get_last_report(&self, session_id: &str) -> String {
        let summary = {
            let lock = self.session_lock(session_id);
            let _guard = lock.lock();
            self.store.get(session_id).and_then(|m| m.last_summary)
        };

        match summary {
            Some(text) if !text.is_empty() => {
                info!(
                    "Retrieved last summary from session memory (chars={}, session_id={})",
                    text.len(),
                    session_id
                );
                text
            }
            _ => {
                info!("No stored summary found (session_id={})", session_id);
                NO_PREVIOUS_SUMMARY_TEXT.to_string()
            }
        }
    }

    /// Record a lookup query and its formatted result.
    pub fn record_search(&self, query: &str, results: &str, session_id: &str) {
        self.with_session(session_id, |memory| {
            memory.last_search_query = Some(query.to_string());
            memory.last_search_results = Some(results.to_string());
        });
    }

    /// A copy of the session's memory, creating the session if needed.
    pub fn session(&self, session_id: &str) -> SessionMemory {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock();
        self.store.get_or_create(session_id)
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    fn with_session<T>(&self, session_id: &str, f: impl FnOnce(&mut SessionMemory) -> T) -> T {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock();

        let mut memory = self.store.get_or_create(session_id);
        let out = f(&mut memory);
        memory.updated_at = Utc::now();
        self.store.put(session_id, memory);
        out
    }

    /// Like `with_session`, but nothing is written back on error.
    fn try_with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionMemory) -> Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock();

        let mut memory = self.store.get_or_create(session_id);
        let out = f(&mut memory)?;
        memory.updated_at = Utc::now();
        self.store.put(session_id, memory);
        Ok(out)
    }
}

fn missing(stage: &'static str, session_id: &str) -> PipelineError {
    PipelineError::MissingStageInput {
        stage,
        session_id: session_id.to_string(),
    }
}
