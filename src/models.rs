//! Data models for the cost pipeline.
//!
//! This module contains the core data structures passed between the
//! pipeline stages: raw records, aggregated buckets, the canonical cost
//! categories and the rendered report.

use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Label used when a bucket key is null.
pub const NULL_KEY_LABEL: &str = "(none)";

/// One raw cost observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Geographic region name.
    pub region: Option<String>,
    /// Cost category label (open set).
    pub category: Option<String>,
    /// Cost in currency units.
    #[serde(default)]
    pub cost: f64,
    /// Usage hours, zero where not tracked.
    #[serde(default)]
    pub hours: f64,
}

impl Record {
    /// Creates a record with both keys present.
    pub fn new(region: &str, category: &str, cost: f64, hours: f64) -> Self {
        Self {
            region: Some(region.to_string()),
            category: Some(category.to_string()),
            cost,
            hours,
        }
    }

    /// Builds a record from loosely typed JSON.
    ///
    /// Missing `cost`/`hours` default to 0.0 and numeric strings are
    /// accepted. Any other value in a numeric field, including negative
    /// and non-finite numbers, is an [`PipelineError::InvalidRecordField`].
    pub fn from_value(index: usize, value: &Value) -> Result<Self, PipelineError> {
        let Some(obj) = value.as_object() else {
            return Err(PipelineError::InvalidRecord {
                index,
                value: value.to_string(),
            });
        };

        Ok(Self {
            region: key_field(obj.get("region")),
            category: key_field(obj.get("category")),
            cost: numeric_field(index, "cost", obj.get("cost"))?,
            hours: numeric_field(index, "hours", obj.get("hours"))?,
        })
    }

    /// Parses every element of a JSON array into records.
    pub fn from_values(values: &[Value]) -> Result<Vec<Self>, PipelineError> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Self::from_value(i, v))
            .collect()
    }
}

fn key_field(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

fn numeric_field(
    index: usize,
    field: &'static str,
    value: Option<&Value>,
) -> Result<f64, PipelineError> {
    let invalid = |v: &Value| PipelineError::InvalidRecordField {
        index,
        field,
        value: v.to_string(),
    };

    let number = match value {
        None => return Ok(0.0),
        Some(v @ Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(v))?,
        Some(v @ Value::String(s)) => s.trim().parse::<f64>().map_err(|_| invalid(v))?,
        Some(v) => return Err(invalid(v)),
    };

    match value {
        Some(v) if !number.is_finite() || number < 0.0 => Err(invalid(v)),
        _ => Ok(number),
    }
}

/// One (region, category) bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    /// Sum of `cost` over the bucket's records.
    #[serde(default)]
    pub total_cost: f64,
    /// Sum of `hours` over the bucket's records.
    #[serde(default, rename = "hours", alias = "total_hours")]
    pub total_hours: f64,
}

impl AggregatedRow {
    /// Creates a row with both keys present.
    #[cfg(test)]
    pub fn new(region: &str, category: &str, total_cost: f64, total_hours: f64) -> Self {
        Self {
            region: Some(region.to_string()),
            category: Some(category.to_string()),
            total_cost,
            total_hours,
        }
    }

    pub fn region_label(&self) -> &str {
        self.region.as_deref().unwrap_or(NULL_KEY_LABEL)
    }

    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(NULL_KEY_LABEL)
    }
}

/// Canonical cost categories summarized in the report narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostCategory {
    Aircraft,
    Personnel,
    Equipment,
}

impl CostCategory {
    /// All canonical categories, in narrative order.
    pub const CANONICAL: [CostCategory; 3] = [
        CostCategory::Aircraft,
        CostCategory::Personnel,
        CostCategory::Equipment,
    ];

    /// The label used in record data.
    pub fn as_str(&self) -> &'static str {
        match self {
            CostCategory::Aircraft => "aircraft",
            CostCategory::Personnel => "personnel",
            CostCategory::Equipment => "equipment",
        }
    }

    /// Whether a row's category label belongs to this category.
    pub fn matches(&self, category: Option<&str>) -> bool {
        category == Some(self.as_str())
    }
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostCategory::Aircraft => write!(f, "Aircraft"),
            CostCategory::Personnel => write!(f, "Personnel"),
            CostCategory::Equipment => write!(f, "Equipment"),
        }
    }
}

/// Reporter input: structured rows, or their serialized JSON form.
#[derive(Debug, Clone, PartialEq)]
pub enum RowsInput {
    Rows(Vec<AggregatedRow>),
    Serialized(String),
}

impl From<Vec<AggregatedRow>> for RowsInput {
    fn from(rows: Vec<AggregatedRow>) -> Self {
        RowsInput::Rows(rows)
    }
}

impl From<&[AggregatedRow]> for RowsInput {
    fn from(rows: &[AggregatedRow]) -> Self {
        RowsInput::Rows(rows.to_vec())
    }
}

impl From<String> for RowsInput {
    fn from(text: String) -> Self {
        RowsInput::Serialized(text)
    }
}

impl From<&str> for RowsInput {
    fn from(text: &str) -> Self {
        RowsInput::Serialized(text.to_string())
    }
}

/// Subtotal for one canonical category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: CostCategory,
    pub total_cost: f64,
}

/// A rendered cost report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostReport {
    /// Rows in rendering order.
    pub rows: Vec<AggregatedRow>,
    /// The single bucket with the largest total cost.
    pub top_bucket: AggregatedRow,
    /// Subtotals for the configured canonical categories.
    pub category_totals: Vec<CategoryTotal>,
    /// Tabular section.
    pub table: String,
    /// Narrative section.
    pub narrative: String,
}

impl CostReport {
    /// Table and narrative joined by a blank line.
    pub fn text(&self) -> String {
        format!("{}\n\n{}", self.table, self.narrative)
    }
}

/// Metadata attached to JSON report output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub session_id: String,
    /// Dataset year, when the records came from the synthetic dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub generated_at: DateTime<Utc>,
    pub records_ingested: usize,
    pub buckets_total: usize,
    pub buckets_reported: usize,
}

/// JSON output document of a CLI run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDocument {
    pub metadata: ReportMetadata,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<String>,
}
