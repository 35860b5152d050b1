//! Named pipeline operations with JSON arguments.
//!
//! This module exposes the pipeline stages as tools: each call names an
//! operation and passes loosely typed JSON arguments. Every tool takes an
//! optional `session_id` that defaults to `"default"`.

mod definitions;

pub use definitions::get_tool_definitions;

use crate::lookup::WebSearch;
use crate::models::{AggregatedRow, RowsInput};
use crate::pipeline::CostPipeline;
use crate::session::{InMemorySessionStore, SessionStore, DEFAULT_SESSION_ID};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Tool definition in function-calling format.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// A tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[cfg(test)]
impl ToolCall {
    pub fn new(name: &str, arguments: Value) -> Self {
        Self {
            function: FunctionCall {
                name: name.to_string(),
                arguments,
            },
        }
    }
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message),
        }
    }

    fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(output) => Self::success(output),
            Err(e) => Self::error(format!("Failed to serialize output: {}", e)),
        }
    }
}

/// Dispatches tool calls onto the pipeline and the lookup service.
pub struct ToolExecutor<S: SessionStore = InMemorySessionStore> {
    pipeline: Arc<CostPipeline<S>>,
    search: WebSearch,
    default_year: i32,
    default_max_rows: usize,
}

impl<S: SessionStore> ToolExecutor<S> {
    pub fn new(
        pipeline: Arc<CostPipeline<S>>,
        search: WebSearch,
        default_year: i32,
        default_max_rows: usize,
    ) -> Self {
        Self {
            pipeline,
            search,
            default_year,
            default_max_rows,
        }
    }

    pub fn pipeline(&self) -> &CostPipeline<S> {
        &self.pipeline
    }

    /// Execute a tool call and return the result.
    pub async fn execute(&self, tool_call: &ToolCall) -> ToolResult {
        let name = &tool_call.function.name;
        let args = &tool_call.function.arguments;

        debug!("Executing tool: {} with args: {:?}", name, args);

        match name.as_str() {
            "load_mock_wildfire_costs" => self.load_mock_wildfire_costs(args),
            "aggregate_costs" => self.aggregate_costs(args),
            "compact_aggregated_costs" => self.compact_aggregated_costs(args),
            "build_cost_table" => self.build_cost_table(args),
            "get_last_summary" => {
                ToolResult::success(self.pipeline.get_last_report(session_id(args)))
            }
            "web_search" => self.web_search(args).await,
            _ => ToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    fn load_mock_wildfire_costs(&self, args: &Value) -> ToolResult {
        let year = match args.get("year") {
            None | Some(Value::Null) => self.default_year,
            Some(v) => match v.as_i64().and_then(|y| i32::try_from(y).ok()) {
                Some(year) => year,
                None => return ToolResult::error(format!("Invalid year: {}", v)),
            },
        };

        let records = self.pipeline.load_mock_costs(year, session_id(args));
        ToolResult::json(&records)
    }

    fn aggregate_costs(&self, args: &Value) -> ToolResult {
        let session_id = session_id(args);

        let result = match json_array(args.get("records")) {
            Ok(Some(values)) => self.pipeline.aggregate_values(&values, session_id),
            Ok(None) => self.pipeline.aggregate_from_session(session_id),
            Err(message) => return ToolResult::error(format!("records: {}", message)),
        };

        match result {
            Ok(rows) => ToolResult::json(&rows),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }

    fn compact_aggregated_costs(&self, args: &Value) -> ToolResult {
        let session_id = session_id(args);

        let max_rows = match args.get("max_rows") {
            None | Some(Value::Null) => self.default_max_rows,
            Some(v) => match v.as_u64().and_then(|n| usize::try_from(n).ok()) {
                Some(n) => n,
                None => return ToolResult::error(format!("Invalid max_rows: {}", v)),
            },
        };

        let result = match json_array(args.get("aggregated")) {
            Ok(Some(values)) => {
                match serde_json::from_value::<Vec<AggregatedRow>>(Value::Array(values)) {
                    Ok(rows) => Ok(self.pipeline.compact(&rows, max_rows, session_id)),
                    Err(e) => return ToolResult::error(format!("aggregated: {}", e)),
                }
            }
            Ok(None) => self.pipeline.compact_from_session(max_rows, session_id),
            Err(message) => return ToolResult::error(format!("aggregated: {}", message)),
        };

        match result {
            Ok(rows) => ToolResult::json(&rows),
            Err(e) => ToolResult::error(e.to_string()),
        }
    }

    fn build_cost_table(&self, args: &Value) -> ToolResult {
        let session_id = session_id(args);

        let input = match args.get("aggregated") {
            None | Some(Value::Null) => {
                return match self.pipeline.render_from_session(session_id) {
                    Ok(text) => ToolResult::success(text),
                    Err(e) => ToolResult::error(e.to_string()),
                };
            }
            Some(Value::String(text)) => RowsInput::Serialized(text.clone()),
            Some(other) => RowsInput::Serialized(other.to_string()),
        };

        ToolResult::success(self.pipeline.render(input, session_id))
    }

    async fn web_search(&self, args: &Value) -> ToolResult {
        let query = match args.get("query").and_then(|v| v.as_str()) {
            Some(q) if !q.trim().is_empty() => q,
            _ => return ToolResult::error("Missing required parameter: query".to_string()),
        };

        let text = self
            .search
            .search(&*self.pipeline, query, session_id(args))
            .await;
        ToolResult::success(text)
    }
}

fn session_id(args: &Value) -> &str {
    args.get("session_id")
        .and_then(|v| v.as_str())
        .unwrap_or(DEFAULT_SESSION_ID)
}

/// Read an optional array argument, given inline or as a JSON string.
fn json_array(value: Option<&Value>) -> Result<Option<Vec<Value>>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.clone())),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => Ok(Some(items)),
            Ok(_) => Err("expected a JSON array".to_string()),
            Err(e) => Err(format!("invalid JSON: {}", e)),
        },
        Some(_) => Err("expected an array".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::lookup::NOT_CONFIGURED_TEXT;
    use crate::report::{EMPTY_INPUT_TEXT, MALFORMED_INPUT_TEXT};
    use crate::session::NO_PREVIOUS_SUMMARY_TEXT;
    use serde_json::json;

    fn executor() -> ToolExecutor {
        let search = WebSearch::new(SearchConfig::default()).unwrap();
        ToolExecutor::new(Arc::new(CostPipeline::in_memory()), search, 2024, 6)
    }

    fn run(executor: &ToolExecutor, name: &str, args: Value) -> ToolResult {
        tokio_test::block_on(executor.execute(&ToolCall::new(name, args)))
    }

    #[test]
    fn test_full_tool_sequence_with_implicit_inputs() {
        let executor = executor();

        let loaded = run(&executor, "load_mock_wildfire_costs", json!({"year": 2022}));
        assert!(loaded.success);

        let aggregated = run(&executor, "aggregate_costs", json!({}));
        assert!(aggregated.success);
        let rows: Vec<AggregatedRow> = serde_json::from_str(&aggregated.output).unwrap();
        assert_eq!(rows.len(), 12);

        let compacted = run(&executor, "compact_aggregated_costs", json!({"max_rows": 3}));
        let rows: Vec<AggregatedRow> = serde_json::from_str(&compacted.output).unwrap();
        assert_eq!(rows.len(), 3);

        let table = run(&executor, "build_cost_table", json!({}));
        assert!(table.success);
        assert_eq!(table.output.lines().take_while(|l| !l.is_empty()).count(), 5);

        let last = run(&executor, "get_last_summary", json!({}));
        assert_eq!(last.output, table.output);

        let memory = executor.pipeline().session(DEFAULT_SESSION_ID);
        assert_eq!(memory.last_year, Some(2022));
    }

    #[test]
    fn test_aggregate_with_inline_records() {
        let executor = executor();
        let result = run(
            &executor,
            "aggregate_costs",
            json!({
                "session_id": "s1",
                "records": [
                    {"region": "South", "category": "aircraft", "cost": 100.0, "hours": 5.0},
                    {"region": "South", "category": "aircraft", "cost": 50.0, "hours": 2.0},
                    {"region": "North", "category": "personnel", "cost": 30.0}
                ]
            }),
        );

        let rows: Vec<AggregatedRow> = serde_json::from_str(&result.output).unwrap();
        assert_eq!(rows[0], AggregatedRow::new("South", "aircraft", 150.0, 7.0));
        assert!(executor.pipeline().store().get(DEFAULT_SESSION_ID).is_none());
    }

    #[test]
    fn test_aggregate_invalid_field_is_error() {
        let executor = executor();
        let result = run(
            &executor,
            "aggregate_costs",
            json!({"records": [{"region": "South", "cost": {"amount": 1}}]}),
        );

        assert!(!result.success);
        assert!(result.error.unwrap().contains("field `cost`"));
    }

    #[test]
    fn test_missing_stage_input_is_error() {
        let executor = executor();

        let result = run(&executor, "compact_aggregated_costs", json!({}));
        assert!(!result.success);
        assert!(result.error.unwrap().contains("no aggregated costs stored"));

        let result = run(&executor, "aggregate_costs", json!({"records": 42}));
        assert!(!result.success);
    }

    #[test]
    fn test_build_cost_table_inputs() {
        let executor = executor();

        let empty = run(&executor, "build_cost_table", json!({"aggregated": []}));
        assert_eq!(empty.output, EMPTY_INPUT_TEXT);

        let malformed = run(&executor, "build_cost_table", json!({"aggregated": "oops"}));
        assert_eq!(malformed.output, MALFORMED_INPUT_TEXT);

        let last = run(&executor, "get_last_summary", json!({}));
        assert_eq!(last.output, NO_PREVIOUS_SUMMARY_TEXT);

        let serialized = json!([
            {"region": "South", "category": "aircraft", "total_cost": 150.0, "hours": 7.0}
        ])
        .to_string();
        let table = run(&executor, "build_cost_table", json!({"aggregated": serialized}));
        assert!(table.output.contains("South | aircraft | 150.00 | 7.0"));
    }

    #[test]
    fn test_compact_argument_validation() {
        let executor = executor();
        let result = run(
            &executor,
            "compact_aggregated_costs",
            json!({"aggregated": [], "max_rows": -1}),
        );
        assert!(!result.success);

        let result = run(
            &executor,
            "compact_aggregated_costs",
            json!({"aggregated": [{"region": "A", "category": "aircraft", "total_cost": "x"}]}),
        );
        assert!(!result.success);
    }

    #[test]
    fn test_web_search_tool() {
        let executor = executor();

        let missing = run(&executor, "web_search", json!({}));
        assert!(!missing.success);

        let result = run(&executor, "web_search", json!({"query": "wildfire costs"}));
        assert!(result.success);
        assert_eq!(result.output, NOT_CONFIGURED_TEXT);
    }

    #[test]
    fn test_unknown_tool() {
        let result = run(&executor(), "delete_everything", json!({}));
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Unknown tool: delete_everything"));
    }

    #[test]
    fn test_tool_call_parsing() {
        let call: ToolCall = serde_json::from_str(
            r#"{"function": {"name": "get_last_summary", "arguments": {"session_id": "x"}}}"#,
        )
        .unwrap();
        assert_eq!(call.function.name, "get_last_summary");
        assert_eq!(session_id(&call.function.arguments), "x");

        let bare: ToolCall =
            serde_json::from_str(r#"{"function": {"name": "get_last_summary"}}"#).unwrap();
        assert_eq!(session_id(&bare.function.arguments), DEFAULT_SESSION_ID);
    }
}
