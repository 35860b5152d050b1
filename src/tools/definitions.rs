//! JSON-schema definitions of the pipeline tools.

use super::{FunctionDefinition, ToolDefinition};
use serde_json::{json, Value};

fn tool(name: &str, description: &str, parameters: Value) -> ToolDefinition {
    ToolDefinition {
        tool_type: "function".to_string(),
        function: FunctionDefinition {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        },
    }
}

fn session_property() -> Value {
    json!({
        "type": "string",
        "description": "Session identifier scoping stored results (default: \"default\")"
    })
}

fn rows_schema() -> Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "region": { "type": "string" },
                "category": { "type": "string" },
                "total_cost": { "type": "number" },
                "hours": { "type": "number" }
            }
        }
    })
}

/// Get the tool definitions.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "load_mock_wildfire_costs",
            "Load the synthetic wildfire cost dataset for a year and remember it in the session.",
            json!({
                "type": "object",
                "properties": {
                    "year": {
                        "type": "integer",
                        "description": "Dataset year (default: 2024)"
                    },
                    "session_id": session_property()
                },
                "required": []
            }),
        ),
        tool(
            "aggregate_costs",
            "Sum cost and hours per (region, category). Without records, aggregates the records last loaded in the session.",
            json!({
                "type": "object",
                "properties": {
                    "records": {
                        "type": "array",
                        "description": "Records with region, category, cost and hours",
                        "items": {
                            "type": "object",
                            "properties": {
                                "region": { "type": "string" },
                                "category": { "type": "string" },
                                "cost": { "type": "number" },
                                "hours": { "type": "number" }
                            }
                        }
                    },
                    "session_id": session_property()
                },
                "required": []
            }),
        ),
        tool(
            "compact_aggregated_costs",
            "Keep only the costliest buckets. Without rows, compacts the session's last aggregation.",
            json!({
                "type": "object",
                "properties": {
                    "aggregated": rows_schema(),
                    "max_rows": {
                        "type": "integer",
                        "description": "Number of buckets to keep (default: 6)"
                    },
                    "session_id": session_property()
                },
                "required": []
            }),
        ),
        tool(
            "build_cost_table",
            "Render aggregated rows as a table with a narrative summary. Accepts rows or their JSON text; without rows, uses the session's last compacted or aggregated rows.",
            json!({
                "type": "object",
                "properties": {
                    "aggregated": rows_schema(),
                    "session_id": session_property()
                },
                "required": []
            }),
        ),
        tool(
            "get_last_summary",
            "Return the last cost summary built in this session.",
            json!({
                "type": "object",
                "properties": {
                    "session_id": session_property()
                },
                "required": []
            }),
        ),
        tool(
            "web_search",
            "Search the web and return the top results as a bulleted list.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Free-text search query"
                    },
                    "session_id": session_property()
                },
                "required": ["query"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definitions() {
        let tools = get_tool_definitions();
        assert_eq!(tools.len(), 6);

        let names: Vec<_> = tools.iter().map(|t| t.function.name.as_str()).collect();
        assert!(names.contains(&"aggregate_costs"));
        assert!(names.contains(&"compact_aggregated_costs"));
        assert!(names.contains(&"build_cost_table"));
        assert!(names.contains(&"get_last_summary"));

        for tool in &tools {
            assert_eq!(tool.tool_type, "function");
            assert!(tool.function.parameters["properties"]["session_id"].is_object());
        }
    }

    #[test]
    fn test_definitions_serialize() {
        let json = serde_json::to_string(&get_tool_definitions()).unwrap();
        assert!(json.contains("\"type\":\"function\""));
        assert!(json.contains("\"required\":[\"query\"]"));
    }
}
