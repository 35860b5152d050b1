//! Cost report generation.
//!
//! This module renders aggregated rows into a markdown-style table followed
//! by a short narrative: the largest bucket, subtotals for the canonical
//! categories and a fixed observation about aircraft costs.

use crate::error::ReportInputError;
use crate::models::{
    AggregatedRow, CategoryTotal, CostCategory, CostReport, ReportDocument, RowsInput,
};
use anyhow::Result;
use std::cmp::Ordering;

/// Returned when serialized rows cannot be parsed.
pub const MALFORMED_INPUT_TEXT: &str = "Could not parse aggregated cost data.";

/// Returned when there are no rows to report.
pub const EMPTY_INPUT_TEXT: &str = "No cost data available.";

const TABLE_HEADER: &str = "Region | Category | Total Cost ($) | Hours";
const TABLE_SEPARATOR: &str = "---|---|---|---";
const NARRATIVE_INTRO: &str = "Wildfire cost summary:";
const AIRCRAFT_OBSERVATION: &str = "- Aircraft is the dominant cost driver across regions, \
with personnel generally higher than equipment.";

/// Resolve reporter input into rows.
pub fn resolve_rows(input: RowsInput) -> Result<Vec<AggregatedRow>, ReportInputError> {
    let rows = match input {
        RowsInput::Rows(rows) => rows,
        RowsInput::Serialized(text) => serde_json::from_str::<Vec<AggregatedRow>>(&text)
            .map_err(|e| ReportInputError::MalformedInput(e.to_string()))?,
    };

    if rows.is_empty() {
        return Err(ReportInputError::EmptyInput);
    }

    Ok(rows)
}

/// Build a report from rows.
///
/// Rows are put in canonical order first, so any permutation of the same
/// rows yields the same report.
pub fn build_cost_report(
    rows: &[AggregatedRow],
    categories: &[CostCategory],
) -> Result<CostReport, ReportInputError> {
    let mut ordered = rows.to_vec();
    ordered.sort_by(canonical_order);

    let Some(top_bucket) = ordered.first().cloned() else {
        return Err(ReportInputError::EmptyInput);
    };

    let category_totals: Vec<CategoryTotal> = categories
        .iter()
        .map(|category| CategoryTotal {
            category: *category,
            total_cost: ordered
                .iter()
                .filter(|r| category.matches(r.category.as_deref()))
                .map(|r| r.total_cost)
                .sum(),
        })
        .collect();

    let table = render_table(&ordered);
    let narrative = render_narrative(&top_bucket, &category_totals);

    Ok(CostReport {
        rows: ordered,
        top_bucket,
        category_totals,
        table,
        narrative,
    })
}

/// Descending total cost, then region, category and hours.
fn canonical_order(a: &AggregatedRow, b: &AggregatedRow) -> Ordering {
    b.total_cost
        .total_cmp(&a.total_cost)
        .then_with(|| a.region.cmp(&b.region))
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.total_hours.total_cmp(&b.total_hours))
}

fn render_table(rows: &[AggregatedRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(TABLE_HEADER.to_string());
    lines.push(TABLE_SEPARATOR.to_string());

    for row in rows {
        lines.push(format!(
            "{} | {} | {} | {:.1}",
            row.region_label(),
            row.category_label(),
            format_amount(row.total_cost, 2),
            row.total_hours
        ));
    }

    lines.join("\n")
}

fn render_narrative(top: &AggregatedRow, totals: &[CategoryTotal]) -> String {
    let mut lines = vec![
        NARRATIVE_INTRO.to_string(),
        String::new(),
        "Key insights:".to_string(),
        format!(
            "- Largest single bucket: {} / {} at ${}.",
            top.region_label(),
            top.category_label(),
            format_amount(top.total_cost, 2)
        ),
    ];

    if !totals.is_empty() {
        let parts: Vec<String> = totals
            .iter()
            .map(|t| format!("{} (${})", t.category, format_amount(t.total_cost, 2)))
            .collect();
        lines.push(format!("- By category: {}.", parts.join(", ")));
    }

    lines.push(AIRCRAFT_OBSERVATION.to_string());
    lines.join("\n")
}

/// Format a number with thousands separators and fixed decimals.
pub fn format_amount(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let is_zero = formatted.chars().all(|c| c == '0' || c == '.');
    let mut out = String::new();
    if value < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Generate the JSON output document.
pub fn generate_json_report(document: &ReportDocument) -> Result<String> {
    serde_json::to_string_pretty(document).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportMetadata;
    use chrono::Utc;

    fn south_aircraft() -> Vec<AggregatedRow> {
        vec![AggregatedRow::new("South", "aircraft", 150.0, 7.0)]
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0, 2), "0.00");
        assert_eq!(format_amount(150.0, 2), "150.00");
        assert_eq!(format_amount(1234.5, 2), "1,234.50");
        assert_eq!(format_amount(176_870.514, 2), "176,870.51");
        assert_eq!(format_amount(1_234_567.0, 2), "1,234,567.00");
        assert_eq!(format_amount(-9876.543, 2), "-9,876.54");
        assert_eq!(format_amount(-0.001, 2), "0.00");
        assert_eq!(format_amount(999.0, 0), "999");
    }

    #[test]
    fn test_resolve_rows() {
        assert_eq!(
            resolve_rows(RowsInput::Rows(vec![])),
            Err(ReportInputError::EmptyInput)
        );
        assert_eq!(resolve_rows("[]".into()), Err(ReportInputError::EmptyInput));
        assert!(matches!(
            resolve_rows("not json".into()),
            Err(ReportInputError::MalformedInput(_))
        ));

        let rows = resolve_rows(
            r#"[{"region":"South","category":"aircraft","total_cost":150.0,"hours":7.0}]"#.into(),
        )
        .unwrap();
        assert_eq!(rows, south_aircraft());
    }

    #[test]
    fn test_build_cost_report_single_row() {
        let report = build_cost_report(&south_aircraft(), &CostCategory::CANONICAL).unwrap();

        assert_eq!(
            report.table,
            "Region | Category | Total Cost ($) | Hours\n---|---|---|---\nSouth | aircraft | 150.00 | 7.0"
        );
        assert!(report
            .narrative
            .contains("Largest single bucket: South / aircraft at $150.00."));
        assert!(report
            .narrative
            .contains("Aircraft ($150.00), Personnel ($0.00), Equipment ($0.00)"));
        assert!(report.narrative.contains("Aircraft is the dominant cost driver"));
        assert_eq!(report.text(), format!("{}\n\n{}", report.table, report.narrative));
    }

    #[test]
    fn test_build_cost_report_is_order_independent() {
        let rows = vec![
            AggregatedRow::new("Central", "aircraft", 161_923.6, 102.7),
            AggregatedRow::new("Central", "personnel", 97_266.43, 0.0),
            AggregatedRow::new("North", "equipment", 30.0, 0.0),
            AggregatedRow::new("East", "equipment", 30.0, 0.0),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let a = build_cost_report(&rows, &CostCategory::CANONICAL).unwrap();
        let b = build_cost_report(&reversed, &CostCategory::CANONICAL).unwrap();

        assert_eq!(a.text(), b.text());
        assert_eq!(a.top_bucket.category_label(), "aircraft");
        assert!(a.table.contains("Central | aircraft | 161,923.60 | 102.7"));
    }

    #[test]
    fn test_build_cost_report_category_subset() {
        let rows = vec![
            AggregatedRow::new("A", "personnel", 10.0, 0.0),
            AggregatedRow::new("B", "fuel", 99.0, 0.0),
        ];
        let report = build_cost_report(&rows, &[CostCategory::Personnel]).unwrap();

        assert_eq!(report.category_totals.len(), 1);
        assert_eq!(report.category_totals[0].total_cost, 10.0);
        assert!(report.narrative.contains("- By category: Personnel ($10.00)."));
        assert_eq!(report.top_bucket.category_label(), "fuel");
    }

    #[test]
    fn test_build_cost_report_null_keys() {
        let rows = vec![AggregatedRow {
            region: None,
            category: None,
            total_cost: 5.0,
            total_hours: 0.0,
        }];
        let report = build_cost_report(&rows, &CostCategory::CANONICAL).unwrap();
        assert!(report.table.ends_with("(none) | (none) | 5.00 | 0.0"));
    }

    #[test]
    fn test_generate_json_report() {
        let document = ReportDocument {
            metadata: ReportMetadata {
                session_id: "default".to_string(),
                year: Some(2024),
                generated_at: Utc::now(),
                records_ingested: 3,
                buckets_total: 2,
                buckets_reported: 1,
            },
            summary: "table".to_string(),
            search_results: None,
        };

        let json = generate_json_report(&document).unwrap();
        assert!(json.contains("\"session_id\": \"default\""));
        assert!(json.contains("\"year\": 2024"));
        assert!(!json.contains("search_results"));
    }
}
