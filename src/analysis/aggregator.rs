//! Cost aggregation by region and category.
//!
//! This module groups raw records into (region, category) buckets and
//! sums their cost and hours.

use crate::models::{AggregatedRow, Record};
use std::collections::HashMap;

type BucketKey = (Option<String>, Option<String>);

/// Aggregate records into one row per distinct (region, category) pair.
///
/// Rows come back sorted by descending total cost. Buckets with equal
/// totals keep the order in which their key was first seen.
pub fn aggregate_costs(records: &[Record]) -> Vec<AggregatedRow> {
    let mut index: HashMap<BucketKey, usize> = HashMap::new();
    let mut rows: Vec<AggregatedRow> = Vec::new();

    for record in records {
        let key = (record.region.clone(), record.category.clone());
        let slot = *index.entry(key).or_insert_with(|| {
            rows.push(AggregatedRow {
                region: record.region.clone(),
                category: record.category.clone(),
                total_cost: 0.0,
                total_hours: 0.0,
            });
            rows.len() - 1
        });

        rows[slot].total_cost += record.cost;
        rows[slot].total_hours += record.hours;
    }

    sort_by_cost_desc(&mut rows);
    rows
}

/// Stable sort by descending total cost.
pub fn sort_by_cost_desc(rows: &mut [AggregatedRow]) {
    rows.sort_by(|a, b| b.total_cost.total_cmp(&a.total_cost));
}

/// Sum of total cost over all rows.
pub fn total_cost(rows: &[AggregatedRow]) -> f64 {
    rows.iter().map(|r| r.total_cost).sum()
}
