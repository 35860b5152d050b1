//! Compaction of aggregated rows to the dominant cost drivers.

use crate::analysis::aggregator::sort_by_cost_desc;
use crate::models::AggregatedRow;

/// Default number of buckets kept by compaction.
pub const DEFAULT_MAX_ROWS: usize = 6;

/// Keep the `max_rows` rows with the largest total cost.
///
/// The input need not be sorted. The sort is stable, so equal totals keep
/// their relative order.
pub fn compact_rows(aggregated: &[AggregatedRow], max_rows: usize) -> Vec<AggregatedRow> {
    let mut rows = aggregated.to_vec();
    sort_by_cost_desc(&mut rows);
    rows.truncate(max_rows);
    rows
}
