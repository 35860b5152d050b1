//! Analysis stages.
//!
//! Aggregation groups raw records into buckets; compaction bounds the
//! number of buckets handed to the reporter.

pub mod aggregator;
pub mod compactor;

pub use aggregator::{aggregate_costs, total_cost};
pub use compactor::{compact_rows, DEFAULT_MAX_ROWS};
