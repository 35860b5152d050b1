//! Report rendering.

pub mod generator;

pub use generator::{
    build_cost_report, generate_json_report, resolve_rows, EMPTY_INPUT_TEXT, MALFORMED_INPUT_TEXT,
};
