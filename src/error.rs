//! Error types for the cost pipeline.
//!
//! Stage failures that reach the caller are [`PipelineError`]s. Reporter
//! input problems are [`ReportInputError`]s and never leave the reporter:
//! they are turned into fixed diagnostic text by the pipeline.

use thiserror::Error;

/// Failures returned to the immediate caller of a pipeline stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A record field could not be interpreted as a number.
    #[error("record {index}: field `{field}` is not a non-negative number: {value}")]
    InvalidRecordField {
        index: usize,
        field: &'static str,
        value: String,
    },

    /// A record was not a JSON object.
    #[error("record {index} is not an object: {value}")]
    InvalidRecord { index: usize, value: String },

    /// A stage was asked to read its input from the session, but the
    /// session holds nothing for the prior stage.
    #[error("no {stage} stored yet in session `{session_id}`")]
    MissingStageInput {
        stage: &'static str,
        session_id: String,
    },
}

/// Reporter input problems, recovered locally into fixed text.
#[derive(Debug, Error, PartialEq)]
pub enum ReportInputError {
    #[error("malformed aggregated input: {0}")]
    MalformedInput(String),

    #[error("no rows to report")]
    EmptyInput,
}
