//! Error types for each pipeline stage.
//!
//! A field that is simply not found in a report is not an error; it is `None`
//! in the `FieldMap`. Explanation failures never leave the explain engine.

use thiserror::Error;

use crate::logic::pipeline::PredictionOutcome;

/// No text could be obtained from a document
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to parse PDF: {0}")]
    PdfParsing(String),

    #[error("document is not readable text: {0}")]
    Encoding(String),

    #[error("no text could be extracted from the document")]
    NoText,

    #[error("extraction worker failed: {0}")]
    Worker(String),
}

/// A prediction was requested without a complete feature record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no extracted data found; upload a report first")]
    NoExtractedData,

    #[error("extracted data is missing required features: {}", .0.join(", "))]
    MissingFeatures(Vec<&'static str>),
}

/// The classifier could not produce a result
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model not loaded")]
    ModelNotLoaded,

    #[error("feature arity mismatch: model expects {expected}, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Layout(#[from] crate::logic::features::LayoutMismatchError),

    #[error("invalid model artifact: {0}")]
    Artifact(String),

    #[error("inference failed: {0}")]
    Runtime(String),
}

/// Attribution could not be computed
#[derive(Debug, Error)]
pub enum ExplanationError {
    #[error("{strategy} is not supported by model {model}")]
    Unsupported { strategy: &'static str, model: String },

    #[error("attribution has {actual} scores, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("attribution failed: {0}")]
    Runtime(String),
}

/// The persistence collaborator failed
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("stored record is malformed: {0}")]
    Malformed(String),
}

/// Anything that stops an upload, prediction or retrieval request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// The prediction was computed and merged into the session, but not saved
    #[error("prediction computed but not saved: {source}")]
    Persistence {
        outcome: Box<PredictionOutcome>,
        #[source]
        source: PersistenceError,
    },

    /// History lookup failed
    #[error(transparent)]
    Retrieval(PersistenceError),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
