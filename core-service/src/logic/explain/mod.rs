//! Explain Module - Which measurements drove a positive prediction
//!
//! Two interchangeable strategies, chosen by configuration:
//! global importances from training, or per-sample attribution.

pub mod engine;
pub mod types;

pub use engine::{
    ExplanationEngine, ExplanationStrategy, Explainer, GlobalImportanceExplainer,
    LocalAttributionExplainer, DEFAULT_TOP_K,
};
pub use types::{Attribution, ExplanationFactors, Factor};
