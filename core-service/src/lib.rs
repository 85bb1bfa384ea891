//! Diabetes risk core: report extraction, classification and explanation.

pub mod constants;
pub mod error;
pub mod logic;

pub use error::{
    ExplanationError, ExtractionError, InferenceError, PersistenceError, PipelineError,
    ValidationError,
};
pub use logic::config::PipelineConfig;
pub use logic::explain::{ExplanationFactors, ExplanationStrategy};
pub use logic::extract::FieldMap;
pub use logic::model::{ClassificationResult, ClassifierAdapter, EngineStatus};
pub use logic::persistence::{MemoryStore, PredictionStore, StoredPrediction};
pub use logic::pipeline::{PredictionOutcome, RiskPipeline};
