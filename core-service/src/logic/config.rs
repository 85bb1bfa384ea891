use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::logic::explain::ExplanationStrategy;

/// Pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Classifier artifact, `.json` forest or `.onnx`
    pub model_path: PathBuf,
    pub explanation_strategy: ExplanationStrategy,
    /// Maximum number of factors in an explanation
    pub top_factors: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(constants::DEFAULT_MODEL_PATH),
            explanation_strategy: ExplanationStrategy::default(),
            top_factors: constants::DEFAULT_TOP_FACTORS,
        }
    }
}

impl PipelineConfig {
    /// Read `MODEL_PATH`, `EXPLANATION_STRATEGY` and `TOP_FACTORS`
    pub fn from_env() -> Self {
        Self {
            model_path: PathBuf::from(constants::get_model_path()),
            explanation_strategy: constants::get_explanation_strategy(),
            top_factors: constants::get_top_factors(),
        }
    }
}
