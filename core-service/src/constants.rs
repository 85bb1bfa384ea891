//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.

use crate::logic::explain::ExplanationStrategy;

/// Default model artifact location
pub const DEFAULT_MODEL_PATH: &str = "saved_models/model.json";

/// Default number of explanation factors
pub const DEFAULT_TOP_FACTORS: usize = 3;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Diabetes Risk";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get model artifact path from environment or use default
pub fn get_model_path() -> String {
    std::env::var("MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.to_string())
}

/// Get explanation strategy from environment or use default
pub fn get_explanation_strategy() -> ExplanationStrategy {
    match std::env::var("EXPLANATION_STRATEGY") {
        Ok(s) => s.parse().unwrap_or_else(|e| {
            log::warn!("{}; using {}", e, ExplanationStrategy::default().as_str());
            ExplanationStrategy::default()
        }),
        Err(_) => ExplanationStrategy::default(),
    }
}

/// Get number of explanation factors from environment or use default
pub fn get_top_factors() -> usize {
    std::env::var("TOP_FACTORS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TOP_FACTORS)
}
