//! Features Module - Feature layout and preparation
//!
//! Turns extracted fields into the exact ordered vector the classifier expects.

pub mod layout;
pub mod prepare;
pub mod vector;

// Re-export common types
pub use layout::{
    feature_index, feature_name, LayoutInfo, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT,
};
pub use prepare::{prepare_features, project_columns, PreparedFeatures};
pub use vector::FeatureVector;
