//! Logic Module - Risk pipeline stages
//!
//! - `extract/` - Report text → clinical fields
//! - `features/` - Canonical feature layout and vector
//! - `model/` - Classifier capability (tree ensemble, ONNX)
//! - `explain/` - Top factors of a positive prediction
//! - `session/` - Per-user transient record
//! - `persistence/` - Prediction history storage

pub mod config;
pub mod explain;
pub mod extract;
pub mod features;
pub mod model;
pub mod persistence;
pub mod pipeline;
pub mod session;
