//! Model Module - Pretrained classifier behind an opaque capability
//!
//! The artifact format is picked from the file extension:
//! `.json` is a tree-ensemble export, `.onnx` runs through ONNX Runtime.

pub mod forest;
pub mod inference;
pub mod onnx;

use std::path::Path;
use std::sync::Arc;

use crate::error::InferenceError;

pub use forest::{ForestArtifact, ForestModel, TreeArtifact};
pub use inference::{
    argmax, ClassificationResult, Classifier, ClassifierAdapter, EngineStatus, POSITIVE_CLASS,
};
pub use onnx::OnnxClassifier;

/// Load a classifier artifact from disk
pub fn load_model(path: &Path) -> Result<Arc<dyn Classifier>, InferenceError> {
    if !path.exists() {
        return Err(InferenceError::Artifact(format!("Model not found: {}", path.display())));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("json") => Ok(Arc::new(ForestModel::load(path)?)),
        Some("onnx") => Ok(Arc::new(OnnxClassifier::load(path)?)),
        _ => Err(InferenceError::Artifact(format!(
            "unsupported model format: {}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("model.json");
        std::fs::write(&json, serde_json::to_string(&forest::tests::sample_artifact()).unwrap()).unwrap();
        let model = load_model(&json).unwrap();
        assert_eq!(model.name(), "random_forest");

        let graph = dir.path().join("model.onnx");
        std::fs::write(&graph, onnx::tests::linear_model_bytes()).unwrap();
        assert_eq!(load_model(&graph).unwrap().name(), "onnx");

        let pickle = dir.path().join("model.pkl");
        std::fs::write(&pickle, b"\x80\x04").unwrap();
        assert!(matches!(load_model(&pickle), Err(InferenceError::Artifact(_))));
    }

    #[test]
    fn test_missing_model_file() {
        assert!(matches!(
            load_model(Path::new("/nonexistent/model.json")),
            Err(InferenceError::Artifact(_))
        ));
    }
}
