//! ONNX Runtime classifier.
//!
//! Expects a classifier graph with a single float input of shape
//! `[batch, n_features]`, an optional int64 `label` output and a float
//! probabilities output of shape `[batch, n_classes]` (exported without a
//! zipmap). Importances and attribution are not available from the graph.

use std::path::Path;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::inference::Classifier;
use crate::error::InferenceError;
use crate::logic::features::FEATURE_COUNT;

pub struct OnnxClassifier {
    /// `Session::run` needs exclusive access
    session: Mutex<Session>,
    label_output: Option<String>,
    proba_output: String,
    arity: usize,
}

impl OnnxClassifier {
    /// Load ONNX model from file
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        log::info!("Loading ONNX model from: {}", path.display());

        if !path.exists() {
            return Err(InferenceError::Artifact(format!("Model not found: {}", path.display())));
        }

        let session = Session::builder()
            .map_err(|e| InferenceError::Artifact(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Artifact(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| InferenceError::Artifact(format!("Failed to load model: {}", e)))?;

        let names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let label_output = names.iter().find(|n| n.contains("label")).cloned();
        let proba_output = names
            .iter()
            .find(|n| n.contains("prob"))
            .or_else(|| names.iter().find(|n| Some(*n) != label_output.as_ref()))
            .cloned()
            .ok_or_else(|| InferenceError::Artifact(format!("no probabilities output in {:?}", names)))?;

        log::info!(
            "ONNX model loaded successfully (label: {:?}, probabilities: {})",
            label_output,
            proba_output
        );

        Ok(Self {
            session: Mutex::new(session),
            label_output,
            proba_output,
            arity: FEATURE_COUNT,
        })
    }

    /// Run the graph once; returns the label output (if any) and probabilities
    fn run(&self, x: &[f64]) -> Result<(Option<i64>, Vec<f64>), InferenceError> {
        if x.len() != self.arity {
            return Err(InferenceError::ArityMismatch {
                expected: self.arity,
                actual: x.len(),
            });
        }

        let input_array = Array2::<f32>::from_shape_vec(
            (1, x.len()),
            x.iter().map(|v| *v as f32).collect(),
        )
        .map_err(|e| InferenceError::Runtime(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError::Runtime(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Runtime(format!("Inference failed: {}", e)))?;

        let proba_value = outputs
            .get(self.proba_output.as_str())
            .ok_or_else(|| InferenceError::Runtime("No probabilities output".to_string()))?;
        let (_, proba) = proba_value
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Runtime(format!("Extract error: {}", e)))?;
        let proba: Vec<f64> = proba.iter().map(|p| *p as f64).collect();

        let label = match &self.label_output {
            Some(name) => outputs
                .get(name.as_str())
                .and_then(|v| v.try_extract_tensor::<i64>().ok())
                .and_then(|(_, data)| data.first().copied()),
            None => None,
        };

        Ok((label, proba))
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn arity(&self) -> usize {
        self.arity
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.run(features).map(|(_, proba)| proba)
    }

    fn predict(&self, features: &[f64]) -> Result<usize, InferenceError> {
        self.predict_with_proba(features).map(|(class, _)| class)
    }

    fn predict_with_proba(&self, features: &[f64]) -> Result<(usize, Vec<f64>), InferenceError> {
        let (label, proba) = self.run(features)?;
        let class = match label {
            Some(label) => usize::try_from(label)
                .map_err(|_| InferenceError::Runtime(format!("negative class label {}", label)))?,
            None => super::inference::argmax(&proba)
                .ok_or_else(|| InferenceError::Runtime("empty probability vector".into()))?,
        };
        Ok((class, proba))
    }
}
