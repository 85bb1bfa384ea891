//! Inference Engine - Classifier capability and adapter
//!
//! The model is opaque behind `Classifier`. `ClassifierAdapter` owns the
//! loaded model (or its absence) and enforces the input contract:
//! one complete, layout-compatible vector of the model's arity.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ExplanationError, InferenceError};
use crate::logic::explain::Attribution;
use crate::logic::features::FeatureVector;

/// Label of the positive (at-risk) class
pub const POSITIVE_CLASS: u8 = 1;

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// A pretrained classifier over one feature vector.
///
/// Implementations must be deterministic and safe to call concurrently.
pub trait Classifier: Send + Sync {
    /// Short identifier for logs and status
    fn name(&self) -> &str;

    /// Number of input features
    fn arity(&self) -> usize;

    /// Per-class probabilities, indexed by class label
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError>;

    /// Predicted class label
    fn predict(&self, features: &[f64]) -> Result<usize, InferenceError> {
        let proba = self.predict_proba(features)?;
        argmax(&proba).ok_or_else(|| InferenceError::Runtime("empty probability vector".into()))
    }

    /// Predicted class and per-class probabilities together.
    ///
    /// Backends that compute both in one pass should override this.
    fn predict_with_proba(&self, features: &[f64]) -> Result<(usize, Vec<f64>), InferenceError> {
        Ok((self.predict(features)?, self.predict_proba(features)?))
    }

    /// Sample-independent importance weights, one per feature
    fn feature_importances(&self) -> Option<Vec<f64>> {
        None
    }

    /// Per-sample signed contributions towards `class`
    fn attribution(&self, _features: &[f64], _class: usize) -> Result<Attribution, ExplanationError> {
        Err(ExplanationError::Unsupported {
            strategy: "local attribution",
            model: self.name().to_string(),
        })
    }
}

/// Index of the largest value; ties go to the lower index
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, v) in values.iter().enumerate() {
        match best {
            Some(b) if *v <= values[b] => {}
            _ => best = Some(i),
        }
    }
    best
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Class label plus the probability of that class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub class_label: u8,
    /// Probability of the predicted class
    pub score: f64,
    pub probabilities: Vec<f64>,
}

impl ClassificationResult {
    pub fn is_positive(&self) -> bool {
        self.class_label == POSITIVE_CLASS
    }
}

/// Engine status for health reporting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_name: String,
    pub model_path: Option<String>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub avg_latency_ms: f64,
    pub inference_count: u64,
}

struct LoadedModel {
    classifier: Arc<dyn Classifier>,
    path: Option<String>,
    loaded_at: DateTime<Utc>,
}

// ============================================================================
// ADAPTER
// ============================================================================

/// Shared, read-only handle on the loaded model
pub struct ClassifierAdapter {
    model: Option<LoadedModel>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl ClassifierAdapter {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self::with_model(Some(LoadedModel {
            classifier,
            path: None,
            loaded_at: Utc::now(),
        }))
    }

    /// Adapter with no model; every inference fails with `ModelNotLoaded`
    pub fn unloaded() -> Self {
        Self::with_model(None)
    }

    /// Load a model artifact from disk
    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        let classifier = super::load_model(path)?;
        Ok(Self::with_model(Some(LoadedModel {
            classifier,
            path: Some(path.display().to_string()),
            loaded_at: Utc::now(),
        })))
    }

    /// Load at startup; a failure is logged and leaves the adapter unloaded
    pub fn load_or_unloaded(path: &Path) -> Self {
        match Self::load(path) {
            Ok(adapter) => adapter,
            Err(e) => {
                log::error!("Failed to load model at startup from {}: {}", path.display(), e);
                Self::unloaded()
            }
        }
    }

    fn with_model(model: Option<LoadedModel>) -> Self {
        Self {
            model,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Result<&Arc<dyn Classifier>, InferenceError> {
        self.model
            .as_ref()
            .map(|m| &m.classifier)
            .ok_or(InferenceError::ModelNotLoaded)
    }

    /// Run one inference
    pub fn classify(&self, vector: &FeatureVector) -> Result<ClassificationResult, InferenceError> {
        let start_time = std::time::Instant::now();
        let model = self.model()?;

        vector.validate()?;
        if model.arity() != vector.len() {
            return Err(InferenceError::ArityMismatch {
                expected: model.arity(),
                actual: vector.len(),
            });
        }

        let (class, probabilities) = model.predict_with_proba(vector.as_slice())?;

        let score = probabilities.get(class).copied().ok_or_else(|| {
            InferenceError::Runtime(format!(
                "class {} outside probability vector of length {}",
                class,
                probabilities.len()
            ))
        })?;
        let class_label = u8::try_from(class)
            .map_err(|_| InferenceError::Runtime(format!("class label {} out of range", class)))?;

        self.latency_sum_us.fetch_add(start_time.elapsed().as_micros() as u64, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        log::debug!("{} predicted class {} (p={:.4})", model.name(), class_label, score);

        Ok(ClassificationResult {
            class_label,
            score,
            probabilities,
        })
    }

    pub fn status(&self) -> EngineStatus {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f64 / count as f64) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_loaded: self.model.is_some(),
            model_name: self
                .model
                .as_ref()
                .map(|m| m.classifier.name().to_string())
                .unwrap_or_else(|| "None".to_string()),
            model_path: self.model.as_ref().and_then(|m| m.path.clone()),
            loaded_at: self.model.as_ref().map(|m| m.loaded_at),
            avg_latency_ms: avg,
            inference_count: count,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fixed-output classifier for adapter and pipeline tests
    pub(crate) struct StubClassifier {
        pub proba: Vec<f64>,
        pub arity: usize,
    }

    impl Classifier for StubClassifier {
        fn name(&self) -> &str {
            "stub"
        }

        fn arity(&self) -> usize {
            self.arity
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, InferenceError> {
            Ok(self.proba.clone())
        }
    }

    fn vector() -> FeatureVector {
        FeatureVector::from_values([2.0, 130.0, 70.0, 20.0, 85.0, 28.5, 0.5, 33.0])
    }

    #[test]
    fn test_argmax_ties_go_low() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[0.18, 0.82]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_score_is_probability_of_predicted_class() {
        let adapter = ClassifierAdapter::new(Arc::new(StubClassifier { proba: vec![0.18, 0.82], arity: 8 }));
        let result = adapter.classify(&vector()).unwrap();
        assert_eq!(result.class_label, 1);
        assert_eq!(result.score, 0.82);
        assert!(result.is_positive());

        let adapter = ClassifierAdapter::new(Arc::new(StubClassifier { proba: vec![0.7, 0.3], arity: 8 }));
        let result = adapter.classify(&vector()).unwrap();
        assert_eq!(result.class_label, 0);
        assert_eq!(result.score, 0.7);
    }

    /// Counts probability passes
    struct CountingClassifier {
        passes: std::sync::atomic::AtomicUsize,
    }

    impl Classifier for CountingClassifier {
        fn name(&self) -> &str {
            "counting"
        }

        fn arity(&self) -> usize {
            8
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<Vec<f64>, InferenceError> {
            self.passes.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.18, 0.82])
        }

        fn predict_with_proba(&self, features: &[f64]) -> Result<(usize, Vec<f64>), InferenceError> {
            let proba = self.predict_proba(features)?;
            Ok((1, proba))
        }
    }

    #[test]
    fn test_classify_uses_single_pass() {
        let counting = Arc::new(CountingClassifier { passes: Default::default() });
        let adapter = ClassifierAdapter::new(counting.clone());

        let result = adapter.classify(&vector()).unwrap();
        assert_eq!(result.class_label, 1);
        assert_eq!(result.score, 0.82);
        assert_eq!(counting.passes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unloaded_model_fails() {
        let adapter = ClassifierAdapter::unloaded();
        assert!(matches!(adapter.classify(&vector()), Err(InferenceError::ModelNotLoaded)));
        assert!(!adapter.status().model_loaded);
    }

    #[test]
    fn test_missing_artifact_leaves_adapter_unloaded() {
        let adapter = ClassifierAdapter::load_or_unloaded(Path::new("/nonexistent/model.json"));
        assert!(!adapter.is_loaded());
    }

    #[test]
    fn test_arity_mismatch_fails() {
        let adapter = ClassifierAdapter::new(Arc::new(StubClassifier { proba: vec![0.5, 0.5], arity: 7 }));
        assert!(matches!(
            adapter.classify(&vector()),
            Err(InferenceError::ArityMismatch { expected: 7, actual: 8 })
        ));
    }

    #[test]
    fn test_stale_layout_fails() {
        let adapter = ClassifierAdapter::new(Arc::new(StubClassifier { proba: vec![0.5, 0.5], arity: 8 }));
        let mut stale = vector();
        stale.version += 1;
        assert!(matches!(adapter.classify(&stale), Err(InferenceError::Layout(_))));
    }

    #[test]
    fn test_status_counts_inferences() {
        let adapter = ClassifierAdapter::new(Arc::new(StubClassifier { proba: vec![0.5, 0.5], arity: 8 }));
        adapter.classify(&vector()).unwrap();
        adapter.classify(&vector()).unwrap();

        let status = adapter.status();
        assert!(status.model_loaded);
        assert_eq!(status.model_name, "stub");
        assert_eq!(status.inference_count, 2);
    }

    #[test]
    fn test_stub_has_no_attribution() {
        let stub = StubClassifier { proba: vec![0.5, 0.5], arity: 8 };
        assert!(stub.feature_importances().is_none());
        assert!(matches!(
            stub.attribution(vector().as_slice(), 1),
            Err(ExplanationError::Unsupported { .. })
        ));
    }
}
