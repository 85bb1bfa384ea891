//! Risk Pipeline - upload → predict → persist
//!
//! Upload and predict for one user are serialized by that user's session
//! lock, which stays held from reading the record through the persistence
//! hand-off. Document parsing and inference run on the blocking pool.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, InferenceError, PipelineError, Result};
use crate::logic::config::PipelineConfig;
use crate::logic::explain::{ExplanationEngine, ExplanationFactors};
use crate::logic::extract::{extract_document, FieldMap};
use crate::logic::model::ClassifierAdapter;
use crate::logic::persistence::{PredictionStore, StoredPrediction};
use crate::logic::session::SessionStore;

/// What a prediction request returns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutcome {
    /// 0 or 1
    pub prediction: u8,
    pub top_factors: ExplanationFactors,
    /// Probability of the predicted class
    pub score: f64,
}

pub struct RiskPipeline<S> {
    adapter: Arc<ClassifierAdapter>,
    explainer: ExplanationEngine,
    sessions: SessionStore,
    store: S,
}

impl<S: PredictionStore> RiskPipeline<S> {
    pub fn new(adapter: Arc<ClassifierAdapter>, config: &PipelineConfig, store: S) -> Self {
        Self {
            adapter,
            explainer: ExplanationEngine::new(config.explanation_strategy, config.top_factors),
            sessions: SessionStore::new(),
            store,
        }
    }

    pub fn adapter(&self) -> &ClassifierAdapter {
        &self.adapter
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Extract a document's fields and make them the user's current record.
    ///
    /// On failure the user's existing record is left untouched.
    pub async fn upload(&self, username: &str, document: Vec<u8>) -> Result<FieldMap> {
        let fields = tokio::task::spawn_blocking(move || extract_document(&document))
            .await
            .map_err(|e| ExtractionError::Worker(e.to_string()))??;

        let mut record = self.sessions.lock_or_create(username).await;
        record.reset_with(fields.clone());

        log::info!(
            "Extracted {} field(s) for user {}",
            fields.present_count(),
            username
        );
        Ok(fields)
    }

    /// Classify the user's current record, explain it and save it.
    ///
    /// A storage failure is returned as `PipelineError::Persistence`, carrying
    /// the outcome; the session record keeps the prediction either way.
    pub async fn predict(&self, username: &str) -> Result<PredictionOutcome> {
        let mut record = self
            .sessions
            .lock_existing(username)
            .await
            .ok_or(crate::error::ValidationError::NoExtractedData)?;

        let vector = record.feature_vector()?;
        log::debug!("Feature vector for user {}: {}", username, vector.to_log_entry());

        let adapter = self.adapter.clone();
        let explainer = self.explainer;
        let (classification, factors) = tokio::task::spawn_blocking(move || {
            let classification = adapter.classify(&vector)?;
            let model = adapter.model()?;
            let factors = explainer.explain(model.as_ref(), &vector, &classification);
            Ok::<_, InferenceError>((classification, factors))
        })
        .await
        .map_err(|e| InferenceError::Runtime(format!("inference worker failed: {}", e)))??;

        record.apply_prediction(classification, factors);

        let outcome = record
            .outcome()
            .ok_or_else(|| InferenceError::Runtime("prediction was not recorded".into()))?;
        let saved_at = record.save_time(Utc::now());
        let stored = StoredPrediction::from_record(&record, saved_at)
            .ok_or_else(|| InferenceError::Runtime("prediction was not recorded".into()))?;

        log::info!(
            "Prediction for user {}: class {} (score {:.4}, {} factor(s))",
            username,
            outcome.prediction,
            outcome.score,
            outcome.top_factors.len()
        );

        if let Err(source) = self.store.store(username, &stored).await {
            log::error!("Failed to save prediction {} for user {}: {}", stored.id, username, source);
            return Err(PipelineError::Persistence {
                outcome: Box::new(outcome),
                source,
            });
        }

        log::debug!("Saved prediction {} for user {}", stored.id, username);
        Ok(outcome)
    }

    /// Saved predictions for a user, straight from storage
    pub async fn history(&self, username: &str) -> Result<Vec<StoredPrediction>> {
        let records = self.store.fetch(username).await.map_err(|e| {
            log::error!("Failed to fetch predictions for user {}: {}", username, e);
            PipelineError::Retrieval(e)
        })?;

        log::info!("Retrieved {} prediction(s) for user {}", records.len(), username);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PersistenceError, ValidationError};
    use crate::logic::explain::ExplanationStrategy;
    use crate::logic::extract::document::tests::make_test_pdf;
    use crate::logic::model::forest::tests::sample_model;
    use crate::logic::model::inference::tests::StubClassifier;
    use crate::logic::persistence::MemoryStore;
    use crate::logic::session::RecordState;

    const REPORT: &str = "Patient report\n\
        Date: 01-02-2023\n\
        Pregnancies: 2\n\
        Glucose (mg/dL): 130\n\
        Blood Pressure (mm Hg): 70\n\
        Skin Thickness (mm): 20\n\
        Insulin (mu U/ml): 85\n\
        BMI (kg/m2): 28.5\n\
        Diabetes Pedigree Function: 0.5\n\
        Age (years): 33\n";

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn forest_pipeline() -> RiskPipeline<MemoryStore> {
        init_logger();
        let adapter = Arc::new(ClassifierAdapter::new(Arc::new(sample_model())));
        RiskPipeline::new(adapter, &PipelineConfig::default(), MemoryStore::new())
    }

    fn stub_pipeline(proba: Vec<f64>) -> RiskPipeline<MemoryStore> {
        init_logger();
        let adapter = Arc::new(ClassifierAdapter::new(Arc::new(StubClassifier { proba, arity: 8 })));
        RiskPipeline::new(adapter, &PipelineConfig::default(), MemoryStore::new())
    }

    struct FailingStore;

    impl PredictionStore for FailingStore {
        async fn store(&self, _username: &str, _record: &StoredPrediction) -> std::result::Result<(), PersistenceError> {
            Err(PersistenceError::Backend("connection refused".into()))
        }

        async fn fetch(&self, _username: &str) -> std::result::Result<Vec<StoredPrediction>, PersistenceError> {
            Err(PersistenceError::Backend("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_end_to_end() {
        let pipeline = forest_pipeline();

        let fields = pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();
        assert_eq!(fields.present_count(), 9);

        let outcome = pipeline.predict("alice").await.unwrap();
        assert_eq!(outcome.prediction, 1);
        assert!((outcome.score - 0.65).abs() < 1e-12);
        assert_eq!(outcome.top_factors.names(), vec!["Glucose", "BMI", "Age"]);
        assert_eq!(outcome.top_factors.get("Age"), Some(33.0));

        let record = pipeline.sessions().snapshot("alice").await.unwrap();
        assert_eq!(record.state, RecordState::Predicted);
        assert_eq!(record.fields, fields);
        assert_eq!(record.outcome(), Some(outcome.clone()));

        let history = pipeline.history("alice").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].prediction_class, 1);
        assert_eq!(history[0].top_factors, outcome.top_factors);
    }

    #[tokio::test]
    async fn test_end_to_end_from_pdf() {
        let pipeline = stub_pipeline(vec![0.18, 0.82]);

        let pdf = make_test_pdf(
            "Date 01-02-2023 Pregnancies 2 Glucose 130 BloodPressure 70 SkinThickness 20 \
             Insulin 85 BMI 28.5 DiabetesPedigreeFunction 0.5 Age 33",
        );
        let fields = pipeline.upload("alice", pdf).await.unwrap();
        assert_eq!(fields.present_count(), 9);
        let outcome = pipeline.predict("alice").await.unwrap();

        assert_eq!(outcome.prediction, 1);
        assert_eq!(outcome.score, 0.82);
        // The stub exposes no importances, so the prediction carries no factors
        assert!(outcome.top_factors.is_empty());
    }

    #[tokio::test]
    async fn test_date_survives_prediction() {
        let pipeline = forest_pipeline();
        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();
        pipeline.predict("alice").await.unwrap();

        let record = pipeline.sessions().snapshot("alice").await.unwrap();
        assert_eq!(record.fields.date.as_deref(), Some("01-02-2023"));

        let history = pipeline.history("alice").await.unwrap();
        assert_eq!(history[0].date.as_deref(), Some("01-02-2023"));
    }

    #[tokio::test]
    async fn test_predict_without_upload_is_validation_failure() {
        let pipeline = forest_pipeline();
        let err = pipeline.predict("nobody").await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(ValidationError::NoExtractedData)));
        assert_eq!(pipeline.store().count("nobody"), 0);
    }

    #[tokio::test]
    async fn test_partial_record_is_validation_failure() {
        let pipeline = forest_pipeline();
        pipeline.upload("alice", b"Glucose: 130\nAge: 33".to_vec()).await.unwrap();

        let err = pipeline.predict("alice").await.unwrap_err();
        match err {
            PipelineError::Validation(ValidationError::MissingFeatures(missing)) => {
                assert_eq!(missing.len(), 6);
                assert!(!missing.contains(&"Glucose"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_previous_record() {
        let pipeline = forest_pipeline();
        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();

        let err = pipeline.upload("alice", b"   \n ".to_vec()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::NoText)));

        let record = pipeline.sessions().snapshot("alice").await.unwrap();
        assert_eq!(record.fields.present_count(), 9);
    }

    #[tokio::test]
    async fn test_new_upload_resets_prediction() {
        let pipeline = forest_pipeline();
        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();
        pipeline.predict("alice").await.unwrap();

        pipeline.upload("alice", b"Glucose: 99".to_vec()).await.unwrap();

        let record = pipeline.sessions().snapshot("alice").await.unwrap();
        assert_eq!(record.state, RecordState::Extracted);
        assert_eq!(record.fields, FieldMap { glucose: Some(99.0), ..Default::default() });
        assert!(record.classification.is_none());
        assert!(record.factors.is_empty());
    }

    #[tokio::test]
    async fn test_repredict_updates_record_and_adds_history() {
        let pipeline = forest_pipeline();
        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();

        let first = pipeline.predict("alice").await.unwrap();
        let second = pipeline.predict("alice").await.unwrap();
        assert_eq!(first, second);

        let record = pipeline.sessions().snapshot("alice").await.unwrap();
        assert_eq!(record.state, RecordState::Predicted);

        let history = pipeline.history("alice").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_ne!(history[0].id, history[1].id);
    }

    #[tokio::test]
    async fn test_back_to_back_reports_are_both_kept() {
        let pipeline = forest_pipeline();
        let second_report = REPORT.replace("Glucose (mg/dL): 130", "Glucose (mg/dL): 90");

        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();
        pipeline.predict("alice").await.unwrap();
        pipeline.upload("alice", second_report.into_bytes()).await.unwrap();
        pipeline.predict("alice").await.unwrap();

        let history = pipeline.history("alice").await.unwrap();
        assert_eq!(history.len(), 2);
        let glucose: Vec<_> = history.iter().map(|p| p.glucose).collect();
        assert_eq!(glucose, vec![Some(130.0), Some(90.0)]);
    }

    #[tokio::test]
    async fn test_negative_prediction_has_no_factors() {
        let pipeline = stub_pipeline(vec![0.7, 0.3]);
        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();

        let outcome = pipeline.predict("alice").await.unwrap();
        assert_eq!(outcome.prediction, 0);
        assert_eq!(outcome.score, 0.7);
        assert!(outcome.top_factors.is_empty());
    }

    #[tokio::test]
    async fn test_local_attribution_strategy() {
        init_logger();
        let adapter = Arc::new(ClassifierAdapter::new(Arc::new(sample_model())));
        let config = PipelineConfig {
            explanation_strategy: ExplanationStrategy::LocalAttribution,
            ..PipelineConfig::default()
        };
        let pipeline = RiskPipeline::new(adapter, &config, MemoryStore::new());

        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();
        let outcome = pipeline.predict("alice").await.unwrap();
        assert_eq!(outcome.top_factors.len(), 3);
        assert_eq!(outcome.top_factors.names()[2], "BMI");
    }

    #[tokio::test]
    async fn test_unloaded_model_is_inference_failure() {
        init_logger();
        let pipeline = RiskPipeline::new(
            Arc::new(ClassifierAdapter::unloaded()),
            &PipelineConfig::default(),
            MemoryStore::new(),
        );
        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();

        let err = pipeline.predict("alice").await.unwrap_err();
        assert!(matches!(err, PipelineError::Inference(InferenceError::ModelNotLoaded)));

        let record = pipeline.sessions().snapshot("alice").await.unwrap();
        assert_eq!(record.state, RecordState::Extracted);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_prediction() {
        init_logger();
        let adapter = Arc::new(ClassifierAdapter::new(Arc::new(sample_model())));
        let pipeline = RiskPipeline::new(adapter, &PipelineConfig::default(), FailingStore);
        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();

        match pipeline.predict("alice").await.unwrap_err() {
            PipelineError::Persistence { outcome, .. } => assert_eq!(outcome.prediction, 1),
            other => panic!("unexpected error: {other}"),
        }

        let record = pipeline.sessions().snapshot("alice").await.unwrap();
        assert_eq!(record.state, RecordState::Predicted);

        assert!(matches!(
            pipeline.history("alice").await.unwrap_err(),
            PipelineError::Retrieval(_)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_users() {
        let pipeline = Arc::new(forest_pipeline());

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    let user = format!("user{}", i);
                    pipeline.upload(&user, REPORT.as_bytes().to_vec()).await.unwrap();
                    pipeline.predict(&user).await.unwrap()
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().prediction, 1);
        }
        assert_eq!(pipeline.sessions().len(), 8);
    }

    #[tokio::test]
    async fn test_same_user_requests_do_not_interleave() {
        let pipeline = Arc::new(forest_pipeline());
        pipeline.upload("alice", REPORT.as_bytes().to_vec()).await.unwrap();

        let upload = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.upload("alice", b"Glucose: 99".to_vec()).await })
        };
        let predict = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.predict("alice").await })
        };

        upload.await.unwrap().unwrap();
        // The predict either saw the full report or the partial one, never a mix
        match predict.await.unwrap() {
            Ok(outcome) => assert_eq!(outcome.prediction, 1),
            Err(e) => assert!(matches!(e, PipelineError::Validation(ValidationError::MissingFeatures(_)))),
        }
    }
}
