//! Per-user working record and its lifecycle.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::logic::explain::ExplanationFactors;
use crate::logic::extract::FieldMap;
use crate::logic::features::{prepare_features, FeatureVector};
use crate::logic::model::ClassificationResult;
use crate::logic::pipeline::PredictionOutcome;

/// Lifecycle state of a session record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    #[default]
    Empty,
    Extracted,
    Predicted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub username: String,
    pub state: RecordState,
    pub fields: FieldMap,
    pub classification: Option<ClassificationResult>,
    pub factors: ExplanationFactors,
    /// Timestamp of the last prediction handed to storage
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl PatientRecord {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            state: RecordState::Empty,
            fields: FieldMap::default(),
            classification: None,
            factors: ExplanationFactors::empty(),
            last_saved_at: None,
        }
    }

    /// Replace the record wholesale with freshly extracted fields
    pub fn reset_with(&mut self, fields: FieldMap) {
        self.fields = fields;
        self.classification = None;
        self.factors = ExplanationFactors::empty();
        self.state = RecordState::Extracted;
    }

    /// Classifier input built from the feature fields only
    pub fn feature_vector(&self) -> Result<FeatureVector, ValidationError> {
        if self.state == RecordState::Empty || self.fields.is_empty() {
            return Err(ValidationError::NoExtractedData);
        }
        prepare_features(&self.fields).into_vector()
    }

    /// Fold a prediction into the record; extracted fields (including `Date`) are kept
    pub fn apply_prediction(&mut self, classification: ClassificationResult, factors: ExplanationFactors) {
        self.classification = Some(classification);
        self.factors = factors;
        self.state = RecordState::Predicted;
    }

    /// Storage timestamp for the next prediction, strictly after the previous one
    pub fn save_time(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        let at = match self.last_saved_at {
            Some(prev) if now <= prev => prev + Duration::microseconds(1),
            _ => now,
        };
        self.last_saved_at = Some(at);
        at
    }

    pub fn outcome(&self) -> Option<PredictionOutcome> {
        self.classification.as_ref().map(|c| PredictionOutcome {
            prediction: c.class_label,
            top_factors: self.factors.clone(),
            score: c.score,
        })
    }
}
