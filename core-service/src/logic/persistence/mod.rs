//! Persistence Module - Durable prediction history
//!
//! The pipeline only needs two operations from storage: upsert one record per
//! completed prediction, and fetch every record for a user.

pub mod memory;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::logic::explain::ExplanationFactors;
use crate::logic::session::PatientRecord;

pub use memory::MemoryStore;

/// Timestamp-shaped document id with microseconds, e.g. `20230201_143005_000042`
pub const DOC_ID_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

pub fn doc_id(at: DateTime<Utc>) -> String {
    at.format(DOC_ID_FORMAT).to_string()
}

/// One saved prediction, as handed to and read back from storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub id: String,
    pub username: String,
    pub pregnancies: Option<i64>,
    pub glucose: Option<f64>,
    pub blood_pressure: Option<f64>,
    pub skin_thickness: Option<f64>,
    pub insulin: Option<f64>,
    pub bmi: Option<f64>,
    pub diabetes_pedigree_function: Option<f64>,
    pub age: Option<i64>,
    pub prediction_class: u8,
    pub top_factors: ExplanationFactors,
    pub score: f64,
    /// Report date as written in the document (`DD-MM-YYYY`)
    pub date: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredPrediction {
    /// Copy a predicted record; `None` when the record has no prediction yet
    pub fn from_record(record: &PatientRecord, at: DateTime<Utc>) -> Option<Self> {
        let classification = record.classification.as_ref()?;
        let fields = &record.fields;

        Some(Self {
            id: doc_id(at),
            username: record.username.clone(),
            pregnancies: fields.pregnancies,
            glucose: fields.glucose,
            blood_pressure: fields.blood_pressure,
            skin_thickness: fields.skin_thickness,
            insulin: fields.insulin,
            bmi: fields.bmi,
            diabetes_pedigree_function: fields.diabetes_pedigree_function,
            age: fields.age,
            prediction_class: classification.class_label,
            top_factors: record.factors.clone(),
            score: classification.score,
            date: fields.date.clone(),
            created_at: at,
        })
    }
}

/// Storage backend for prediction history
pub trait PredictionStore: Send + Sync + 'static {
    /// Upsert by (`username`, `record.id`)
    fn store(
        &self,
        username: &str,
        record: &StoredPrediction,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;

    /// All records for a user, oldest first
    fn fetch(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Vec<StoredPrediction>, PersistenceError>> + Send;
}
