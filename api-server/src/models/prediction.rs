//! Prediction history model

use chrono::{DateTime, Utc};
use risk_core::{ExplanationFactors, PersistenceError, PredictionStore, StoredPrediction};
use sqlx::{FromRow, PgPool};

/// Row shape of the `predictions` table
#[derive(Debug, Clone, FromRow)]
pub struct PredictionRow {
    pub username: String,
    pub doc_id: String,
    pub pregnancies: Option<i64>,
    pub glucose: Option<f64>,
    pub blood_pressure: Option<f64>,
    pub skin_thickness: Option<f64>,
    pub insulin: Option<f64>,
    pub bmi: Option<f64>,
    pub diabetes_pedigree_function: Option<f64>,
    pub age: Option<i64>,
    pub prediction_class: i16,
    /// JSON text, keys in rank order
    pub top_factors: String,
    pub score: f64,
    pub report_date: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PredictionRow> for StoredPrediction {
    type Error = PersistenceError;

    fn try_from(row: PredictionRow) -> Result<Self, Self::Error> {
        let prediction_class = u8::try_from(row.prediction_class).map_err(|_| {
            PersistenceError::Malformed(format!(
                "{}/{}: prediction_class {}",
                row.username, row.doc_id, row.prediction_class
            ))
        })?;
        let top_factors: ExplanationFactors = serde_json::from_str(&row.top_factors)
            .map_err(|e| PersistenceError::Malformed(format!("{}/{}: {}", row.username, row.doc_id, e)))?;

        Ok(StoredPrediction {
            id: row.doc_id,
            username: row.username,
            pregnancies: row.pregnancies,
            glucose: row.glucose,
            blood_pressure: row.blood_pressure,
            skin_thickness: row.skin_thickness,
            insulin: row.insulin,
            bmi: row.bmi,
            diabetes_pedigree_function: row.diabetes_pedigree_function,
            age: row.age,
            prediction_class,
            top_factors,
            score: row.score,
            date: row.report_date,
            created_at: row.created_at,
        })
    }
}

/// Prediction history in PostgreSQL
#[derive(Clone)]
pub struct PgPredictionStore {
    pool: PgPool,
}

impl PgPredictionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(pool: &PgPool, username: &str, record: &StoredPrediction) -> Result<(), sqlx::Error> {
        let top_factors = serde_json::to_string(&record.top_factors)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        sqlx::query(
            r#"
            INSERT INTO predictions (
                username, doc_id, pregnancies, glucose, blood_pressure, skin_thickness, insulin,
                bmi, diabetes_pedigree_function, age, prediction_class, top_factors, score,
                report_date, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::json, $13, $14, $15)
            ON CONFLICT (username, doc_id) DO UPDATE SET
                pregnancies = EXCLUDED.pregnancies,
                glucose = EXCLUDED.glucose,
                blood_pressure = EXCLUDED.blood_pressure,
                skin_thickness = EXCLUDED.skin_thickness,
                insulin = EXCLUDED.insulin,
                bmi = EXCLUDED.bmi,
                diabetes_pedigree_function = EXCLUDED.diabetes_pedigree_function,
                age = EXCLUDED.age,
                prediction_class = EXCLUDED.prediction_class,
                top_factors = EXCLUDED.top_factors,
                score = EXCLUDED.score,
                report_date = EXCLUDED.report_date,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(username)
        .bind(&record.id)
        .bind(record.pregnancies)
        .bind(record.glucose)
        .bind(record.blood_pressure)
        .bind(record.skin_thickness)
        .bind(record.insulin)
        .bind(record.bmi)
        .bind(record.diabetes_pedigree_function)
        .bind(record.age)
        .bind(i16::from(record.prediction_class))
        .bind(top_factors)
        .bind(record.score)
        .bind(&record.date)
        .bind(record.created_at)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn list_by_username(pool: &PgPool, username: &str) -> Result<Vec<PredictionRow>, sqlx::Error> {
        sqlx::query_as::<_, PredictionRow>(
            r#"
            SELECT username, doc_id, pregnancies, glucose, blood_pressure, skin_thickness,
                   insulin, bmi, diabetes_pedigree_function, age, prediction_class,
                   top_factors::text AS top_factors, score, report_date, created_at
            FROM predictions
            WHERE username = $1
            ORDER BY created_at, doc_id
            "#,
        )
        .bind(username)
        .fetch_all(pool)
        .await
    }
}

impl PredictionStore for PgPredictionStore {
    async fn store(&self, username: &str, record: &StoredPrediction) -> Result<(), PersistenceError> {
        Self::upsert(&self.pool, username, record)
            .await
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;

        tracing::info!("Prediction saved for user: {}, document ID: {}", username, record.id);
        Ok(())
    }

    async fn fetch(&self, username: &str) -> Result<Vec<StoredPrediction>, PersistenceError> {
        Self::list_by_username(&self.pool, username)
            .await
            .map_err(|e| PersistenceError::Backend(e.to_string()))?
            .into_iter()
            .map(StoredPrediction::try_from)
            .collect()
    }
}
