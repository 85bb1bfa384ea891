//! In-process prediction store, used by the pipeline and router tests.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use super::{PredictionStore, StoredPrediction};
use crate::error::PersistenceError;

#[derive(Default)]
pub struct MemoryStore {
    /// username → doc id → record
    records: RwLock<HashMap<String, BTreeMap<String, StoredPrediction>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, username: &str) -> usize {
        self.records.read().get(username).map_or(0, BTreeMap::len)
    }
}

impl PredictionStore for MemoryStore {
    async fn store(&self, username: &str, record: &StoredPrediction) -> Result<(), PersistenceError> {
        self.records
            .write()
            .entry(username.to_string())
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn fetch(&self, username: &str) -> Result<Vec<StoredPrediction>, PersistenceError> {
        Ok(self
            .records
            .read()
            .get(username)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::explain::ExplanationFactors;
    use chrono::{TimeZone, Utc};

    fn prediction(id: &str, score: f64) -> StoredPrediction {
        StoredPrediction {
            id: id.to_string(),
            username: "alice".into(),
            pregnancies: Some(2),
            glucose: Some(130.0),
            blood_pressure: Some(70.0),
            skin_thickness: Some(20.0),
            insulin: Some(85.0),
            bmi: Some(28.5),
            diabetes_pedigree_function: Some(0.5),
            age: Some(33),
            prediction_class: 1,
            top_factors: ExplanationFactors::empty(),
            score,
            date: None,
            created_at: Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_upsert_by_doc_id() {
        let store = MemoryStore::new();
        store.store("alice", &prediction("20230201_000000", 0.6)).await.unwrap();
        store.store("alice", &prediction("20230201_000000", 0.8)).await.unwrap();
        store.store("alice", &prediction("20230201_000001", 0.7)).await.unwrap();

        let records = store.fetch("alice").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score, 0.8);
        assert_eq!(records[1].id, "20230201_000001");
    }

    #[tokio::test]
    async fn test_users_are_separate() {
        let store = MemoryStore::new();
        store.store("alice", &prediction("a", 0.6)).await.unwrap();

        assert!(store.fetch("bob").await.unwrap().is_empty());
        assert_eq!(store.count("alice"), 1);
        assert_eq!(store.count("bob"), 0);
    }
}
