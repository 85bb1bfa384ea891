//! Keyed store of session records.
//!
//! Each username maps to its own async mutex, so requests for one user are
//! serialized while different users never wait on each other. The outer map
//! lock is only held to find or insert a slot, never across an await.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::record::PatientRecord;

/// Exclusive access to one user's record
pub type RecordGuard = OwnedMutexGuard<PatientRecord>;

#[derive(Default)]
pub struct SessionStore {
    records: RwLock<HashMap<String, Arc<Mutex<PatientRecord>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, username: &str) -> Option<Arc<Mutex<PatientRecord>>> {
        self.records.read().get(username).cloned()
    }

    fn slot_or_create(&self, username: &str) -> Arc<Mutex<PatientRecord>> {
        if let Some(slot) = self.slot(username) {
            return slot;
        }
        self.records
            .write()
            .entry(username.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(PatientRecord::new(username))))
            .clone()
    }

    /// Lock a user's record, creating an empty one first if needed
    pub async fn lock_or_create(&self, username: &str) -> RecordGuard {
        self.slot_or_create(username).lock_owned().await
    }

    /// Lock a user's record if one exists
    pub async fn lock_existing(&self, username: &str) -> Option<RecordGuard> {
        match self.slot(username) {
            Some(slot) => Some(slot.lock_owned().await),
            None => None,
        }
    }

    /// Copy of a user's current record
    pub async fn snapshot(&self, username: &str) -> Option<PatientRecord> {
        self.lock_existing(username).await.map(|guard| guard.clone())
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}
