//! Session Module - Transient per-user record between upload and predict

pub mod record;
pub mod store;

pub use record::{PatientRecord, RecordState};
pub use store::{RecordGuard, SessionStore};
