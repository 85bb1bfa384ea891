//! HTTP handlers

pub mod classical;
pub mod health;
