//! Feature Preparer
//!
//! Projects a record onto exactly the classifier's columns. Projection is
//! total and never fails on extra columns; completeness is only enforced when
//! the projection is turned into a `FeatureVector`.

use serde_json::{Map, Value};

use super::layout::{FEATURE_COUNT, FEATURE_LAYOUT};
use super::vector::FeatureVector;
use crate::error::ValidationError;
use crate::logic::extract::{ClinicalField, FieldMap};

/// Feature columns in layout order, possibly incomplete
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreparedFeatures {
    columns: [Option<f64>; FEATURE_COUNT],
}

impl PreparedFeatures {
    pub fn get(&self, name: &str) -> Option<f64> {
        super::layout::feature_index(name).and_then(|i| self.columns[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Option<f64>)> + '_ {
        FEATURE_LAYOUT.iter().copied().zip(self.columns.iter().copied())
    }

    /// Names of absent columns, in layout order
    pub fn missing(&self) -> Vec<&'static str> {
        self.iter().filter(|(_, v)| v.is_none()).map(|(name, _)| name).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.columns.iter().all(Option::is_some)
    }

    /// Build the classifier input; fails when any column is absent
    pub fn into_vector(self) -> Result<FeatureVector, ValidationError> {
        let mut values = [0.0f64; FEATURE_COUNT];
        for (slot, column) in values.iter_mut().zip(self.columns.iter()) {
            match column {
                Some(v) => *slot = *v,
                None => return Err(ValidationError::MissingFeatures(self.missing())),
            }
        }
        Ok(FeatureVector::from_values(values))
    }

    /// Read feature columns out of an arbitrary column mapping
    pub fn from_columns(columns: &Map<String, Value>) -> Self {
        let mut prepared = Self::default();
        for (slot, name) in prepared.columns.iter_mut().zip(FEATURE_LAYOUT) {
            *slot = columns.get(*name).and_then(Value::as_f64);
        }
        prepared
    }
}

/// Project extracted fields onto the feature columns; `Date` is left behind
pub fn prepare_features(fields: &FieldMap) -> PreparedFeatures {
    let mut prepared = PreparedFeatures::default();
    for field in ClinicalField::ALL {
        if let Some(index) = field.feature_index() {
            prepared.columns[index] = fields.get(field).and_then(|v| v.as_f64());
        }
    }
    prepared
}

/// Restrict a wider column mapping to the feature columns
pub fn project_columns(columns: &Map<String, Value>) -> Map<String, Value> {
    columns
        .iter()
        .filter(|(name, _)| FEATURE_LAYOUT.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
