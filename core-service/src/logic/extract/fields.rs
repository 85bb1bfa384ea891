//! Clinical fields read from a report.
//!
//! `FieldMap` keeps "not found" (`None`) distinct from "found and zero".

use serde::{Deserialize, Serialize};

use crate::logic::features::layout;

/// How a captured value is parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Float,
    Date,
}

/// The fixed set of fields looked for in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClinicalField {
    Pregnancies,
    Glucose,
    BloodPressure,
    SkinThickness,
    Insulin,
    Bmi,
    DiabetesPedigreeFunction,
    Age,
    Date,
}

impl ClinicalField {
    pub const ALL: [ClinicalField; 9] = [
        ClinicalField::Pregnancies,
        ClinicalField::Glucose,
        ClinicalField::BloodPressure,
        ClinicalField::SkinThickness,
        ClinicalField::Insulin,
        ClinicalField::Bmi,
        ClinicalField::DiabetesPedigreeFunction,
        ClinicalField::Age,
        ClinicalField::Date,
    ];

    /// Column name, identical to the classifier's training column
    pub fn name(self) -> &'static str {
        match self {
            Self::Pregnancies => "Pregnancies",
            Self::Glucose => "Glucose",
            Self::BloodPressure => "BloodPressure",
            Self::SkinThickness => "SkinThickness",
            Self::Insulin => "Insulin",
            Self::Bmi => "BMI",
            Self::DiabetesPedigreeFunction => "DiabetesPedigreeFunction",
            Self::Age => "Age",
            Self::Date => "Date",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Self::Pregnancies | Self::Age => FieldKind::Integer,
            Self::Date => FieldKind::Date,
            _ => FieldKind::Float,
        }
    }

    /// Position in the feature vector, `None` for metadata fields
    pub fn feature_index(self) -> Option<usize> {
        layout::feature_index(self.name())
    }

    pub fn is_feature(self) -> bool {
        self.feature_index().is_some()
    }
}

impl std::fmt::Display for ClinicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Date(String),
}

impl FieldValue {
    /// Parse a captured substring as `kind`
    pub fn parse(kind: FieldKind, raw: &str) -> Option<Self> {
        match kind {
            FieldKind::Integer => raw.parse().ok().map(Self::Integer),
            FieldKind::Float => raw.parse().ok().map(Self::Float),
            FieldKind::Date => Some(Self::Date(raw.to_string())),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Date(_) => None,
        }
    }
}

/// Extracted fields, any of which may be absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMap {
    #[serde(rename = "Pregnancies")]
    pub pregnancies: Option<i64>,
    #[serde(rename = "Glucose")]
    pub glucose: Option<f64>,
    #[serde(rename = "BloodPressure")]
    pub blood_pressure: Option<f64>,
    #[serde(rename = "SkinThickness")]
    pub skin_thickness: Option<f64>,
    #[serde(rename = "Insulin")]
    pub insulin: Option<f64>,
    #[serde(rename = "BMI")]
    pub bmi: Option<f64>,
    #[serde(rename = "DiabetesPedigreeFunction")]
    pub diabetes_pedigree_function: Option<f64>,
    #[serde(rename = "Age")]
    pub age: Option<i64>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: ClinicalField) -> Option<FieldValue> {
        match field {
            ClinicalField::Pregnancies => self.pregnancies.map(FieldValue::Integer),
            ClinicalField::Glucose => self.glucose.map(FieldValue::Float),
            ClinicalField::BloodPressure => self.blood_pressure.map(FieldValue::Float),
            ClinicalField::SkinThickness => self.skin_thickness.map(FieldValue::Float),
            ClinicalField::Insulin => self.insulin.map(FieldValue::Float),
            ClinicalField::Bmi => self.bmi.map(FieldValue::Float),
            ClinicalField::DiabetesPedigreeFunction => {
                self.diabetes_pedigree_function.map(FieldValue::Float)
            }
            ClinicalField::Age => self.age.map(FieldValue::Integer),
            ClinicalField::Date => self.date.clone().map(FieldValue::Date),
        }
    }

    /// Set a field; returns false when the value's type doesn't fit the field
    pub fn set(&mut self, field: ClinicalField, value: FieldValue) -> bool {
        match (field, value) {
            (ClinicalField::Pregnancies, FieldValue::Integer(v)) => self.pregnancies = Some(v),
            (ClinicalField::Age, FieldValue::Integer(v)) => self.age = Some(v),
            (ClinicalField::Date, FieldValue::Date(v)) => self.date = Some(v),
            (ClinicalField::Glucose, FieldValue::Float(v)) => self.glucose = Some(v),
            (ClinicalField::BloodPressure, FieldValue::Float(v)) => self.blood_pressure = Some(v),
            (ClinicalField::SkinThickness, FieldValue::Float(v)) => self.skin_thickness = Some(v),
            (ClinicalField::Insulin, FieldValue::Float(v)) => self.insulin = Some(v),
            (ClinicalField::Bmi, FieldValue::Float(v)) => self.bmi = Some(v),
            (ClinicalField::DiabetesPedigreeFunction, FieldValue::Float(v)) => {
                self.diabetes_pedigree_function = Some(v)
            }
            _ => return false,
        }
        true
    }

    pub fn is_present(&self, field: ClinicalField) -> bool {
        self.get(field).is_some()
    }

    pub fn present_count(&self) -> usize {
        ClinicalField::ALL.iter().filter(|f| self.is_present(**f)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.present_count() == 0
    }

    /// Feature fields with no value, in layout order
    pub fn missing_features(&self) -> Vec<ClinicalField> {
        ClinicalField::ALL
            .iter()
            .copied()
            .filter(|f| f.is_feature() && !self.is_present(*f))
            .collect()
    }
}
