//! Explanation types

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Per-sample signed contributions for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// Model output before any feature is considered
    pub baseline: f64,
    /// One score per feature, in layout order
    pub contributions: Vec<f64>,
}

impl Attribution {
    /// `baseline + Σ contributions`
    pub fn output(&self) -> f64 {
        self.baseline + self.contributions.iter().sum::<f64>()
    }
}

/// One influential feature and this sample's value for it
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub name: String,
    pub value: f64,
}

/// Influential features, most influential first.
///
/// Serializes as a JSON object whose key order is the rank order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExplanationFactors(Vec<Factor>);

impl ExplanationFactors {
    pub fn new(factors: Vec<Factor>) -> Self {
        Self(factors)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Factor> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.iter().find(|f| f.name == name).map(|f| f.value)
    }
}

impl Serialize for ExplanationFactors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for factor in &self.0 {
            map.serialize_entry(&factor.name, &factor.value)?;
        }
        map.end()
    }
}

struct FactorsVisitor;

impl<'de> Visitor<'de> for FactorsVisitor {
    type Value = ExplanationFactors;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of feature name to value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut factors = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((name, value)) = access.next_entry::<String, f64>()? {
            factors.push(Factor { name, value });
        }
        Ok(ExplanationFactors(factors))
    }
}

impl<'de> Deserialize<'de> for ExplanationFactors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FactorsVisitor)
    }
}
