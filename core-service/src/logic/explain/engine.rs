//! Explanation Engine - Ranks features for a positive prediction
//!
//! Scores come from the configured `Explainer`, are sorted descending with
//! ties kept in layout order, and the top `k` are paired with this sample's
//! values.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::types::{ExplanationFactors, Factor};
use crate::error::ExplanationError;
use crate::logic::features::{feature_name, FeatureVector};
use crate::logic::model::{ClassificationResult, Classifier, POSITIVE_CLASS};

/// Default number of factors reported
pub const DEFAULT_TOP_K: usize = 3;

/// Which attribution method ranks the features
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationStrategy {
    /// Sample-independent importances from training
    #[default]
    GlobalImportance,
    /// Per-sample contributions towards the positive class
    LocalAttribution,
}

impl ExplanationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlobalImportance => "global_importance",
            Self::LocalAttribution => "local_attribution",
        }
    }

    fn explainer(&self) -> &'static dyn Explainer {
        match self {
            Self::GlobalImportance => &GlobalImportanceExplainer,
            Self::LocalAttribution => &LocalAttributionExplainer,
        }
    }
}

impl FromStr for ExplanationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global_importance" | "global" => Ok(Self::GlobalImportance),
            "local_attribution" | "local" => Ok(Self::LocalAttribution),
            other => Err(format!("unknown explanation strategy: {}", other)),
        }
    }
}

/// Scores every feature of one sample; larger means more influential
pub trait Explainer: Send + Sync {
    fn name(&self) -> &'static str;

    fn rank_scores(
        &self,
        model: &dyn Classifier,
        vector: &FeatureVector,
    ) -> Result<Vec<f64>, ExplanationError>;
}

pub struct GlobalImportanceExplainer;

impl Explainer for GlobalImportanceExplainer {
    fn name(&self) -> &'static str {
        "global importance"
    }

    fn rank_scores(
        &self,
        model: &dyn Classifier,
        _vector: &FeatureVector,
    ) -> Result<Vec<f64>, ExplanationError> {
        model.feature_importances().ok_or_else(|| ExplanationError::Unsupported {
            strategy: self.name(),
            model: model.name().to_string(),
        })
    }
}

pub struct LocalAttributionExplainer;

impl Explainer for LocalAttributionExplainer {
    fn name(&self) -> &'static str {
        "local attribution"
    }

    fn rank_scores(
        &self,
        model: &dyn Classifier,
        vector: &FeatureVector,
    ) -> Result<Vec<f64>, ExplanationError> {
        let attribution = model.attribution(vector.as_slice(), POSITIVE_CLASS as usize)?;
        log::debug!(
            "{} attribution: baseline {:.4}, output {:.4}",
            model.name(),
            attribution.baseline,
            attribution.output()
        );
        Ok(attribution.contributions.iter().map(|c| c.abs()).collect())
    }
}

/// Turns a positive classification into its top factors
#[derive(Debug, Clone, Copy)]
pub struct ExplanationEngine {
    strategy: ExplanationStrategy,
    top_k: usize,
}

impl Default for ExplanationEngine {
    fn default() -> Self {
        Self::new(ExplanationStrategy::default(), DEFAULT_TOP_K)
    }
}

impl ExplanationEngine {
    pub fn new(strategy: ExplanationStrategy, top_k: usize) -> Self {
        Self { strategy, top_k }
    }

    pub fn strategy(&self) -> ExplanationStrategy {
        self.strategy
    }

    /// Top factors for a positive result, empty otherwise.
    ///
    /// Attribution errors are logged and yield empty factors.
    pub fn explain(
        &self,
        model: &dyn Classifier,
        vector: &FeatureVector,
        result: &ClassificationResult,
    ) -> ExplanationFactors {
        if !result.is_positive() {
            return ExplanationFactors::empty();
        }

        match self.rank(model, vector) {
            Ok(factors) => factors,
            Err(e) => {
                log::warn!(
                    "Explanation skipped ({} on {}): {}",
                    self.strategy.as_str(),
                    model.name(),
                    e
                );
                ExplanationFactors::empty()
            }
        }
    }

    fn rank(
        &self,
        model: &dyn Classifier,
        vector: &FeatureVector,
    ) -> Result<ExplanationFactors, ExplanationError> {
        let scores = self.strategy.explainer().rank_scores(model, vector)?;
        if scores.len() != vector.len() {
            return Err(ExplanationError::LengthMismatch {
                expected: vector.len(),
                actual: scores.len(),
            });
        }
        if scores.iter().any(|s| s.is_nan()) {
            return Err(ExplanationError::Runtime("NaN attribution score".into()));
        }

        // Stable sort: equal scores stay in layout order
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(std::cmp::Ordering::Equal));

        let factors = order
            .into_iter()
            .take(self.top_k)
            .filter_map(|i| {
                Some(Factor {
                    name: feature_name(i)?.to_string(),
                    value: vector.values[i],
                })
            })
            .collect();

        Ok(ExplanationFactors::new(factors))
    }
}
