//! Tree-ensemble classifier loaded from a JSON artifact.
//!
//! The artifact mirrors a fitted random forest's array layout: per tree,
//! `children_left`, `children_right`, `feature`, `threshold` and `value`
//! (class distribution at every node). A child index of `-1` marks a leaf.
//!
//! Probabilities are the mean of each tree's normalized leaf distribution.
//! Local attribution follows the decision path: each split credits its
//! feature with the change in class probability between parent and child,
//! so `baseline + Σ contributions` equals the predicted probability.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::inference::{argmax, Classifier};
use crate::error::{ExplanationError, InferenceError};
use crate::logic::explain::Attribution;
use crate::logic::features::layout;

const LEAF: i64 = -1;

// ============================================================================
// ARTIFACT FORMAT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub n_features: usize,
    pub n_classes: usize,
    /// Training column order; checked against the feature layout when present
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Impurity-based importances from training
    #[serde(default)]
    pub feature_importances: Option<Vec<f64>>,
    pub trees: Vec<TreeArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

// ============================================================================
// VALIDATED MODEL
// ============================================================================

#[derive(Debug, Clone)]
struct Split {
    feature: usize,
    threshold: f64,
    left: usize,
    right: usize,
}

#[derive(Debug, Clone)]
struct Node {
    split: Option<Split>,
    /// Normalized class distribution
    value: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_artifact(
        index: usize,
        t: &TreeArtifact,
        n_features: usize,
        n_classes: usize,
    ) -> Result<Self, InferenceError> {
        let bad = |msg: String| InferenceError::Artifact(format!("tree {}: {}", index, msg));

        let n = t.value.len();
        if n == 0 {
            return Err(bad("no nodes".into()));
        }
        if [t.children_left.len(), t.children_right.len(), t.feature.len(), t.threshold.len()]
            .iter()
            .any(|&len| len != n)
        {
            return Err(bad("node arrays differ in length".into()));
        }

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let value = normalize(&t.value[i]).ok_or_else(|| bad(format!("node {} has no class weight", i)))?;
            if value.len() != n_classes {
                return Err(bad(format!("node {} has {} classes, expected {}", i, value.len(), n_classes)));
            }

            let (left, right) = (t.children_left[i], t.children_right[i]);
            let split = if left == LEAF && right == LEAF {
                None
            } else {
                // Children always come after their parent, so every walk terminates.
                let child = |c: i64| -> Result<usize, InferenceError> {
                    usize::try_from(c)
                        .ok()
                        .filter(|&c| c > i && c < n)
                        .ok_or_else(|| bad(format!("node {} has invalid child {}", i, c)))
                };
                let feature = usize::try_from(t.feature[i])
                    .ok()
                    .filter(|&f| f < n_features)
                    .ok_or_else(|| bad(format!("node {} splits on invalid feature {}", i, t.feature[i])))?;

                Some(Split {
                    feature,
                    threshold: t.threshold[i],
                    left: child(left)?,
                    right: child(right)?,
                })
            };

            nodes.push(Node { split, value });
        }

        Ok(Self { nodes })
    }

    /// Node indices from root to leaf
    fn path(&self, x: &[f64]) -> Vec<usize> {
        let mut path = vec![0];
        let mut node = 0;
        while let Some(split) = &self.nodes[node].split {
            // Split thresholds were fit on f32-cast inputs.
            let v = x[split.feature] as f32 as f64;
            node = if v <= split.threshold { split.left } else { split.right };
            path.push(node);
        }
        path
    }
}

fn normalize(weights: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = weights.iter().sum();
    if total.is_nan() || total <= 0.0 || weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return None;
    }
    Some(weights.iter().map(|w| w / total).collect())
}

/// Random-forest classifier
#[derive(Debug, Clone)]
pub struct ForestModel {
    n_features: usize,
    n_classes: usize,
    importances: Option<Vec<f64>>,
    trees: Vec<Tree>,
}

impl ForestModel {
    pub fn from_artifact(artifact: ForestArtifact) -> Result<Self, InferenceError> {
        if artifact.n_classes < 2 {
            return Err(InferenceError::Artifact(format!(
                "need at least 2 classes, got {}",
                artifact.n_classes
            )));
        }
        if artifact.trees.is_empty() {
            return Err(InferenceError::Artifact("forest has no trees".into()));
        }
        if let Some(names) = &artifact.feature_names {
            if names.len() != artifact.n_features || !layout::matches_layout(names) {
                return Err(InferenceError::Artifact(format!(
                    "feature names {:?} do not match layout {:?}",
                    names,
                    layout::FEATURE_LAYOUT
                )));
            }
        }
        if let Some(importances) = &artifact.feature_importances {
            if importances.len() != artifact.n_features {
                return Err(InferenceError::Artifact(format!(
                    "{} importances for {} features",
                    importances.len(),
                    artifact.n_features
                )));
            }
        }

        let trees = artifact
            .trees
            .iter()
            .enumerate()
            .map(|(i, t)| Tree::from_artifact(i, t, artifact.n_features, artifact.n_classes))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            n_features: artifact.n_features,
            n_classes: artifact.n_classes,
            importances: artifact.feature_importances,
            trees,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, InferenceError> {
        let artifact: ForestArtifact =
            serde_json::from_str(json).map_err(|e| InferenceError::Artifact(e.to_string()))?;
        Self::from_artifact(artifact)
    }

    pub fn load(path: &Path) -> Result<Self, InferenceError> {
        log::info!("Loading forest model from: {}", path.display());

        let json = std::fs::read_to_string(path)
            .map_err(|e| InferenceError::Artifact(format!("{}: {}", path.display(), e)))?;
        let model = Self::from_json(&json)?;

        log::info!(
            "Forest model loaded: {} trees, {} features, {} classes",
            model.trees.len(),
            model.n_features,
            model.n_classes
        );
        Ok(model)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn check_input(&self, x: &[f64]) -> Result<(), InferenceError> {
        if x.len() != self.n_features {
            return Err(InferenceError::ArityMismatch {
                expected: self.n_features,
                actual: x.len(),
            });
        }
        if let Some(i) = x.iter().position(|v| !v.is_finite()) {
            return Err(InferenceError::Runtime(format!("feature {} is not finite", i)));
        }
        Ok(())
    }
}

impl Classifier for ForestModel {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn arity(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, InferenceError> {
        self.check_input(x)?;

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = *tree.path(x).last().unwrap_or(&0);
            for (p, v) in proba.iter_mut().zip(&tree.nodes[leaf].value) {
                *p += v;
            }
        }

        let n = self.trees.len() as f64;
        Ok(proba.into_iter().map(|p| p / n).collect())
    }

    fn predict_with_proba(&self, x: &[f64]) -> Result<(usize, Vec<f64>), InferenceError> {
        let proba = self.predict_proba(x)?;
        let class = argmax(&proba).ok_or_else(|| InferenceError::Runtime("empty probability vector".into()))?;
        Ok((class, proba))
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.importances.clone()
    }

    fn attribution(&self, x: &[f64], class: usize) -> Result<Attribution, ExplanationError> {
        self.check_input(x).map_err(|e| ExplanationError::Runtime(e.to_string()))?;
        if class >= self.n_classes {
            return Err(ExplanationError::Runtime(format!("class {} out of range", class)));
        }

        let mut baseline = 0.0;
        let mut contributions = vec![0.0; self.n_features];

        for tree in &self.trees {
            let path = tree.path(x);
            baseline += tree.nodes[0].value[class];
            for pair in path.windows(2) {
                let (parent, child) = (&tree.nodes[pair[0]], &tree.nodes[pair[1]]);
                if let Some(split) = &parent.split {
                    contributions[split.feature] += child.value[class] - parent.value[class];
                }
            }
        }

        let n = self.trees.len() as f64;
        Ok(Attribution {
            baseline: baseline / n,
            contributions: contributions.into_iter().map(|c| c / n).collect(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::logic::features::FEATURE_LAYOUT;

    /// Two stumps-with-depth over Glucose (1), BMI (5) and Age (7).
    ///
    /// Tree 0: Glucose <= 127.5 → negative leaf, else BMI <= 30 → mixed / positive.
    /// Tree 1: Age <= 28.5 → negative leaf, else positive leaf.
    pub(crate) fn sample_artifact() -> ForestArtifact {
        ForestArtifact {
            n_features: 8,
            n_classes: 2,
            feature_names: Some(FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect()),
            feature_importances: Some(vec![0.02, 0.40, 0.05, 0.03, 0.05, 0.20, 0.05, 0.20]),
            trees: vec![
                TreeArtifact {
                    children_left: vec![1, -1, 3, -1, -1],
                    children_right: vec![2, -1, 4, -1, -1],
                    feature: vec![1, -2, 5, -2, -2],
                    threshold: vec![127.5, -2.0, 30.0, -2.0, -2.0],
                    value: vec![
                        vec![60.0, 40.0],
                        vec![45.0, 5.0],
                        vec![15.0, 35.0],
                        vec![10.0, 10.0],
                        vec![5.0, 25.0],
                    ],
                },
                TreeArtifact {
                    children_left: vec![1, -1, -1],
                    children_right: vec![2, -1, -1],
                    feature: vec![7, -2, -2],
                    threshold: vec![28.5, -2.0, -2.0],
                    value: vec![vec![50.0, 50.0], vec![40.0, 10.0], vec![10.0, 40.0]],
                },
            ],
        }
    }

    pub(crate) fn sample_model() -> ForestModel {
        ForestModel::from_artifact(sample_artifact()).unwrap()
    }

    const POSITIVE: [f64; 8] = [2.0, 130.0, 70.0, 20.0, 85.0, 28.5, 0.5, 33.0];
    const NEGATIVE: [f64; 8] = [1.0, 90.0, 70.0, 20.0, 85.0, 22.0, 0.2, 25.0];

    #[test]
    fn test_predict_proba_is_mean_of_leaves() {
        let model = sample_model();
        // Tree 0 → node 3 (0.5, 0.5); tree 1 → node 2 (0.2, 0.8)
        let proba = model.predict_proba(&POSITIVE).unwrap();
        assert!((proba[0] - 0.35).abs() < 1e-12);
        assert!((proba[1] - 0.65).abs() < 1e-12);
        assert_eq!(model.predict(&POSITIVE).unwrap(), 1);
        assert_eq!(model.predict(&NEGATIVE).unwrap(), 0);
    }

    #[test]
    fn test_deterministic() {
        let model = sample_model();
        assert_eq!(model.predict_proba(&POSITIVE).unwrap(), model.predict_proba(&POSITIVE).unwrap());
        let reloaded = ForestModel::from_json(&serde_json::to_string(&sample_artifact()).unwrap()).unwrap();
        assert_eq!(model.predict_proba(&POSITIVE).unwrap(), reloaded.predict_proba(&POSITIVE).unwrap());
    }

    #[test]
    fn test_attribution_sums_to_probability() {
        let model = sample_model();
        let proba = model.predict_proba(&POSITIVE).unwrap();
        let attribution = model.attribution(&POSITIVE, 1).unwrap();

        let total = attribution.output();
        assert!((total - proba[1]).abs() < 1e-12);

        // Only features on the decision path get credit
        for (i, c) in attribution.contributions.iter().enumerate() {
            if ![1, 5, 7].contains(&i) {
                assert_eq!(*c, 0.0);
            }
        }
        // BMI 28.5 took the mixed branch: negative contribution
        assert!(attribution.contributions[5] < 0.0);
    }

    #[test]
    fn test_threshold_is_inclusive_left() {
        let model = sample_model();
        let mut x = POSITIVE;
        x[7] = 28.5;
        let attribution = model.attribution(&x, 1).unwrap();
        assert!(attribution.contributions[7] < 0.0);
    }

    #[test]
    fn test_rejects_mismatched_feature_names() {
        let mut artifact = sample_artifact();
        artifact.feature_names.as_mut().unwrap().swap(0, 1);
        assert!(matches!(ForestModel::from_artifact(artifact), Err(InferenceError::Artifact(_))));
    }

    #[test]
    fn test_rejects_cyclic_tree() {
        let mut artifact = sample_artifact();
        artifact.trees[1].children_left[0] = 0;
        assert!(ForestModel::from_artifact(artifact).is_err());
    }

    #[test]
    fn test_rejects_bad_split_feature() {
        let mut artifact = sample_artifact();
        artifact.trees[1].feature[0] = 8;
        assert!(ForestModel::from_artifact(artifact).is_err());
    }

    #[test]
    fn test_arity_follows_artifact() {
        let mut artifact = sample_artifact();
        artifact.n_features = 9;
        artifact.feature_names = None;
        artifact.feature_importances = None;
        let model = ForestModel::from_artifact(artifact).unwrap();
        assert_eq!(model.arity(), 9);
        assert!(matches!(
            model.predict_proba(&POSITIVE),
            Err(InferenceError::ArityMismatch { expected: 9, actual: 8 })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, serde_json::to_string(&sample_artifact()).unwrap()).unwrap();

        let model = ForestModel::load(&path).unwrap();
        assert_eq!(model.tree_count(), 2);
        assert_eq!(model.feature_importances().unwrap().len(), 8);
    }
}
