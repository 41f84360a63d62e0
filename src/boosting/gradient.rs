//! Gradient boosting for multi-class classification
//!
//! Multinomial deviance with one regression tree per class and stage:
//! - raw scores start at the log class priors
//! - each tree is fitted to the residual `y_k − p_k`
//! - leaves are replaced by a single Newton step `(K−1)/K · Σr / Σ|r|(1−|r|)`
//! - probabilities are the softmax of the raw scores

use crate::boosting::tree::{RegressionTree, TreeConfig};
use crate::core::{ClassifierError, ProbabilisticClassifier, Result, Sample};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gradient boosting builder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub tree: TreeConfig,
}

impl Default for GradientBoosting {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            tree: TreeConfig::default(),
        }
    }
}

impl GradientBoosting {
    /// Builder with the default configuration (100 stages, rate 0.1, depth 3)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of boosting stages
    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    /// Set the shrinkage applied to every stage
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Set the maximum tree depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.tree.max_depth = max_depth;
        self
    }

    /// Train on labeled samples with classes `0..n_classes`
    pub fn fit(&self, samples: &[Sample], n_classes: usize) -> Result<TrainedGradientBoosting> {
        if samples.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }
        if n_classes < 2 {
            return Err(ClassifierError::InvalidParameter(format!(
                "need at least two classes, got {n_classes}"
            )));
        }
        if self.n_estimators == 0 {
            return Err(ClassifierError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ClassifierError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }

        let n = samples.len();
        let mut counts = vec![0usize; n_classes];
        for sample in samples {
            if sample.label >= n_classes {
                return Err(ClassifierError::InvalidDataset(format!(
                    "label {} outside 0..{n_classes}",
                    sample.label
                )));
            }
            counts[sample.label] += 1;
        }
        if let Some(missing) = counts.iter().position(|&c| c == 0) {
            return Err(ClassifierError::InvalidDataset(format!(
                "class {missing} has no training samples"
            )));
        }

        let x: Vec<Vec<f64>> = samples.iter().map(|s| s.features.clone()).collect();
        let init: Vec<f64> = counts
            .iter()
            .map(|&c| (c as f64 / n as f64).ln())
            .collect();
        let mut raw: Vec<Vec<f64>> = vec![init.clone(); n];
        let mut stages = Vec::with_capacity(self.n_estimators);
        let k_factor = (n_classes - 1) as f64 / n_classes as f64;

        for stage in 0..self.n_estimators {
            let probabilities: Vec<Vec<f64>> = raw.iter().map(|r| softmax(r)).collect();
            let mut trees = Vec::with_capacity(n_classes);

            for k in 0..n_classes {
                let residuals: Vec<f64> = samples
                    .iter()
                    .zip(&probabilities)
                    .map(|(s, p)| indicator(s.label == k) - p[k])
                    .collect();

                let mut tree = RegressionTree::fit(&x, &residuals, &self.tree);

                let mut leaves: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
                for (row, &r) in x.iter().zip(&residuals) {
                    let entry = leaves.entry(tree.apply(row)).or_insert((0.0, 0.0));
                    entry.0 += r;
                    entry.1 += r.abs() * (1.0 - r.abs());
                }
                for (&leaf, &(numerator, denominator)) in &leaves {
                    let value = if denominator.abs() < 1e-150 {
                        0.0
                    } else {
                        k_factor * numerator / denominator
                    };
                    tree.set_leaf_value(leaf, value);
                }

                for (row, scores) in x.iter().zip(raw.iter_mut()) {
                    scores[k] += self.learning_rate * tree.predict(row);
                }
                trees.push(tree);
            }

            stages.push(trees);

            if (stage + 1) % 10 == 0 {
                let deviance = samples
                    .iter()
                    .zip(&raw)
                    .map(|(s, r)| -softmax(r)[s.label].max(f64::MIN_POSITIVE).ln())
                    .sum::<f64>()
                    / n as f64;
                debug!("Boosting stage {}: train deviance {:.6}", stage + 1, deviance);
            }
        }

        Ok(TrainedGradientBoosting {
            n_classes,
            learning_rate: self.learning_rate,
            init,
            stages,
        })
    }
}

/// A fitted gradient boosting classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedGradientBoosting {
    n_classes: usize,
    learning_rate: f64,
    /// Log class priors
    init: Vec<f64>,
    /// `stages[m][k]` is the tree of stage `m` for class `k`
    stages: Vec<Vec<RegressionTree>>,
}

impl TrainedGradientBoosting {
    /// Raw (pre-softmax) score per class
    pub fn raw_scores(&self, x: &[f64]) -> Vec<f64> {
        let mut scores = self.init.clone();
        for trees in &self.stages {
            for (score, tree) in scores.iter_mut().zip(trees) {
                *score += self.learning_rate * tree.predict(x);
            }
        }
        scores
    }

    /// Number of boosting stages
    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    /// Shrinkage per stage
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

impl ProbabilisticClassifier for TrainedGradientBoosting {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        softmax(&self.raw_scores(x))
    }
}

/// Numerically stable softmax
pub fn softmax(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = values.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}
