//! Standard (z-score) feature scaling
//!
//! Statistics are fitted on the training partition only and reused verbatim
//! for every later transform, at evaluation time and in the service.

use crate::core::{ClassifierError, Result, Sample};
use serde::{Deserialize, Serialize};

/// Per-feature mean and scale learned from training data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    /// Population standard deviation; 1.0 for constant features
    scale: Vec<f64>,
    n_samples_seen: usize,
}

impl StandardScaler {
    /// Fit mean and population standard deviation of each feature
    pub fn fit(samples: &[Sample]) -> Result<Self> {
        let first = samples.first().ok_or(ClassifierError::EmptyDataset)?;
        let dim = first.features.len();
        if dim == 0 {
            return Err(ClassifierError::InvalidDataset(
                "samples have no features".to_string(),
            ));
        }

        let n = samples.len() as f64;
        let mut mean = vec![0.0; dim];
        for sample in samples {
            if sample.features.len() != dim {
                return Err(ClassifierError::DimensionMismatch {
                    expected: dim,
                    actual: sample.features.len(),
                });
            }
            for (m, &v) in mean.iter_mut().zip(&sample.features) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = vec![0.0; dim];
        for sample in samples {
            for ((var, &v), &m) in variance.iter_mut().zip(&sample.features).zip(&mean) {
                *var += (v - m) * (v - m);
            }
        }

        let scale = variance
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std < 1e-12 {
                    1.0
                } else {
                    std
                }
            })
            .collect();

        Ok(Self {
            mean,
            scale,
            n_samples_seen: samples.len(),
        })
    }

    /// Scale one feature vector
    pub fn transform(&self, features: &[f64]) -> Result<Vec<f64>> {
        if features.len() != self.mean.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: self.mean.len(),
                actual: features.len(),
            });
        }

        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }

    /// Scale the features of every sample, keeping labels
    pub fn transform_samples(&self, samples: &[Sample]) -> Result<Vec<Sample>> {
        samples
            .iter()
            .map(|s| Ok(Sample::new(self.transform(&s.features)?, s.label)))
            .collect()
    }

    /// Per-feature means
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Per-feature scales
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Number of features the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Number of samples the statistics came from
    pub fn n_samples_seen(&self) -> usize {
        self.n_samples_seen
    }
}
