//! Core traits shared by datasets and classifiers

use crate::core::{argmax, Prediction, Sample};

/// Dataset abstraction for labeled samples
pub trait Dataset: Send + Sync {
    /// Number of samples in the dataset
    fn len(&self) -> usize;

    /// Number of features (dimensionality)
    fn dim(&self) -> usize;

    /// Get a single sample by index
    ///
    /// # Panics
    /// Panics if index >= len()
    fn get_sample(&self, i: usize) -> Sample;

    /// Get all class labels
    fn labels(&self) -> Vec<usize>;

    /// Copy every sample out of the dataset
    fn samples(&self) -> Vec<Sample> {
        (0..self.len()).map(|i| self.get_sample(i)).collect()
    }

    /// Number of samples per class, indexed by class
    fn class_counts(&self, n_classes: usize) -> Vec<usize> {
        let mut counts = vec![0; n_classes];
        for label in self.labels() {
            if label < n_classes {
                counts[label] += 1;
            }
        }
        counts
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A fitted classifier producing a probability distribution over classes
pub trait ProbabilisticClassifier: Send + Sync {
    /// Number of classes in the output distribution
    fn n_classes(&self) -> usize;

    /// Class probabilities for one (already scaled) feature vector
    fn predict_proba(&self, x: &[f64]) -> Vec<f64>;

    /// Most probable class index
    fn predict(&self, x: &[f64]) -> usize {
        argmax(&self.predict_proba(x))
    }

    /// Full prediction for one feature vector
    fn predict_full(&self, x: &[f64]) -> Prediction {
        Prediction::from_probabilities(self.predict_proba(x))
    }
}
