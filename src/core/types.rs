//! Core type definitions for the iris classifier

use crate::core::{ClassifierError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of measurements per flower
pub const N_FEATURES: usize = 4;

/// Number of species in the reference dataset
pub const N_CLASSES: usize = 3;

/// Feature names in input order, as reported by the API
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "sepal length (cm)",
    "sepal width (cm)",
    "petal length (cm)",
    "petal width (cm)",
];

/// Iris species (class labels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Setosa,
    Versicolor,
    Virginica,
}

impl Species {
    /// All species in class-index order
    pub const ALL: [Species; N_CLASSES] = [Species::Setosa, Species::Versicolor, Species::Virginica];

    /// Class index used for storage and probability vectors
    pub fn index(self) -> usize {
        match self {
            Species::Setosa => 0,
            Species::Versicolor => 1,
            Species::Virginica => 2,
        }
    }

    /// Species for a class index
    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or_else(|| ClassifierError::ParseError(format!("Unknown class index: {index}")))
    }

    /// Lowercase species name
    pub fn name(self) -> &'static str {
        match self {
            Species::Setosa => "setosa",
            Species::Versicolor => "versicolor",
            Species::Virginica => "virginica",
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Species {
    type Err = ClassifierError;

    /// Accepts `setosa`, `Iris-setosa` (any case) or a class index
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_matches('"');
        if let Ok(index) = trimmed.parse::<usize>() {
            return Self::from_index(index);
        }

        let lower = trimmed.to_ascii_lowercase();
        let name = lower.strip_prefix("iris-").unwrap_or(&lower);
        Self::ALL
            .iter()
            .copied()
            .find(|species| species.name() == name)
            .ok_or_else(|| ClassifierError::ParseError(format!("Unknown species: {trimmed}")))
    }
}

/// Labeled training sample
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// Dense feature vector
    pub features: Vec<f64>,
    /// Class index
    pub label: usize,
}

impl Sample {
    /// Create a new sample
    pub fn new(features: Vec<f64>, label: usize) -> Self {
        Self { features, label }
    }
}

/// Multi-class prediction: winning class and the full distribution
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Index of the most probable class
    pub class_index: usize,
    /// Probability per class, in class-index order
    pub probabilities: Vec<f64>,
}

impl Prediction {
    /// Build a prediction from a probability vector
    pub fn from_probabilities(probabilities: Vec<f64>) -> Self {
        let class_index = argmax(&probabilities);
        Self {
            class_index,
            probabilities,
        }
    }

    /// Probability of the predicted class
    pub fn confidence(&self) -> f64 {
        self.probabilities
            .get(self.class_index)
            .copied()
            .unwrap_or(0.0)
    }

    /// Predicted species
    pub fn species(&self) -> Result<Species> {
        Species::from_index(self.class_index)
    }
}

/// Index of the largest value; ties resolve to the lowest index
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Result of the binary optimization process
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Lagrange multipliers (alpha values)
    pub alpha: Vec<f64>,
    /// Offset subtracted from the decision value
    pub rho: f64,
    /// Indices of support vectors (where alpha > 0)
    pub support_vectors: Vec<usize>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Final dual objective value
    pub objective_value: f64,
    /// False when the iteration limit stopped the solver
    pub converged: bool,
}

/// Configuration for the SMO optimizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Tolerance on the KKT gap
    pub epsilon: f64,
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Kernel cache size in bytes
    pub cache_size: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.001,
            max_iterations: 100_000,
            cache_size: 16_000_000, // 16MB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_species_round_trip_index() {
        for species in Species::ALL {
            assert_eq!(Species::from_index(species.index()).unwrap(), species);
        }
        assert!(Species::from_index(3).is_err());
    }

    #[test]
    fn test_species_parsing() {
        assert_eq!("setosa".parse::<Species>().unwrap(), Species::Setosa);
        assert_eq!("Iris-versicolor".parse::<Species>().unwrap(), Species::Versicolor);
        assert_eq!("VIRGINICA".parse::<Species>().unwrap(), Species::Virginica);
        assert_eq!("\"setosa\"".parse::<Species>().unwrap(), Species::Setosa);
        assert_eq!("2".parse::<Species>().unwrap(), Species::Virginica);
        assert!("rose".parse::<Species>().is_err());
    }

    #[test]
    fn test_species_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Species::Versicolor).unwrap();
        assert_eq!(json, "\"versicolor\"");
    }

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(argmax(&[0.2, 0.5, 0.3]), 1);
        assert_eq!(argmax(&[0.4, 0.4, 0.2]), 0);
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn test_prediction_confidence() {
        let pred = Prediction::from_probabilities(vec![0.1, 0.7, 0.2]);
        assert_eq!(pred.class_index, 1);
        assert_eq!(pred.confidence(), 0.7);
        assert_eq!(pred.species().unwrap(), Species::Versicolor);
    }

    #[test]
    fn test_optimizer_config_default() {
        let config = OptimizerConfig::default();
        assert_eq!(config.c, 1.0);
        assert_eq!(config.epsilon, 0.001);
        assert_eq!(config.max_iterations, 100_000);
    }
}
