//! Multi-class support vector classifier (one-vs-one)
//!
//! One binary machine is trained per class pair. Hard predictions use
//! majority voting; probabilities come from per-pair Platt sigmoids fitted on
//! cross-validated decision values and merged by pairwise coupling.

use crate::core::{
    argmax, ClassifierError, OptimizerConfig, ProbabilisticClassifier, Result, Sample,
};
use crate::kernel::KernelKind;
use crate::svm::binary::BinarySvm;
use crate::svm::platt::{couple_pairwise, PlattSigmoid};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Default number of internal folds used to calibrate probabilities
pub const DEFAULT_CALIBRATION_FOLDS: usize = 5;

/// Support vector classifier builder
#[derive(Debug, Clone)]
pub struct SVC {
    kernel: KernelKind,
    config: OptimizerConfig,
    probability: bool,
    calibration_folds: usize,
    seed: u64,
}

impl SVC {
    /// Create a classifier with the given kernel and default parameters
    pub fn new(kernel: KernelKind) -> Self {
        Self {
            kernel,
            config: OptimizerConfig::default(),
            probability: false,
            calibration_folds: DEFAULT_CALIBRATION_FOLDS,
            seed: 42,
        }
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.config.c = c;
        self
    }

    /// Set convergence tolerance
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    /// Set maximum number of SMO iterations per binary problem
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Enable probability calibration
    pub fn with_probability(mut self, probability: bool) -> Self {
        self.probability = probability;
        self
    }

    /// Seed for the calibration folds
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Regularization parameter C
    pub fn c(&self) -> f64 {
        self.config.c
    }

    /// Kernel the classifier will be trained with
    pub fn kernel(&self) -> KernelKind {
        self.kernel
    }

    /// Train on labeled samples with classes `0..n_classes`
    pub fn fit(&self, samples: &[Sample], n_classes: usize) -> Result<TrainedSVC> {
        self.kernel.validate()?;
        if samples.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }
        if n_classes < 2 {
            return Err(ClassifierError::InvalidParameter(format!(
                "need at least two classes, got {n_classes}"
            )));
        }

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

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut machines = Vec::with_capacity(n_classes * (n_classes - 1) / 2);

        for positive in 0..n_classes {
            for negative in positive + 1..n_classes {
                let (x, y): (Vec<Vec<f64>>, Vec<f64>) = samples
                    .iter()
                    .filter(|s| s.label == positive || s.label == negative)
                    .map(|s| {
                        let target = if s.label == positive { 1.0 } else { -1.0 };
                        (s.features.clone(), target)
                    })
                    .unzip();

                let svm = BinarySvm::fit(&x, &y, self.kernel, &self.config)?;
                let sigmoid = if self.probability {
                    Some(self.calibrate(&x, &y, &mut rng)?)
                } else {
                    None
                };

                debug!(
                    "Pair ({positive}, {negative}): {} support vectors, rho={:.6}",
                    svm.n_support_vectors(),
                    svm.rho()
                );

                machines.push(PairwiseMachine {
                    positive,
                    negative,
                    svm,
                    sigmoid,
                });
            }
        }

        Ok(TrainedSVC {
            n_classes,
            kernel: self.kernel,
            c: self.config.c,
            machines,
        })
    }

    /// Fit a sigmoid on decision values predicted by held-out folds
    fn calibrate(&self, x: &[Vec<f64>], y: &[f64], rng: &mut StdRng) -> Result<PlattSigmoid> {
        let n = x.len();
        let folds = self.calibration_folds.clamp(2, n.max(2));
        let mut perm: Vec<usize> = (0..n).collect();
        perm.shuffle(rng);

        let mut decision_values = vec![0.0; n];
        for fold in 0..folds {
            let start = fold * n / folds;
            let end = (fold + 1) * n / folds;
            let held_out = &perm[start..end];

            let (train_x, train_y): (Vec<Vec<f64>>, Vec<f64>) = perm[..start]
                .iter()
                .chain(&perm[end..])
                .map(|&i| (x[i].clone(), y[i]))
                .unzip();

            let has_positive = train_y.iter().any(|&l| l > 0.0);
            let has_negative = train_y.iter().any(|&l| l < 0.0);

            match (has_positive, has_negative) {
                (true, true) => {
                    let model = BinarySvm::fit(&train_x, &train_y, self.kernel, &self.config)?;
                    for &i in held_out {
                        decision_values[i] = model.decision_function(&x[i]);
                    }
                }
                (true, false) => held_out.iter().for_each(|&i| decision_values[i] = 1.0),
                (false, true) => held_out.iter().for_each(|&i| decision_values[i] = -1.0),
                (false, false) => held_out.iter().for_each(|&i| decision_values[i] = 0.0),
            }
        }

        Ok(PlattSigmoid::fit(&decision_values, y))
    }
}

/// Binary machine for one class pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseMachine {
    /// Class predicted by a positive decision value
    pub positive: usize,
    /// Class predicted by a negative decision value
    pub negative: usize,
    pub svm: BinarySvm,
    pub sigmoid: Option<PlattSigmoid>,
}

/// A trained one-vs-one support vector classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedSVC {
    n_classes: usize,
    kernel: KernelKind,
    c: f64,
    machines: Vec<PairwiseMachine>,
}

impl TrainedSVC {
    /// Decision value of every pairwise machine, in training order
    pub fn decision_values(&self, x: &[f64]) -> Vec<f64> {
        self.machines
            .iter()
            .map(|m| m.svm.decision_function(x))
            .collect()
    }

    /// Votes per class from the pairwise machines
    pub fn votes(&self, x: &[f64]) -> Vec<usize> {
        let mut votes = vec![0; self.n_classes];
        for machine in &self.machines {
            if machine.svm.decision_function(x) > 0.0 {
                votes[machine.positive] += 1;
            } else {
                votes[machine.negative] += 1;
            }
        }
        votes
    }

    /// Majority-vote prediction; ties go to the lowest class index
    pub fn predict_vote(&self, x: &[f64]) -> usize {
        let votes: Vec<f64> = self.votes(x).into_iter().map(|v| v as f64).collect();
        argmax(&votes)
    }

    /// Whether every machine carries a fitted sigmoid
    pub fn is_calibrated(&self) -> bool {
        self.machines.iter().all(|m| m.sigmoid.is_some())
    }

    /// Whether every pairwise machine converged
    pub fn converged(&self) -> bool {
        self.machines.iter().all(|m| m.svm.converged())
    }

    /// Total number of support vectors across machines
    pub fn n_support_vectors(&self) -> usize {
        self.machines.iter().map(|m| m.svm.n_support_vectors()).sum()
    }

    /// Kernel of the classifier
    pub fn kernel(&self) -> KernelKind {
        self.kernel
    }

    /// Regularization parameter C used in training
    pub fn c(&self) -> f64 {
        self.c
    }

    /// Pairwise machines
    pub fn machines(&self) -> &[PairwiseMachine] {
        &self.machines
    }
}

impl ProbabilisticClassifier for TrainedSVC {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Coupled Platt probabilities, or vote shares for an uncalibrated model
    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        if !self.is_calibrated() {
            let votes = self.votes(x);
            let total = votes.iter().sum::<usize>().max(1) as f64;
            return votes.into_iter().map(|v| v as f64 / total).collect();
        }

        let k = self.n_classes;
        let mut pairwise = vec![vec![0.0; k]; k];
        for machine in &self.machines {
            if let Some(sigmoid) = &machine.sigmoid {
                let p = sigmoid.clipped_probability(machine.svm.decision_function(x));
                pairwise[machine.positive][machine.negative] = p;
                pairwise[machine.negative][machine.positive] = 1.0 - p;
            }
        }
        couple_pairwise(&pairwise)
    }

    fn predict(&self, x: &[f64]) -> usize {
        self.predict_vote(x)
    }
}
