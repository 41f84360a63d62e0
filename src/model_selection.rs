//! Stratified splitting, cross-validation folds and SVM grid search

use crate::core::{ClassifierError, ProbabilisticClassifier, Result, Sample};
use crate::kernel::KernelKind;
use crate::metrics::accuracy;
use crate::svm::SVC;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Indices of each class, in input order
fn indices_by_class(samples: &[Sample]) -> Vec<Vec<usize>> {
    let n_classes = samples.iter().map(|s| s.label + 1).max().unwrap_or(0);
    let mut groups = vec![Vec::new(); n_classes];
    for (i, sample) in samples.iter().enumerate() {
        groups[sample.label].push(i);
    }
    groups
}

/// Split samples into `(train, test)` preserving class proportions
///
/// Each class is shuffled with a seeded RNG and `round(n_class * test_fraction)`
/// of its members go to the test partition.
pub fn train_test_split_stratified(
    samples: &[Sample],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<Sample>, Vec<Sample>)> {
    if samples.is_empty() {
        return Err(ClassifierError::EmptyDataset);
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ClassifierError::InvalidParameter(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();

    for mut group in indices_by_class(samples) {
        if group.is_empty() {
            continue;
        }
        group.shuffle(&mut rng);
        let n_test = (group.len() as f64 * test_fraction).round() as usize;
        let (test, train) = group.split_at(n_test.min(group.len()));
        test_idx.extend_from_slice(test);
        train_idx.extend_from_slice(train);
    }

    // Interleave classes instead of leaving them in blocks
    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    let pick = |idx: &[usize]| idx.iter().map(|&i| samples[i].clone()).collect();
    Ok((pick(&train_idx), pick(&test_idx)))
}

/// K-fold splitter keeping class balance in every fold
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    seed: u64,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            seed: 0,
        }
    }

    /// Shuffle each class with the given seed before dealing
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// `(train_indices, validation_indices)` for every fold
    pub fn split(&self, samples: &[Sample]) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        if self.n_splits < 2 {
            return Err(ClassifierError::InvalidParameter(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if samples.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        let mut offset = 0;

        for (class, mut group) in indices_by_class(samples).into_iter().enumerate() {
            if group.is_empty() {
                continue;
            }
            if group.len() < self.n_splits {
                return Err(ClassifierError::InvalidParameter(format!(
                    "class {class} has {} samples, fewer than n_splits={}",
                    group.len(),
                    self.n_splits
                )));
            }
            if self.shuffle {
                group.shuffle(&mut rng);
            }
            // Continue dealing where the previous class stopped so fold sizes stay even
            for (j, idx) in group.into_iter().enumerate() {
                folds[(offset + j) % self.n_splits].push(idx);
            }
            offset += 1;
        }

        Ok((0..self.n_splits)
            .map(|k| {
                let train = folds
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != k)
                    .flat_map(|(_, fold)| fold.iter().copied())
                    .collect();
                (train, folds[k].clone())
            })
            .collect())
    }
}

/// Kernel width candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GammaSpec {
    /// `1 / (n_features * var(X))`
    Scale,
    /// `1 / n_features`
    Auto,
    #[serde(untagged)]
    Value(f64),
}

impl GammaSpec {
    /// Concrete gamma for a training matrix
    pub fn resolve(&self, samples: &[Sample]) -> f64 {
        let n_features = samples.first().map_or(1, |s| s.features.len()).max(1) as f64;
        match *self {
            GammaSpec::Scale => {
                let values: Vec<f64> = samples
                    .iter()
                    .flat_map(|s| s.features.iter().copied())
                    .collect();
                let n = values.len().max(1) as f64;
                let mean = values.iter().sum::<f64>() / n;
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                if var > 0.0 {
                    1.0 / (n_features * var)
                } else {
                    1.0
                }
            }
            GammaSpec::Auto => 1.0 / n_features,
            GammaSpec::Value(gamma) => gamma,
        }
    }
}

impl fmt::Display for GammaSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GammaSpec::Scale => write!(f, "scale"),
            GammaSpec::Auto => write!(f, "auto"),
            GammaSpec::Value(v) => write!(f, "{v}"),
        }
    }
}

/// Kernel family searched over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelFamily {
    Rbf,
    Poly,
}

impl KernelFamily {
    fn build(self, gamma: f64) -> KernelKind {
        match self {
            KernelFamily::Rbf => KernelKind::Rbf { gamma },
            KernelFamily::Poly => KernelKind::Poly {
                gamma,
                coef0: 0.0,
                degree: 3,
            },
        }
    }
}

/// One grid point and its cross-validated score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub c: f64,
    pub gamma: GammaSpec,
    pub kernel: KernelFamily,
    pub mean_score: f64,
    pub fold_scores: Vec<f64>,
}

/// Outcome of a grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult {
    /// Every combination in grid order
    pub points: Vec<GridPoint>,
    /// Index of the winning combination in `points`
    pub best_index: usize,
    /// Winner's kernel with gamma resolved on the full training data
    pub best_kernel: KernelKind,
}

impl GridSearchResult {
    pub fn best(&self) -> &GridPoint {
        &self.points[self.best_index]
    }

    pub fn best_c(&self) -> f64 {
        self.best().c
    }

    pub fn best_score(&self) -> f64 {
        self.best().mean_score
    }
}

/// Exhaustive search over C, gamma and kernel family
#[derive(Debug, Clone)]
pub struct GridSearch {
    c_values: Vec<f64>,
    gammas: Vec<GammaSpec>,
    kernels: Vec<KernelFamily>,
    folds: usize,
    seed: u64,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            c_values: vec![0.1, 1.0, 10.0, 100.0],
            gammas: vec![
                GammaSpec::Scale,
                GammaSpec::Auto,
                GammaSpec::Value(0.001),
                GammaSpec::Value(0.01),
            ],
            kernels: vec![KernelFamily::Rbf],
            folds: 5,
            seed: 42,
        }
    }
}

impl GridSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_c_values(mut self, c_values: Vec<f64>) -> Self {
        self.c_values = c_values;
        self
    }

    pub fn with_gammas(mut self, gammas: Vec<GammaSpec>) -> Self {
        self.gammas = gammas;
        self
    }

    pub fn with_kernels(mut self, kernels: Vec<KernelFamily>) -> Self {
        self.kernels = kernels;
        self
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of combinations evaluated
    pub fn n_candidates(&self) -> usize {
        self.c_values.len() * self.gammas.len() * self.kernels.len()
    }

    /// Score every combination by mean fold accuracy
    pub fn fit(&self, samples: &[Sample], n_classes: usize) -> Result<GridSearchResult> {
        if self.n_candidates() == 0 {
            return Err(ClassifierError::InvalidParameter(
                "parameter grid is empty".to_string(),
            ));
        }
        if let Some(c) = self.c_values.iter().find(|c| !(c.is_finite() && **c > 0.0)) {
            return Err(ClassifierError::InvalidParameter(format!(
                "C must be positive, got: {c}"
            )));
        }
        for gamma in &self.gammas {
            if let GammaSpec::Value(value) = *gamma {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ClassifierError::InvalidParameter(format!(
                        "gamma must be positive, got: {value}"
                    )));
                }
            }
        }
        let splits = StratifiedKFold::new(self.folds)
            .with_shuffle(self.seed)
            .split(samples)?;

        info!(
            "Fitting {} folds for each of {} candidates, totalling {} fits",
            self.folds,
            self.n_candidates(),
            self.folds * self.n_candidates()
        );

        let fold_data: Vec<(Vec<Sample>, Vec<Sample>)> = splits
            .iter()
            .map(|(train, valid)| {
                let pick = |idx: &[usize]| -> Vec<Sample> {
                    idx.iter().map(|&i| samples[i].clone()).collect()
                };
                (pick(train), pick(valid))
            })
            .collect();

        let mut points = Vec::with_capacity(self.n_candidates());
        for &c in &self.c_values {
            for &gamma in &self.gammas {
                for &family in &self.kernels {
                    let mut fold_scores = Vec::with_capacity(fold_data.len());
                    for (train, valid) in &fold_data {
                        let kernel = family.build(gamma.resolve(train));
                        let model = SVC::new(kernel).with_c(c).fit(train, n_classes)?;
                        let y_true: Vec<usize> = valid.iter().map(|s| s.label).collect();
                        let y_pred: Vec<usize> =
                            valid.iter().map(|s| model.predict(&s.features)).collect();
                        fold_scores.push(accuracy(&y_true, &y_pred));
                    }
                    let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                    debug!("C={c}, gamma={gamma}, kernel={family:?}: mean accuracy {mean_score:.4}");
                    points.push(GridPoint {
                        c,
                        gamma,
                        kernel: family,
                        mean_score,
                        fold_scores,
                    });
                }
            }
        }

        // Strict comparison keeps the earliest combination on ties
        let mut best_index = 0;
        for (i, point) in points.iter().enumerate() {
            if point.mean_score > points[best_index].mean_score {
                best_index = i;
            }
        }
        let best = &points[best_index];
        let best_kernel = best.kernel.build(best.gamma.resolve(samples));

        info!(
            "Best SVM params: C={}, gamma={}, kernel={} (CV accuracy {:.4})",
            best.c, best.gamma, best_kernel, best.mean_score
        );

        Ok(GridSearchResult {
            points,
            best_index,
            best_kernel,
        })
    }
}
