//! Offline training pipeline
//!
//! Loads the labeled dataset, fits the scaler and the soft-voting ensemble,
//! evaluates it on a held-out partition and writes both artifacts.

use crate::boosting::GradientBoosting;
use crate::core::{
    ClassifierError, Dataset, ProbabilisticClassifier, Result, Sample, Species, FEATURE_NAMES,
    N_CLASSES, N_FEATURES,
};
use crate::data::{iris_dataset, CsvDataset};
use crate::ensemble::{EnsembleMember, SoftVotingEnsemble};
use crate::metrics::{ClassificationReport, ConfusionMatrix};
use crate::model_selection::{
    train_test_split_stratified, GridSearch, GridSearchResult, KernelFamily,
};
use crate::persistence::{save_classifier, save_scaler, TrainingParams};
use crate::scaler::StandardScaler;
use crate::svm::SVC;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

/// File name of the scaler artifact inside the output directory
pub const SCALER_FILE: &str = "scaler.json";
/// File name of the classifier artifact inside the output directory
pub const MODEL_FILE: &str = "model.json";

/// Settings for one training run
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// CSV file to train on; the bundled iris data when `None`
    pub data_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub seed: u64,
    pub cv_folds: usize,
    pub test_size: f64,
    /// Add polynomial kernels to the grid
    pub with_poly: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            data_path: None,
            output_dir: PathBuf::from("."),
            seed: 42,
            cv_folds: 5,
            test_size: 0.2,
            with_poly: false,
        }
    }
}

/// Everything produced by fitting, before anything is written
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    pub scaler: StandardScaler,
    pub model: SoftVotingEnsemble,
    pub grid: GridSearchResult,
    pub params: TrainingParams,
    pub confusion: ConfusionMatrix,
    pub report: ClassificationReport,
}

/// Summary of a completed run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub params: TrainingParams,
    pub report: ClassificationReport,
    pub confusion: ConfusionMatrix,
    pub scaler_path: PathBuf,
    pub model_path: PathBuf,
}

/// Offline trainer
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn load_samples(&self) -> Result<Vec<Sample>> {
        let dataset = match &self.config.data_path {
            Some(path) => {
                info!("Loading dataset from {}", path.display());
                CsvDataset::from_file(path)?
            }
            None => {
                info!("Loading bundled iris dataset");
                iris_dataset()?
            }
        };

        if dataset.dim() != N_FEATURES {
            return Err(ClassifierError::InvalidDataset(format!(
                "expected {N_FEATURES} features, found {}",
                dataset.dim()
            )));
        }
        let counts = dataset.class_counts(N_CLASSES);
        if let Some(missing) = counts.iter().position(|&c| c == 0) {
            return Err(ClassifierError::InvalidDataset(format!(
                "species {} has no samples",
                Species::ALL[missing]
            )));
        }
        info!("Loaded {} samples, class counts {:?}", dataset.len(), counts);
        Ok(dataset.samples())
    }

    fn check_partition(name: &str, samples: &[Sample]) -> Result<()> {
        let mut counts = [0usize; N_CLASSES];
        for sample in samples {
            counts[sample.label] += 1;
        }
        if let Some(class) = counts.iter().position(|&c| c < 2) {
            return Err(ClassifierError::InvalidDataset(format!(
                "{name} partition has {} samples of {}, need at least 2",
                counts[class],
                Species::ALL[class]
            )));
        }
        Ok(())
    }

    /// Fit scaler and ensemble and evaluate them, without writing artifacts
    pub fn fit(&self) -> Result<FittedPipeline> {
        let start = Instant::now();
        let samples = self.load_samples()?;

        let (train, test) =
            train_test_split_stratified(&samples, self.config.test_size, self.config.seed)?;
        Self::check_partition("training", &train)?;
        Self::check_partition("test", &test)?;
        info!("Split into {} training and {} test samples", train.len(), test.len());

        let scaler = StandardScaler::fit(&train)?;
        let train = scaler.transform_samples(&train)?;
        let test = scaler.transform_samples(&test)?;

        info!("Training SVM with grid search...");
        let mut kernels = vec![KernelFamily::Rbf];
        if self.config.with_poly {
            kernels.push(KernelFamily::Poly);
        }
        let grid = GridSearch::new()
            .with_kernels(kernels)
            .with_folds(self.config.cv_folds)
            .with_seed(self.config.seed)
            .fit(&train, N_CLASSES)?;

        let svm = SVC::new(grid.best_kernel)
            .with_c(grid.best_c())
            .with_probability(true)
            .with_seed(self.config.seed)
            .fit(&train, N_CLASSES)?;
        if !svm.converged() {
            return Err(ClassifierError::NotConverged(format!(
                "SVM with C={} and {} hit the iteration limit",
                grid.best_c(),
                grid.best_kernel
            )));
        }

        info!("Training Gradient Boosting...");
        let boosting = GradientBoosting::new().fit(&train, N_CLASSES)?;

        info!("Creating soft-voting ensemble...");
        let model = SoftVotingEnsemble::new(vec![
            EnsembleMember::Svm(svm),
            EnsembleMember::GradientBoosting(boosting),
        ])?;

        let y_true: Vec<usize> = test.iter().map(|s| s.label).collect();
        let y_pred: Vec<usize> = test.iter().map(|s| model.predict(&s.features)).collect();
        let confusion = ConfusionMatrix::new(&y_true, &y_pred, N_CLASSES);
        let names: Vec<&str> = Species::ALL.iter().map(|s| s.name()).collect();
        let report = ClassificationReport::new(&y_true, &y_pred, &names);

        info!("Test accuracy: {:.4}", report.accuracy);
        info!("Confusion matrix:\n{confusion}");
        info!("Classification report:\n{report}");
        info!("Features: {}", FEATURE_NAMES.join(", "));
        info!("Training finished in {:.2?}", start.elapsed());

        let best = grid.best();
        let params = TrainingParams {
            c: best.c,
            gamma: best.gamma.to_string(),
            kernel: grid.best_kernel.to_string(),
            cv_score: best.mean_score,
            test_accuracy: report.accuracy,
            n_train: train.len(),
            n_test: test.len(),
            seed: self.config.seed,
        };

        Ok(FittedPipeline {
            scaler,
            model,
            grid,
            params,
            confusion,
            report,
        })
    }

    /// Fit, evaluate and write `scaler.json` and `model.json`
    pub fn run(&self) -> Result<TrainingReport> {
        let fitted = self.fit()?;

        std::fs::create_dir_all(&self.config.output_dir)?;
        let scaler_path = self.config.output_dir.join(SCALER_FILE);
        let model_path = self.config.output_dir.join(MODEL_FILE);

        save_scaler(&fitted.scaler, &scaler_path)?;
        info!("Scaler saved to {}", scaler_path.display());
        save_classifier(&fitted.model, &fitted.params, &model_path)?;
        info!("Model saved to {}", model_path.display());

        Ok(TrainingReport {
            params: fitted.params,
            report: fitted.report,
            confusion: fitted.confusion,
            scaler_path,
            model_path,
        })
    }
}
