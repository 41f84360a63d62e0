//! Iris species classifier with an HTTP prediction service
//!
//! A soft-voting ensemble of a one-vs-one kernel SVM (SMO solver, Platt
//! calibrated) and a multinomial gradient boosting classifier, trained
//! offline on the iris dataset and served over HTTP.
//!
//! ```no_run
//! use irisvm::{Trainer, TrainerConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let report = Trainer::new(TrainerConfig {
//!     output_dir: "artifacts".into(),
//!     ..TrainerConfig::default()
//! })
//! .run()?;
//! println!("test accuracy: {:.3}", report.params.test_accuracy);
//! # Ok(())
//! # }
//! ```

pub mod boosting;
pub mod cache;
pub mod core;
pub mod data;
pub mod ensemble;
pub mod kernel;
pub mod metrics;
pub mod model_selection;
pub mod persistence;
pub mod scaler;
pub mod service;
pub mod solver;
pub mod svm;
pub mod trainer;

// Re-export main types for convenience
pub use crate::boosting::{GradientBoosting, TrainedGradientBoosting};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{ClassifierError, Result};
pub use crate::data::{iris_dataset, CsvDataset};
pub use crate::ensemble::{EnsembleMember, SoftVotingEnsemble};
pub use crate::kernel::{Kernel, KernelKind};
pub use crate::metrics::{accuracy, ClassificationReport, ConfusionMatrix};
pub use crate::model_selection::{
    train_test_split_stratified, GammaSpec, GridSearch, GridSearchResult, StratifiedKFold,
};
pub use crate::scaler::StandardScaler;
pub use crate::service::{AppContext, ArtifactPaths, ServiceSettings};
pub use crate::svm::{TrainedSVC, SVC};
pub use crate::trainer::{Trainer, TrainerConfig, TrainingReport};

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
