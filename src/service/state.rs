//! Immutable service state
//!
//! Artifacts are loaded exactly once when the context is built. A failed
//! load does not abort startup; it leaves the context in the `Failed` state
//! so that health checks and prediction calls can report it.

use crate::core::{
    ClassifierError, Prediction, ProbabilisticClassifier, Result, Species, N_CLASSES, N_FEATURES,
};
use crate::ensemble::{EnsembleMember, SoftVotingEnsemble};
use crate::persistence::{load_classifier, load_scaler};
use crate::scaler::StandardScaler;
use log::{error, info};
use std::path::{Path, PathBuf};

/// Model description reported before (or without) a loaded model
pub const MODEL_TYPE: &str = "Ensemble (SVM + Gradient Boosting)";

/// Accepted measurement range in centimeters, exclusive minimum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceSettings {
    pub min_feature: f64,
    pub max_feature: f64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            min_feature: 0.0,
            max_feature: 20.0,
        }
    }
}

impl ServiceSettings {
    /// Validate one named measurement
    pub fn check(&self, name: &str, value: f64) -> Result<f64> {
        if !value.is_finite() || value <= self.min_feature || value > self.max_feature {
            return Err(ClassifierError::InvalidInput(format!(
                "{name} must be a number in ({}, {}] cm, got {value}",
                self.min_feature, self.max_feature
            )));
        }
        Ok(value)
    }
}

/// Where the two artifacts live
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
}

impl ArtifactPaths {
    pub fn new(model: impl Into<PathBuf>, scaler: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            scaler: scaler.into(),
        }
    }

    /// `model.json` and `scaler.json` inside one directory
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            dir.join(crate::trainer::MODEL_FILE),
            dir.join(crate::trainer::SCALER_FILE),
        )
    }
}

/// Scaler and classifier loaded together
#[derive(Debug)]
pub struct LoadedModel {
    scaler: StandardScaler,
    model: SoftVotingEnsemble,
}

impl LoadedModel {
    /// Pair a scaler with a classifier after checking they fit the iris layout
    pub fn new(scaler: StandardScaler, model: SoftVotingEnsemble) -> Result<Self> {
        if scaler.n_features() != N_FEATURES {
            return Err(ClassifierError::DimensionMismatch {
                expected: N_FEATURES,
                actual: scaler.n_features(),
            });
        }
        if model.n_classes() != N_CLASSES {
            return Err(ClassifierError::InvalidDataset(format!(
                "classifier predicts {} classes, expected {N_CLASSES}",
                model.n_classes()
            )));
        }
        for member in model.members() {
            if let EnsembleMember::Svm(svm) = member {
                svm.kernel().validate()?;
            }
        }
        Ok(Self { scaler, model })
    }

    pub fn model(&self) -> &SoftVotingEnsemble {
        &self.model
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Scale raw measurements and run the ensemble
    pub fn predict(&self, features: &[f64]) -> Result<Prediction> {
        let scaled = self.scaler.transform(features)?;
        Ok(self.model.predict_full(&scaled))
    }
}

/// Outcome of loading the artifacts
#[derive(Debug)]
pub enum ModelState {
    Ready(LoadedModel),
    Failed(String),
}

/// Everything the handlers need, shared behind an `Arc`
#[derive(Debug)]
pub struct AppContext {
    state: ModelState,
    settings: ServiceSettings,
}

impl AppContext {
    /// Load both artifacts; failure is recorded, never raised
    pub fn load(paths: &ArtifactPaths, settings: ServiceSettings) -> Self {
        let loaded = load_scaler(&paths.scaler).and_then(|scaler| {
            let payload = load_classifier(&paths.model)?;
            LoadedModel::new(scaler, payload.model)
        });

        match loaded {
            Ok(model) => {
                info!(
                    "Model and scaler loaded from {} and {}",
                    paths.model.display(),
                    paths.scaler.display()
                );
                Self::ready(model, settings)
            }
            Err(e) => {
                error!("Failed to load model artifacts: {e}");
                Self::failed(e.to_string(), settings)
            }
        }
    }

    pub fn ready(model: LoadedModel, settings: ServiceSettings) -> Self {
        Self {
            state: ModelState::Ready(model),
            settings,
        }
    }

    pub fn failed(reason: impl Into<String>, settings: ServiceSettings) -> Self {
        Self {
            state: ModelState::Failed(reason.into()),
            settings,
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    /// Description of the served model
    pub fn model_type(&self) -> String {
        match &self.state {
            ModelState::Ready(loaded) => loaded.model.description(),
            ModelState::Failed(_) => MODEL_TYPE.to_string(),
        }
    }

    /// Predict from already validated raw measurements
    pub fn predict(&self, features: &[f64]) -> Result<(Species, Prediction)> {
        match &self.state {
            ModelState::Ready(loaded) => {
                let prediction = loaded.predict(features)?;
                let species = prediction.species()?;
                Ok((species, prediction))
            }
            ModelState::Failed(reason) => Err(ClassifierError::ModelUnavailable(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sample;
    use crate::kernel::KernelKind;
    use crate::svm::SVC;
    use tempfile::TempDir;

    #[test]
    fn test_settings_bounds() {
        let settings = ServiceSettings::default();
        assert_eq!(settings.check("x", 5.1).unwrap(), 5.1);
        assert_eq!(settings.check("x", 20.0).unwrap(), 20.0);
        assert!(settings.check("x", 0.0).is_err());
        assert!(settings.check("x", -1.0).is_err());
        assert!(settings.check("x", 20.5).is_err());
        assert!(settings.check("x", f64::NAN).is_err());
        assert!(settings.check("x", f64::INFINITY).is_err());
    }

    #[test]
    fn test_loaded_model_rejects_tampered_kernel() {
        let samples: Vec<Sample> = (0..N_CLASSES)
            .flat_map(|class| {
                (0..4).map(move |i| {
                    let base = class as f64 * 3.0 + i as f64 * 0.1;
                    Sample::new(vec![base, base, base, base], class)
                })
            })
            .collect();
        let scaler = StandardScaler::fit(&samples).unwrap();
        let svm = SVC::new(KernelKind::Rbf { gamma: 0.5 })
            .fit(&samples, N_CLASSES)
            .unwrap();
        let model = SoftVotingEnsemble::new(vec![EnsembleMember::Svm(svm)]).unwrap();

        let json = serde_json::to_string(&model)
            .unwrap()
            .replace("\"gamma\":0.5", "\"gamma\":0.0");
        let tampered: SoftVotingEnsemble = serde_json::from_str(&json).unwrap();

        assert!(LoadedModel::new(scaler.clone(), model).is_ok());
        assert!(matches!(
            LoadedModel::new(scaler, tampered),
            Err(ClassifierError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_artifacts_fail_softly() {
        let dir = TempDir::new().unwrap();
        let ctx = AppContext::load(&ArtifactPaths::in_dir(dir.path()), ServiceSettings::default());

        assert!(!ctx.is_ready());
        assert_eq!(ctx.model_type(), MODEL_TYPE);
        assert!(matches!(ctx.state(), ModelState::Failed(reason) if reason.contains("IO error")));
        assert!(matches!(
            ctx.predict(&[5.1, 3.5, 1.4, 0.2]),
            Err(ClassifierError::ModelUnavailable(_))
        ));
    }
}
