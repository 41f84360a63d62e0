//! Artifact serialization and persistence
//!
//! The trainer writes two JSON artifacts, a fitted scaler and the ensemble
//! classifier. Both are wrapped in an envelope recording the artifact kind,
//! format version, library version and creation time, which loading checks
//! before trusting the payload.

use crate::core::{ClassifierError, ProbabilisticClassifier, Result};
use crate::ensemble::{EnsembleMember, SoftVotingEnsemble};
use crate::scaler::StandardScaler;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Version of the on-disk layout; bumped on incompatible changes
pub const FORMAT_VERSION: u32 = 1;

/// What an artifact file contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Scaler,
    Classifier,
}

impl ArtifactKind {
    fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Classifier => "classifier",
        }
    }
}

/// Envelope shared by both artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub format_version: u32,
    pub kind: ArtifactKind,
    /// Library version used to create the artifact
    pub library_version: String,
    pub created_at: DateTime<Utc>,
    pub payload: T,
}

impl<T> Artifact<T> {
    fn new(kind: ArtifactKind, payload: T) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            kind,
            library_version: crate::VERSION.to_string(),
            created_at: Utc::now(),
            payload,
        }
    }
}

/// Parameters chosen during training, kept for reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub c: f64,
    /// Gamma as searched (`scale`, `auto` or a number)
    pub gamma: String,
    /// Kernel with gamma resolved
    pub kernel: String,
    pub cv_score: f64,
    pub test_accuracy: f64,
    pub n_train: usize,
    pub n_test: usize,
    pub seed: u64,
}

/// Classifier artifact payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierPayload {
    pub model: SoftVotingEnsemble,
    pub training_params: TrainingParams,
}

fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn read_artifact<T: DeserializeOwned, P: AsRef<Path>>(
    path: P,
    expected: ArtifactKind,
) -> Result<Artifact<T>> {
    let file = File::open(path.as_ref())?;
    let artifact: Artifact<T> = serde_json::from_reader(BufReader::new(file))?;
    check_envelope(artifact.kind, artifact.format_version, expected)?;
    Ok(artifact)
}

fn check_envelope(kind: ArtifactKind, format_version: u32, expected: ArtifactKind) -> Result<()> {
    if kind != expected {
        return Err(ClassifierError::SerializationError(format!(
            "expected a {} artifact, found {}",
            expected.as_str(),
            kind.as_str()
        )));
    }
    if format_version != FORMAT_VERSION {
        return Err(ClassifierError::SerializationError(format!(
            "unsupported format version {format_version} (expected {FORMAT_VERSION})"
        )));
    }
    Ok(())
}

/// Save a fitted scaler
pub fn save_scaler<P: AsRef<Path>>(scaler: &StandardScaler, path: P) -> Result<()> {
    write_json(&Artifact::new(ArtifactKind::Scaler, scaler), path)
}

/// Load a fitted scaler
pub fn load_scaler<P: AsRef<Path>>(path: P) -> Result<StandardScaler> {
    Ok(read_artifact::<StandardScaler, _>(path, ArtifactKind::Scaler)?.payload)
}

/// Save the trained ensemble together with its training parameters
pub fn save_classifier<P: AsRef<Path>>(
    model: &SoftVotingEnsemble,
    training_params: &TrainingParams,
    path: P,
) -> Result<()> {
    #[derive(Serialize)]
    struct PayloadRef<'a> {
        model: &'a SoftVotingEnsemble,
        training_params: &'a TrainingParams,
    }

    let payload = PayloadRef {
        model,
        training_params,
    };
    write_json(&Artifact::new(ArtifactKind::Classifier, payload), path)
}

/// Load the trained ensemble and its training parameters
pub fn load_classifier<P: AsRef<Path>>(path: P) -> Result<ClassifierPayload> {
    Ok(read_artifact::<ClassifierPayload, _>(path, ArtifactKind::Classifier)?.payload)
}

/// Print a human-readable summary of any artifact file
pub fn print_summary<P: AsRef<Path>>(path: P) -> Result<()> {
    let file = File::open(path.as_ref())?;
    let value: serde_json::Value = serde_json::from_reader(BufReader::new(file))?;
    let kind: ArtifactKind = serde_json::from_value(value["kind"].clone())?;

    match kind {
        ArtifactKind::Scaler => {
            let artifact: Artifact<StandardScaler> = serde_json::from_value(value)?;
            check_envelope(artifact.kind, artifact.format_version, ArtifactKind::Scaler)?;
            print_header(&artifact);
            let scaler = &artifact.payload;
            println!("Samples Seen: {}", scaler.n_samples_seen());
            println!("Mean: {:?}", scaler.mean());
            println!("Scale: {:?}", scaler.scale());
        }
        ArtifactKind::Classifier => {
            let artifact: Artifact<ClassifierPayload> = serde_json::from_value(value)?;
            check_envelope(artifact.kind, artifact.format_version, ArtifactKind::Classifier)?;
            print_header(&artifact);
            let model = &artifact.payload.model;
            let params = &artifact.payload.training_params;
            println!("Model: {}", model.description());
            println!("Classes: {}", model.n_classes());
            for member in model.members() {
                match member {
                    EnsembleMember::Svm(svm) => println!(
                        "  SVM: kernel {}, C {}, {} support vectors, calibrated: {}",
                        svm.kernel(),
                        svm.c(),
                        svm.n_support_vectors(),
                        svm.is_calibrated()
                    ),
                    EnsembleMember::GradientBoosting(gb) => println!(
                        "  Gradient Boosting: {} stages, learning rate {}",
                        gb.n_stages(),
                        gb.learning_rate()
                    ),
                }
            }
            println!("Training Parameters:");
            println!("  C: {}", params.c);
            println!("  Gamma: {}", params.gamma);
            println!("  Kernel: {}", params.kernel);
            println!("  CV Accuracy: {:.4}", params.cv_score);
            println!("  Test Accuracy: {:.4}", params.test_accuracy);
            println!("  Train/Test Samples: {}/{}", params.n_train, params.n_test);
            println!("  Seed: {}", params.seed);
        }
    }
    Ok(())
}

fn print_header<T>(artifact: &Artifact<T>) {
    println!("=== irisvm {} Artifact ===", artifact.kind.as_str());
    println!("Format Version: {}", artifact.format_version);
    println!("Library Version: {}", artifact.library_version);
    println!("Created: {}", artifact.created_at.to_rfc3339());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boosting::GradientBoosting;
    use crate::core::Sample;
    use crate::kernel::KernelKind;
    use crate::svm::SVC;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    fn toy_samples() -> Vec<Sample> {
        let mut samples = Vec::new();
        for i in 0..6 {
            let d = i as f64 * 0.1;
            samples.push(Sample::new(vec![0.0 + d, 0.0], 0));
            samples.push(Sample::new(vec![3.0 + d, 0.0], 1));
            samples.push(Sample::new(vec![0.0 + d, 3.0], 2));
        }
        samples
    }

    fn params() -> TrainingParams {
        TrainingParams {
            c: 1.0,
            gamma: "scale".to_string(),
            kernel: "rbf(gamma=0.500000)".to_string(),
            cv_score: 0.95,
            test_accuracy: 1.0,
            n_train: 18,
            n_test: 0,
            seed: 42,
        }
    }

    #[test]
    fn test_scaler_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("scaler.json");
        let scaler = StandardScaler::fit(&toy_samples())?;

        save_scaler(&scaler, &path)?;
        assert_eq!(load_scaler(&path)?, scaler);

        let text = std::fs::read_to_string(&path)?;
        assert!(text.contains("\"kind\": \"scaler\""));
        assert!(text.contains("\"created_at\""));
        Ok(())
    }

    #[test]
    fn test_classifier_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("model.json");
        let samples = toy_samples();

        let svm = SVC::new(KernelKind::Rbf { gamma: 0.5 }).fit(&samples, 3)?;
        let gb = GradientBoosting::new()
            .with_n_estimators(5)
            .fit(&samples, 3)?;
        let model = SoftVotingEnsemble::new(vec![
            EnsembleMember::Svm(svm),
            EnsembleMember::GradientBoosting(gb),
        ])?;

        save_classifier(&model, &params(), &path)?;
        let loaded = load_classifier(&path)?;

        assert_eq!(loaded.training_params, params());
        assert_eq!(loaded.model.description(), model.description());
        for sample in &samples {
            let expected = model.predict_proba(&sample.features);
            let actual = loaded.model.predict_proba(&sample.features);
            for (a, e) in actual.iter().zip(&expected) {
                assert_relative_eq!(*a, *e, epsilon = 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn test_kind_mismatch_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("scaler.json");
        save_scaler(&StandardScaler::fit(&toy_samples())?, &path)?;

        assert!(matches!(
            load_classifier(&path),
            Err(ClassifierError::SerializationError(_))
        ));
        Ok(())
    }

    #[test]
    fn test_format_version_checked() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("scaler.json");
        save_scaler(&StandardScaler::fit(&toy_samples())?, &path)?;

        let text = std::fs::read_to_string(&path)?.replace(
            &format!("\"format_version\": {FORMAT_VERSION}"),
            "\"format_version\": 99",
        );
        std::fs::write(&path, text)?;

        let err = load_scaler(&path).unwrap_err();
        assert!(err.to_string().contains("format version 99"));
        Ok(())
    }

    #[test]
    fn test_missing_and_malformed_files() -> Result<()> {
        let dir = TempDir::new()?;
        assert!(matches!(
            load_scaler(dir.path().join("absent.json")),
            Err(ClassifierError::IoError(_))
        ));

        let garbage = dir.path().join("garbage.json");
        std::fs::write(&garbage, "not json")?;
        assert!(matches!(
            load_scaler(&garbage),
            Err(ClassifierError::SerializationError(_))
        ));
        Ok(())
    }
}
