//! Soft-voting ensemble
//!
//! The ensemble averages the probability vectors of its members; the
//! prediction is the argmax of that average.

use crate::boosting::TrainedGradientBoosting;
use crate::core::{ClassifierError, ProbabilisticClassifier, Result};
use crate::svm::TrainedSVC;
use serde::{Deserialize, Serialize};

/// A fitted ensemble member
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnsembleMember {
    Svm(TrainedSVC),
    GradientBoosting(TrainedGradientBoosting),
}

impl EnsembleMember {
    /// Human-readable member name
    pub fn name(&self) -> &'static str {
        match self {
            EnsembleMember::Svm(_) => "SVM",
            EnsembleMember::GradientBoosting(_) => "Gradient Boosting",
        }
    }
}

impl ProbabilisticClassifier for EnsembleMember {
    fn n_classes(&self) -> usize {
        match self {
            EnsembleMember::Svm(m) => m.n_classes(),
            EnsembleMember::GradientBoosting(m) => m.n_classes(),
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        match self {
            EnsembleMember::Svm(m) => m.predict_proba(x),
            EnsembleMember::GradientBoosting(m) => m.predict_proba(x),
        }
    }
}

/// Averages member probabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftVotingEnsemble {
    n_classes: usize,
    members: Vec<EnsembleMember>,
}

impl SoftVotingEnsemble {
    /// Combine fitted members; all must share the same class count
    pub fn new(members: Vec<EnsembleMember>) -> Result<Self> {
        let first = members.first().ok_or_else(|| {
            ClassifierError::InvalidParameter("ensemble needs at least one member".to_string())
        })?;
        let n_classes = first.n_classes();

        if let Some(other) = members.iter().find(|m| m.n_classes() != n_classes) {
            return Err(ClassifierError::DimensionMismatch {
                expected: n_classes,
                actual: other.n_classes(),
            });
        }

        Ok(Self { n_classes, members })
    }

    /// E.g. `Ensemble (SVM + Gradient Boosting)`
    pub fn description(&self) -> String {
        let names: Vec<&str> = self.members.iter().map(EnsembleMember::name).collect();
        format!("Ensemble ({})", names.join(" + "))
    }

    /// Fitted members
    pub fn members(&self) -> &[EnsembleMember] {
        &self.members
    }
}

impl ProbabilisticClassifier for SoftVotingEnsemble {
    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        let mut average = vec![0.0; self.n_classes];
        for member in &self.members {
            for (acc, p) in average.iter_mut().zip(member.predict_proba(x)) {
                *acc += p;
            }
        }
        let count = self.members.len() as f64;
        average.iter_mut().for_each(|p| *p /= count);
        average
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boosting::GradientBoosting;
    use crate::core::Sample;
    use crate::kernel::KernelKind;
    use crate::svm::SVC;
    use approx::assert_relative_eq;

    fn samples() -> Vec<Sample> {
        let mut samples = Vec::new();
        for i in 0..8 {
            let jitter = (i as f64) * 0.05;
            samples.push(Sample::new(vec![-2.0 + jitter, 0.0 - jitter], 0));
            samples.push(Sample::new(vec![2.0 - jitter, 0.0 + jitter], 1));
            samples.push(Sample::new(vec![0.0 + jitter, 2.5 - jitter], 2));
        }
        samples
    }

    fn ensemble() -> SoftVotingEnsemble {
        let data = samples();
        let svm = SVC::new(KernelKind::Rbf { gamma: 0.5 })
            .with_probability(true)
            .fit(&data, 3)
            .unwrap();
        let gb = GradientBoosting::new()
            .with_n_estimators(20)
            .fit(&data, 3)
            .unwrap();
        SoftVotingEnsemble::new(vec![
            EnsembleMember::Svm(svm),
            EnsembleMember::GradientBoosting(gb),
        ])
        .unwrap()
    }

    #[test]
    fn test_average_of_member_probabilities() {
        let model = ensemble();
        let probe = [0.3, 0.4];
        let p = model.predict_proba(&probe);
        let a = model.members()[0].predict_proba(&probe);
        let b = model.members()[1].predict_proba(&probe);

        for k in 0..3 {
            assert_relative_eq!(p[k], (a[k] + b[k]) / 2.0, epsilon = 1e-12);
        }
        assert_relative_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_description_lists_members() {
        assert_eq!(ensemble().description(), "Ensemble (SVM + Gradient Boosting)");
    }

    #[test]
    fn test_prediction_is_argmax() {
        let model = ensemble();
        let pred = model.predict_full(&[-2.0, 0.0]);
        assert_eq!(pred.class_index, 0);
        assert_eq!(model.predict(&[-2.0, 0.0]), 0);
    }

    #[test]
    fn test_empty_ensemble_rejected() {
        assert!(SoftVotingEnsemble::new(Vec::new()).is_err());
    }
}
