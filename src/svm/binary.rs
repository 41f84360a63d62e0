//! Binary kernel SVM built from an SMO solution

use crate::core::{OptimizerConfig, Result};
use crate::kernel::{Kernel, KernelKind};
use crate::solver::SMOSolver;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A trained two-class SVM: f(x) = Σ αᵢyᵢK(xᵢ, x) − ρ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinarySvm {
    kernel: KernelKind,
    support_vectors: Vec<Vec<f64>>,
    /// αᵢ·yᵢ for each support vector
    coefficients: Vec<f64>,
    rho: f64,
    #[serde(default = "solver_converged")]
    converged: bool,
}

fn solver_converged() -> bool {
    true
}

impl BinarySvm {
    /// Train on vectors `x` with labels `y` in {-1, +1}
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        kernel: KernelKind,
        config: &OptimizerConfig,
    ) -> Result<Self> {
        let solver = SMOSolver::new(Arc::new(kernel), config.clone());
        let result = solver.solve(x, y)?;
        debug!(
            "Binary SVM: {} iterations, dual objective {:.6}",
            result.iterations, result.objective_value
        );

        let support_vectors = result
            .support_vectors
            .iter()
            .map(|&i| x[i].clone())
            .collect();
        let coefficients = result
            .support_vectors
            .iter()
            .map(|&i| result.alpha[i] * y[i])
            .collect();

        Ok(Self {
            kernel,
            support_vectors,
            coefficients,
            rho: result.rho,
            converged: result.converged,
        })
    }

    /// Signed distance-like score; positive means the +1 class
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.coefficients)
            .map(|(sv, coef)| coef * self.kernel.compute(sv, x))
            .sum::<f64>()
            - self.rho
    }

    /// Whether SMO met the KKT tolerance before its iteration limit
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.len()
    }

    /// Offset term ρ
    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Kernel used by the machine
    pub fn kernel(&self) -> KernelKind {
        self.kernel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_svm_separates_line() {
        let x = vec![vec![2.0], vec![-2.0], vec![1.5], vec![-1.5]];
        let y = vec![1.0, -1.0, 1.0, -1.0];
        let svm = BinarySvm::fit(&x, &y, KernelKind::Linear, &OptimizerConfig::default())
            .expect("Training should succeed");

        assert!(svm.n_support_vectors() > 0);
        assert!(svm.decision_function(&[1.0]) > 0.0);
        assert!(svm.decision_function(&[-1.0]) < 0.0);
    }

    #[test]
    fn test_binary_svm_serde_preserves_decisions() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 2.0], vec![2.0, 0.0]];
        let y = vec![1.0, -1.0, 1.0, -1.0];
        let svm = BinarySvm::fit(&x, &y, KernelKind::Rbf { gamma: 0.5 }, &OptimizerConfig::default())
            .unwrap();

        let json = serde_json::to_string(&svm).unwrap();
        let restored: BinarySvm = serde_json::from_str(&json).unwrap();
        let probe = [0.3, 0.9];
        assert_eq!(svm.decision_function(&probe), restored.decision_function(&probe));
    }
}
