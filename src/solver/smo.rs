//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Solves the binary C-SVC dual
//!
//! ```text
//! min  ½ αᵀQα − eᵀα    s.t.  0 ≤ αᵢ ≤ C,  yᵀα = 0,   Qᵢⱼ = yᵢyⱼK(xᵢ, xⱼ)
//! ```
//!
//! by repeatedly optimizing a pair of multipliers. The pair is the maximal
//! violating pair with second-order gain selection, and the gradient
//! `G = Qα − e` is maintained incrementally from cached kernel rows.

use crate::cache::KernelCache;
use crate::core::{ClassifierError, OptimizationResult, OptimizerConfig, Result};
use crate::kernel::Kernel;
use log::{debug, warn};
use std::sync::Arc;

/// Lower bound on the curvature of a working-set pair
const TAU: f64 = 1e-12;

/// SMO solver for SVM optimization
pub struct SMOSolver<K: Kernel> {
    kernel: Arc<K>,
    config: OptimizerConfig,
}

impl<K: Kernel> SMOSolver<K> {
    /// Create a new SMO solver with the given kernel and configuration
    pub fn new(kernel: Arc<K>, config: OptimizerConfig) -> Self {
        Self { kernel, config }
    }

    /// Solve the SVM optimization problem
    ///
    /// `x` holds the training vectors and `y` their labels, which must be
    /// -1 or +1 with both classes present.
    pub fn solve(&self, x: &[Vec<f64>], y: &[f64]) -> Result<OptimizationResult> {
        self.validate(x, y)?;

        let n = x.len();
        let c = self.config.c;
        let mut cache = KernelCache::with_memory_limit(self.config.cache_size, n);
        let diag: Vec<f64> = x.iter().map(|xi| self.kernel.compute(xi, xi)).collect();

        let mut alpha = vec![0.0; n];
        // With α = 0 the gradient of the dual objective is −e
        let mut grad = vec![-1.0; n];
        let mut iterations = 0;
        let mut converged = true;

        loop {
            if iterations >= self.config.max_iterations {
                warn!(
                    "SMO reached the iteration limit ({}) before converging",
                    self.config.max_iterations
                );
                converged = false;
                break;
            }

            let Some((i, j)) = self.select_working_set(x, y, &alpha, &grad, &diag, &mut cache)
            else {
                break;
            };
            iterations += 1;

            let row_i = self.kernel_row(&mut cache, x, i);
            let row_j = self.kernel_row(&mut cache, x, j);
            let (old_ai, old_aj) = (alpha[i], alpha[j]);

            if y[i] != y[j] {
                let quad = positive_curvature(diag[i] + diag[j] - 2.0 * row_i[j]);
                let delta = (-grad[i] - grad[j]) / quad;
                let diff = alpha[i] - alpha[j];
                alpha[i] += delta;
                alpha[j] += delta;

                if diff > 0.0 {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = diff;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = -diff;
                }
                if diff > 0.0 {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = c - diff;
                    }
                } else if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = c + diff;
                }
            } else {
                let quad = positive_curvature(diag[i] + diag[j] - 2.0 * row_i[j]);
                let delta = (grad[i] - grad[j]) / quad;
                let sum = alpha[i] + alpha[j];
                alpha[i] -= delta;
                alpha[j] += delta;

                if sum > c {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = sum - c;
                    }
                    if alpha[j] > c {
                        alpha[j] = c;
                        alpha[i] = sum - c;
                    }
                } else {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = sum;
                    }
                    if alpha[i] < 0.0 {
                        alpha[i] = 0.0;
                        alpha[j] = sum;
                    }
                }
            }

            let delta_i = alpha[i] - old_ai;
            let delta_j = alpha[j] - old_aj;
            for k in 0..n {
                grad[k] += y[k] * (y[i] * row_i[k] * delta_i + y[j] * row_j[k] * delta_j);
            }
        }

        let rho = self.calculate_rho(y, &alpha, &grad);
        let support_vectors: Vec<usize> = alpha
            .iter()
            .enumerate()
            .filter(|(_, &a)| a > 0.0)
            .map(|(i, _)| i)
            .collect();
        let objective_value = alpha
            .iter()
            .zip(&grad)
            .map(|(a, g)| a * (g - 1.0))
            .sum::<f64>()
            / 2.0;

        let stats = cache.stats();
        debug!(
            "SMO finished: {} support vectors, cache hit rate {:.2} ({}/{}), {}/{} rows cached",
            support_vectors.len(),
            cache.hit_rate(),
            stats.hits,
            stats.hits + stats.misses,
            stats.size,
            stats.capacity
        );

        Ok(OptimizationResult {
            alpha,
            rho,
            support_vectors,
            iterations,
            objective_value,
            converged,
        })
    }

    fn validate(&self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.is_empty() {
            return Err(ClassifierError::EmptyDataset);
        }
        if x.len() != y.len() {
            return Err(ClassifierError::DimensionMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        if self.config.c <= 0.0 || !self.config.c.is_finite() {
            return Err(ClassifierError::InvalidParameter(format!(
                "C must be positive, got: {}",
                self.config.c
            )));
        }

        let dim = x[0].len();
        if let Some(row) = x.iter().find(|row| row.len() != dim) {
            return Err(ClassifierError::DimensionMismatch {
                expected: dim,
                actual: row.len(),
            });
        }

        // Validate labels are binary (-1 or +1)
        for &label in y {
            if label != 1.0 && label != -1.0 {
                return Err(ClassifierError::InvalidLabel(label));
            }
        }
        if !y.contains(&1.0) || !y.contains(&-1.0) {
            return Err(ClassifierError::InvalidDataset(
                "binary problem needs samples of both classes".to_string(),
            ));
        }

        Ok(())
    }

    /// Kernel row K(i, ·), served from the cache when possible
    fn kernel_row(&self, cache: &mut KernelCache, x: &[Vec<f64>], i: usize) -> Arc<[f64]> {
        cache.row(i, || {
            x.iter()
                .map(|xk| self.kernel.compute(&x[i], xk))
                .collect()
        })
    }

    /// Pick the maximal violating pair, or `None` once the KKT gap is below epsilon
    fn select_working_set(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        alpha: &[f64],
        grad: &[f64],
        diag: &[f64],
        cache: &mut KernelCache,
    ) -> Option<(usize, usize)> {
        let c = self.config.c;
        let mut g_max = f64::NEG_INFINITY;
        let mut g_max2 = f64::NEG_INFINITY;
        let mut i_best = None;

        for t in 0..y.len() {
            let in_up_set = if y[t] > 0.0 { alpha[t] < c } else { alpha[t] > 0.0 };
            if in_up_set && -y[t] * grad[t] >= g_max {
                g_max = -y[t] * grad[t];
                i_best = Some(t);
            }
        }

        let i = i_best?;
        let row_i = self.kernel_row(cache, x, i);
        let mut j_best = None;
        let mut obj_diff_min = f64::INFINITY;

        for t in 0..y.len() {
            let in_low_set = if y[t] > 0.0 { alpha[t] > 0.0 } else { alpha[t] < c };
            if !in_low_set {
                continue;
            }

            let y_grad = y[t] * grad[t];
            if y_grad >= g_max2 {
                g_max2 = y_grad;
            }

            let grad_diff = g_max + y_grad;
            if grad_diff > 0.0 {
                let quad = positive_curvature(diag[i] + diag[t] - 2.0 * row_i[t]);
                let obj_diff = -(grad_diff * grad_diff) / quad;
                if obj_diff <= obj_diff_min {
                    obj_diff_min = obj_diff;
                    j_best = Some(t);
                }
            }
        }

        if g_max + g_max2 < self.config.epsilon {
            return None;
        }
        j_best.map(|j| (i, j))
    }

    /// Offset of the decision function from the KKT conditions
    fn calculate_rho(&self, y: &[f64], alpha: &[f64], grad: &[f64]) -> f64 {
        let c = self.config.c;
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut free_count = 0usize;

        for t in 0..y.len() {
            let y_grad = y[t] * grad[t];
            if alpha[t] >= c {
                if y[t] < 0.0 {
                    upper = upper.min(y_grad);
                } else {
                    lower = lower.max(y_grad);
                }
            } else if alpha[t] <= 0.0 {
                if y[t] > 0.0 {
                    upper = upper.min(y_grad);
                } else {
                    lower = lower.max(y_grad);
                }
            } else {
                free_count += 1;
                free_sum += y_grad;
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else {
            (upper + lower) / 2.0
        }
    }
}

fn positive_curvature(quad: f64) -> f64 {
    if quad > 0.0 {
        quad
    } else {
        TAU
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{LinearKernel, RBFKernel};
    use approx::assert_relative_eq;

    fn decision(
        kernel: &impl Kernel,
        x: &[Vec<f64>],
        y: &[f64],
        result: &OptimizationResult,
        point: &[f64],
    ) -> f64 {
        result
            .support_vectors
            .iter()
            .map(|&i| result.alpha[i] * y[i] * kernel.compute(&x[i], point))
            .sum::<f64>()
            - result.rho
    }

    #[test]
    fn test_smo_solver_empty_dataset() {
        let solver = SMOSolver::new(Arc::new(LinearKernel::new()), OptimizerConfig::default());
        let result = solver.solve(&[], &[]);
        assert!(matches!(result, Err(ClassifierError::EmptyDataset)));
    }

    #[test]
    fn test_smo_solver_invalid_labels() {
        let solver = SMOSolver::new(Arc::new(LinearKernel::new()), OptimizerConfig::default());
        let result = solver.solve(&[vec![1.0], vec![2.0]], &[1.0, 0.5]);
        assert!(matches!(result, Err(ClassifierError::InvalidLabel(l)) if l == 0.5));
    }

    #[test]
    fn test_smo_solver_single_class_rejected() {
        let solver = SMOSolver::new(Arc::new(LinearKernel::new()), OptimizerConfig::default());
        let result = solver.solve(&[vec![1.0], vec![2.0]], &[1.0, 1.0]);
        assert!(matches!(result, Err(ClassifierError::InvalidDataset(_))));
    }

    #[test]
    fn test_smo_solver_length_mismatch() {
        let solver = SMOSolver::new(Arc::new(LinearKernel::new()), OptimizerConfig::default());
        let result = solver.solve(&[vec![1.0], vec![2.0]], &[1.0]);
        assert!(matches!(
            result,
            Err(ClassifierError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_smo_solver_two_point_margin() {
        let kernel = LinearKernel::new();
        let solver = SMOSolver::new(Arc::new(kernel), OptimizerConfig::default());

        let x = vec![vec![2.0], vec![-2.0]];
        let y = vec![1.0, -1.0];
        let result = solver.solve(&x, &y).expect("Should solve successfully");

        // The maximum-margin solution is w = 0.5, b = 0: both points on the margin
        assert_relative_eq!(result.alpha[0], 0.125, epsilon = 1e-9);
        assert_relative_eq!(result.alpha[1], 0.125, epsilon = 1e-9);
        assert_relative_eq!(result.rho, 0.0, epsilon = 1e-9);
        assert_eq!(result.support_vectors, vec![0, 1]);
        assert_relative_eq!(decision(&kernel, &x, &y, &result, &[2.0]), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_smo_solver_respects_box_constraint() {
        let mut config = OptimizerConfig::default();
        config.c = 0.05;
        let solver = SMOSolver::new(Arc::new(LinearKernel::new()), config);

        let x = vec![vec![2.0], vec![-2.0], vec![1.5], vec![-1.5]];
        let y = vec![1.0, -1.0, 1.0, -1.0];
        let result = solver.solve(&x, &y).expect("Should solve");

        for &a in &result.alpha {
            assert!((0.0..=0.05 + 1e-12).contains(&a));
        }
        let balance: f64 = result.alpha.iter().zip(&y).map(|(a, l)| a * l).sum();
        assert_relative_eq!(balance, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_smo_solver_xor_with_rbf() {
        let kernel = RBFKernel::new(1.0);
        let mut config = OptimizerConfig::default();
        config.c = 10.0;
        let solver = SMOSolver::new(Arc::new(kernel), config);

        let x = vec![
            vec![1.0, 1.0],
            vec![-1.0, -1.0],
            vec![1.0, -1.0],
            vec![-1.0, 1.0],
        ];
        let y = vec![-1.0, -1.0, 1.0, 1.0];
        let result = solver.solve(&x, &y).expect("Should solve");

        for (point, &label) in x.iter().zip(&y) {
            let value = decision(&kernel, &x, &y, &result, point);
            assert_eq!(value.signum(), label);
        }
        assert!(result.objective_value < 0.0);
    }

    #[test]
    fn test_smo_solver_max_iterations() {
        let mut config = OptimizerConfig::default();
        config.max_iterations = 1;
        let solver = SMOSolver::new(Arc::new(RBFKernel::new(1.0)), config);

        let x = vec![
            vec![1.0, 1.0],
            vec![-1.0, -1.0],
            vec![1.0, -1.0],
            vec![-1.0, 1.0],
        ];
        let y = vec![-1.0, -1.0, 1.0, 1.0];
        let result = solver.solve(&x, &y).expect("Should stop at the limit");
        assert_eq!(result.iterations, 1);
        assert!(!result.converged);
    }
}
