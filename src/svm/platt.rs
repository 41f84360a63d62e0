//! Probability calibration for SVM decision values
//!
//! Platt scaling maps a decision value `f` to `P(y = +1 | f) = 1 / (1 + exp(A·f + B))`.
//! `A` and `B` are fitted by Newton's method with backtracking line search on
//! regularized targets (Lin, Lin & Weng, "A note on Platt's probabilistic
//! outputs for support vector machines"). Pairwise probabilities of a
//! one-vs-one machine are merged with the coupling method of Wu, Lin & Weng (2004).

use log::warn;
use serde::{Deserialize, Serialize};

const MAX_NEWTON_ITERATIONS: usize = 100;
const MIN_STEP: f64 = 1e-10;
const HESSIAN_RIDGE: f64 = 1e-12;
const GRADIENT_TOLERANCE: f64 = 1e-5;

/// Pairwise probabilities are clipped away from 0 and 1 before coupling
const MIN_PAIRWISE_PROBABILITY: f64 = 1e-7;

/// Fitted sigmoid parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlattSigmoid {
    pub a: f64,
    pub b: f64,
}

impl PlattSigmoid {
    /// Fit the sigmoid to decision values and their ±1 labels
    pub fn fit(decision_values: &[f64], labels: &[f64]) -> Self {
        let prior1 = labels.iter().filter(|&&l| l > 0.0).count() as f64;
        let prior0 = labels.len() as f64 - prior1;

        let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
        let lo_target = 1.0 / (prior0 + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&l| if l > 0.0 { hi_target } else { lo_target })
            .collect();

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = objective(decision_values, &targets, a, b);

        let mut converged = false;
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let mut h11 = HESSIAN_RIDGE;
            let mut h22 = HESSIAN_RIDGE;
            let mut h21 = 0.0;
            let mut g1 = 0.0;
            let mut g2 = 0.0;

            for (&f, &t) in decision_values.iter().zip(&targets) {
                let f_apb = f * a + b;
                let (p, q) = if f_apb >= 0.0 {
                    let e = (-f_apb).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = f_apb.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = t - p;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < GRADIENT_TOLERANCE && g2.abs() < GRADIENT_TOLERANCE {
                converged = true;
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            while step >= MIN_STEP {
                let new_a = a + step * da;
                let new_b = b + step * db;
                let new_f = objective(decision_values, &targets, new_a, new_b);
                if new_f < fval + 0.0001 * step * gd {
                    a = new_a;
                    b = new_b;
                    fval = new_f;
                    break;
                }
                step /= 2.0;
            }

            if step < MIN_STEP {
                warn!("Platt scaling line search failed; keeping current sigmoid");
                converged = true;
                break;
            }
        }

        if !converged {
            warn!("Platt scaling reached the Newton iteration limit");
        }

        Self { a, b }
    }

    /// Probability of the +1 class for a decision value
    pub fn probability(&self, decision_value: f64) -> f64 {
        let f_apb = decision_value * self.a + self.b;
        if f_apb >= 0.0 {
            let e = (-f_apb).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + f_apb.exp())
        }
    }

    /// Probability clipped into the open interval used for coupling
    pub fn clipped_probability(&self, decision_value: f64) -> f64 {
        self.probability(decision_value)
            .clamp(MIN_PAIRWISE_PROBABILITY, 1.0 - MIN_PAIRWISE_PROBABILITY)
    }
}

/// Negative log-likelihood of the sigmoid, written to avoid overflow
fn objective(decision_values: &[f64], targets: &[f64], a: f64, b: f64) -> f64 {
    decision_values
        .iter()
        .zip(targets)
        .map(|(&f, &t)| {
            let f_apb = f * a + b;
            if f_apb >= 0.0 {
                t * f_apb + (1.0 + (-f_apb).exp()).ln()
            } else {
                (t - 1.0) * f_apb + (1.0 + f_apb.exp()).ln()
            }
        })
        .sum()
}

/// Couple pairwise probabilities into a class distribution
///
/// `pairwise[i][j]` is the probability of class `i` given the sample is
/// either `i` or `j`; entries must satisfy `pairwise[j][i] = 1 − pairwise[i][j]`.
pub fn couple_pairwise(pairwise: &[Vec<f64>]) -> Vec<f64> {
    let k = pairwise.len();
    if k == 0 {
        return Vec::new();
    }
    if k == 1 {
        return vec![1.0];
    }

    let mut q = vec![vec![0.0; k]; k];
    for t in 0..k {
        for j in 0..k {
            if j == t {
                continue;
            }
            q[t][t] += pairwise[j][t] * pairwise[j][t];
            q[t][j] = -pairwise[j][t] * pairwise[t][j];
        }
    }

    let mut p = vec![1.0 / k as f64; k];
    let mut qp = vec![0.0; k];
    let max_iterations = 100.max(k);
    let tolerance = 0.005 / k as f64;

    let mut iteration = 0;
    while iteration < max_iterations {
        let mut p_qp = 0.0;
        for t in 0..k {
            qp[t] = (0..k).map(|j| q[t][j] * p[j]).sum();
            p_qp += p[t] * qp[t];
        }

        let max_error = qp
            .iter()
            .map(|&v| (v - p_qp).abs())
            .fold(0.0, f64::max);
        if max_error < tolerance {
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + p_qp) / q[t][t];
            p[t] += diff;
            p_qp = (p_qp + diff * (diff * q[t][t] + 2.0 * qp[t])) / ((1.0 + diff) * (1.0 + diff));
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
        iteration += 1;
    }

    if iteration >= max_iterations {
        warn!("Pairwise coupling reached the iteration limit");
    }

    let total: f64 = p.iter().sum();
    p.iter().map(|v| v / total).collect()
}
