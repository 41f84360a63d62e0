//! Serializable kernel selection
//!
//! Models store their kernel as a plain enum so they can be persisted and
//! shared across threads without generics leaking into the service.

use crate::core::{ClassifierError, Result};
use crate::kernel::{Kernel, LinearKernel, PolynomialKernel, RBFKernel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete kernel with its fitted parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: u32 },
}

impl KernelKind {
    /// Family name (`linear`, `rbf`, `poly`)
    pub fn family(&self) -> &'static str {
        match self {
            KernelKind::Linear => "linear",
            KernelKind::Rbf { .. } => "rbf",
            KernelKind::Poly { .. } => "poly",
        }
    }

    /// Check the parameters before training or after loading
    pub fn validate(&self) -> Result<()> {
        match *self {
            KernelKind::Linear => Ok(()),
            KernelKind::Rbf { gamma } | KernelKind::Poly { gamma, .. }
                if !(gamma.is_finite() && gamma > 0.0) =>
            {
                Err(ClassifierError::InvalidParameter(format!(
                    "gamma must be positive, got: {gamma}"
                )))
            }
            KernelKind::Poly { coef0, .. } if !coef0.is_finite() => Err(
                ClassifierError::InvalidParameter(format!("coef0 must be finite, got: {coef0}")),
            ),
            KernelKind::Poly { degree: 0, .. } => Err(ClassifierError::InvalidParameter(
                "polynomial degree must be positive".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

impl Kernel for KernelKind {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        match *self {
            KernelKind::Linear => LinearKernel.compute(x, y),
            KernelKind::Rbf { gamma } => RBFKernel { gamma }.compute(x, y),
            KernelKind::Poly {
                gamma,
                coef0,
                degree,
            } => PolynomialKernel {
                gamma,
                coef0,
                degree,
            }
            .compute(x, y),
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelKind::Linear => write!(f, "linear"),
            KernelKind::Rbf { gamma } => write!(f, "rbf(gamma={gamma:.6})"),
            KernelKind::Poly {
                gamma,
                coef0,
                degree,
            } => write!(f, "poly(degree={degree}, gamma={gamma:.6}, coef0={coef0})"),
        }
    }
}
