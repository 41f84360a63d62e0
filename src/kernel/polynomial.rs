//! Polynomial Kernel Implementation
//!
//! K(x, y) = (γ * <x, y> + r)^d

use crate::kernel::traits::{dot, Kernel};

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone, Copy)]
pub struct PolynomialKernel {
    /// Scaling factor for the dot product
    pub gamma: f64,
    /// Independent term in the polynomial
    pub coef0: f64,
    /// Degree of the polynomial
    pub degree: u32,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel
    ///
    /// # Panics
    /// Panics if `degree` is zero or `gamma` is not positive
    pub fn new(degree: u32, gamma: f64, coef0: f64) -> Self {
        assert!(degree > 0, "Polynomial degree must be positive");
        assert!(gamma > 0.0, "Gamma must be positive");
        Self {
            gamma,
            coef0,
            degree,
        }
    }
}

impl Default for PolynomialKernel {
    /// Cubic kernel (γ<x,y>)³ with γ = 1
    fn default() -> Self {
        Self::new(3, 1.0, 0.0)
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> f64 {
        (self.gamma * dot(x, y) + self.coef0).powi(self.degree as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadratic_kernel() {
        let kernel = PolynomialKernel::new(2, 1.0, 1.0);
        // (1*2 + 2*3 + 1)^2 = 81
        assert_eq!(kernel.compute(&[1.0, 2.0], &[2.0, 3.0]), 81.0);
    }

    #[test]
    fn test_default_is_cubic_without_offset() {
        let kernel = PolynomialKernel::default();
        assert_eq!(kernel.compute(&[2.0], &[1.0]), 8.0);
    }

    #[test]
    #[should_panic(expected = "Polynomial degree must be positive")]
    fn test_zero_degree_panics() {
        PolynomialKernel::new(0, 1.0, 0.0);
    }
}
