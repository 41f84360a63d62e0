//! SVM solver implementations
//!
//! Sequential Minimal Optimization (SMO) for the C-SVC dual problem.

pub mod smo;

pub use self::smo::*;
