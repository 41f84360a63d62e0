//! Gradient-boosted regression trees

pub mod gradient;
pub mod tree;

pub use self::gradient::{softmax, GradientBoosting, TrainedGradientBoosting};
pub use self::tree::{Node, RegressionTree, TreeConfig};
