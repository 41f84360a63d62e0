//! Kernel support vector classification

pub mod binary;
pub mod multiclass;
pub mod platt;

pub use self::binary::BinarySvm;
pub use self::multiclass::{PairwiseMachine, TrainedSVC, DEFAULT_CALIBRATION_FOLDS, SVC};
pub use self::platt::{couple_pairwise, PlattSigmoid};
