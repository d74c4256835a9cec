//! Classifier wrappers over the linfa model crates.
pub mod classifier;
pub mod factory;
pub mod forest;
pub mod logistic;
pub mod svm;

pub use classifier::Classifier;
pub use factory::build_model;
