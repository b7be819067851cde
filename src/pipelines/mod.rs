//! End-to-end pipelines
//!
//! - [`scaling_comparison`] - raw vs min-max vs z-score features on one classifier
//! - [`hyperparameter_search`] - architecture and optimizer search on MNIST

pub mod hyperparameter_search;
pub mod scaling_comparison;

pub use hyperparameter_search::{HyperparameterSearchConfig, SearchReport};
pub use scaling_comparison::{ComparisonReport, ScalerAccuracy, ScalingComparisonConfig};
