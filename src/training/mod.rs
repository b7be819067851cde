//! Model training module
//!
//! Provides the feed-forward classifier both pipelines train:
//! - Multi-layer perceptron with per-layer activation and dropout
//! - SGD, RMSprop and Adam update rules
//! - Accuracy and cross-entropy metrics

pub mod metrics;
pub mod neural_network;
mod optim;

pub use metrics::{accuracy, log_loss};
pub use neural_network::{Activation, LayerConfig, MLPClassifier, MLPConfig};
pub use optim::OptimizerKind;
