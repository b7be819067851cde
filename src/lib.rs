//! ml-primer - feature scaling and hyperparameter search for small classifiers
//!
//! This crate provides two pipelines over a compact ML toolkit:
//! - Scaling comparison: identity, global min-max and per-feature z-score
//!   features, each used to train the same feed-forward classifier
//! - Hyperparameter search: random or TPE sampling over a declarative
//!   search space with conditional branches, trained on MNIST
//!
//! # Modules
//!
//! - [`preprocessing`] - Label encoding, train/test split, scaling
//! - [`training`] - Multi-layer perceptron, optimizers, metrics
//! - [`optimizer`] - Search space, samplers, trial loop
//! - [`pipelines`] - The two end-to-end pipelines
//! - [`utils`] - CSV and MNIST IDX loading
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod optimizer;

// Pipelines and I/O
pub mod pipelines;
pub mod utils;

// Services
pub mod cli;

pub use error::{PrimerError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{PrimerError, Result};
    pub use crate::optimizer::{
        Branch, HyperSearch, OptimizationConfig, Parameter, ParameterValue, SamplerType,
        SearchSpace, Study, TrialOutcome, TrialParams, TrialStatus,
    };
    pub use crate::pipelines::{
        ComparisonReport, HyperparameterSearchConfig, ScalingComparisonConfig, SearchReport,
    };
    pub use crate::preprocessing::{
        one_hot, train_test_split, LabelEncoder, Scaler, ScalerType, SplitDataset,
    };
    pub use crate::training::{Activation, LayerConfig, MLPClassifier, MLPConfig, OptimizerKind};
    pub use crate::utils::{load_mnist, MnistLimits, TabularLoader};
}
