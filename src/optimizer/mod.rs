//! Hyperparameter optimization module
//!
//! Provides a sequential search driver over a declarative search space:
//! - Float, integer, categorical and boolean parameters
//! - Conditional branches that activate nested parameters
//! - Random search and Tree-structured Parzen Estimators (TPE)
//! - Trial history with JSON persistence

mod config;
mod optimizer;
mod samplers;
mod search_space;

pub use config::OptimizationConfig;
pub use optimizer::{HyperSearch, Study, TrialOutcome, TrialResult, TrialStatus};
pub use samplers::{create_sampler, RandomSampler, Sampler, SamplerType, TPESampler};
pub use search_space::{Branch, Parameter, ParameterType, ParameterValue, SearchSpace, TrialParams};
