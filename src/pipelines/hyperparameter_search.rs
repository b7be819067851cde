//! Hyperparameter search pipeline
//!
//! Samples network architectures and optimizers from a fixed search space,
//! trains each briefly on MNIST and keeps the configuration with the best
//! test accuracy. Trials minimize `loss = -accuracy`.

use crate::error::{PrimerError, Result};
use crate::optimizer::{
    Branch, HyperSearch, OptimizationConfig, Parameter, ParameterValue, SamplerType, SearchSpace,
    TrialOutcome, TrialParams,
};
use crate::preprocessing::SplitDataset;
use crate::training::{Activation, LayerConfig, MLPClassifier, MLPConfig, OptimizerKind};
use crate::utils::{load_mnist, MnistLimits};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Settings for [`run`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HyperparameterSearchConfig {
    /// Directory holding the four MNIST IDX files
    pub data_dir: PathBuf,
    pub n_trials: usize,
    /// Training epochs per trial
    pub epochs: usize,
    pub sampler: SamplerType,
    pub n_startup_trials: usize,
    /// Sampler seed; unseeded by default
    pub random_state: Option<u64>,
    /// Where the trial history is written; `None` skips persistence
    pub trials_path: Option<PathBuf>,
    pub max_train: Option<usize>,
    pub max_test: Option<usize>,
    /// Print one line per trial
    pub verbose: bool,
}

impl Default for HyperparameterSearchConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/mnist"),
            n_trials: 5,
            epochs: 1,
            sampler: SamplerType::TPE,
            n_startup_trials: 10,
            random_state: None,
            trials_path: Some(PathBuf::from("trials.json")),
            max_train: None,
            max_test: None,
            verbose: true,
        }
    }
}

impl HyperparameterSearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config; absent fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_n_trials(mut self, n: usize) -> Self {
        self.n_trials = n;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerType) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_trials_path(mut self, path: Option<PathBuf>) -> Self {
        self.trials_path = path;
        self
    }

    pub fn with_limits(mut self, max_train: Option<usize>, max_test: Option<usize>) -> Self {
        self.max_train = max_train;
        self.max_test = max_test;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn optimization_config(&self) -> OptimizationConfig {
        OptimizationConfig::new()
            .with_n_trials(self.n_trials)
            .with_sampler(self.sampler)
            .with_n_startup_trials(self.n_startup_trials)
            .with_random_state(self.random_state)
            .with_verbose(self.verbose)
    }
}

/// Outcome of [`run_search`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchReport {
    pub best_params: TrialParams,
    pub best_accuracy: f64,
    pub n_trials: usize,
    pub n_failed: usize,
    /// Set only when the trial history was written
    pub saved_to: Option<PathBuf>,
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.best_params.keys().collect();
        names.sort();
        for name in names {
            writeln!(f, "{}: {}", name, self.best_params[name])?;
        }
        Ok(())
    }
}

/// The architecture search space.
///
/// `extra_block = "four"` activates `extra_regularizer`.
pub fn search_space() -> SearchSpace {
    SearchSpace::new()
        .uniform("dropout_1", 0.0, 1.0)
        .choice("units_2", vec![256_i64, 512, 1024])
        .categorical("activation_2", vec!["relu", "sigmoid"])
        .uniform("dropout_2", 0.0, 1.0)
        .conditional(
            "extra_block",
            vec![
                Branch::empty("three"),
                Branch::new(
                    "four",
                    vec![Parameter::categorical("extra_regularizer", vec!["dropout", "linear"])],
                ),
            ],
        )
        .categorical("optimizer", vec!["rmsprop", "adam", "sgd"])
        .choice("batch_size", vec![64_i64, 128])
}

fn missing(name: &str) -> PrimerError {
    PrimerError::InvalidParameter {
        name: name.to_string(),
        value: "<missing>".to_string(),
        reason: "not present in trial parameters".to_string(),
    }
}

fn ill_typed(name: &str, value: &ParameterValue, expected: &str) -> PrimerError {
    PrimerError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: format!("expected {}", expected),
    }
}

fn float_param(params: &TrialParams, name: &str) -> Result<f64> {
    let value = params.get(name).ok_or_else(|| missing(name))?;
    value.as_float().ok_or_else(|| ill_typed(name, value, "a number"))
}

fn usize_param(params: &TrialParams, name: &str) -> Result<usize> {
    let value = params.get(name).ok_or_else(|| missing(name))?;
    value
        .as_int()
        .and_then(|v| usize::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| ill_typed(name, value, "a positive integer"))
}

fn str_param<'a>(params: &'a TrialParams, name: &str) -> Result<&'a str> {
    let value = params.get(name).ok_or_else(|| missing(name))?;
    value.as_string().ok_or_else(|| ill_typed(name, value, "a string"))
}

/// Translate sampled parameters into a model configuration
pub fn build_model_config(params: &TrialParams, epochs: usize) -> Result<MLPConfig> {
    let mut layers = vec![
        LayerConfig::new(512, Activation::ReLU).with_dropout(float_param(params, "dropout_1")?),
        LayerConfig::new(
            usize_param(params, "units_2")?,
            str_param(params, "activation_2")?.parse()?,
        )
        .with_dropout(float_param(params, "dropout_2")?),
    ];

    match str_param(params, "extra_block")? {
        "three" => {}
        "four" => {
            let dropout = match str_param(params, "extra_regularizer")? {
                "dropout" => 0.5,
                "linear" => 0.0,
                other => {
                    return Err(ill_typed(
                        "extra_regularizer",
                        &ParameterValue::from(other),
                        "dropout or linear",
                    ))
                }
            };
            layers.push(LayerConfig::new(100, Activation::ReLU).with_dropout(dropout));
        }
        other => {
            return Err(ill_typed(
                "extra_block",
                &ParameterValue::from(other),
                "three or four",
            ))
        }
    }

    let optimizer: OptimizerKind = str_param(params, "optimizer")?.parse()?;

    Ok(MLPConfig::new()
        .with_hidden_layers(layers)
        .with_optimizer(optimizer)
        .with_epochs(epochs)
        .with_batch_size(usize_param(params, "batch_size")?)
        .with_random_state(None))
}

/// Train one sampled configuration and score it on the test split
pub fn objective(params: &TrialParams, data: &SplitDataset, epochs: usize) -> Result<TrialOutcome> {
    let config = build_model_config(params, epochs)?;
    let mut model = MLPClassifier::new(config);
    model.fit(&data.x_train, &data.y_train)?;
    let accuracy = model.score(&data.x_test, &data.y_test)?;

    debug!(accuracy, "Trial scored");
    Ok(TrialOutcome::ok(-accuracy).with_metric("accuracy", accuracy))
}

/// Run the search on already-loaded data.
///
/// A failure to write the trial history is reported and otherwise ignored.
pub fn run_search(
    data: &SplitDataset,
    config: &HyperparameterSearchConfig,
) -> Result<SearchReport> {
    let mut search = HyperSearch::new(config.optimization_config(), search_space());
    search.optimize(|params| objective(params, data, config.epochs))?;

    let study = search.study();
    let best = study.best_trial().ok_or_else(|| {
        PrimerError::OptimizationError("no trial completed successfully".to_string())
    })?;
    let best_accuracy = best.metrics.get("accuracy").copied().unwrap_or(-best.loss);

    info!(
        best_trial = best.trial_id,
        best_accuracy,
        n_trials = study.trials.len(),
        "Best configuration found"
    );

    let saved_to = match &config.trials_path {
        Some(path) => match search.save_study(path) {
            Ok(()) => {
                info!(path = %path.display(), "Saved trial history");
                Some(path.clone())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not save trial history");
                println!("Could not save trials to {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };

    Ok(SearchReport {
        best_params: best.params.clone(),
        best_accuracy,
        n_trials: study.trials.len(),
        n_failed: study.n_failed(),
        saved_to,
    })
}

/// Load MNIST once, then search
pub fn run(config: &HyperparameterSearchConfig) -> Result<SearchReport> {
    let limits = MnistLimits {
        max_train: config.max_train,
        max_test: config.max_test,
    };
    let data = load_mnist(&config.data_dir, limits)?;
    run_search(&data, config)
}
