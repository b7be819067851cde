//! Scaling comparison pipeline
//!
//! Trains the same classifier on raw, min-max normalized and standardized
//! copies of one tabular dataset and reports test accuracy for each.

use crate::error::{PrimerError, Result};
use crate::preprocessing::{
    one_hot, train_test_split, LabelEncoder, Scaler, ScalerType, SplitDataset,
};
use crate::training::{Activation, LayerConfig, MLPClassifier, MLPConfig, OptimizerKind};
use crate::utils::TabularLoader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Settings for [`run`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingComparisonConfig {
    /// CSV file with a header row
    pub data_path: PathBuf,
    /// Column holding the class label
    pub label_column: usize,
    /// Numeric feature columns (half-open)
    pub feature_columns: Range<usize>,
    pub train_fraction: f64,
    /// Seed for the train/test shuffle
    pub split_seed: u64,
    pub hidden_layers: Vec<LayerConfig>,
    pub optimizer: OptimizerKind,
    pub learning_rate: Option<f64>,
    pub epochs: usize,
    pub batch_size: usize,
    /// Seed shared by all three models
    pub model_seed: Option<u64>,
}

impl Default for ScalingComparisonConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/measurements.csv"),
            label_column: 2,
            feature_columns: 5..11,
            train_fraction: 0.75,
            split_seed: 42,
            hidden_layers: vec![
                LayerConfig::new(64, Activation::ReLU).with_dropout(0.2),
                LayerConfig::new(32, Activation::ReLU).with_dropout(0.2),
            ],
            optimizer: OptimizerKind::Adam,
            learning_rate: None,
            epochs: 50,
            batch_size: 32,
            model_seed: Some(7),
        }
    }
}

impl ScalingComparisonConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config; absent fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_label_column(mut self, column: usize) -> Self {
        self.label_column = column;
        self
    }

    pub fn with_feature_columns(mut self, columns: Range<usize>) -> Self {
        self.feature_columns = columns;
        self
    }

    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    pub fn with_split_seed(mut self, seed: u64) -> Self {
        self.split_seed = seed;
        self
    }

    pub fn with_hidden_layers(mut self, layers: Vec<LayerConfig>) -> Self {
        self.hidden_layers = layers;
        self
    }

    pub fn with_learning_rate(mut self, lr: Option<f64>) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_model_seed(mut self, seed: Option<u64>) -> Self {
        self.model_seed = seed;
        self
    }

    /// Model settings shared by every scaling strategy
    pub fn model_config(&self) -> MLPConfig {
        let config = MLPConfig::new()
            .with_hidden_layers(self.hidden_layers.clone())
            .with_optimizer(self.optimizer)
            .with_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_random_state(self.model_seed);
        match self.learning_rate {
            Some(lr) => config.with_learning_rate(lr),
            None => config,
        }
    }
}

/// Test accuracy of one scaling strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalerAccuracy {
    pub scaler: ScalerType,
    pub accuracy: f64,
}

/// Outcome of [`compare_scalers`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub n_train: usize,
    pub n_test: usize,
    /// Class names in code order
    pub classes: Vec<String>,
    pub results: Vec<ScalerAccuracy>,
}

impl ComparisonReport {
    /// Strategy with the highest accuracy; the earliest wins ties
    pub fn best(&self) -> Option<&ScalerAccuracy> {
        self.results.iter().fold(None, |best, r| match best {
            Some(b) if b.accuracy >= r.accuracy => Some(b),
            _ => Some(r),
        })
    }

    pub fn accuracy_of(&self, scaler: ScalerType) -> Option<f64> {
        self.results.iter().find(|r| r.scaler == scaler).map(|r| r.accuracy)
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.results {
            writeln!(f, "{}: {:.2}", r.scaler.name(), r.accuracy)?;
        }
        Ok(())
    }
}

/// Load the CSV, encode labels and split into train and test sets
pub fn prepare(config: &ScalingComparisonConfig) -> Result<(SplitDataset, LabelEncoder)> {
    let data = TabularLoader::new()
        .with_label_column(config.label_column)
        .with_feature_columns(config.feature_columns.clone())
        .load(&config.data_path)?;

    if data.is_empty() {
        return Err(PrimerError::DataError(format!(
            "{} has no data rows",
            config.data_path.display()
        )));
    }

    let mut encoder = LabelEncoder::new();
    let codes = encoder.fit_transform(&data.labels)?;
    let targets = one_hot(&codes, encoder.n_classes())?;

    let split = train_test_split(
        &data.features,
        &targets,
        config.train_fraction,
        config.split_seed,
    )?;

    info!(
        rows = data.len(),
        classes = encoder.n_classes(),
        train = split.n_train(),
        test = split.n_test(),
        "Prepared dataset"
    );

    Ok((split, encoder))
}

/// Fit each scaler on the train split, then train and score a fresh model
pub fn compare_scalers(
    split: &SplitDataset,
    encoder: &LabelEncoder,
    config: &ScalingComparisonConfig,
) -> Result<ComparisonReport> {
    let mut results = Vec::with_capacity(ScalerType::ALL.len());

    for scaler_type in ScalerType::ALL {
        let start = Instant::now();

        let mut scaler = Scaler::new(scaler_type);
        let x_train = scaler.fit_transform(&split.x_train)?;
        let x_test = scaler.transform(&split.x_test)?;

        let mut model = MLPClassifier::new(config.model_config());
        model.fit(&x_train, &split.y_train)?;
        let accuracy = model.score(&x_test, &split.y_test)?;

        debug!(
            scaler = scaler_type.name(),
            final_loss = ?model.loss_history().last(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model trained"
        );
        info!(scaler = scaler_type.name(), accuracy, "Scored strategy");

        results.push(ScalerAccuracy {
            scaler: scaler_type,
            accuracy,
        });
    }

    Ok(ComparisonReport {
        n_train: split.n_train(),
        n_test: split.n_test(),
        classes: encoder.classes().to_vec(),
        results,
    })
}

/// Run the whole comparison
pub fn run(config: &ScalingComparisonConfig) -> Result<ComparisonReport> {
    let (split, encoder) = prepare(config)?;
    compare_scalers(&split, &encoder, config)
}
