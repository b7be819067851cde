//! Neural Network (Multi-Layer Perceptron) classifier
//!
//! A feedforward network with per-layer activations and dropout, a softmax
//! output and categorical cross-entropy loss, trained with mini-batches for a
//! fixed number of epochs.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::metrics::{accuracy, log_loss};
use super::optim::{LayerOptimizer, OptimizerKind};
use crate::error::{PrimerError, Result};
use crate::preprocessing::argmax_rows;

/// Activation function for hidden layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// Rectified Linear Unit
    ReLU,
    /// Sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Linear (identity)
    Linear,
}

impl Default for Activation {
    fn default() -> Self {
        Self::ReLU
    }
}

impl Activation {
    pub fn name(&self) -> &'static str {
        match self {
            Activation::ReLU => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Linear => "linear",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = PrimerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "relu" => Ok(Activation::ReLU),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "linear" => Ok(Activation::Linear),
            other => Err(PrimerError::InvalidParameter {
                name: "activation".to_string(),
                value: other.to_string(),
                reason: "expected one of relu, sigmoid, tanh, linear".to_string(),
            }),
        }
    }
}

/// One hidden layer: dense units, activation, then dropout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub units: usize,
    pub activation: Activation,
    /// Fraction of outputs zeroed during training, in [0, 1]
    pub dropout: f64,
}

impl LayerConfig {
    pub fn new(units: usize, activation: Activation) -> Self {
        Self {
            units,
            activation,
            dropout: 0.0,
        }
    }

    pub fn with_dropout(mut self, rate: f64) -> Self {
        self.dropout = rate;
        self
    }
}

/// Neural Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPConfig {
    /// Hidden layers, input side first
    pub hidden_layers: Vec<LayerConfig>,
    /// Update rule
    pub optimizer: OptimizerKind,
    /// Learning rate; `None` uses the optimizer's default
    pub learning_rate: Option<f64>,
    /// Number of passes over the training data
    pub epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Seed for weight init, shuffling and dropout masks
    pub random_state: Option<u64>,
}

impl Default for MLPConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![
                LayerConfig::new(64, Activation::ReLU).with_dropout(0.2),
                LayerConfig::new(32, Activation::ReLU).with_dropout(0.2),
            ],
            optimizer: OptimizerKind::Adam,
            learning_rate: None,
            epochs: 50,
            batch_size: 32,
            random_state: Some(42),
        }
    }
}

impl MLPConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hidden_layers(mut self, layers: Vec<LayerConfig>) -> Self {
        self.hidden_layers = layers;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = Some(lr);
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

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PrimerError::InvalidParameter {
                name: "batch_size".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        for layer in &self.hidden_layers {
            if layer.units == 0 {
                return Err(PrimerError::InvalidParameter {
                    name: "units".to_string(),
                    value: "0".to_string(),
                    reason: "hidden layers need at least one unit".to_string(),
                });
            }
            if !(0.0..=1.0).contains(&layer.dropout) {
                return Err(PrimerError::InvalidParameter {
                    name: "dropout".to_string(),
                    value: layer.dropout.to_string(),
                    reason: "must be in [0, 1]".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Intermediate values of a training forward pass
struct ForwardPass {
    /// Layer inputs: `activations[0]` is the batch, the last entry the softmax output
    activations: Vec<Array2<f64>>,
    /// Pre-activation values of each hidden layer
    z_values: Vec<Array2<f64>>,
    /// Scaled dropout masks of each hidden layer
    masks: Vec<Option<Array2<f64>>>,
}

/// Multi-Layer Perceptron Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPClassifier {
    config: MLPConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    n_classes: usize,
    loss_history: Vec<f64>,
    is_fitted: bool,
}

impl MLPClassifier {
    pub fn new(config: MLPConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            n_classes: 0,
            loss_history: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn config(&self) -> &MLPConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Mean training loss of every completed epoch
    pub fn loss_history(&self) -> &[f64] {
        &self.loss_history
    }

    /// Fit on features `x` and one-hot targets `y`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array2<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(PrimerError::TrainingError("no training samples".to_string()));
        }
        if y.nrows() != n_samples {
            return Err(PrimerError::ShapeError {
                expected: format!("{} target rows", n_samples),
                actual: format!("{} target rows", y.nrows()),
            });
        }
        if y.ncols() == 0 {
            return Err(PrimerError::TrainingError("targets have no classes".to_string()));
        }

        self.n_features = x.ncols();
        self.n_classes = y.ncols();
        self.loss_history.clear();

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.initialize_weights(&mut rng);

        let lr = self
            .config
            .learning_rate
            .unwrap_or_else(|| self.config.optimizer.default_learning_rate());
        let mut optimizer =
            LayerOptimizer::new(self.config.optimizer, lr, &self.weights, &self.biases);

        let mut indices: Vec<usize> = (0..n_samples).collect();

        for epoch in 0..self.config.epochs {
            indices.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for batch_indices in indices.chunks(self.config.batch_size) {
                let x_batch = x.select(Axis(0), batch_indices);
                let y_batch = y.select(Axis(0), batch_indices);

                let pass = self.forward_train(&x_batch, &mut rng);
                let output = &pass.activations[pass.activations.len() - 1];
                epoch_loss += log_loss(&y_batch, output) * batch_indices.len() as f64;

                let gradients = self.backward(&y_batch, &pass);
                optimizer.step(&mut self.weights, &mut self.biases, &gradients);
            }

            let epoch_loss = epoch_loss / n_samples as f64;
            debug!(epoch = epoch + 1, loss = epoch_loss, "Epoch complete");
            self.loss_history.push(epoch_loss);
        }

        self.is_fitted = true;
        Ok(())
    }

    /// Predict class probabilities
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PrimerError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(PrimerError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let n_layers = self.weights.len();
        let mut a = x.to_owned();
        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = a.dot(w) + b;
            a = if i < n_layers - 1 {
                activate(&z, self.config.hidden_layers[i].activation)
            } else {
                softmax(&z)
            };
        }

        Ok(a)
    }

    /// Predict class indices
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(argmax_rows(&self.predict_proba(x)?))
    }

    /// Accuracy against one-hot targets
    pub fn score(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<f64> {
        let proba = self.predict_proba(x)?;
        Ok(accuracy(y, &proba))
    }

    fn initialize_weights(&mut self, rng: &mut Xoshiro256PlusPlus) {
        self.weights.clear();
        self.biases.clear();

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(self.config.hidden_layers.iter().map(|l| l.units));
        layer_sizes.push(self.n_classes);

        for pair in layer_sizes.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);

            // Glorot uniform
            let limit = (6.0 / (n_in + n_out) as f64).sqrt();
            let weights = Array2::from_shape_fn((n_in, n_out), |_| rng.gen_range(-limit..limit));

            self.weights.push(weights);
            self.biases.push(Array1::zeros(n_out));
        }
    }

    fn forward_train(&self, x: &Array2<f64>, rng: &mut Xoshiro256PlusPlus) -> ForwardPass {
        let n_layers = self.weights.len();
        let mut activations = vec![x.clone()];
        let mut z_values = Vec::with_capacity(n_layers - 1);
        let mut masks = Vec::with_capacity(n_layers - 1);

        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = activations[i].dot(w) + b;

            if i < n_layers - 1 {
                let layer = &self.config.hidden_layers[i];
                let mut a = activate(&z, layer.activation);
                let mask = dropout_mask(a.dim(), layer.dropout, rng);
                if let Some(m) = &mask {
                    a *= m;
                }
                z_values.push(z);
                masks.push(mask);
                activations.push(a);
            } else {
                activations.push(softmax(&z));
            }
        }

        ForwardPass {
            activations,
            z_values,
            masks,
        }
    }

    fn backward(&self, y: &Array2<f64>, pass: &ForwardPass) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y.nrows() as f64;
        let mut gradients = Vec::with_capacity(self.weights.len());

        // Softmax + cross-entropy gradient
        let output = &pass.activations[pass.activations.len() - 1];
        let mut delta = (output - y) / n;

        for i in (0..self.weights.len()).rev() {
            let a_prev = &pass.activations[i];

            let grad_w = a_prev.t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                let layer = &self.config.hidden_layers[i - 1];
                let mut next = delta.dot(&self.weights[i].t())
                    * activate_derivative(&pass.z_values[i - 1], layer.activation);
                if let Some(mask) = &pass.masks[i - 1] {
                    next *= mask;
                }
                delta = next;
            }
        }

        gradients.reverse();
        gradients
    }
}

/// Inverted dropout: kept units are scaled by 1 / (1 - rate)
fn dropout_mask(
    shape: (usize, usize),
    rate: f64,
    rng: &mut Xoshiro256PlusPlus,
) -> Option<Array2<f64>> {
    if rate <= 0.0 {
        return None;
    }
    let keep = 1.0 - rate;
    if keep <= 0.0 {
        return Some(Array2::zeros(shape));
    }
    Some(Array2::from_shape_fn(shape, |_| {
        if rng.gen::<f64>() < keep {
            1.0 / keep
        } else {
            0.0
        }
    }))
}

fn activate(z: &Array2<f64>, activation: Activation) -> Array2<f64> {
    match activation {
        Activation::ReLU => z.mapv(|v| v.max(0.0)),
        Activation::Sigmoid => z.mapv(|v| 1.0 / (1.0 + (-v).exp())),
        Activation::Tanh => z.mapv(|v| v.tanh()),
        Activation::Linear => z.clone(),
    }
}

fn activate_derivative(z: &Array2<f64>, activation: Activation) -> Array2<f64> {
    match activation {
        Activation::ReLU => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
        Activation::Sigmoid => z.mapv(|v| {
            let s = 1.0 / (1.0 + (-v).exp());
            s * (1.0 - s)
        }),
        Activation::Tanh => z.mapv(|v| 1.0 - v.tanh().powi(2)),
        Activation::Linear => Array2::ones(z.raw_dim()),
    }
}

fn softmax(z: &Array2<f64>) -> Array2<f64> {
    let mut result = z.clone();
    for mut row in result.rows_mut() {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::one_hot;

    fn create_classification_data() -> (Array2<f64>, Array2<f64>) {
        let n = 120;
        let mut x = Array2::zeros((n, 2));
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            let class = i % 2;
            let center = if class == 0 { -1.5 } else { 1.5 };
            x[[i, 0]] = center + 0.5 * (i as f64 * 0.37).sin();
            x[[i, 1]] = center + 0.5 * (i as f64 * 0.71).cos();
            labels.push(class);
        }
        (x, one_hot(&labels, 2).unwrap())
    }

    fn small_config() -> MLPConfig {
        MLPConfig::new()
            .with_hidden_layers(vec![
                LayerConfig::new(16, Activation::ReLU),
                LayerConfig::new(8, Activation::ReLU),
            ])
            .with_learning_rate(0.01)
            .with_epochs(100)
            .with_random_state(Some(3))
    }

    #[test]
    fn test_mlp_classifier_learns_separable_data() {
        let (x, y) = create_classification_data();
        let mut mlp = MLPClassifier::new(small_config());
        mlp.fit(&x, &y).unwrap();

        let acc = mlp.score(&x, &y).unwrap();
        assert!(acc > 0.9, "Accuracy ({}) should be above 90%", acc);
    }

    #[test]
    fn test_loss_decreases() {
        let (x, y) = create_classification_data();
        let mut mlp = MLPClassifier::new(small_config());
        mlp.fit(&x, &y).unwrap();

        let history = mlp.loss_history();
        assert_eq!(history.len(), 100);
        assert!(history[history.len() - 1] < history[0]);
    }

    #[test]
    fn test_all_optimizers_and_activations_train() {
        let (x, y) = create_classification_data();
        for optimizer in [OptimizerKind::Sgd, OptimizerKind::RmsProp, OptimizerKind::Adam] {
            for activation in [
                Activation::ReLU,
                Activation::Sigmoid,
                Activation::Tanh,
                Activation::Linear,
            ] {
                let config = MLPConfig::new()
                    .with_hidden_layers(vec![LayerConfig::new(8, activation).with_dropout(0.3)])
                    .with_optimizer(optimizer)
                    .with_epochs(3);
                let mut mlp = MLPClassifier::new(config);
                mlp.fit(&x, &y).unwrap();

                let proba = mlp.predict_proba(&x).unwrap();
                assert!(proba.iter().all(|p| p.is_finite()));
            }
        }
    }

    #[test]
    fn test_full_dropout_stays_finite() {
        let (x, y) = create_classification_data();
        let config = MLPConfig::new()
            .with_hidden_layers(vec![LayerConfig::new(8, Activation::ReLU).with_dropout(1.0)])
            .with_epochs(2);
        let mut mlp = MLPClassifier::new(config);
        mlp.fit(&x, &y).unwrap();
        assert!(mlp.predict_proba(&x).unwrap().iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let (x, y) = create_classification_data();
        let mut a = MLPClassifier::new(small_config().with_epochs(5));
        let mut b = MLPClassifier::new(small_config().with_epochs(5));
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = create_classification_data();
        let mut mlp = MLPClassifier::new(small_config().with_epochs(2));
        mlp.fit(&x, &y).unwrap();

        let proba = mlp.predict_proba(&x).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let mlp = MLPClassifier::new(MLPConfig::default());
        let x = Array2::zeros((1, 2));
        assert!(matches!(mlp.predict(&x), Err(PrimerError::ModelNotFitted)));
    }

    #[test]
    fn test_fit_rejects_bad_dropout() {
        let (x, y) = create_classification_data();
        let config = MLPConfig::new()
            .with_hidden_layers(vec![LayerConfig::new(4, Activation::ReLU).with_dropout(1.5)]);
        let mut mlp = MLPClassifier::new(config);
        assert!(matches!(mlp.fit(&x, &y), Err(PrimerError::InvalidParameter { .. })));
    }

    #[test]
    fn test_activation_functions() {
        let z = Array2::from_shape_vec((2, 3), vec![-1.0, 0.0, 1.0, -2.0, 0.5, 2.0]).unwrap();

        let relu = activate(&z, Activation::ReLU);
        assert_eq!(relu[[0, 0]], 0.0);
        assert_eq!(relu[[0, 2]], 1.0);

        let sigmoid = activate(&z, Activation::Sigmoid);
        assert!((sigmoid[[0, 1]] - 0.5).abs() < 0.001);

        let sm = softmax(&z);
        assert!((sm.row(0).sum() - 1.0).abs() < 1e-12);
        assert!(sm[[1, 2]] > sm[[1, 1]]);
    }

    #[test]
    fn test_activation_from_str() {
        assert_eq!("ReLU".parse::<Activation>().unwrap(), Activation::ReLU);
        assert_eq!("sigmoid".parse::<Activation>().unwrap(), Activation::Sigmoid);
        assert!("softplus".parse::<Activation>().is_err());
    }
}
