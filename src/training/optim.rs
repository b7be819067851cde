//! Gradient-descent update rules used by the MLP

use crate::error::{PrimerError, Result};
use ndarray::{Array, Array1, Array2, Dimension, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const RMSPROP_RHO: f64 = 0.9;
const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-7;

/// Optimizer choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    /// Plain stochastic gradient descent
    Sgd,
    /// RMSprop: gradient scaled by a running RMS of past gradients
    RmsProp,
    /// Adam with bias-corrected first and second moments
    Adam,
}

impl OptimizerKind {
    pub fn default_learning_rate(&self) -> f64 {
        match self {
            OptimizerKind::Sgd => 0.01,
            OptimizerKind::RmsProp => 0.001,
            OptimizerKind::Adam => 0.001,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OptimizerKind::Sgd => "sgd",
            OptimizerKind::RmsProp => "rmsprop",
            OptimizerKind::Adam => "adam",
        }
    }
}

impl Default for OptimizerKind {
    fn default() -> Self {
        Self::Adam
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptimizerKind {
    type Err = PrimerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sgd" => Ok(OptimizerKind::Sgd),
            "rmsprop" => Ok(OptimizerKind::RmsProp),
            "adam" => Ok(OptimizerKind::Adam),
            other => Err(PrimerError::InvalidParameter {
                name: "optimizer".to_string(),
                value: other.to_string(),
                reason: "expected one of sgd, rmsprop, adam".to_string(),
            }),
        }
    }
}

/// Moment buffers for one parameter tensor
#[derive(Debug, Clone)]
struct Moments<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> Moments<D> {
    fn zeros_like(param: &Array<f64, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }
}

/// Optimizer state for a stack of dense layers
#[derive(Debug, Clone)]
pub(crate) struct LayerOptimizer {
    kind: OptimizerKind,
    learning_rate: f64,
    t: i32,
    weights: Vec<Moments<ndarray::Ix2>>,
    biases: Vec<Moments<ndarray::Ix1>>,
}

impl LayerOptimizer {
    pub(crate) fn new(
        kind: OptimizerKind,
        learning_rate: f64,
        weights: &[Array2<f64>],
        biases: &[Array1<f64>],
    ) -> Self {
        Self {
            kind,
            learning_rate,
            t: 0,
            weights: weights.iter().map(Moments::zeros_like).collect(),
            biases: biases.iter().map(Moments::zeros_like).collect(),
        }
    }

    /// Apply one update; `gradients[i]` pairs with layer `i`
    pub(crate) fn step(
        &mut self,
        weights: &mut [Array2<f64>],
        biases: &mut [Array1<f64>],
        gradients: &[(Array2<f64>, Array1<f64>)],
    ) {
        self.t += 1;
        for (i, (grad_w, grad_b)) in gradients.iter().enumerate() {
            let (kind, lr, t) = (self.kind, self.learning_rate, self.t);
            update(kind, lr, t, &mut weights[i], grad_w, &mut self.weights[i]);
            update(kind, lr, t, &mut biases[i], grad_b, &mut self.biases[i]);
        }
    }
}

fn update<D: Dimension>(
    kind: OptimizerKind,
    lr: f64,
    t: i32,
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    moments: &mut Moments<D>,
) {
    match kind {
        OptimizerKind::Sgd => {
            param.scaled_add(-lr, grad);
        }
        OptimizerKind::RmsProp => {
            Zip::from(param)
                .and(grad)
                .and(&mut moments.v)
                .for_each(|p, &g, v| {
                    *v = RMSPROP_RHO * *v + (1.0 - RMSPROP_RHO) * g * g;
                    *p -= lr * g / (v.sqrt() + EPSILON);
                });
        }
        OptimizerKind::Adam => {
            let bias1 = 1.0 - ADAM_BETA1.powi(t);
            let bias2 = 1.0 - ADAM_BETA2.powi(t);
            Zip::from(param)
                .and(grad)
                .and(&mut moments.m)
                .and(&mut moments.v)
                .for_each(|p, &g, m, v| {
                    *m = ADAM_BETA1 * *m + (1.0 - ADAM_BETA1) * g;
                    *v = ADAM_BETA2 * *v + (1.0 - ADAM_BETA2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *p -= lr * m_hat / (v_hat.sqrt() + EPSILON);
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn minimize(kind: OptimizerKind, lr: f64, steps: usize) -> f64 {
        // f(w) = (w - 3)^2 on a 1x1 weight, bias unused
        let mut weights = vec![arr2(&[[0.0]])];
        let mut biases = vec![arr1(&[0.0])];
        let mut opt = LayerOptimizer::new(kind, lr, &weights, &biases);

        for _ in 0..steps {
            let w = weights[0][[0, 0]];
            let grads = vec![(arr2(&[[2.0 * (w - 3.0)]]), arr1(&[0.0]))];
            opt.step(&mut weights, &mut biases, &grads);
        }
        weights[0][[0, 0]]
    }

    #[test]
    fn test_sgd_converges() {
        assert!((minimize(OptimizerKind::Sgd, 0.1, 200) - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_rmsprop_converges() {
        assert!((minimize(OptimizerKind::RmsProp, 0.01, 2000) - 3.0).abs() < 0.05);
    }

    #[test]
    fn test_adam_converges() {
        assert!((minimize(OptimizerKind::Adam, 0.05, 2000) - 3.0).abs() < 0.05);
    }

    #[test]
    fn test_sgd_single_step() {
        let mut weights = vec![arr2(&[[1.0, 2.0]])];
        let mut biases = vec![arr1(&[0.5, 0.5])];
        let mut opt = LayerOptimizer::new(OptimizerKind::Sgd, 0.5, &weights, &biases);

        let grads = vec![(arr2(&[[1.0, -2.0]]), arr1(&[1.0, 0.0]))];
        opt.step(&mut weights, &mut biases, &grads);

        assert_eq!(weights[0], arr2(&[[0.5, 3.0]]));
        assert_eq!(biases[0], arr1(&[0.0, 0.5]));
    }

    #[test]
    fn test_optimizer_from_str() {
        assert_eq!("RMSprop".parse::<OptimizerKind>().unwrap(), OptimizerKind::RmsProp);
        assert_eq!("adam".parse::<OptimizerKind>().unwrap(), OptimizerKind::Adam);
        assert!("adagrad".parse::<OptimizerKind>().is_err());
    }
}
