//! Seeded train/test splitting

use crate::error::{PrimerError, Result};
use ndarray::{Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Train/test partition of a feature matrix and its one-hot targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitDataset {
    pub x_train: Array2<f64>,
    pub y_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_test: Array2<f64>,
}

impl SplitDataset {
    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.y_train.ncols()
    }

    /// Same targets, different feature matrices (e.g. after scaling)
    pub fn with_features(&self, x_train: Array2<f64>, x_test: Array2<f64>) -> Result<Self> {
        if x_train.nrows() != self.n_train() || x_test.nrows() != self.n_test() {
            return Err(PrimerError::ShapeError {
                expected: format!("{} train / {} test rows", self.n_train(), self.n_test()),
                actual: format!("{} train / {} test rows", x_train.nrows(), x_test.nrows()),
            });
        }
        Ok(Self {
            x_train,
            y_train: self.y_train.clone(),
            x_test,
            y_test: self.y_test.clone(),
        })
    }
}

/// Shuffle rows with `seed`, then cut at `floor(n * train_fraction)`.
///
/// The split is positional; classes are not stratified.
pub fn train_test_split(
    features: &Array2<f64>,
    targets: &Array2<f64>,
    train_fraction: f64,
    seed: u64,
) -> Result<SplitDataset> {
    if !(train_fraction > 0.0 && train_fraction <= 1.0) {
        return Err(PrimerError::InvalidParameter {
            name: "train_fraction".to_string(),
            value: train_fraction.to_string(),
            reason: "must be in (0, 1]".to_string(),
        });
    }

    if features.nrows() != targets.nrows() {
        return Err(PrimerError::ShapeError {
            expected: format!("{} target rows", features.nrows()),
            actual: format!("{} target rows", targets.nrows()),
        });
    }

    let n_samples = features.nrows();
    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_train = (n_samples as f64 * train_fraction) as usize;
    let (train_idx, test_idx) = indices.split_at(n_train);

    Ok(SplitDataset {
        x_train: features.select(Axis(0), train_idx),
        y_train: targets.select(Axis(0), train_idx),
        x_test: features.select(Axis(0), test_idx),
        y_test: targets.select(Axis(0), test_idx),
    })
}
