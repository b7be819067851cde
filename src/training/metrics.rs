//! Classification metrics

use crate::preprocessing::argmax_rows;
use ndarray::Array2;

/// Fraction of rows whose predicted argmax matches the true argmax.
///
/// Both matrices are `(n_samples, n_classes)`; an empty set scores 0.0.
pub fn accuracy(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> f64 {
    let n = y_true.nrows();
    if n == 0 {
        return 0.0;
    }

    let correct = argmax_rows(y_true)
        .into_iter()
        .zip(argmax_rows(y_pred))
        .filter(|(t, p)| t == p)
        .count();

    correct as f64 / n as f64
}

/// Mean categorical cross-entropy of predicted probabilities against one-hot targets
pub fn log_loss(y_true: &Array2<f64>, y_pred: &Array2<f64>) -> f64 {
    let n = y_true.nrows();
    if n == 0 {
        return 0.0;
    }

    let total: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(&t, _)| t > 0.0)
        .map(|(&t, &p)| -t * p.max(1e-15).ln())
        .sum();

    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_accuracy() {
        let y_true = arr2(&[[1.0, 0.0], [0.0, 1.0], [0.0, 1.0], [1.0, 0.0]]);
        let y_pred = arr2(&[[0.9, 0.1], [0.3, 0.7], [0.6, 0.4], [0.2, 0.8]]);
        assert!((accuracy(&y_true, &y_pred) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_empty() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert_eq!(accuracy(&empty, &empty), 0.0);
    }

    #[test]
    fn test_log_loss_perfect_prediction() {
        let y = arr2(&[[0.0, 1.0], [1.0, 0.0]]);
        assert!(log_loss(&y, &y).abs() < 1e-12);
    }

    #[test]
    fn test_log_loss_uniform_prediction() {
        let y_true = arr2(&[[0.0, 1.0]]);
        let y_pred = arr2(&[[0.5, 0.5]]);
        assert!((log_loss(&y_true, &y_pred) - std::f64::consts::LN_2).abs() < 1e-12);
    }
}
