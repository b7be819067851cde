//! Label encoding implementations

use crate::error::{PrimerError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Maps categorical label strings to dense integer class indices.
///
/// Classes are sorted lexicographically before codes are assigned, so the
/// same set of labels always yields the same mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
    mapping: HashMap<String, usize>,
}

impl LabelEncoder {
    /// Create an empty encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the unique labels and assign each a class index
    pub fn fit<S: AsRef<str>>(&mut self, labels: &[S]) -> &mut Self {
        let unique: BTreeSet<&str> = labels.iter().map(AsRef::as_ref).collect();
        self.classes = unique.into_iter().map(String::from).collect();
        self.mapping = self
            .classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class.clone(), idx))
            .collect();
        self
    }

    /// Encode labels as class indices
    pub fn transform<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|label| {
                let label = label.as_ref();
                self.mapping
                    .get(label)
                    .copied()
                    .ok_or_else(|| PrimerError::UnknownLabel(label.to_string()))
            })
            .collect()
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<Vec<usize>> {
        self.fit(labels);
        self.transform(labels)
    }

    /// Label for a class index
    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Known classes, in index order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}

/// One-hot encode class indices into an `(n, n_classes)` matrix
pub fn one_hot(indices: &[usize], n_classes: usize) -> Result<Array2<f64>> {
    let mut encoded = Array2::zeros((indices.len(), n_classes));
    for (row, &class_idx) in indices.iter().enumerate() {
        if class_idx >= n_classes {
            return Err(PrimerError::InvalidParameter {
                name: "class_index".to_string(),
                value: class_idx.to_string(),
                reason: format!("must be below {}", n_classes),
            });
        }
        encoded[[row, class_idx]] = 1.0;
    }
    Ok(encoded)
}

/// Column index of the largest value in each row.
///
/// Ties resolve to the first maximum.
pub fn argmax_rows(matrix: &Array2<f64>) -> Vec<usize> {
    matrix
        .rows()
        .into_iter()
        .map(|row| {
            let mut best_idx = 0;
            let mut best_val = f64::NEG_INFINITY;
            for (idx, &v) in row.iter().enumerate() {
                if v > best_val {
                    best_val = v;
                    best_idx = idx;
                }
            }
            best_idx
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_classes_sorted() {
        let mut encoder = LabelEncoder::new();
        encoder.fit(&["virginica", "setosa", "versicolor", "setosa"]);

        assert_eq!(encoder.classes(), &["setosa", "versicolor", "virginica"]);
        assert_eq!(encoder.n_classes(), 3);
    }

    #[test]
    fn test_mapping_independent_of_order() {
        let mut a = LabelEncoder::new();
        let mut b = LabelEncoder::new();
        let codes_a = a.fit_transform(&["b", "a", "c"]).unwrap();
        let codes_b = b.fit_transform(&["c", "b", "a"]).unwrap();

        assert_eq!(codes_a, vec![1, 0, 2]);
        assert_eq!(codes_b, vec![2, 1, 0]);
        assert_eq!(a.classes(), b.classes());
    }

    #[test]
    fn test_unknown_label() {
        let mut encoder = LabelEncoder::new();
        encoder.fit(&["a", "b"]);
        let result = encoder.transform(&["c"]);
        assert!(matches!(result, Err(PrimerError::UnknownLabel(ref l)) if l == "c"));
    }

    #[test]
    fn test_inverse_transform() {
        let mut encoder = LabelEncoder::new();
        encoder.fit(&["low", "high"]);
        assert_eq!(encoder.inverse_transform(0), Some("high"));
        assert_eq!(encoder.inverse_transform(1), Some("low"));
        assert_eq!(encoder.inverse_transform(2), None);
    }

    #[test]
    fn test_one_hot_argmax_round_trip() {
        let indices = vec![2, 0, 1, 1, 3, 0];
        let encoded = one_hot(&indices, 4).unwrap();

        assert_eq!(encoded.dim(), (6, 4));
        assert!(encoded.rows().into_iter().all(|r| r.sum() == 1.0));
        assert_eq!(argmax_rows(&encoded), indices);
    }

    #[test]
    fn test_one_hot_out_of_range() {
        assert!(one_hot(&[0, 3], 3).is_err());
    }

    #[test]
    fn test_argmax_first_maximum_wins() {
        let m = arr2(&[[0.2, 0.4, 0.4], [0.9, 0.05, 0.05]]);
        assert_eq!(argmax_rows(&m), vec![1, 0]);
    }

    mod encoder_proptest {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn prop_one_hot_argmax_round_trip(
                n_classes in 1..12usize,
                raw in prop::collection::vec(0..1000usize, 0..50),
            ) {
                let indices: Vec<usize> = raw.iter().map(|&i| i % n_classes).collect();
                let encoded = one_hot(&indices, n_classes).unwrap();

                prop_assert_eq!(encoded.dim(), (indices.len(), n_classes));
                prop_assert!(encoded.rows().into_iter().all(|row| row.sum() == 1.0));
                prop_assert_eq!(argmax_rows(&encoded), indices);
            }
        }
    }
}
