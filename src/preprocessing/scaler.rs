//! Feature scaling implementations

use crate::error::{PrimerError, Result};
use ndarray::{Array1, Array2, Axis, Zip};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalerType {
    /// No scaling, the features are copied as-is
    None,
    /// Min-Max scaling with one global min/max: (x - min) / (max - min)
    MinMax,
    /// Standard scaling per feature (z-score): (x - mean) / std
    Standard,
}

impl ScalerType {
    /// All scaler types, in the order the comparison pipeline reports them
    pub const ALL: [ScalerType; 3] = [ScalerType::None, ScalerType::MinMax, ScalerType::Standard];

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            ScalerType::None => "raw",
            ScalerType::MinMax => "normalized",
            ScalerType::Standard => "standardized",
        }
    }
}

impl fmt::Display for ScalerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalerType {
    type Err = PrimerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "none" | "identity" | "raw" => Ok(ScalerType::None),
            "minmax" | "min_max" | "normalize" | "normalized" => Ok(ScalerType::MinMax),
            "standard" | "standardize" | "standardized" | "zscore" => Ok(ScalerType::Standard),
            other => Err(PrimerError::InvalidParameter {
                name: "scaler".to_string(),
                value: other.to_string(),
                reason: "expected one of none, minmax, standard".to_string(),
            }),
        }
    }
}

/// Statistics captured by `fit`, one entry per feature column.
///
/// Min-max scaling stores the same global min and range in every slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    center: Array1<f64>,
    scale: Array1<f64>,
}

/// Feature scaler
///
/// Statistics are computed once from the reference (training) matrix and
/// reused for every later `transform`, so test data never leaks into them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    params: Option<ScalerParams>,
}

impl Scaler {
    /// Create a new, unfitted scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            params: None,
        }
    }

    /// Scaler type
    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    /// Whether `fit` has been called
    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    /// Fit the scaler to the reference matrix
    pub fn fit(&mut self, reference: &Array2<f64>) -> Result<&mut Self> {
        if reference.nrows() == 0 {
            return Err(PrimerError::PreprocessingError(
                "cannot fit a scaler on an empty matrix".to_string(),
            ));
        }

        let n_features = reference.ncols();
        let params = match self.scaler_type {
            ScalerType::None => ScalerParams {
                center: Array1::zeros(n_features),
                scale: Array1::ones(n_features),
            },
            ScalerType::MinMax => {
                let min = reference.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = reference.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                ScalerParams {
                    center: Array1::from_elem(n_features, min),
                    scale: Array1::from_elem(n_features, max - min),
                }
            }
            ScalerType::Standard => {
                let center = reference.mean_axis(Axis(0)).ok_or_else(|| {
                    PrimerError::PreprocessingError("mean of empty matrix".to_string())
                })?;
                let mut scale = reference.std_axis(Axis(0), 0.0);
                // a rounded mean leaves a constant column with a tiny nonzero std
                Zip::from(&mut scale)
                    .and(reference.columns())
                    .for_each(|s, col| {
                        if col.iter().all(|&v| v == col[0]) {
                            *s = 0.0;
                        }
                    });
                ScalerParams { center, scale }
            }
        };

        self.params = Some(params);
        Ok(self)
    }

    /// Transform data with the fitted statistics. The input is left untouched.
    pub fn transform(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self.params.as_ref().ok_or(PrimerError::ModelNotFitted)?;

        if features.ncols() != params.center.len() {
            return Err(PrimerError::ShapeError {
                expected: format!("{} feature columns", params.center.len()),
                actual: format!("{} feature columns", features.ncols()),
            });
        }

        if self.scaler_type == ScalerType::None {
            return Ok(features.to_owned());
        }

        let mut scaled = features.to_owned();
        for row in scaled.rows_mut() {
            Zip::from(row)
                .and(&params.center)
                .and(&params.scale)
                .for_each(|x, &center, &scale| {
                    *x = finite_or_zero((*x - center) / scale);
                });
        }

        Ok(scaled)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, features: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(features)?;
        self.transform(features)
    }
}

/// Zero-denominator results (NaN, ±inf) are reported as 0.0
#[inline]
fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Copy of `features` with no scaling applied
pub fn identity(features: &Array2<f64>) -> Array2<f64> {
    features.to_owned()
}

/// Scale `features` into [0, 1] using the global min/max of `reference`
pub fn min_max_scale(features: &Array2<f64>, reference: &Array2<f64>) -> Result<Array2<f64>> {
    Scaler::new(ScalerType::MinMax).fit(reference)?.transform(features)
}

/// Standardize `features` using the per-feature mean/std of `reference`
pub fn standardize(features: &Array2<f64>, reference: &Array2<f64>) -> Result<Array2<f64>> {
    Scaler::new(ScalerType::Standard).fit(reference)?.transform(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_min_max_global_range() {
        let train = arr2(&[[0.0, 10.0], [5.0, 5.0], [10.0, 0.0]]);
        let scaled = min_max_scale(&train, &train).unwrap();

        let expected = arr2(&[[0.0, 1.0], [0.5, 0.5], [1.0, 0.0]]);
        for (a, b) in scaled.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_min_max_is_not_per_feature() {
        // column 1 only spans [2, 4] but shares the global range [0, 10]
        let train = arr2(&[[0.0, 2.0], [10.0, 4.0]]);
        let scaled = min_max_scale(&train, &train).unwrap();

        assert!((scaled[[0, 1]] - 0.2).abs() < 1e-12);
        assert!((scaled[[1, 1]] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_min_max_values_in_unit_interval() {
        let train = arr2(&[[3.5, -2.0, 8.0], [1.0, 0.5, 7.25], [-4.0, 6.0, 2.0]]);
        let scaled = min_max_scale(&train, &train).unwrap();
        assert!(scaled.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_min_max_constant_matrix_is_zero() {
        let train = arr2(&[[3.0, 3.0], [3.0, 3.0]]);
        let test = arr2(&[[4.0, 2.0]]);
        let mut scaler = Scaler::new(ScalerType::MinMax);
        scaler.fit(&train).unwrap();

        assert!(scaler.transform(&train).unwrap().iter().all(|&v| v == 0.0));
        assert!(scaler.transform(&test).unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_standardize_unit_moments() {
        let train = arr2(&[[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [6.0, 5.0]]);
        let scaled = standardize(&train, &train).unwrap();

        for col in scaled.columns() {
            assert!(col.mean().unwrap().abs() < 1e-10);
            assert!((col.std(0.0) - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_standardize_zero_variance_column() {
        let train = arr2(&[[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]]);
        let test = arr2(&[[7.0, 2.0], [5.0, 4.0]]);

        let mut scaler = Scaler::new(ScalerType::Standard);
        let train_scaled = scaler.fit_transform(&train).unwrap();
        let test_scaled = scaler.transform(&test).unwrap();

        assert!(train_scaled.column(0).iter().all(|&v| v == 0.0));
        assert!(test_scaled.column(0).iter().all(|&v| v == 0.0));
        assert!(test_scaled.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_transform_does_not_mutate_input() {
        let train = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let before = train.clone();
        let _ = standardize(&train, &train).unwrap();
        assert_eq!(train, before);
    }

    #[test]
    fn test_identity_copies() {
        let train = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let mut scaler = Scaler::new(ScalerType::None);
        assert_eq!(scaler.fit_transform(&train).unwrap(), identity(&train));
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = Scaler::new(ScalerType::Standard);
        let result = scaler.transform(&arr2(&[[1.0]]));
        assert!(matches!(result, Err(PrimerError::ModelNotFitted)));
    }

    #[test]
    fn test_transform_shape_mismatch() {
        let mut scaler = Scaler::new(ScalerType::Standard);
        scaler.fit(&arr2(&[[1.0, 2.0], [2.0, 3.0]])).unwrap();
        let result = scaler.transform(&arr2(&[[1.0, 2.0, 3.0]]));
        assert!(matches!(result, Err(PrimerError::ShapeError { .. })));
    }

    #[test]
    fn test_scaler_type_from_str() {
        assert_eq!("minmax".parse::<ScalerType>().unwrap(), ScalerType::MinMax);
        assert_eq!("Standardize".parse::<ScalerType>().unwrap(), ScalerType::Standard);
        assert_eq!("identity".parse::<ScalerType>().unwrap(), ScalerType::None);
        assert!("robust".parse::<ScalerType>().is_err());
    }

    mod scaler_proptest {
        use super::*;
        use proptest::prelude::*;

        fn matrix(min_rows: usize) -> impl Strategy<Value = Array2<f64>> {
            (min_rows..20usize, 1..6usize).prop_flat_map(|(rows, cols)| {
                prop::collection::vec(-1e3f64..1e3, rows * cols)
                    .prop_map(move |data| Array2::from_shape_vec((rows, cols), data).unwrap())
            })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn prop_min_max_self_scaled_in_unit_interval(x in matrix(1)) {
                let scaled = min_max_scale(&x, &x).unwrap();
                prop_assert_eq!(scaled.dim(), x.dim());
                for &v in scaled.iter() {
                    prop_assert!((0.0..=1.0).contains(&v), "{} outside [0, 1]", v);
                }
            }

            #[test]
            fn prop_standardize_unit_moments(x in matrix(2), constant in -1e3f64..1e3) {
                let mut x = x;
                x.column_mut(0).fill(constant);

                let scaled = standardize(&x, &x).unwrap();
                prop_assert!(scaled.column(0).iter().all(|&v| v == 0.0));

                for (raw, col) in x.columns().into_iter().zip(scaled.columns()).skip(1) {
                    if raw.std(0.0) < 1e-3 {
                        continue;
                    }
                    prop_assert!(col.mean().unwrap().abs() < 1e-6);
                    prop_assert!((col.std(0.0) - 1.0).abs() < 1e-6);
                }
            }
        }
    }
}
