//! Data preprocessing module
//!
//! Provides the preprocessing steps shared by both pipelines:
//! - Label encoding with a deterministic class order, one-hot targets
//! - Seeded positional train/test splitting
//! - Feature scaling (identity, global min-max, per-feature standardization)
//!   fitted on the training split and reused for the test split

mod encoder;
mod scaler;
mod split;

pub use encoder::{argmax_rows, one_hot, LabelEncoder};
pub use scaler::{identity, min_max_scale, standardize, Scaler, ScalerType};
pub use split::{train_test_split, SplitDataset};
