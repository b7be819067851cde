//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    load_idx_images, load_idx_labels, load_mnist, parse_idx_images, parse_idx_labels,
    MnistLimits, TabularData, TabularLoader,
};
