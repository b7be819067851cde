//! Data loading utilities

use crate::error::{PrimerError, Result};
use crate::preprocessing::{one_hot, SplitDataset};
use ndarray::Array2;
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

const IDX_IMAGES_MAGIC: u32 = 0x0000_0803;
const IDX_LABELS_MAGIC: u32 = 0x0000_0801;
const MNIST_CLASSES: usize = 10;

/// Feature matrix and raw label strings read from a delimited file
#[derive(Debug, Clone)]
pub struct TabularData {
    pub features: Array2<f64>,
    pub labels: Vec<String>,
}

impl TabularData {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Loader for fixed-column CSV files.
///
/// Columns are addressed by position; the header row (if any) is dropped.
#[derive(Debug, Clone)]
pub struct TabularLoader {
    label_column: usize,
    feature_columns: Range<usize>,
    delimiter: u8,
    has_header: bool,
}

impl Default for TabularLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularLoader {
    /// Label in column 2, features in columns 5 through 10
    pub fn new() -> Self {
        Self {
            label_column: 2,
            feature_columns: 5..11,
            delimiter: b',',
            has_header: true,
        }
    }

    pub fn with_label_column(mut self, column: usize) -> Self {
        self.label_column = column;
        self
    }

    /// Half-open range of feature column positions
    pub fn with_feature_columns(mut self, columns: Range<usize>) -> Self {
        self.feature_columns = columns;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Load a CSV file
    pub fn load(&self, path: impl AsRef<Path>) -> Result<TabularData> {
        let path = path.as_ref();
        let start = Instant::now();

        if self.feature_columns.is_empty() {
            return Err(PrimerError::ConfigError(
                "feature column range is empty".to_string(),
            ));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .delimiter(self.delimiter)
            .from_path(path)?;

        let n_features = self.feature_columns.len();
        let mut values = Vec::new();
        let mut labels = Vec::new();

        for (row_idx, record) in reader.records().enumerate() {
            let record = record?;

            let label = record.get(self.label_column).ok_or_else(|| {
                PrimerError::DataError(format!(
                    "row {}: missing label column {}",
                    row_idx, self.label_column
                ))
            })?;
            labels.push(label.trim().to_string());

            for col in self.feature_columns.clone() {
                let raw = record.get(col).ok_or_else(|| {
                    PrimerError::DataError(format!(
                        "row {}: missing feature column {}",
                        row_idx, col
                    ))
                })?;
                let value: f64 = raw.trim().parse().map_err(|_| {
                    PrimerError::DataError(format!(
                        "row {}, column {}: cannot parse {:?} as a number",
                        row_idx, col, raw
                    ))
                })?;
                values.push(value);
            }
        }

        let features = Array2::from_shape_vec((labels.len(), n_features), values)?;

        debug!(
            path = %path.display(),
            rows = labels.len(),
            features = n_features,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded tabular data"
        );

        Ok(TabularData { features, labels })
    }
}

/// Row limits applied when reading MNIST
#[derive(Debug, Clone, Copy, Default)]
pub struct MnistLimits {
    pub max_train: Option<usize>,
    pub max_test: Option<usize>,
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Result<u32> {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| PrimerError::DataError("truncated IDX header".to_string()))
}

/// Parse an IDX3 image file into `(n_images, rows * cols)` pixels scaled to [0, 1]
pub fn parse_idx_images(bytes: &[u8], limit: Option<usize>) -> Result<Array2<f64>> {
    let magic = read_u32_be(bytes, 0)?;
    if magic != IDX_IMAGES_MAGIC {
        return Err(PrimerError::DataError(format!(
            "bad IDX image magic {:#010x}",
            magic
        )));
    }

    let n_images = read_u32_be(bytes, 4)? as usize;
    let n_rows = read_u32_be(bytes, 8)? as usize;
    let n_cols = read_u32_be(bytes, 12)? as usize;
    let n = limit.map_or(n_images, |l| l.min(n_images));
    let (n_pixels, n_bytes) = n_rows
        .checked_mul(n_cols)
        .and_then(|n_pixels| n.checked_mul(n_pixels).map(|total| (n_pixels, total)))
        .ok_or_else(|| PrimerError::DataError("IDX dimensions overflow".to_string()))?;

    let payload = &bytes[16..];
    if payload.len() < n_bytes {
        return Err(PrimerError::DataError(format!(
            "IDX image payload holds {} bytes, expected {}",
            payload.len(),
            n_bytes
        )));
    }

    let pixels: Vec<f64> = payload[..n_bytes]
        .iter()
        .map(|&p| p as f64 / 255.0)
        .collect();

    Ok(Array2::from_shape_vec((n, n_pixels), pixels)?)
}

/// Parse an IDX1 label file into class indices
pub fn parse_idx_labels(bytes: &[u8], limit: Option<usize>) -> Result<Vec<usize>> {
    let magic = read_u32_be(bytes, 0)?;
    if magic != IDX_LABELS_MAGIC {
        return Err(PrimerError::DataError(format!(
            "bad IDX label magic {:#010x}",
            magic
        )));
    }

    let n_labels = read_u32_be(bytes, 4)? as usize;
    let n = limit.map_or(n_labels, |l| l.min(n_labels));

    let payload = &bytes[8..];
    if payload.len() < n {
        return Err(PrimerError::DataError(format!(
            "IDX label payload holds {} bytes, expected {}",
            payload.len(),
            n
        )));
    }

    Ok(payload[..n].iter().map(|&l| l as usize).collect())
}

pub fn load_idx_images(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Array2<f64>> {
    parse_idx_images(&fs::read(path)?, limit)
}

pub fn load_idx_labels(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Vec<usize>> {
    parse_idx_labels(&fs::read(path)?, limit)
}

/// Load the four standard MNIST IDX files from `dir`.
///
/// Images are flattened and scaled to [0, 1]; labels are one-hot encoded.
pub fn load_mnist(dir: impl AsRef<Path>, limits: MnistLimits) -> Result<SplitDataset> {
    let dir = dir.as_ref();
    let start = Instant::now();

    let x_train = load_idx_images(dir.join("train-images-idx3-ubyte"), limits.max_train)?;
    let train_labels = load_idx_labels(dir.join("train-labels-idx1-ubyte"), limits.max_train)?;
    let x_test = load_idx_images(dir.join("t10k-images-idx3-ubyte"), limits.max_test)?;
    let test_labels = load_idx_labels(dir.join("t10k-labels-idx1-ubyte"), limits.max_test)?;

    if x_train.nrows() != train_labels.len() || x_test.nrows() != test_labels.len() {
        return Err(PrimerError::ShapeError {
            expected: format!("{} train / {} test labels", x_train.nrows(), x_test.nrows()),
            actual: format!("{} train / {} test labels", train_labels.len(), test_labels.len()),
        });
    }

    let split = SplitDataset {
        x_train,
        y_train: one_hot(&train_labels, MNIST_CLASSES)?,
        x_test,
        y_test: one_hot(&test_labels, MNIST_CLASSES)?,
    };

    info!(
        dir = %dir.display(),
        train = split.n_train(),
        test = split.n_test(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded MNIST"
    );

    Ok(split)
}
