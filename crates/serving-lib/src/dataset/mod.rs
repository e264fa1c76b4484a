//! Reference dataset loading
//!
//! The dataset is a header-less comma separated file with one row per
//! sample: the schema's feature columns followed by the cover type label.

mod schema;
mod split;

pub use schema::{FeatureSchema, NUM_CLASSES, NUM_FEATURES, TARGET_COLUMN};
pub use split::TrainTestSplit;

use crate::error::{DispatchError, Result};
use crate::models::ClassId;
use ndarray::{Array2, ArrayView1, Axis};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;
use tracing::debug;

/// In-memory copy of the reference dataset
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    features: Array2<f64>,
    labels: Vec<ClassId>,
}

impl ReferenceDataset {
    /// Read and parse the dataset file
    pub fn load(path: &Path, schema: &FeatureSchema, max_rows: Option<usize>) -> Result<Self> {
        let bytes = read_dataset_bytes(path)?;
        Self::parse(path, &bytes, schema, max_rows)
    }

    /// Parse raw CSV bytes. `path` is only used for error reporting.
    pub fn parse(
        path: &Path,
        bytes: &[u8],
        schema: &FeatureSchema,
        max_rows: Option<usize>,
    ) -> Result<Self> {
        let start = Instant::now();
        let width = schema.width();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut values: Vec<f64> = Vec::new();
        let mut labels: Vec<ClassId> = Vec::new();

        for (row, record) in reader.records().enumerate() {
            if max_rows.is_some_and(|limit| labels.len() >= limit) {
                break;
            }
            let record = record.map_err(|e| DispatchError::dataset(path, e))?;
            if record.len() != width + 1 {
                return Err(DispatchError::dataset(
                    path,
                    format!("row {} has {} columns, expected {}", row + 1, record.len(), width + 1),
                ));
            }
            for field in record.iter().take(width) {
                let value: f64 = field.parse().map_err(|_| {
                    DispatchError::dataset(path, format!("row {}: '{}' is not numeric", row + 1, field))
                })?;
                values.push(value);
            }
            let label: ClassId = record[width].parse().map_err(|_| {
                DispatchError::dataset(
                    path,
                    format!("row {}: invalid {} '{}'", row + 1, TARGET_COLUMN, &record[width]),
                )
            })?;
            labels.push(label);
        }

        if labels.is_empty() {
            return Err(DispatchError::dataset(path, "dataset contains no rows"));
        }

        let features = Array2::from_shape_vec((labels.len(), width), values)
            .map_err(|e| DispatchError::dataset(path, e))?;

        debug!(
            path = %path.display(),
            rows = labels.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Reference dataset loaded"
        );

        Ok(Self { features, labels })
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[ClassId] {
        &self.labels
    }

    pub fn row(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.features.row(idx)
    }

    /// Copy out the given rows
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Vec<ClassId>) {
        let features = self.features.select(Axis(0), indices);
        let labels = indices.iter().map(|&i| self.labels[i]).collect();
        (features, labels)
    }
}

/// Read the raw dataset file
pub fn read_dataset_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| DispatchError::dataset(path, e))
}

/// Hex-encoded SHA-256 of the dataset contents
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
