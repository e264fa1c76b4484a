//! Shared trainer for the linear and ensemble classifiers
//!
//! `prepare` loads the reference dataset once, splits it with a fixed seed,
//! and fits both sub-models. By default this happens on every call. With
//! [`TrainingPolicy::CacheByDatasetHash`] the fitted pair is reused while the
//! dataset file's SHA-256 is unchanged.

use super::{
    Backend, BackendKind, Classifier, ForestParams, LinearParams, LogisticRegression,
    RandomForest, Scores,
};
use crate::dataset::{
    content_digest, read_dataset_bytes, FeatureSchema, ReferenceDataset, TrainTestSplit,
};
use crate::error::{DispatchError, Result};
use crate::models::ClassId;
use ndarray::ArrayView1;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Whether fitted models survive between requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrainingPolicy {
    /// Refit on every request
    #[default]
    Retrain,
    /// Reuse the last fit while the dataset contents are unchanged
    CacheByDatasetHash,
}

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub policy: TrainingPolicy,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub max_rows: Option<usize>,
    pub linear: LinearParams,
    pub forest: ForestParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            policy: TrainingPolicy::Retrain,
            test_fraction: 0.2,
            split_seed: 42,
            max_rows: None,
            linear: LinearParams::default(),
            forest: ForestParams::default(),
        }
    }
}

/// Selectable sub-model of the shared trainer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubModel {
    Linear,
    Ensemble,
}

/// Both sub-models fitted from one dataset load
#[derive(Debug)]
pub struct TrainedModels {
    linear: LogisticRegression,
    ensemble: RandomForest,
    linear_scores: Scores,
    ensemble_scores: Scores,
    n_features: usize,
    dataset_digest: Option<String>,
    pub training_time: Duration,
}

impl TrainedModels {
    /// Accuracy and F1 on the held-out split
    pub fn metrics(&self, submodel: SubModel) -> Scores {
        match submodel {
            SubModel::Linear => self.linear_scores,
            SubModel::Ensemble => self.ensemble_scores,
        }
    }

    pub fn predict(&self, submodel: SubModel, row: ArrayView1<'_, f64>) -> Result<ClassId> {
        if row.len() != self.n_features {
            return Err(DispatchError::FeatureShape {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        Ok(match submodel {
            SubModel::Linear => self.linear.predict_one(row),
            SubModel::Ensemble => self.ensemble.predict_one(row),
        })
    }

    pub fn dataset_digest(&self) -> Option<&str> {
        self.dataset_digest.as_deref()
    }
}

/// Result of `prepare`: the models and whether they were fitted just now
#[derive(Debug, Clone)]
pub struct PreparedModels {
    pub models: Arc<TrainedModels>,
    pub fresh: bool,
}

pub struct StatisticalBackend {
    dataset_path: PathBuf,
    schema: FeatureSchema,
    config: TrainerConfig,
    memo: Mutex<Option<Arc<TrainedModels>>>,
}

impl StatisticalBackend {
    pub fn new(dataset_path: impl Into<PathBuf>, schema: FeatureSchema, config: TrainerConfig) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            schema,
            config,
            memo: Mutex::new(None),
        }
    }

    /// Load the dataset and fit both sub-models (or reuse a memoized fit)
    pub fn prepare(&self) -> Result<PreparedModels> {
        let bytes = read_dataset_bytes(&self.dataset_path)?;

        match self.config.policy {
            TrainingPolicy::Retrain => Ok(PreparedModels {
                models: Arc::new(self.train(&bytes, None)?),
                fresh: true,
            }),
            TrainingPolicy::CacheByDatasetHash => {
                let digest = content_digest(&bytes);
                let mut memo = self
                    .memo
                    .lock()
                    .map_err(|e| DispatchError::Internal(format!("Lock poisoned: {}", e)))?;

                if let Some(models) = memo.as_ref() {
                    if models.dataset_digest() == Some(digest.as_str()) {
                        debug!(digest = %digest, "Reusing trained models for unchanged dataset");
                        return Ok(PreparedModels {
                            models: Arc::clone(models),
                            fresh: false,
                        });
                    }
                }

                let models = Arc::new(self.train(&bytes, Some(digest))?);
                *memo = Some(Arc::clone(&models));
                Ok(PreparedModels {
                    models,
                    fresh: true,
                })
            }
        }
    }

    fn train(&self, bytes: &[u8], digest: Option<String>) -> Result<TrainedModels> {
        let start = Instant::now();
        let dataset =
            ReferenceDataset::parse(&self.dataset_path, bytes, &self.schema, self.config.max_rows)?;
        let split = TrainTestSplit::shuffled(
            dataset.n_rows(),
            self.config.test_fraction,
            self.config.split_seed,
        );
        let (x_train, y_train) = dataset.select(&split.train);
        let (x_test, y_test) = dataset.select(&split.test);

        let mut linear = LogisticRegression::new(self.config.linear.clone());
        linear.fit(x_train.view(), &y_train)?;
        let mut ensemble = RandomForest::new(self.config.forest.clone());
        ensemble.fit(x_train.view(), &y_train)?;

        let linear_scores = linear.score(x_test.view(), &y_test);
        let ensemble_scores = ensemble.score(x_test.view(), &y_test);
        let training_time = start.elapsed();

        info!(
            rows = dataset.n_rows(),
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            linear_accuracy = linear_scores.accuracy,
            forest_accuracy = ensemble_scores.accuracy,
            elapsed_ms = training_time.as_millis(),
            "Statistical models trained"
        );

        Ok(TrainedModels {
            linear,
            ensemble,
            linear_scores,
            ensemble_scores,
            n_features: self.schema.width(),
            dataset_digest: digest,
            training_time,
        })
    }
}

impl Backend for StatisticalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Statistical
    }

    /// Retraining backends are never ready ahead of a request
    fn is_ready(&self) -> bool {
        match self.config.policy {
            TrainingPolicy::Retrain => false,
            TrainingPolicy::CacheByDatasetHash => self
                .memo
                .lock()
                .map(|memo| memo.is_some())
                .unwrap_or(false),
        }
    }
}
