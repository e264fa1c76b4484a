//! Strategy dispatcher
//!
//! Routes one resolved [`ModelOption`] to exactly one backend, shapes the
//! request vector for it, and builds the result envelope. Every dispatch is
//! timed, counted and logged.

pub mod output;

use crate::adapter::FeatureAdapter;
use crate::backend::{
    ArtifactLoader, Backend, BackendKind, HeuristicBackend, ModelCache, OnnxLoader,
    PersistedModelBackend, StatisticalBackend, SubModel, TrainerConfig, HEURISTIC_FIELDS,
};
use crate::dataset::{FeatureSchema, NUM_CLASSES};
use crate::error::{ErrorClass, Result};
use crate::models::{ModelOption, PredictRequest, PredictionResult, RawFeatureVector};
use crate::observability::{DispatchMetrics, StructuredLogger};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Paths and training settings for a dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub dataset_path: PathBuf,
    pub model_path: PathBuf,
    /// Cap on reference rows read per request; `None` reads the whole file
    pub max_rows: Option<usize>,
    pub trainer: TrainerConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("dataset_and_info/covtype.data"),
            model_path: PathBuf::from("serialized_model/nn_model.onnx"),
            max_rows: None,
            trainer: TrainerConfig::default(),
        }
    }
}

pub struct Dispatcher {
    schema: FeatureSchema,
    heuristic: HeuristicBackend,
    statistical: StatisticalBackend,
    persisted: PersistedModelBackend,
    metrics: DispatchMetrics,
    logger: StructuredLogger,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        loader: Arc<dyn ArtifactLoader>,
        cache: Arc<ModelCache>,
    ) -> Self {
        let schema = FeatureSchema::covtype().clone();
        let trainer = TrainerConfig {
            max_rows: config.max_rows,
            ..config.trainer
        };

        Self {
            heuristic: HeuristicBackend::new(
                config.dataset_path.clone(),
                schema.clone(),
                config.max_rows,
            ),
            statistical: StatisticalBackend::new(config.dataset_path, schema.clone(), trainer),
            persisted: PersistedModelBackend::new(config.model_path, loader, cache),
            schema,
            metrics: DispatchMetrics::new(),
            logger: StructuredLogger::new("covtype-dispatcher"),
        }
    }

    /// Dispatcher whose neural-network option reads ONNX artifacts
    pub fn with_onnx(config: DispatcherConfig, cache: Arc<ModelCache>) -> Self {
        let width = FeatureSchema::covtype().width();
        Self::new(config, Arc::new(OnnxLoader::new(width, NUM_CLASSES)), cache)
    }

    /// Resolve the request's option, then dispatch.
    ///
    /// An unresolvable option fails before any backend is touched.
    pub fn dispatch_request(&self, request: &PredictRequest) -> Result<PredictionResult> {
        let option = match ModelOption::from_request_value(&request.option) {
            Ok(option) => option,
            Err(e) => {
                self.metrics.inc_errors(e.kind());
                self.logger
                    .log_dispatch_failure(None, e.kind(), true, &request.option.to_string());
                return Err(e);
            }
        };
        self.dispatch(option, &request.pred_input)
    }

    pub fn dispatch(&self, option: ModelOption, raw: &RawFeatureVector) -> Result<PredictionResult> {
        let start = Instant::now();
        let result = self.route(option, raw);
        let elapsed = start.elapsed();

        self.metrics
            .observe_dispatch(option.name(), elapsed.as_secs_f64());
        match &result {
            Ok(prediction) => {
                self.metrics.inc_predictions(option.name());
                self.logger
                    .log_prediction(option.name(), prediction.label, elapsed.as_millis());
            }
            Err(e) => {
                self.metrics.inc_errors(e.kind());
                self.logger.log_dispatch_failure(
                    Some(option.name()),
                    e.kind(),
                    e.class() == ErrorClass::Client,
                    &e.to_string(),
                );
            }
        }
        result
    }

    fn route(&self, option: ModelOption, raw: &RawFeatureVector) -> Result<PredictionResult> {
        let adapter = FeatureAdapter::new(&self.schema);

        match option {
            ModelOption::Heuristic => {
                let subset = adapter.project(raw, &HEURISTIC_FIELDS)?;
                self.heuristic.prepare()?;
                let label = self.heuristic.predict(&subset)?;
                let accuracy = self.heuristic.accuracy()?;
                Ok(output::heuristic(label, accuracy))
            }
            ModelOption::RandomForest => self.serve_statistical(SubModel::Ensemble, &adapter, raw),
            ModelOption::LogisticRegression => self.serve_statistical(SubModel::Linear, &adapter, raw),
            ModelOption::NeuralNetwork => {
                let features = adapter.dense_f32(raw)?;
                self.load_model()?;
                let label = self.persisted.predict(&features)?;
                Ok(output::neural_network(label))
            }
        }
    }

    fn serve_statistical(
        &self,
        submodel: SubModel,
        adapter: &FeatureAdapter<'_>,
        raw: &RawFeatureVector,
    ) -> Result<PredictionResult> {
        let row = adapter.dense(raw)?;
        let prepared = self.statistical.prepare()?;
        if prepared.fresh {
            self.metrics
                .observe_training(prepared.models.training_time.as_secs_f64());
            self.logger.log_models_trained(
                prepared.models.dataset_digest(),
                prepared.models.training_time.as_millis(),
                prepared.fresh,
            );
        }

        let label = prepared.models.predict(submodel, row.view())?;
        Ok(output::statistical(
            submodel,
            label,
            prepared.models.metrics(submodel),
        ))
    }

    /// Load the persisted artifact if it is not cached yet.
    ///
    /// Returns true when this call read it from disk.
    pub fn load_model(&self) -> Result<bool> {
        let start = Instant::now();
        let loaded_now = self.persisted.load()?;
        if loaded_now {
            self.metrics.inc_artifact_loads();
            self.logger.log_model_loaded(
                &self.persisted.artifact_path().display().to_string(),
                start.elapsed().as_millis(),
            );
        }
        Ok(loaded_now)
    }

    pub fn persisted(&self) -> &PersistedModelBackend {
        &self.persisted
    }

    /// Whether each backend family can predict without a prepare step
    pub fn readiness(&self) -> Vec<(BackendKind, bool)> {
        let backends: [&dyn Backend; 3] = [&self.heuristic, &self.statistical, &self.persisted];
        backends
            .iter()
            .map(|backend| (backend.kind(), backend.is_ready()))
            .collect()
    }
}
