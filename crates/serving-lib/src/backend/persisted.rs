//! Persisted neural-network backend
//!
//! Wraps one pre-built ONNX artifact loaded with tract. Lifecycle is an
//! explicit two-step: `load()` (idempotent, serialized by the shared
//! [`ModelCache`]) and then `predict()`. Predicting before a successful load
//! fails instead of loading implicitly.

use super::{Backend, BackendKind, ModelCache};
use crate::error::{DispatchError, Result};
use crate::models::ClassId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A loaded artifact able to classify one dense row
pub trait ArtifactModel: Send + Sync {
    fn predict(&self, features: &[f32]) -> Result<ClassId>;
}

/// Reads an artifact file into a model
pub trait ArtifactLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Arc<dyn ArtifactModel>>;
}

/// Loads ONNX graphs with a fixed `[1, n_features]` f32 input
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    n_features: usize,
    n_classes: ClassId,
}

impl OnnxLoader {
    pub fn new(n_features: usize, n_classes: ClassId) -> Self {
        Self {
            n_features,
            n_classes,
        }
    }

    /// Parse and optimize an ONNX model from bytes
    fn plan(&self, model_bytes: &[u8]) -> TractResult<TractModel> {
        tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))?
            .with_input_fact(0, f32::fact([1, self.n_features]).into())?
            .into_optimized()?
            .into_runnable()
    }
}

impl ArtifactLoader for OnnxLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn ArtifactModel>> {
        let bytes = std::fs::read(path).map_err(|e| DispatchError::model_load(path, e))?;
        let plan = self
            .plan(&bytes)
            .map_err(|e| DispatchError::model_load(path, format!("{:#}", e)))?;
        Ok(Arc::new(OnnxModel {
            plan,
            n_features: self.n_features,
            n_classes: self.n_classes,
        }))
    }
}

struct OnnxModel {
    plan: TractModel,
    n_features: usize,
    n_classes: ClassId,
}

impl OnnxModel {
    fn run(&self, features: &[f32]) -> TractResult<Vec<f32>> {
        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, self.n_features), features.to_vec())?.into();
        let result = self.plan.run(tvec!(input.into()))?;
        let output = result
            .first()
            .ok_or_else(|| anyhow::anyhow!("No output from model"))?;
        let values = output.cast_to::<f32>()?;
        let values: Vec<f32> = values.as_slice::<f32>()?.to_vec();
        Ok(values)
    }
}

impl ArtifactModel for OnnxModel {
    fn predict(&self, features: &[f32]) -> Result<ClassId> {
        if features.len() != self.n_features {
            return Err(DispatchError::FeatureShape {
                expected: self.n_features,
                actual: features.len(),
            });
        }

        let start = Instant::now();
        let values = self
            .run(features)
            .map_err(|e| DispatchError::Internal(format!("inference failed: {:#}", e)))?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        output_to_label(&values, self.n_classes)
    }
}

/// A single output value is the class id; `n_classes` values are per-class
/// scores for classes 1..=n_classes. Anything else is a malformed model.
fn output_to_label(values: &[f32], n_classes: ClassId) -> Result<ClassId> {
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(DispatchError::Internal(format!(
            "model produced non-finite output {}",
            bad
        )));
    }

    match values {
        [] => Err(DispatchError::Internal("model produced no output".to_string())),
        [label] => {
            let rounded = label.round();
            if rounded < 1.0 || rounded > n_classes as f32 {
                return Err(DispatchError::Internal(format!(
                    "model produced label {} outside 1..={}",
                    label, n_classes
                )));
            }
            Ok(rounded as ClassId)
        }
        scores if scores.len() == n_classes as usize => {
            let mut best = 0;
            for (idx, score) in scores.iter().enumerate() {
                if *score > scores[best] {
                    best = idx;
                }
            }
            Ok(best as ClassId + 1)
        }
        scores => Err(DispatchError::Internal(format!(
            "model produced {} scores for {} classes",
            scores.len(),
            n_classes
        ))),
    }
}

pub struct PersistedModelBackend {
    artifact_path: PathBuf,
    loader: Arc<dyn ArtifactLoader>,
    cache: Arc<ModelCache>,
}

impl PersistedModelBackend {
    pub fn new(
        artifact_path: impl Into<PathBuf>,
        loader: Arc<dyn ArtifactLoader>,
        cache: Arc<ModelCache>,
    ) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            loader,
            cache,
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Transition Unloaded -> Loaded. A no-op once loaded.
    ///
    /// Returns true when this call read the artifact.
    pub fn load(&self) -> Result<bool> {
        let start = Instant::now();
        let loader = Arc::clone(&self.loader);
        let (_, loaded_now) = self
            .cache
            .get_or_load(&self.artifact_path, |path| loader.load(path))?;

        if loaded_now {
            debug!(
                path = %self.artifact_path.display(),
                elapsed_ms = start.elapsed().as_millis(),
                "Model artifact loaded"
            );
        }
        Ok(loaded_now)
    }

    pub fn is_loaded(&self) -> bool {
        match self.cache.contains(&self.artifact_path) {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "Model cache unreadable");
                false
            }
        }
    }

    /// Classify a dense row. Requires a prior successful `load()`.
    pub fn predict(&self, features: &[f32]) -> Result<ClassId> {
        let model = self
            .cache
            .get(&self.artifact_path)?
            .ok_or(DispatchError::ModelNotLoaded)?;
        model.predict(features)
    }
}

impl Backend for PersistedModelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Persisted
    }

    fn is_ready(&self) -> bool {
        self.is_loaded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{onnx_matmul_artifact, write_artifact, CountingLoader};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_predict_before_load_fails() {
        let artifact = write_artifact("2");
        let backend = PersistedModelBackend::new(
            artifact.path(),
            Arc::new(CountingLoader::default()),
            Arc::new(ModelCache::new()),
        );
        assert!(!backend.is_ready());
        assert!(matches!(
            backend.predict(&[0.0; 54]),
            Err(DispatchError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_load_is_idempotent() {
        let artifact = write_artifact("6");
        let loader = Arc::new(CountingLoader::default());
        let backend = PersistedModelBackend::new(
            artifact.path(),
            loader.clone(),
            Arc::new(ModelCache::new()),
        );

        assert!(backend.load().unwrap());
        assert!(!backend.load().unwrap());
        assert_eq!(loader.reads.load(Ordering::SeqCst), 1);
        assert!(backend.is_loaded());
        assert_eq!(backend.predict(&[0.0; 54]).unwrap(), 6);
    }

    #[test]
    fn test_missing_artifact_stays_unloaded() {
        let backend = PersistedModelBackend::new(
            "/nonexistent/nn_model.onnx",
            Arc::new(CountingLoader::default()),
            Arc::new(ModelCache::new()),
        );
        assert!(matches!(backend.load(), Err(DispatchError::ModelLoad { .. })));
        assert!(!backend.is_loaded());
        assert!(matches!(
            backend.predict(&[0.0; 54]),
            Err(DispatchError::ModelNotLoaded)
        ));
    }

    #[test]
    fn test_onnx_loader_rejects_corrupt_bytes() {
        let artifact = write_artifact("definitely not protobuf");
        let err = OnnxLoader::new(54, 7).load(artifact.path()).err().unwrap();
        assert!(matches!(err, DispatchError::ModelLoad { .. }));
    }

    #[test]
    fn test_onnx_loader_missing_file() {
        let err = OnnxLoader::new(54, 7)
            .load(Path::new("/nonexistent/nn_model.onnx"))
            .err()
            .unwrap();
        assert!(matches!(err, DispatchError::ModelLoad { .. }));
    }

    fn onnx_backend(artifact: &Path) -> PersistedModelBackend {
        PersistedModelBackend::new(
            artifact,
            Arc::new(OnnxLoader::new(54, 7)),
            Arc::new(ModelCache::new()),
        )
    }

    fn row_with(idx: usize, value: f32) -> Vec<f32> {
        let mut row = vec![0.0; 54];
        row[idx] = value;
        row
    }

    #[test]
    fn test_onnx_single_output_is_class_id() {
        // Output echoes the first feature
        let artifact = onnx_matmul_artifact(1, |row, _| if row == 0 { 1.0 } else { 0.0 });
        let backend = onnx_backend(artifact.path());
        assert!(backend.load().unwrap());

        assert_eq!(backend.predict(&row_with(0, 3.0)).unwrap(), 3);
        assert_eq!(backend.predict(&row_with(0, 6.8)).unwrap(), 7);
        assert!(matches!(
            backend.predict(&row_with(0, 0.3)),
            Err(DispatchError::Internal(_))
        ));
        assert!(matches!(
            backend.predict(&row_with(0, 9.0)),
            Err(DispatchError::Internal(_))
        ));
        assert!(matches!(
            backend.predict(&[0.0; 12]),
            Err(DispatchError::FeatureShape { expected: 54, actual: 12 })
        ));
    }

    #[test]
    fn test_onnx_score_output_takes_argmax() {
        // Score for class k is feature k-1
        let artifact = onnx_matmul_artifact(7, |row, col| if row == col { 1.0 } else { 0.0 });
        let backend = onnx_backend(artifact.path());
        backend.load().unwrap();

        assert_eq!(backend.predict(&row_with(3, 5.0)).unwrap(), 4);
        assert_eq!(backend.predict(&row_with(6, 0.5)).unwrap(), 7);
    }

    #[test]
    fn test_onnx_wrong_score_count_is_internal() {
        let artifact = onnx_matmul_artifact(3, |row, col| if row == col { 1.0 } else { 0.0 });
        let backend = onnx_backend(artifact.path());
        backend.load().unwrap();
        assert!(matches!(
            backend.predict(&row_with(1, 1.0)),
            Err(DispatchError::Internal(_))
        ));
    }

    #[test]
    fn test_output_to_label() {
        assert_eq!(output_to_label(&[3.0], 7).unwrap(), 3);
        assert_eq!(output_to_label(&[0.6], 7).unwrap(), 1);
        assert_eq!(output_to_label(&[0.1, 0.7, 0.2, 0.0, 0.0, 0.0, 0.0], 7).unwrap(), 2);
        assert!(output_to_label(&[], 7).is_err());
        assert!(output_to_label(&[f32::NAN], 7).is_err());
    }

    #[test]
    fn test_output_outside_class_range_is_rejected() {
        for values in [vec![0.3], vec![9.0], vec![1e12], vec![-2.0]] {
            assert!(
                matches!(output_to_label(&values, 7), Err(DispatchError::Internal(_))),
                "{:?}",
                values
            );
        }
        let mut scores = vec![0.5; 7];
        scores[0] = f32::NAN;
        assert!(matches!(
            output_to_label(&scores, 7),
            Err(DispatchError::Internal(_))
        ));
        assert!(output_to_label(&[0.1, 0.9, 0.2], 7).is_err());
    }

    #[test]
    fn test_poisoned_cache_is_internal_not_unloaded() {
        let artifact = write_artifact("2");
        let cache = Arc::new(ModelCache::new());
        let poisoner = Arc::clone(&cache);
        let path = artifact.path().to_path_buf();
        let _ = std::thread::spawn(move || {
            let _ = poisoner.get_or_load(&path, |_| panic!("loader crashed"));
        })
        .join();

        let backend =
            PersistedModelBackend::new(artifact.path(), Arc::new(CountingLoader::default()), cache);
        assert!(!backend.is_loaded());
        assert!(matches!(
            backend.predict(&[0.0; 54]),
            Err(DispatchError::Internal(_))
        ));
    }
}
