//! Serving library for forest cover-type prediction
//!
//! This crate provides the core functionality for:
//! - Reference dataset loading and the shared feature schema
//! - Rule-based, statistical, and persisted-model prediction backends
//! - Strategy dispatch with a uniform result envelope
//! - Health checks and observability

pub mod adapter;
pub mod backend;
pub mod dataset;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;

pub use dispatch::{Dispatcher, DispatcherConfig};
pub use error::{DispatchError, ErrorClass, INVALID_OPTION_MESSAGE};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{DispatchMetrics, StructuredLogger};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::backend::{ArtifactLoader, ArtifactModel};
    use crate::error::{DispatchError, Result};
    use crate::models::ClassId;
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::NamedTempFile;
    use tract_onnx::pb;

    /// Deterministic covtype-shaped rows whose label follows elevation bands
    pub fn synthetic_csv(rows: usize) -> String {
        let mut out = String::new();
        for i in 0..rows {
            let class = (i % 7) as u32 + 1;
            let elevation = 1900 + class * 250 + (i % 17) as u32;
            let mut row: Vec<String> = vec![
                elevation.to_string(),
                ((i * 37) % 360).to_string(),
                (i % 30).to_string(),
                ((i * 11) % 400).to_string(),
                (i % 50).to_string(),
                ((i * 97) % 3000).to_string(),
                (150 + i % 100).to_string(),
                (180 + i % 70).to_string(),
                (100 + i % 100).to_string(),
                ((i * 53) % 3000).to_string(),
            ];
            for area in 0..4 {
                row.push(if area == (class as usize) % 4 { "1" } else { "0" }.to_string());
            }
            for soil in 0..40 {
                row.push(if soil == i % 40 { "1" } else { "0" }.to_string());
            }
            row.push(class.to_string());
            out.push_str(&row.join(","));
            out.push('\n');
        }
        out
    }

    pub fn write_dataset(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    /// A 54-wide sample: Elevation 3000, Aspect 120, Slope 10, Wilderness_Area_3 set
    pub fn sample_input() -> Vec<f64> {
        let mut values = vec![
            3000.0, 120.0, 10.0, 150.0, 0.0, 0.0, 220.0, 200.0, 180.0, 500.0,
        ];
        values.extend([0.0, 0.0, 1.0, 0.0]);
        values.extend(std::iter::repeat(0.0).take(39));
        values.push(1.0);
        values
    }

    /// Artifact loader that reads a class id from a text file and counts reads
    #[derive(Default)]
    pub struct CountingLoader {
        pub reads: AtomicUsize,
    }

    struct FixedModel(ClassId);

    impl ArtifactModel for FixedModel {
        fn predict(&self, features: &[f32]) -> Result<ClassId> {
            if features.len() != 54 {
                return Err(DispatchError::FeatureShape {
                    expected: 54,
                    actual: features.len(),
                });
            }
            Ok(self.0)
        }
    }

    impl ArtifactLoader for CountingLoader {
        fn load(&self, path: &Path) -> Result<Arc<dyn ArtifactModel>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            let bytes = std::fs::read(path).map_err(|e| DispatchError::ModelLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            let label = String::from_utf8_lossy(&bytes)
                .trim()
                .parse::<ClassId>()
                .map_err(|e| DispatchError::ModelLoad {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            Ok(Arc::new(FixedModel(label)))
        }
    }

    pub fn write_artifact(contents: &str) -> NamedTempFile {
        write_dataset(contents)
    }

    fn float_info(name: &str, dims: &[i64]) -> pb::ValueInfoProto {
        use pb::tensor_shape_proto::{dimension, Dimension};

        let dim = dims
            .iter()
            .map(|&d| Dimension {
                value: Some(dimension::Value::DimValue(d)),
                ..Default::default()
            })
            .collect();
        pb::ValueInfoProto {
            name: name.to_string(),
            r#type: Some(pb::TypeProto {
                value: Some(pb::type_proto::Value::TensorType(pb::type_proto::Tensor {
                    elem_type: pb::tensor_proto::DataType::Float as i32,
                    shape: Some(pb::TensorShapeProto { dim }),
                })),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Single-node ONNX graph: `[1, 54] x [54, outputs]` with `weight(row, col)`
    pub fn onnx_matmul_artifact(outputs: usize, weight: impl Fn(usize, usize) -> f32) -> NamedTempFile {
        use prost::Message;

        let inputs = crate::dataset::NUM_FEATURES;
        let float_data = (0..inputs)
            .flat_map(|row| (0..outputs).map(move |col| (row, col)))
            .map(|(row, col)| weight(row, col))
            .collect();

        let graph = pb::GraphProto {
            name: "covtype_fixture".to_string(),
            node: vec![pb::NodeProto {
                input: vec!["features".to_string(), "weights".to_string()],
                output: vec!["scores".to_string()],
                name: "matmul".to_string(),
                op_type: "MatMul".to_string(),
                ..Default::default()
            }],
            initializer: vec![pb::TensorProto {
                name: "weights".to_string(),
                dims: vec![inputs as i64, outputs as i64],
                data_type: pb::tensor_proto::DataType::Float as i32,
                float_data,
                ..Default::default()
            }],
            input: vec![float_info("features", &[1, inputs as i64])],
            output: vec![float_info("scores", &[1, outputs as i64])],
            ..Default::default()
        };
        let model = pb::ModelProto {
            ir_version: 7,
            opset_import: vec![pb::OperatorSetIdProto {
                domain: String::new(),
                version: 13,
            }],
            producer_name: "covtype-tests".to_string(),
            graph: Some(graph),
            ..Default::default()
        };

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&model.encode_to_vec()).unwrap();
        file.flush().unwrap();
        file
    }
}
