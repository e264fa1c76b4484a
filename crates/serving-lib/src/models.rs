//! Core data models for the dispatch service

use crate::error::{DispatchError, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Cover type class id (1..=7 in the reference dataset)
pub type ClassId = u32;

/// Prediction strategy selected by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelOption {
    Heuristic,
    RandomForest,
    LogisticRegression,
    NeuralNetwork,
}

impl ModelOption {
    /// All options in declaration order. Position + 1 is the numeric id.
    pub const ALL: [ModelOption; 4] = [
        ModelOption::Heuristic,
        ModelOption::RandomForest,
        ModelOption::LogisticRegression,
        ModelOption::NeuralNetwork,
    ];

    pub fn id(&self) -> u64 {
        match self {
            ModelOption::Heuristic => 1,
            ModelOption::RandomForest => 2,
            ModelOption::LogisticRegression => 3,
            ModelOption::NeuralNetwork => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelOption::Heuristic => "heuristic",
            ModelOption::RandomForest => "random-forest",
            ModelOption::LogisticRegression => "logistic-regression",
            ModelOption::NeuralNetwork => "neural-network",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelOption::Heuristic => "Rule-based heuristic over seven terrain features",
            ModelOption::RandomForest => "Random forest trained on request",
            ModelOption::LogisticRegression => "Multinomial logistic regression trained on request",
            ModelOption::NeuralNetwork => "Pre-built neural network loaded from artifact",
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.id() == id)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|o| o.name() == name)
    }

    /// Resolve the `option` field of a request.
    ///
    /// Integers select by id and strings by canonical name. No coercion
    /// between the two: `"2"` is rejected, as is `2.0`.
    pub fn from_request_value(value: &serde_json::Value) -> Result<Self> {
        let resolved = match value {
            serde_json::Value::Number(n) => n.as_u64().and_then(Self::from_id),
            serde_json::Value::String(s) => Self::from_name(s),
            _ => None,
        };
        resolved.ok_or_else(|| DispatchError::InvalidOption {
            received: value.to_string(),
        })
    }
}

impl fmt::Display for ModelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Request body accepted by the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    pub option: serde_json::Value,
    pub pred_input: RawFeatureVector,
}

/// Full ordered feature row, in dataset column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawFeatureVector(pub Vec<f64>);

impl RawFeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

impl From<Vec<f64>> for RawFeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Name-keyed projection of a raw row, consumed by the heuristic backend
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedFeatureSubset {
    values: BTreeMap<String, i64>,
}

impl NamedFeatureSubset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: i64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Result<i64> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| DispatchError::FeatureMapping {
                field: name.to_string(),
                reason: "missing from feature subset".to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of a single dispatch
///
/// Metric names are backend specific and kept exactly as each backend
/// reports them. Serializes as a flat JSON object: metrics first, then the
/// label under `label_key`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub option: ModelOption,
    pub label: ClassId,
    pub label_key: &'static str,
    pub metrics: Vec<(&'static str, f64)>,
}

impl PredictionResult {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }
}

impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.metrics.len() + 1))?;
        for (key, value) in &self.metrics {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(self.label_key, &self.label)?;
        map.end()
    }
}
