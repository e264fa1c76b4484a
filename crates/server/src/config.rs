//! Server configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use serving_lib::backend::{ForestParams, TrainerConfig, TrainingPolicy};
use serving_lib::DispatcherConfig;
use std::path::PathBuf;

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "COVTYPE_CONFIG";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP port for predictions, health and metrics
    #[serde(default = "default_port")]
    pub port: u16,

    /// Reference dataset (CSV without header)
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Persisted neural-network artifact (ONNX)
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default)]
    pub training_policy: TrainingPolicy,

    #[serde(default = "default_forest_trees")]
    pub forest_trees: usize,

    /// Cap on reference rows read per request
    #[serde(default)]
    pub max_rows: Option<usize>,

    /// Load the artifact at startup instead of on the first request
    #[serde(default)]
    pub preload_model: bool,
}

fn default_port() -> u16 {
    5000
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("dataset_and_info/covtype.data")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("serialized_model/nn_model.onnx")
}

fn default_forest_trees() -> usize {
    ForestParams::default().n_trees
}

impl ServerConfig {
    /// Load configuration from an optional file, then `COVTYPE_*` variables
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("COVTYPE").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;
        Self::from_settings(settings)
    }

    pub fn from_settings(settings: config::Config) -> Result<Self> {
        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            dataset_path: self.dataset_path.clone(),
            model_path: self.model_path.clone(),
            max_rows: self.max_rows,
            trainer: TrainerConfig {
                policy: self.training_policy,
                forest: ForestParams {
                    n_trees: self.forest_trees,
                    ..ForestParams::default()
                },
                ..TrainerConfig::default()
            },
        }
    }
}
