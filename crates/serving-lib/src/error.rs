//! Error taxonomy for the dispatch core
//!
//! Every failure a dispatch can produce is one of these variants. The
//! transport layer uses [`DispatchError::class`] to pick a client or server
//! status and [`DispatchError::kind`] as a stable metrics label.

use std::path::PathBuf;
use thiserror::Error;

/// Message returned to clients for an unknown option
pub const INVALID_OPTION_MESSAGE: &str = "Invalid option choice.";

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The requested option is not one of the known strategies
    #[error("Invalid option choice.")]
    InvalidOption { received: String },

    /// A named field required by a backend could not be produced
    #[error("feature '{field}' is not available: {reason}")]
    FeatureMapping { field: String, reason: String },

    /// The raw vector does not have the width the schema expects
    #[error("feature vector has {actual} values, expected {expected}")]
    FeatureShape { expected: usize, actual: usize },

    /// The reference dataset is missing, unreadable, or empty
    #[error("reference dataset {path:?} unavailable: {reason}")]
    DatasetUnavailable { path: PathBuf, reason: String },

    /// The persisted artifact could not be read or parsed
    #[error("failed to load model artifact {path:?}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// `predict` was called on a persisted backend that was never loaded
    #[error("model not loaded, call load() before predict()")]
    ModelNotLoaded,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Whether a failure was caused by the caller or by the serving environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Client,
    Server,
}

impl DispatchError {
    pub fn class(&self) -> ErrorClass {
        match self {
            DispatchError::InvalidOption { .. }
            | DispatchError::FeatureMapping { .. }
            | DispatchError::FeatureShape { .. } => ErrorClass::Client,
            DispatchError::DatasetUnavailable { .. }
            | DispatchError::ModelLoad { .. }
            | DispatchError::ModelNotLoaded
            | DispatchError::Internal(_) => ErrorClass::Server,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::InvalidOption { .. } => "invalid_option",
            DispatchError::FeatureMapping { .. } => "feature_mapping",
            DispatchError::FeatureShape { .. } => "feature_shape",
            DispatchError::DatasetUnavailable { .. } => "dataset_unavailable",
            DispatchError::ModelLoad { .. } => "model_load",
            DispatchError::ModelNotLoaded => "model_not_loaded",
            DispatchError::Internal(_) => "internal",
        }
    }

    pub(crate) fn dataset(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DispatchError::DatasetUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DispatchError::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = DispatchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_message_is_client_facing() {
        let err = DispatchError::InvalidOption {
            received: "99".to_string(),
        };
        assert_eq!(err.to_string(), INVALID_OPTION_MESSAGE);
        assert_eq!(err.class(), ErrorClass::Client);
    }

    #[test]
    fn test_environment_errors_are_server_class() {
        assert_eq!(
            DispatchError::dataset("missing.data", "not found").class(),
            ErrorClass::Server
        );
        assert_eq!(
            DispatchError::model_load("nn.onnx", "corrupt").class(),
            ErrorClass::Server
        );
        assert_eq!(DispatchError::ModelNotLoaded.class(), ErrorClass::Server);
    }

    #[test]
    fn test_shape_error_reports_widths() {
        let err = DispatchError::FeatureShape {
            expected: 54,
            actual: 3,
        };
        assert_eq!(err.kind(), "feature_shape");
        assert!(err.to_string().contains("3 values, expected 54"));
    }
}
