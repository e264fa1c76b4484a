//! Result envelopes per option
//!
//! Key names are a wire contract with existing clients and differ per
//! backend, trailing colons included.

use crate::backend::{Scores, SubModel};
use crate::models::{ClassId, ModelOption, PredictionResult};

pub const HEURISTIC_ACCURACY: &str = "Heuristic Algorithm Accuracy";
pub const HEURISTIC_LABEL: &str = "Predict 'Cover_type' value for sample - Heuristic Algorithm";

pub const FOREST_ACCURACY: &str = "Random Forest Accuracy";
pub const FOREST_F1: &str = "Random Forest F1_score";
pub const FOREST_LABEL: &str = "Predict 'Cover_type' value for sample - Random Forest";

pub const LINEAR_ACCURACY: &str = "Logistic Regression Accuracy:";
pub const LINEAR_F1: &str = "Logistic Regression F1_score:";
pub const LINEAR_LABEL: &str = "Predict 'Cover_type' value for sample - Logistic Regression";

pub const NN_LABEL: &str = "Predict 'Cover_type' value for sample - NN";

pub fn heuristic(label: ClassId, accuracy: f64) -> PredictionResult {
    PredictionResult {
        option: ModelOption::Heuristic,
        label,
        label_key: HEURISTIC_LABEL,
        metrics: vec![(HEURISTIC_ACCURACY, accuracy)],
    }
}

pub fn statistical(submodel: SubModel, label: ClassId, scores: Scores) -> PredictionResult {
    let (option, accuracy_key, f1_key, label_key) = match submodel {
        SubModel::Ensemble => (
            ModelOption::RandomForest,
            FOREST_ACCURACY,
            FOREST_F1,
            FOREST_LABEL,
        ),
        SubModel::Linear => (
            ModelOption::LogisticRegression,
            LINEAR_ACCURACY,
            LINEAR_F1,
            LINEAR_LABEL,
        ),
    };
    PredictionResult {
        option,
        label,
        label_key,
        metrics: vec![(accuracy_key, scores.accuracy), (f1_key, scores.f1_score)],
    }
}

/// The persisted model reports no metrics
pub fn neural_network(label: ClassId) -> PredictionResult {
    PredictionResult {
        option: ModelOption::NeuralNetwork,
        label,
        label_key: NN_LABEL,
        metrics: Vec::new(),
    }
}
