//! Prediction backends
//!
//! Three families with different readiness semantics:
//! - heuristic: stateless, nothing to prepare
//! - statistical: a linear and an ensemble classifier fitted by one trainer
//! - persisted: a pre-built artifact loaded once through a [`ModelCache`]

mod cache;
mod forest;
mod heuristic;
mod linear;
mod persisted;
mod scoring;
mod statistical;

pub use cache::ModelCache;
pub use forest::{ForestParams, RandomForest};
pub use heuristic::{HeuristicBackend, HEURISTIC_FIELDS};
pub use linear::{LinearParams, LogisticRegression};
pub use persisted::{ArtifactLoader, ArtifactModel, OnnxLoader, PersistedModelBackend};
pub use scoring::{accuracy, weighted_f1, Scores};
pub use statistical::{
    PreparedModels, StatisticalBackend, SubModel, TrainedModels, TrainerConfig, TrainingPolicy,
};

use crate::error::Result;
use crate::models::ClassId;
use ndarray::{ArrayView1, ArrayView2, Axis};
use std::fmt;

/// Which backend family serves a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Heuristic,
    Statistical,
    Persisted,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::Heuristic => "heuristic",
            BackendKind::Statistical => "statistical",
            BackendKind::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Readiness check shared by all backends
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// True when `predict` can run without a prepare step
    fn is_ready(&self) -> bool;
}

/// Contract for the fitted statistical models
pub trait Classifier: Send + Sync {
    /// Fit on rows of `x` labelled by `y`
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[ClassId]) -> Result<()>;

    /// Predict one label per row
    fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<ClassId>;

    fn predict_one(&self, row: ArrayView1<'_, f64>) -> ClassId {
        self.predict(row.insert_axis(Axis(0)))[0]
    }

    /// Accuracy and weighted F1 on a labelled set
    fn score(&self, x: ArrayView2<'_, f64>, y: &[ClassId]) -> Scores {
        let predicted = self.predict(x);
        Scores {
            accuracy: accuracy(y, &predicted),
            f1_score: weighted_f1(y, &predicted),
        }
    }
}
