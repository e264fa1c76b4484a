//! Rule-based cover type heuristic
//!
//! Elevation picks a band, then the first override in that band whose
//! conditions all hold decides the class; otherwise the band default does.
//! The table is static, so identical subsets always get identical labels.

use super::{Backend, BackendKind};
use crate::adapter::FeatureAdapter;
use crate::dataset::{FeatureSchema, ReferenceDataset};
use crate::error::Result;
use crate::models::{ClassId, NamedFeatureSubset};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

const ELEVATION: &str = "Elevation";
const ASPECT: &str = "Aspect";
const SLOPE: &str = "Slope";
const HYDROLOGY: &str = "Horizontal_Distance_To_Hydrology";
const HILLSHADE_9AM: &str = "Hillshade_9am";
const HILLSHADE_NOON: &str = "Hillshade_Noon";
const WILDERNESS_3: &str = "Wilderness_Area_3";

/// The seven fields the rule set reads
pub const HEURISTIC_FIELDS: [&str; 7] = [
    ELEVATION,
    ASPECT,
    SLOPE,
    HYDROLOGY,
    HILLSHADE_9AM,
    HILLSHADE_NOON,
    WILDERNESS_3,
];

#[derive(Debug, Clone, Copy)]
enum Condition {
    InWilderness3,
    /// Aspect within 45 degrees of north and slope at least this steep
    NorthFacing { min_slope: i64 },
    SlopeBelow(i64),
    HydrologyWithin(i64),
    Hillshade9amBelow(i64),
    HillshadeNoonAtLeast(i64),
}

impl Condition {
    fn holds(&self, s: &NamedFeatureSubset) -> Result<bool> {
        Ok(match *self {
            Condition::InWilderness3 => s.get(WILDERNESS_3)? == 1,
            Condition::NorthFacing { min_slope } => {
                let aspect = s.get(ASPECT)?.rem_euclid(360);
                (aspect <= 45 || aspect >= 315) && s.get(SLOPE)? >= min_slope
            }
            Condition::SlopeBelow(limit) => s.get(SLOPE)? < limit,
            Condition::HydrologyWithin(limit) => s.get(HYDROLOGY)? <= limit,
            Condition::Hillshade9amBelow(limit) => s.get(HILLSHADE_9AM)? < limit,
            Condition::HillshadeNoonAtLeast(limit) => s.get(HILLSHADE_NOON)? >= limit,
        })
    }
}

struct Override {
    all: &'static [Condition],
    cover_type: ClassId,
}

struct ElevationBand {
    floor: i64,
    default: ClassId,
    overrides: &'static [Override],
}

// Bands ordered from the highest floor down; the last one catches everything.
const RULES: &[ElevationBand] = &[
    ElevationBand {
        floor: 3350,
        default: 7,
        overrides: &[],
    },
    ElevationBand {
        floor: 3050,
        default: 1,
        overrides: &[Override {
            all: &[Condition::InWilderness3, Condition::SlopeBelow(8)],
            cover_type: 7,
        }],
    },
    ElevationBand {
        floor: 2750,
        default: 2,
        overrides: &[
            Override {
                all: &[Condition::NorthFacing { min_slope: 15 }],
                cover_type: 1,
            },
            Override {
                all: &[
                    Condition::InWilderness3,
                    Condition::HillshadeNoonAtLeast(235),
                    Condition::SlopeBelow(12),
                ],
                cover_type: 5,
            },
        ],
    },
    ElevationBand {
        floor: 2450,
        default: 2,
        overrides: &[
            Override {
                all: &[Condition::NorthFacing { min_slope: 20 }],
                cover_type: 6,
            },
            Override {
                all: &[Condition::Hillshade9amBelow(170)],
                cover_type: 6,
            },
        ],
    },
    ElevationBand {
        floor: 2150,
        default: 3,
        overrides: &[
            Override {
                all: &[Condition::HydrologyWithin(60), Condition::SlopeBelow(10)],
                cover_type: 4,
            },
            Override {
                all: &[Condition::NorthFacing { min_slope: 15 }],
                cover_type: 6,
            },
            Override {
                all: &[Condition::Hillshade9amBelow(185)],
                cover_type: 6,
            },
        ],
    },
    ElevationBand {
        floor: i64::MIN,
        default: 3,
        overrides: &[Override {
            all: &[Condition::HydrologyWithin(150)],
            cover_type: 4,
        }],
    },
];

/// Classify a subset with the static rule table
pub fn classify(subset: &NamedFeatureSubset) -> Result<ClassId> {
    let elevation = subset.get(ELEVATION)?;
    // Every field is required even when the matching band ignores it
    for field in HEURISTIC_FIELDS {
        subset.get(field)?;
    }

    let Some(band) = RULES.iter().find(|band| elevation >= band.floor) else {
        return Ok(3);
    };
    for rule in band.overrides {
        let mut matched = true;
        for condition in rule.all {
            if !condition.holds(subset)? {
                matched = false;
                break;
            }
        }
        if matched {
            return Ok(rule.cover_type);
        }
    }
    Ok(band.default)
}

/// Stateless heuristic backend
#[derive(Debug, Clone)]
pub struct HeuristicBackend {
    dataset_path: PathBuf,
    schema: FeatureSchema,
    max_rows: Option<usize>,
}

impl HeuristicBackend {
    pub fn new(dataset_path: impl Into<PathBuf>, schema: FeatureSchema, max_rows: Option<usize>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
            schema,
            max_rows,
        }
    }

    /// Nothing to train or load
    pub fn prepare(&self) -> Result<()> {
        Ok(())
    }

    pub fn predict(&self, subset: &NamedFeatureSubset) -> Result<ClassId> {
        classify(subset)
    }

    /// Share of reference rows the rule table labels correctly.
    /// Reads the dataset on every call.
    pub fn accuracy(&self) -> Result<f64> {
        let start = Instant::now();
        let dataset = ReferenceDataset::load(&self.dataset_path, &self.schema, self.max_rows)?;
        let projection = FeatureAdapter::new(&self.schema).projection(&HEURISTIC_FIELDS)?;

        let mut correct = 0usize;
        for (idx, &label) in dataset.labels().iter().enumerate() {
            let subset = projection.apply(dataset.row(idx))?;
            if classify(&subset)? == label {
                correct += 1;
            }
        }

        let accuracy = correct as f64 / dataset.n_rows() as f64;
        debug!(
            rows = dataset.n_rows(),
            accuracy = accuracy,
            elapsed_ms = start.elapsed().as_millis(),
            "Heuristic accuracy computed"
        );
        Ok(accuracy)
    }
}

impl Backend for HeuristicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Heuristic
    }

    fn is_ready(&self) -> bool {
        true
    }
}
