//! Named column schema of the reference dataset
//!
//! Every backend resolves features through this list instead of fixed
//! positions, so a reordered dataset only needs a new schema.

use crate::error::{DispatchError, Result};
use crate::models::ClassId;
use std::sync::OnceLock;

/// Number of feature columns in a raw row
pub const NUM_FEATURES: usize = 54;

/// Cover types are labelled 1..=NUM_CLASSES
pub const NUM_CLASSES: ClassId = 7;

/// Name of the target column (last column of each dataset row)
pub const TARGET_COLUMN: &str = "Cover_Type";

const CONTINUOUS_COLUMNS: [&str; 10] = [
    "Elevation",
    "Aspect",
    "Slope",
    "Horizontal_Distance_To_Hydrology",
    "Vertical_Distance_To_Hydrology",
    "Horizontal_Distance_To_Roadways",
    "Hillshade_9am",
    "Hillshade_Noon",
    "Hillshade_3pm",
    "Horizontal_Distance_To_Fire_Points",
];

const WILDERNESS_AREAS: usize = 4;
const SOIL_TYPES: usize = 40;

/// Ordered feature column names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// The 54-column forest cover-type layout
    pub fn covtype() -> &'static FeatureSchema {
        static SCHEMA: OnceLock<FeatureSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            let mut columns: Vec<String> =
                CONTINUOUS_COLUMNS.iter().map(|c| c.to_string()).collect();
            columns.extend((1..=WILDERNESS_AREAS).map(|i| format!("Wilderness_Area_{}", i)));
            columns.extend((1..=SOIL_TYPES).map(|i| format!("Soil_Type_{}", i)));
            FeatureSchema::new(columns)
        })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DispatchError::FeatureMapping {
                field: name.to_string(),
                reason: "not a column of the feature schema".to_string(),
            })
    }

    /// Fails with a shape error unless `len` matches the schema width
    pub fn check_width(&self, len: usize) -> Result<()> {
        if len != self.width() {
            return Err(DispatchError::FeatureShape {
                expected: self.width(),
                actual: len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covtype_layout() {
        let schema = FeatureSchema::covtype();
        assert_eq!(schema.width(), NUM_FEATURES);
        assert_eq!(schema.index_of("Elevation").unwrap(), 0);
        assert_eq!(schema.index_of("Slope").unwrap(), 2);
        assert_eq!(schema.index_of("Hillshade_9am").unwrap(), 6);
        assert_eq!(schema.index_of("Hillshade_Noon").unwrap(), 7);
        assert_eq!(schema.index_of("Wilderness_Area_3").unwrap(), 12);
        assert_eq!(schema.index_of("Soil_Type_40").unwrap(), 53);
    }

    #[test]
    fn test_unknown_column() {
        assert!(matches!(
            FeatureSchema::covtype().index_of("Rainfall"),
            Err(DispatchError::FeatureMapping { .. })
        ));
    }

    #[test]
    fn test_check_width() {
        let schema = FeatureSchema::covtype();
        assert!(schema.check_width(54).is_ok());
        assert!(matches!(
            schema.check_width(53),
            Err(DispatchError::FeatureShape { expected: 54, actual: 53 })
        ));
    }
}
