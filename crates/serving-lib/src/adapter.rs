//! Shapes raw request vectors for each backend
//!
//! ML backends take the full dense row; the heuristic takes a name-keyed
//! subset. Both go through the feature schema so no backend depends on
//! column positions.

use crate::dataset::FeatureSchema;
use crate::error::{DispatchError, Result};
use crate::models::{NamedFeatureSubset, RawFeatureVector};
use ndarray::{Array1, ArrayView1};

pub struct FeatureAdapter<'a> {
    schema: &'a FeatureSchema,
}

impl<'a> FeatureAdapter<'a> {
    pub fn new(schema: &'a FeatureSchema) -> Self {
        Self { schema }
    }

    /// Full-width row for the statistical backends
    pub fn dense(&self, raw: &RawFeatureVector) -> Result<Array1<f64>> {
        self.schema.check_width(raw.len())?;
        Ok(Array1::from(raw.values().to_vec()))
    }

    /// Full-width `f32` row for the persisted model
    pub fn dense_f32(&self, raw: &RawFeatureVector) -> Result<Vec<f32>> {
        self.schema.check_width(raw.len())?;
        Ok(raw.values().iter().map(|&v| v as f32).collect())
    }

    /// Resolve `fields` against the schema once, for repeated projection
    pub fn projection(&self, fields: &[&'static str]) -> Result<Projection> {
        let columns = fields
            .iter()
            .map(|&name| Ok((name, self.schema.index_of(name)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Projection { columns })
    }

    /// Project a request vector onto the named `fields`
    ///
    /// Only the named columns need to be present; trailing values are ignored.
    pub fn project(
        &self,
        raw: &RawFeatureVector,
        fields: &[&'static str],
    ) -> Result<NamedFeatureSubset> {
        self.projection(fields)?.apply(ArrayView1::from(raw.values()))
    }
}

/// Field names paired with their resolved column positions
#[derive(Debug, Clone)]
pub struct Projection {
    columns: Vec<(&'static str, usize)>,
}

impl Projection {
    pub fn apply(&self, row: ArrayView1<'_, f64>) -> Result<NamedFeatureSubset> {
        let mut subset = NamedFeatureSubset::new();
        for &(name, idx) in &self.columns {
            let value = row
                .get(idx)
                .copied()
                .ok_or_else(|| DispatchError::FeatureMapping {
                    field: name.to_string(),
                    reason: format!("input has only {} values", row.len()),
                })?;
            // Truncate toward zero; the rule set works on whole units
            subset.insert(name, value as i64);
        }
        Ok(subset)
    }
}
