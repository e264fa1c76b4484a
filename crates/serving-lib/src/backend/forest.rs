//! Random forest over linfa decision trees
//!
//! Each tree is fitted on a bootstrap sample restricted to a random feature
//! subset. Trees are fitted in parallel, each from its own RNG seeded with
//! `seed + tree index`, so the fitted forest does not depend on thread
//! scheduling. Prediction is a majority vote.

use super::Classifier;
use crate::error::{DispatchError, Result};
use crate::models::ClassId;
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Features each tree sees; `None` means all of them
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 10,
            max_depth: 16,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

struct Member {
    features: Vec<usize>,
    tree: DecisionTree<f64, usize>,
}

impl Member {
    fn votes(&self, x: ArrayView2<'_, f64>) -> Array1<usize> {
        self.tree.predict(&x.select(Axis(1), &self.features))
    }
}

pub struct RandomForest {
    params: ForestParams,
    classes: Vec<ClassId>,
    members: Vec<Member>,
}

impl fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForest")
            .field("params", &self.params)
            .field("classes", &self.classes)
            .field("n_trees", &self.members.len())
            .finish()
    }
}

impl RandomForest {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            classes: Vec::new(),
            members: Vec::new(),
        }
    }

    fn fit_member(
        &self,
        x: ArrayView2<'_, f64>,
        y_idx: &[usize],
        n_features: usize,
        tree: usize,
    ) -> Result<Member> {
        let mut rng = StdRng::seed_from_u64(self.params.seed.wrapping_add(tree as u64));
        let n_rows = x.nrows();
        let rows: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
        let mut features = rand::seq::index::sample(&mut rng, x.ncols(), n_features).into_vec();
        features.sort_unstable();

        let records = x.select(Axis(0), &rows).select(Axis(1), &features);
        let targets: Array1<usize> = rows.iter().map(|&r| y_idx[r]).collect();
        let dataset = DatasetBase::new(records, targets);

        let tree = DecisionTree::params()
            .split_quality(SplitQuality::Gini)
            .max_depth(Some(self.params.max_depth))
            .min_weight_split(self.params.min_samples_split as f32)
            .fit(&dataset)
            .map_err(|e| DispatchError::Internal(format!("decision tree fit failed: {}", e)))?;

        Ok(Member { features, tree })
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[ClassId]) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() || self.params.n_trees == 0 {
            return Err(DispatchError::Internal(format!(
                "cannot fit {} trees on {} rows with {} labels",
                self.params.n_trees,
                x.nrows(),
                y.len()
            )));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let y_idx: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();

        let n_features = self
            .params
            .max_features
            .unwrap_or(x.ncols())
            .clamp(1, x.ncols().max(1));

        let this = &*self;
        let members = (0..this.params.n_trees)
            .into_par_iter()
            .map(|t| this.fit_member(x, &y_idx, n_features, t))
            .collect::<Result<Vec<Member>>>()?;

        self.classes = classes;
        self.members = members;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<ClassId> {
        if self.members.is_empty() {
            return vec![0; x.nrows()];
        }

        let mut tally = vec![vec![0usize; self.classes.len()]; x.nrows()];
        for member in &self.members {
            for (row, class_idx) in member.votes(x).iter().enumerate() {
                if let Some(count) = tally[row].get_mut(*class_idx) {
                    *count += 1;
                }
            }
        }
        tally
            .iter()
            .map(|votes| self.classes[majority(votes)])
            .collect()
    }
}

/// Index of the largest count; ties go to the lowest index
fn majority(counts: &[usize]) -> usize {
    let mut best = 0;
    for (idx, &count) in counts.iter().enumerate() {
        if count > counts[best] {
            best = idx;
        }
    }
    best
}
