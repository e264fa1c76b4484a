//! Hold-out evaluation metrics

use crate::models::ClassId;
use std::collections::BTreeMap;

/// Accuracy and F1 of a sub-model on the held-out split
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scores {
    pub accuracy: f64,
    pub f1_score: f64,
}

/// Fraction of predictions equal to the truth. Empty input scores 0.
pub fn accuracy(truth: &[ClassId], predicted: &[ClassId]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

/// Per-class F1 averaged with weights equal to each class's support
pub fn weighted_f1(truth: &[ClassId], predicted: &[ClassId]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }

    // class -> (true positives, false positives, false negatives, support)
    let mut counts: BTreeMap<ClassId, (usize, usize, usize, usize)> = BTreeMap::new();
    for (&t, &p) in truth.iter().zip(predicted) {
        counts.entry(t).or_default().3 += 1;
        if t == p {
            counts.entry(t).or_default().0 += 1;
        } else {
            counts.entry(p).or_default().1 += 1;
            counts.entry(t).or_default().2 += 1;
        }
    }

    let total = truth.len() as f64;
    counts
        .values()
        .filter(|(_, _, _, support)| *support > 0)
        .map(|&(tp, fp, fn_, support)| {
            let denom = 2 * tp + fp + fn_;
            let f1 = if denom == 0 {
                0.0
            } else {
                2.0 * tp as f64 / denom as f64
            };
            f1 * support as f64 / total
        })
        .sum()
}
