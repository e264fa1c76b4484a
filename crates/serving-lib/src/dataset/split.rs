//! Reproducible train/test split

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices of a shuffled hold-out split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Shuffle `0..n_rows` with a seeded RNG and hold out `test_fraction`.
    ///
    /// The test part is rounded up; both parts keep at least one row when
    /// `n_rows >= 2`. The same seed always yields the same split.
    pub fn shuffled(n_rows: usize, test_fraction: f64, seed: u64) -> Self {
        let mut indices: Vec<usize> = (0..n_rows).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        if n_rows < 2 {
            return Self {
                train: indices.clone(),
                test: indices,
            };
        }

        let fraction = test_fraction.clamp(0.0, 1.0);
        let n_test = ((n_rows as f64 * fraction).ceil() as usize).clamp(1, n_rows - 1);
        let train = indices.split_off(n_test);
        Self {
            train,
            test: indices,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let split = TrainTestSplit::shuffled(100, 0.2, 42);
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_reproducible() {
        assert_eq!(
            TrainTestSplit::shuffled(50, 0.25, 7),
            TrainTestSplit::shuffled(50, 0.25, 7)
        );
        assert_ne!(
            TrainTestSplit::shuffled(50, 0.25, 7),
            TrainTestSplit::shuffled(50, 0.25, 8)
        );
    }

    #[test]
    fn test_tiny_datasets_keep_both_sides() {
        let split = TrainTestSplit::shuffled(2, 0.9, 1);
        assert_eq!(split.train.len(), 1);
        assert_eq!(split.test.len(), 1);

        let single = TrainTestSplit::shuffled(1, 0.2, 1);
        assert_eq!(single.train, vec![0]);
        assert_eq!(single.test, vec![0]);
    }
}
