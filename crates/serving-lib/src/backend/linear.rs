//! Multinomial logistic regression
//!
//! Features are standardized with the training mean and deviation, then a
//! linfa multinomial model is fitted with L-BFGS. No randomness: the same
//! training set always gives the same coefficients.

use super::Classifier;
use crate::error::{DispatchError, Result};
use crate::models::ClassId;
use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_logistic::{MultiFittedLogisticRegression, MultiLogisticRegression};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::fmt;

#[derive(Debug, Clone)]
pub struct LinearParams {
    pub max_iterations: u64,
    /// L2 penalty applied to the coefficients
    pub alpha: f64,
    pub gradient_tolerance: f64,
}

impl Default for LinearParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            alpha: 0.1,
            gradient_tolerance: 1e-4,
        }
    }
}

enum Fitted {
    Unfitted,
    /// Training labels held a single class
    Constant,
    Model(MultiFittedLogisticRegression<f64, usize>),
}

pub struct LogisticRegression {
    params: LinearParams,
    classes: Vec<ClassId>,
    mean: Array1<f64>,
    scale: Array1<f64>,
    fitted: Fitted,
}

impl fmt::Debug for LogisticRegression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogisticRegression")
            .field("params", &self.params)
            .field("classes", &self.classes)
            .finish()
    }
}

impl LogisticRegression {
    pub fn new(params: LinearParams) -> Self {
        Self {
            params,
            classes: Vec::new(),
            mean: Array1::zeros(0),
            scale: Array1::zeros(0),
            fitted: Fitted::Unfitted,
        }
    }

    fn standardize(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        (&x - &self.mean) / &self.scale
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: &[ClassId]) -> Result<()> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(DispatchError::Internal(format!(
                "cannot fit logistic regression on {} rows with {} labels",
                x.nrows(),
                y.len()
            )));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        self.mean = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        self.scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });

        if classes.len() < 2 {
            self.classes = classes;
            self.fitted = Fitted::Constant;
            return Ok(());
        }

        let targets: Array1<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();
        let dataset = DatasetBase::new(self.standardize(x), targets);

        let model = MultiLogisticRegression::default()
            .alpha(self.params.alpha)
            .gradient_tolerance(self.params.gradient_tolerance)
            .max_iterations(self.params.max_iterations)
            .fit(&dataset)
            .map_err(|e| {
                DispatchError::Internal(format!("logistic regression fit failed: {}", e))
            })?;

        self.classes = classes;
        self.fitted = Fitted::Model(model);
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Vec<ClassId> {
        match &self.fitted {
            Fitted::Unfitted => vec![0; x.nrows()],
            Fitted::Constant => vec![self.classes[0]; x.nrows()],
            Fitted::Model(model) => {
                let predicted: Array1<usize> = model.predict(&self.standardize(x));
                predicted
                    .iter()
                    .map(|&idx| self.classes.get(idx).copied().unwrap_or(0))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Vec<ClassId>) {
        let x = array![
            [0.0, 1.0],
            [0.2, 0.9],
            [0.1, 1.1],
            [5.0, 0.0],
            [5.2, 0.1],
            [4.9, -0.1],
            [10.0, -1.0],
            [10.1, -0.9],
            [9.8, -1.1],
        ];
        (x, vec![1, 1, 1, 2, 2, 2, 3, 3, 3])
    }

    fn coefficients(model: &LogisticRegression) -> Array2<f64> {
        match &model.fitted {
            Fitted::Model(fitted) => fitted.params().clone(),
            _ => panic!("model was not fitted"),
        }
    }

    #[test]
    fn test_fits_separable_classes() {
        let (x, y) = separable();
        let mut model = LogisticRegression::new(LinearParams::default());
        model.fit(x.view(), &y).unwrap();
        assert_eq!(model.classes, vec![1, 2, 3]);
        assert_eq!(model.predict(x.view()), y);
        let scores = model.score(x.view(), &y);
        assert_eq!(scores.accuracy, 1.0);
    }

    #[test]
    fn test_constant_column_does_not_break_scaling() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [8.0, 7.0], [9.0, 7.0]];
        let y = vec![1, 1, 2, 2];
        let mut model = LogisticRegression::new(LinearParams::default());
        model.fit(x.view(), &y).unwrap();
        assert!(coefficients(&model).iter().all(|w| w.is_finite()));
        assert_eq!(model.predict_one(x.row(0)), 1);
        assert_eq!(model.predict_one(x.row(3)), 2);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = separable();
        let mut a = LogisticRegression::new(LinearParams::default());
        let mut b = LogisticRegression::new(LinearParams::default());
        a.fit(x.view(), &y).unwrap();
        b.fit(x.view(), &y).unwrap();
        assert_eq!(coefficients(&a), coefficients(&b));
    }

    #[test]
    fn test_single_class_predicts_that_class() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let mut model = LogisticRegression::new(LinearParams::default());
        model.fit(x.view(), &[5, 5]).unwrap();
        assert_eq!(model.predict(x.view()), vec![5, 5]);
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let x = Array2::<f64>::zeros((0, 3));
        let mut model = LogisticRegression::new(LinearParams::default());
        assert!(model.fit(x.view(), &[]).is_err());
    }
}
