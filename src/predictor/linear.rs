use linfa::prelude::*;
use linfa_logistic::MultiLogisticRegression;
use ndarray::{Array1, Array2, ArrayView1};

use crate::outcome::Prob3;

/// The stable linear baseline of the ensemble (spec §4.5 point 2), fit once
/// per training run on the same feature matrix as the boosted model.
/// Grounded on the `linfa`/`linfa-logistic` stack (see the
/// `ertyurk-spbook-trader` manifest in the example pack).
pub struct LinearModel {
    fitted: linfa_logistic::MultiFittedLogisticRegression<f64, usize>,
}

impl LinearModel {
    pub fn fit(x: &Array2<f64>, y: &[u8]) -> Self {
        let targets: Array1<usize> = y.iter().map(|&v| v as usize).collect();
        let dataset = Dataset::new(x.clone(), targets);
        let fitted = MultiLogisticRegression::default()
            .max_iterations(200)
            .fit(&dataset)
            .expect("logistic regression fit on a well-formed feature matrix");
        Self { fitted }
    }

    pub fn predict_proba_row(&self, row: ArrayView1<f64>) -> Prob3 {
        let batch: Array2<f64> = row.insert_axis(ndarray::Axis(0)).to_owned();
        let probs = self.fitted.predict_probabilities(&batch);
        // Columns follow the model's sorted class labels, i.e. Outcome::code() order.
        Prob3::new(probs[[0, 2]], probs[[0, 1]], probs[[0, 0]])
    }
}
