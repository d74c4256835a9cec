//! Logistic-regression wrapper over linfa-logistic.
//!
//! Binary runs use the two-class solver and expose its coefficients as the
//! importance column; multiclass runs use the multinomial solver and predict
//! hard labels only.
use anyhow::{anyhow, Result};
use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_logistic::{
    FittedLogisticRegression, LogisticRegression, MultiFittedLogisticRegression,
    MultiLogisticRegression,
};
use ndarray::{Array1, Array2};

use crate::config::LogRegParams;
use crate::models::classifier::Classifier;

const MAX_ITERATIONS: u64 = 500;

pub struct LogisticModel {
    params: LogRegParams,
    fitted: Option<FittedLogistic>,
}

enum FittedLogistic {
    Binary(FittedLogisticRegression<f64, usize>),
    Multinomial(MultiFittedLogisticRegression<f64, usize>),
}

impl LogisticModel {
    pub fn new(params: LogRegParams) -> Self {
        LogisticModel {
            params,
            fitted: None,
        }
    }

    fn alpha(&self) -> Result<f64> {
        if self.params.c <= 0.0 {
            return Err(anyhow!(
                "inverse regularization strength C must be positive, got {}",
                self.params.c
            ));
        }
        Ok(1.0 / self.params.c)
    }
}

impl Classifier for LogisticModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        let alpha = self.alpha()?;
        let dataset = Dataset::new(x.clone(), y.clone());

        if n_classes == 2 {
            let model = LogisticRegression::default()
                .alpha(alpha)
                .with_intercept(self.params.fit_intercept)
                .max_iterations(MAX_ITERATIONS)
                .fit(&dataset)
                .map_err(|e| anyhow!("Logistic regression fit failed: {}", e))?;
            self.fitted = Some(FittedLogistic::Binary(model));
        } else {
            let model = MultiLogisticRegression::default()
                .alpha(alpha)
                .with_intercept(self.params.fit_intercept)
                .max_iterations(MAX_ITERATIONS)
                .fit(&dataset)
                .map_err(|e| anyhow!("Multinomial logistic fit failed: {}", e))?;
            self.fitted = Some(FittedLogistic::Multinomial(model));
        }
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self.fitted.as_ref() {
            Some(FittedLogistic::Binary(model)) => Ok(model.predict_probabilities(x)),
            Some(FittedLogistic::Multinomial(_)) => Err(anyhow!(
                "probability scores are defined for binary runs only"
            )),
            None => Err(anyhow!("Logistic model queried before fit")),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        match self.fitted.as_ref() {
            Some(FittedLogistic::Binary(model)) => Ok(model.predict(x)),
            Some(FittedLogistic::Multinomial(model)) => Ok(model.predict(x)),
            None => Err(anyhow!("Logistic model queried before fit")),
        }
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        match self.fitted.as_ref()? {
            FittedLogistic::Binary(model) => Some(model.params().to_vec()),
            FittedLogistic::Multinomial(_) => None,
        }
    }

    fn name(&self) -> &'static str {
        "logistic regression"
    }
}
