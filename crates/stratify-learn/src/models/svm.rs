//! Support-vector classifier wrapper over linfa-svm.
//!
//! Binary runs fit a single probabilistic SVM; multiclass runs fit one
//! machine per class (one-vs-rest) and take the argmax of the per-class
//! probabilities. The SVM families expect min-max scaled features; scaling
//! happens upstream in the trainer.
use anyhow::{anyhow, Result};
use linfa::dataset::Pr;
use linfa::traits::{Fit, Predict};
use linfa::Dataset;
use linfa_svm::{Svm, SvmParams};
use ndarray::{Array1, Array2};

use crate::config::{SvmKernel, SvmSettings};
use crate::models::classifier::Classifier;

pub struct SvmModel {
    settings: SvmSettings,
    fitted: Vec<Svm<f64, Pr>>,
    n_classes: usize,
}

impl SvmModel {
    pub fn new(settings: SvmSettings) -> Self {
        SvmModel {
            settings,
            fitted: Vec::new(),
            n_classes: 0,
        }
    }

    fn fit_one(&self, x: &Array2<f64>, targets: Array1<bool>) -> Result<Svm<f64, Pr>> {
        let dataset = Dataset::new(x.clone(), targets);

        let mut params: SvmParams<f64, Pr> = Svm::<f64, Pr>::params()
            .pos_neg_weights(self.settings.c, self.settings.c);

        params = match self.settings.kernel {
            SvmKernel::Linear => params.linear_kernel(),
            SvmKernel::Rbf => params.gaussian_kernel(self.settings.gamma),
            SvmKernel::Poly => {
                params.polynomial_kernel(self.settings.gamma, self.settings.degree as f64)
            }
        };

        <SvmParams<f64, Pr> as Fit<_, _, _>>::fit(&params, &dataset)
            .map_err(|e| anyhow!("SVM fit failed: {}", e))
    }

    /// Per-machine probability columns, rows aligned with `x`.
    fn machine_scores(&self, x: &Array2<f64>) -> Result<Vec<Vec<f64>>> {
        if self.fitted.is_empty() {
            return Err(anyhow!("SVM queried before fit"));
        }
        let mut columns = Vec::with_capacity(self.fitted.len());
        for machine in &self.fitted {
            let predictions = machine.predict(x.clone());
            let scores: Vec<f64> = predictions
                .targets()
                .iter()
                .map(|p| f64::from(**p))
                .collect();
            columns.push(scores);
        }
        Ok(columns)
    }
}

impl Classifier for SvmModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        self.fitted.clear();
        self.n_classes = n_classes;

        if n_classes == 2 {
            let targets = y.mapv(|v| v == 1);
            self.fitted.push(self.fit_one(x, targets)?);
        } else {
            for class in 0..n_classes {
                let targets = y.mapv(|v| v == class);
                self.fitted.push(self.fit_one(x, targets)?);
            }
        }
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_classes != 2 {
            return Err(anyhow!(
                "probability scores are defined for binary runs only"
            ));
        }
        let columns = self.machine_scores(x)?;
        Ok(Array1::from_vec(columns.into_iter().next().unwrap_or_default()))
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let columns = self.machine_scores(x)?;
        if self.n_classes == 2 {
            let preds = columns[0].iter().map(|&p| (p >= 0.5) as usize).collect();
            return Ok(Array1::from_vec(preds));
        }

        let n_rows = x.nrows();
        let mut preds = Vec::with_capacity(n_rows);
        for row in 0..n_rows {
            let best = (0..columns.len())
                .max_by(|&a, &b| {
                    columns[a][row]
                        .partial_cmp(&columns[b][row])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(0);
            preds.push(best);
        }
        Ok(Array1::from_vec(preds))
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        // Kernel machines expose no per-feature weights; the importance
        // output column is omitted for the SVM families.
        None
    }

    fn name(&self) -> &'static str {
        "support vector machine"
    }
}
