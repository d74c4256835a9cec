//! L1-penalized linear-model selection.
//!
//! Fits a lasso at the caller's regularization strength and keeps every
//! feature whose fitted coefficient is non-zero; sparsity is controlled by
//! the strength, not a fixed count. The regression variant takes the alpha
//! directly; the classification variant maps the sparsity parameter C to
//! alpha = 1/C and fits against the 0/1-recoded labels.
use anyhow::{anyhow, Result};
use linfa::traits::Fit;
use linfa::Dataset;
use linfa_elasticnet::ElasticNet;
use ndarray::{Array1, Array2};

use crate::config::TaskKind;
use crate::frame::FeatureFrame;

/// Coefficient magnitudes below this count as shrunk to zero.
const ZERO_TOLERANCE: f64 = 1e-12;

/// Fit a lasso and return the indices of features with non-zero
/// coefficients, in column order.
pub fn lasso_nonzero(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Vec<usize>> {
    if alpha <= 0.0 {
        return Err(anyhow!("lasso penalty must be positive, got {}", alpha));
    }

    let dataset = Dataset::new(x.clone(), y.clone());
    let model = ElasticNet::params()
        .penalty(alpha)
        .l1_ratio(1.0)
        .fit(&dataset)
        .map_err(|e| anyhow!("Lasso fit failed: {}", e))?;

    let kept: Vec<usize> = model
        .hyperplane()
        .iter()
        .enumerate()
        .filter_map(|(i, c)| if c.abs() > ZERO_TOLERANCE { Some(i) } else { None })
        .collect();

    log::info!(
        "Lasso (alpha = {}) retained {} of {} features",
        alpha,
        kept.len(),
        x.ncols()
    );
    Ok(kept)
}

/// L1 selection against a recoded frame.
pub fn l1_select(frame: &FeatureFrame, param: f64, task: TaskKind) -> Result<Vec<usize>> {
    match task {
        TaskKind::Regression => {
            let y = frame.numeric_labels()?;
            lasso_nonzero(&frame.x, &y, param)
        }
        TaskKind::Classification => {
            if param <= 0.0 {
                return Err(anyhow!("sparsity parameter C must be positive, got {}", param));
            }
            let y = frame.encode_binary("1", "0")?.mapv(|v| v as f64);
            lasso_nonzero(&frame.x, &y, 1.0 / param)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regression_data() -> (Array2<f64>, Array1<f64>) {
        // y depends strongly on feature 0, weakly on feature 1, not on 2.
        let mut values = Vec::new();
        let mut targets = Vec::new();
        for i in 0..20 {
            let a = i as f64 / 20.0;
            let b = ((i * 7) % 20) as f64 / 20.0;
            let c = ((i * 13) % 20) as f64 / 20.0;
            values.extend_from_slice(&[a, b, c]);
            targets.push(3.0 * a + 0.1 * b);
        }
        (
            Array2::from_shape_vec((20, 3), values).unwrap(),
            Array1::from_vec(targets),
        )
    }

    #[test]
    fn strong_predictor_survives_moderate_penalty() {
        let (x, y) = regression_data();
        let kept = lasso_nonzero(&x, &y, 0.05).unwrap();
        assert!(kept.contains(&0));
    }

    #[test]
    fn retained_count_grows_as_alpha_shrinks() {
        let (x, y) = regression_data();
        let strict = lasso_nonzero(&x, &y, 0.5).unwrap().len();
        let loose = lasso_nonzero(&x, &y, 0.001).unwrap().len();
        assert!(loose >= strict);
    }

    #[test]
    fn heavy_penalty_clears_everything() {
        let (x, y) = regression_data();
        let kept = lasso_nonzero(&x, &y, 1e6).unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn nonpositive_penalty_is_error() {
        let (x, y) = regression_data();
        assert!(lasso_nonzero(&x, &y, 0.0).is_err());
    }
}
