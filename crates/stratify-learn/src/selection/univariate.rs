//! Univariate chi-squared feature scoring and top-N selection.

use anyhow::Result;
use ndarray::{Array1, Array2};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::PipelineError;
use crate::frame::FeatureFrame;

/// Compute per-feature chi-squared statistics of the class/feature
/// dependence, treating each feature column as a frequency-like quantity
/// summed within each class. Features must be nonnegative.
///
/// # Parameters
///
/// * `x` - Feature matrix of shape (n_samples, n_features).
/// * `y` - Class codes in `0..n_classes`.
/// * `n_classes` - Number of distinct classes.
///
/// # Returns
///
/// A tuple of per-feature chi-squared statistics and their p-values.
/// Features with zero total mass score 0 with p-value 1.
pub fn chi2_scores(
    x: &Array2<f64>,
    y: &Array1<usize>,
    n_classes: usize,
) -> Result<(Array1<f64>, Array1<f64>)> {
    let n_samples = x.nrows();
    let n_features = x.ncols();

    if n_classes < 2 {
        return Err(PipelineError::DegenerateClasses(
            "chi-squared scoring needs at least two classes".to_string(),
        )
        .into());
    }

    for (idx, value) in x.iter().enumerate() {
        if *value < 0.0 {
            let feature = idx % n_features;
            return Err(PipelineError::MalformedTable(format!(
                "feature '{}' contains negative values; chi-squared scoring needs nonnegative features",
                feature
            ))
            .into());
        }
    }

    // Observed class-wise sums and class frequencies.
    let mut observed = Array2::<f64>::zeros((n_classes, n_features));
    let mut class_count = vec![0.0f64; n_classes];
    for row in 0..n_samples {
        let class = y[row];
        class_count[class] += 1.0;
        for col in 0..n_features {
            observed[(class, col)] += x[(row, col)];
        }
    }

    let feature_sum: Vec<f64> = (0..n_features).map(|c| observed.column(c).sum()).collect();

    let dof = (n_classes - 1) as f64;
    let dist = ChiSquared::new(dof).map_err(|e| anyhow::anyhow!("chi2 distribution: {}", e))?;

    let mut stats = Array1::zeros(n_features);
    let mut p_values = Array1::ones(n_features);
    for col in 0..n_features {
        if feature_sum[col] == 0.0 {
            continue;
        }
        let mut stat = 0.0;
        for class in 0..n_classes {
            let expected = class_count[class] / n_samples as f64 * feature_sum[col];
            if expected > 0.0 {
                let diff = observed[(class, col)] - expected;
                stat += diff * diff / expected;
            }
        }
        stats[col] = stat;
        p_values[col] = 1.0 - dist.cdf(stat);
    }

    Ok((stats, p_values))
}

/// Top-k feature picker over a score vector, highest first. The underlying
/// sort is stable, so ties keep their original column order.
pub struct SelectKBest {
    k: usize,
}

impl SelectKBest {
    pub fn new(k: usize) -> Self {
        SelectKBest { k }
    }

    /// Indices of the k best-scoring features (fewer when the input has
    /// fewer features).
    pub fn fit(&self, scores: &Array1<f64>) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..scores.len()).collect();
        indices.sort_by(|&i, &j| {
            scores[j]
                .partial_cmp(&scores[i])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        indices.truncate(self.k);
        indices
    }
}

/// Chi-squared selection against a recoded frame: score every feature and
/// keep the top `n`, in ranked order.
pub fn chi2_select(frame: &FeatureFrame, n: usize) -> Result<Vec<usize>> {
    let counts = frame.class_counts();
    let classes: Vec<String> = counts.keys().cloned().collect();
    let y = frame.encode_classes(&classes)?;

    let (stats, _) = chi2_scores(&frame.x, &y, classes.len())?;
    Ok(SelectKBest::new(n).fit(&stats))
}
