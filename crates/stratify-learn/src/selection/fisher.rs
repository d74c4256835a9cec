//! Fisher's-exact-test enrichment for binary features.
//!
//! For each feature, builds the 2x2 contingency table of label x feature
//! presence and computes the one-sided (greater) hypergeometric p-value.
//! Features that are not strictly 0/1 are rejected up front; a cell with no
//! observations counts zero, the deliberate "no observation" placeholder.
use anyhow::Result;
use statrs::distribution::{DiscreteCDF, Hypergeometric};

use crate::error::PipelineError;
use crate::frame::FeatureFrame;

/// One-sided (greater) p-value for the table [[tp, fn], [fp, tn]]:
/// the probability of drawing at least `tp` positives among the
/// feature-present instances under the hypergeometric null.
pub fn fisher_greater(tp: u64, fn_: u64, fp: u64, tn: u64) -> Result<f64> {
    if tp == 0 {
        return Ok(1.0);
    }
    let population = tp + fn_ + fp + tn;
    let successes = tp + fn_; // positive-labeled instances
    let draws = tp + fp; // feature-present instances

    let dist = Hypergeometric::new(population, successes, draws)
        .map_err(|e| anyhow::anyhow!("hypergeometric distribution: {}", e))?;
    let p = 1.0 - dist.cdf(tp - 1);
    Ok(p.clamp(0.0, 1.0))
}

/// Keep features enriched in the positive class at `p_cutoff`, in column
/// order. Labels must already be recoded to "1"/"0".
pub fn fisher_select(frame: &FeatureFrame, p_cutoff: f64) -> Result<Vec<usize>> {
    let is_pos = frame.encode_binary("1", "0")?;

    let mut kept = Vec::new();
    for col in 0..frame.n_features() {
        let mut tp = 0u64;
        let mut fn_ = 0u64;
        let mut fp = 0u64;
        let mut tn = 0u64;

        for row in 0..frame.n_rows() {
            let value = frame.x[(row, col)];
            let present = if value == 1.0 {
                true
            } else if value == 0.0 {
                false
            } else {
                return Err(PipelineError::NonBinaryFeature {
                    feature: frame.feature_names[col].clone(),
                }
                .into());
            };
            match (is_pos[row] == 1, present) {
                (true, true) => tp += 1,
                (true, false) => fn_ += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
            }
        }

        let p = fisher_greater(tp, fn_, fp, tn)?;
        if p <= p_cutoff {
            kept.push(col);
        }
    }

    log::info!(
        "Fisher enrichment (p <= {}) retained {} of {} features",
        p_cutoff,
        kept.len(),
        frame.n_features()
    );
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn binary_frame(columns: Vec<Vec<f64>>, labels: Vec<&str>) -> FeatureFrame {
        let n_rows = labels.len();
        let n_cols = columns.len();
        let mut values = vec![0.0; n_rows * n_cols];
        for (c, col) in columns.iter().enumerate() {
            for (r, v) in col.iter().enumerate() {
                values[r * n_cols + c] = *v;
            }
        }
        FeatureFrame {
            ids: (0..n_rows).map(|i| format!("r{}", i)).collect(),
            labels: labels.into_iter().map(str::to_string).collect(),
            feature_names: (0..n_cols).map(|i| format!("k{}", i)).collect(),
            x: Array2::from_shape_vec((n_rows, n_cols), values).unwrap(),
        }
    }

    #[test]
    fn perfectly_enriched_feature_passes() {
        // All positives carry the feature, all negatives lack it.
        let frame = binary_frame(
            vec![vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]],
            vec!["1", "1", "1", "1", "0", "0", "0", "0"],
        );
        let p = fisher_greater(4, 0, 0, 4).unwrap();
        let kept = fisher_select(&frame, p).unwrap();
        assert_eq!(kept, vec![0]);
    }

    #[test]
    fn flat_feature_is_excluded_at_strict_cutoff() {
        // Identical distribution across classes.
        let frame = binary_frame(
            vec![vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0]],
            vec!["1", "1", "1", "1", "0", "0", "0", "0"],
        );
        let kept = fisher_select(&frame, 0.05).unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn non_binary_feature_is_rejected() {
        let frame = binary_frame(vec![vec![0.0, 2.0, 1.0, 0.0]], vec!["1", "1", "0", "0"]);
        let err = fisher_select(&frame, 0.05).unwrap_err();
        assert!(err.to_string().contains("not binary"));
    }

    #[test]
    fn empty_cells_count_zero() {
        // No negatives carry the feature: fp cell is empty, still computable.
        let p = fisher_greater(3, 1, 0, 4).unwrap();
        assert!(p > 0.0 && p <= 1.0);
    }

    #[test]
    fn zero_true_positives_gives_p_one() {
        assert_eq!(fisher_greater(0, 4, 4, 0).unwrap(), 1.0);
    }
}
