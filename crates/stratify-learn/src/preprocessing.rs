//! Feature scaling applied before the SVM families.
//!
//! Provides a per-column min-max scaler fitted on the training frame and
//! applied to both the training and apply-to matrices.

use ndarray::Array2;

/// Per-column min-max scaler.
#[derive(Clone, Debug)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub range: Vec<f64>,
}

impl MinMaxScaler {
    /// Minimum range to avoid division by zero on constant columns.
    const MIN_RANGE: f64 = 1e-12;
}

/// Fit a `MinMaxScaler` from an `Array2<f64>` where rows are samples and
/// columns are features.
pub fn fit_scaler(x: &Array2<f64>) -> MinMaxScaler {
    let (nrows, ncols) = x.dim();
    assert!(nrows > 0 && ncols > 0, "fit_scaler requires non-empty matrix");

    let mut min = vec![f64::INFINITY; ncols];
    let mut max = vec![f64::NEG_INFINITY; ncols];
    for r in 0..nrows {
        for c in 0..ncols {
            let v = x[(r, c)];
            if v < min[c] {
                min[c] = v;
            }
            if v > max[c] {
                max[c] = v;
            }
        }
    }

    let range = min
        .iter()
        .zip(max.iter())
        .map(|(lo, hi)| (hi - lo).max(MinMaxScaler::MIN_RANGE))
        .collect();

    MinMaxScaler { min, range }
}

/// Transform all rows into [0, 1] using the provided scaler. Values outside
/// the fitted range map outside [0, 1]; that is intentional for apply-to
/// rows that were not part of the fit.
pub fn transform_all(x: &Array2<f64>, sc: &MinMaxScaler) -> Array2<f64> {
    let (nrows, ncols) = x.dim();
    let mut out = x.clone();
    for r in 0..nrows {
        for c in 0..ncols {
            out[(r, c)] = (x[(r, c)] - sc.min[c]) / sc.range[c];
        }
    }
    out
}

/// Fit and transform in one call.
pub fn fit_transform(x: &Array2<f64>) -> Array2<f64> {
    let sc = fit_scaler(x);
    transform_all(x, &sc)
}
