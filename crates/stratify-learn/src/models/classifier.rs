use anyhow::Result;
use ndarray::{Array1, Array2};

/// The contract every algorithm family implements for the round trainer.
///
/// Labels are class codes: for binary runs 1 is the positive class and 0 the
/// negative; for multiclass runs codes index the sorted class list.
pub trait Classifier {
    /// Fit the model on the given rows.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()>;

    /// Predicted probability of the positive class. Binary runs only;
    /// multiclass models return an error.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Predicted class codes for any class count.
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>>;

    /// Per-feature importances or coefficients, when the family produces
    /// them. `None` means the importance output column is omitted.
    fn feature_importance(&self) -> Option<Vec<f64>>;

    /// Human readable family name.
    fn name(&self) -> &'static str {
        "classifier"
    }
}
