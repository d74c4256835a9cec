//! Tree-ensemble importance ranking for feature selection.

use anyhow::Result;

use crate::config::{ForestParams, MaxFeatures};
use crate::frame::FeatureFrame;
use crate::models::classifier::Classifier;
use crate::models::forest::RandomForestModel;
use crate::selection::univariate::SelectKBest;

/// Selection runs fix the ensemble shape: 500 trees, entropy criterion,
/// sqrt(n_features) per tree, no depth cap.
fn selection_params(n_jobs: usize) -> ForestParams {
    ForestParams {
        n_estimators: 500,
        max_depth: None,
        max_features: MaxFeatures::Sqrt,
        n_jobs,
    }
}

/// Fit the ensemble on the whole frame and return normalized mean
/// impurity-reduction importances per feature.
pub fn forest_importances(frame: &FeatureFrame, n_jobs: usize) -> Result<Vec<f64>> {
    let counts = frame.class_counts();
    let classes: Vec<String> = counts.keys().cloned().collect();
    let y = frame.encode_classes(&classes)?;

    let mut model = RandomForestModel::new(selection_params(n_jobs));
    model.fit(&frame.x, &y, classes.len())?;

    Ok(model
        .feature_importance()
        .unwrap_or_else(|| vec![0.0; frame.n_features()]))
}

/// Keep the top `n` features by ensemble importance, ranked.
pub fn forest_select(frame: &FeatureFrame, n: usize, n_jobs: usize) -> Result<Vec<usize>> {
    let importances = forest_importances(frame, n_jobs)?;
    let scores = ndarray::Array1::from_vec(importances);
    Ok(SelectKBest::new(n).fit(&scores))
}
