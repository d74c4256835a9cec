//! Bagged decision-tree ensemble over `linfa_trees::DecisionTree`.
//!
//! Each tree trains on a bootstrap row sample and a random feature subset
//! with entropy split quality. Tree fitting is the library's job; this
//! wrapper only orchestrates the bagging loop,
//! aggregates votes into class probabilities, and averages the per-tree
//! importances back onto the full feature space.
use anyhow::{anyhow, Context, Result};
use linfa::prelude::*;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use rayon::prelude::*;

use crate::config::ForestParams;
use crate::models::classifier::Classifier;

pub struct RandomForestModel {
    params: ForestParams,
    fitted: Option<FittedForest>,
}

struct FittedForest {
    trees: Vec<TreeMember>,
    n_classes: usize,
    n_features: usize,
}

struct TreeMember {
    tree: DecisionTree<f64, usize>,
    features: Vec<usize>,
}

impl RandomForestModel {
    pub fn new(params: ForestParams) -> Self {
        RandomForestModel {
            params,
            fitted: None,
        }
    }

    /// Vote fractions per class, rows aligned with `x`.
    fn votes(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| anyhow!("Forest queried before fit"))?;

        let mut votes = Array2::zeros((x.nrows(), fitted.n_classes));
        for member in &fitted.trees {
            let sub = x.select(Axis(1), &member.features);
            let preds = member.tree.predict(&sub);
            for (row, &label) in preds.iter().enumerate() {
                votes[(row, label)] += 1.0;
            }
        }
        votes /= fitted.trees.len() as f64;
        Ok(votes)
    }
}

impl Classifier for RandomForestModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>, n_classes: usize) -> Result<()> {
        let n_rows = x.nrows();
        let n_features = x.ncols();
        let subset_size = self.params.max_features.resolve(n_features);
        let max_depth = self.params.max_depth;
        let all_features: Vec<usize> = (0..n_features).collect();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.params.n_jobs.max(1))
            .build()
            .context("Failed to build forest worker pool")?;

        let trees = pool.install(|| {
            (0..self.params.n_estimators)
                .into_par_iter()
                .map(|_| {
                    let mut rng = thread_rng();
                    let rows: Vec<usize> =
                        (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();
                    let mut features: Vec<usize> = all_features
                        .choose_multiple(&mut rng, subset_size)
                        .copied()
                        .collect();
                    features.sort_unstable();

                    let x_sub = x.select(Axis(0), &rows).select(Axis(1), &features);
                    let y_sub: Array1<usize> =
                        Array1::from_vec(rows.iter().map(|&r| y[r]).collect());
                    let dataset = Dataset::new(x_sub, y_sub);

                    let tree = DecisionTree::params()
                        .split_quality(SplitQuality::Entropy)
                        .max_depth(max_depth)
                        .fit(&dataset)
                        .context("Decision tree fit failed")?;

                    Ok(TreeMember { tree, features })
                })
                .collect::<Result<Vec<_>>>()
        })?;

        self.fitted = Some(FittedForest {
            trees,
            n_classes,
            n_features,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let votes = self.votes(x)?;
        Ok(votes.column(1).to_owned())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let votes = self.votes(x)?;
        let preds = votes
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| {
                        a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|(idx, _)| idx)
                    .unwrap_or(0)
            })
            .collect();
        Ok(preds)
    }

    fn feature_importance(&self) -> Option<Vec<f64>> {
        let fitted = self.fitted.as_ref()?;
        let mut total = vec![0.0; fitted.n_features];
        for member in &fitted.trees {
            let importance = member.tree.feature_importance();
            for (local, &global) in member.features.iter().enumerate() {
                total[global] += importance[local];
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for v in total.iter_mut() {
                *v /= sum;
            }
        }
        Some(total)
    }

    fn name(&self) -> &'static str {
        "random forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxFeatures;

    fn separable_data() -> (Array2<f64>, Array1<usize>) {
        // Second feature separates the classes; the rest are constant.
        let x = Array2::from_shape_vec(
            (10, 3),
            vec![
                0.5, 1.0, 0.2, 0.5, 0.0, 0.2, 0.5, 1.0, 0.2, 0.5, 0.0, 0.2, 0.5, 1.0, 0.2, 0.5,
                0.0, 0.2, 0.5, 1.0, 0.2, 0.5, 0.0, 0.2, 0.5, 1.0, 0.2, 0.5, 0.0, 0.2,
            ],
        )
        .unwrap();
        let y = Array1::from_vec(vec![1, 0, 1, 0, 1, 0, 1, 0, 1, 0]);
        (x, y)
    }

    #[test]
    fn forest_learns_a_separable_feature() {
        let (x, y) = separable_data();
        let mut model = RandomForestModel::new(ForestParams {
            n_estimators: 25,
            max_depth: Some(4),
            max_features: MaxFeatures::All,
            n_jobs: 1,
        });
        model.fit(&x, &y, 2).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        for (i, p) in proba.iter().enumerate() {
            if y[i] == 1 {
                assert!(*p > 0.5, "row {} should score high, got {}", i, p);
            } else {
                assert!(*p < 0.5, "row {} should score low, got {}", i, p);
            }
        }
    }

    #[test]
    fn importance_concentrates_on_the_informative_feature() {
        let (x, y) = separable_data();
        let mut model = RandomForestModel::new(ForestParams {
            n_estimators: 25,
            max_depth: Some(4),
            max_features: MaxFeatures::All,
            n_jobs: 1,
        });
        model.fit(&x, &y, 2).unwrap();

        let importance = model.feature_importance().unwrap();
        assert_eq!(importance.len(), 3);
        assert!(importance[1] > importance[0]);
        assert!(importance[1] > importance[2]);
    }

    #[test]
    fn predict_before_fit_is_error() {
        let model = RandomForestModel::new(ForestParams::default());
        let x = Array2::zeros((2, 2));
        assert!(model.predict_proba(&x).is_err());
    }
}
