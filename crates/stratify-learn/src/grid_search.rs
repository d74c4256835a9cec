//! Fixed-grid hyperparameter search.
//!
//! Evaluates every candidate combination on the same balanced samples the
//! final training rounds will use, scoring by mean out-of-fold ROC-AUC for
//! two classes and macro-F1 otherwise. The balanced sets are returned so
//! search and final training share them.
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ndarray::Axis;

use crate::config::{
    Algorithm, AlgorithmParams, ForestParams, LogRegParams, MaxFeatures, SvmKernel, SvmSettings,
};
use crate::cross_validation::{out_of_fold_labels, out_of_fold_proba};
use crate::frame::FeatureFrame;
use crate::metrics::{confusion_matrix, macro_f1, roc_auc};
use crate::sampling::establish_balanced;
use crate::trainer::ClassLayout;

const C_GRID: [f64; 5] = [0.01, 0.1, 1.0, 10.0, 100.0];
const GAMMA_GRID: [f64; 4] = [0.001, 0.01, 0.1, 1.0];
const DEGREE_GRID: [u32; 2] = [2, 3];
const DEPTH_GRID: [usize; 3] = [3, 5, 10];

/// The candidate combinations for one algorithm family.
pub fn candidate_grid(algorithm: Algorithm, n_jobs: usize) -> Vec<AlgorithmParams> {
    match algorithm {
        Algorithm::RandomForest => {
            let fractions = [
                MaxFeatures::Fraction(0.1),
                MaxFeatures::Fraction(0.25),
                MaxFeatures::Fraction(0.5),
                MaxFeatures::Sqrt,
            ];
            DEPTH_GRID
                .iter()
                .flat_map(|&depth| {
                    fractions.iter().map(move |&max_features| {
                        AlgorithmParams::Forest(ForestParams {
                            n_estimators: 500,
                            max_depth: Some(depth),
                            max_features,
                            n_jobs,
                        })
                    })
                })
                .collect()
        }
        Algorithm::Svm => C_GRID
            .iter()
            .map(|&c| {
                AlgorithmParams::Svm(SvmSettings {
                    c,
                    kernel: SvmKernel::Linear,
                    ..SvmSettings::default()
                })
            })
            .collect(),
        Algorithm::SvmPoly => C_GRID
            .iter()
            .flat_map(|&c| {
                DEGREE_GRID.iter().flat_map(move |&degree| {
                    GAMMA_GRID.iter().map(move |&gamma| {
                        AlgorithmParams::Svm(SvmSettings {
                            c,
                            kernel: SvmKernel::Poly,
                            degree,
                            gamma,
                        })
                    })
                })
            })
            .collect(),
        Algorithm::SvmRbf => C_GRID
            .iter()
            .flat_map(|&c| {
                GAMMA_GRID.iter().map(move |&gamma| {
                    AlgorithmParams::Svm(SvmSettings {
                        c,
                        kernel: SvmKernel::Rbf,
                        degree: 2,
                        gamma,
                    })
                })
            })
            .collect(),
        Algorithm::LogReg => C_GRID
            .iter()
            .flat_map(|&c| {
                [true, false].iter().map(move |&fit_intercept| {
                    AlgorithmParams::LogReg(LogRegParams { c, fit_intercept })
                })
            })
            .collect(),
    }
}

/// Outcome of a grid search: the winning parameters, every combination's
/// mean score (best first), and the balanced samples used.
#[derive(Debug, Clone)]
pub struct GridSearchOutcome {
    pub best: AlgorithmParams,
    pub ranked: Vec<(String, f64)>,
    pub balanced: Vec<Vec<String>>,
}

/// Run the sweep for one algorithm family.
pub fn grid_search(
    frame: &FeatureFrame,
    layout: &ClassLayout,
    algorithm: Algorithm,
    min_size: usize,
    rounds: usize,
    cv_folds: usize,
    n_jobs: usize,
) -> Result<GridSearchOutcome> {
    let balanced = establish_balanced(frame, &layout.classes, min_size, rounds)?;
    let y = layout.encode(frame)?;
    let id_index = frame.id_index();

    let candidates = candidate_grid(algorithm, n_jobs);
    log::info!(
        "Grid search over {} combinations x {} balanced rounds",
        candidates.len(),
        balanced.len()
    );

    let mut scored: Vec<(String, f64, AlgorithmParams)> = Vec::with_capacity(candidates.len());
    for params in candidates {
        let mut round_scores = Vec::with_capacity(balanced.len());
        for round_ids in &balanced {
            let rows: Vec<usize> = round_ids
                .iter()
                .map(|id| {
                    id_index
                        .get(id.as_str())
                        .copied()
                        .ok_or_else(|| anyhow!("balanced id '{}' missing from frame", id))
                })
                .collect::<Result<_>>()?;
            let x_bal = frame.x.select(Axis(0), &rows);
            let y_bal = y.select(Axis(0), &rows);

            let score = if layout.is_binary() {
                let oof = out_of_fold_proba(&params, &x_bal, &y_bal, cv_folds)?;
                let is_pos: Vec<bool> = y_bal.iter().map(|&c| c == 1).collect();
                roc_auc(&oof.to_vec(), &is_pos)?
            } else {
                let oof = out_of_fold_labels(&params, &x_bal, &y_bal, layout.n_classes(), cv_folds)?;
                let cm = confusion_matrix(&y_bal.to_vec(), &oof.to_vec(), layout.n_classes());
                macro_f1(&cm)
            };
            round_scores.push(score);
        }
        let mean = round_scores.iter().sum::<f64>() / round_scores.len() as f64;
        log::debug!("{} -> {:.4}", params, mean);
        scored.push((params.to_string(), mean, params));
    }

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let best = scored
        .first()
        .map(|(_, _, p)| p.clone())
        .ok_or_else(|| anyhow!("empty hyperparameter grid"))?;

    Ok(GridSearchOutcome {
        best,
        ranked: scored.into_iter().map(|(d, s, _)| (d, s)).collect(),
        balanced,
    })
}

/// Write the sweep results, best first.
pub fn write_grid_report<P: AsRef<Path>>(path: P, ranked: &[(String, f64)]) -> Result<()> {
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
    writeln!(file, "Parameters\tScore")?;
    for (description, score) in ranked {
        writeln!(file, "{}\t{:.6}", description, score)?;
    }
    Ok(())
}
