//! Stratified k-fold out-of-fold prediction.
//!
//! The balanced-round trainer scores the balanced subsample itself with the
//! model it is evaluating, so each row's score must come from a fold that
//! did not train on it.
use anyhow::Result;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::config::AlgorithmParams;
use crate::error::PipelineError;
use crate::models::build_model;

/// Deal row indices into `k` folds, stratified by class: each class's rows
/// are shuffled and distributed round-robin so every fold sees every class.
pub fn stratified_folds(y: &Array1<usize>, n_classes: usize, k: usize) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(PipelineError::DegenerateClasses(
            "cross-validation needs at least 2 folds".to_string(),
        )
        .into());
    }

    let mut rng = thread_rng();
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];

    for class in 0..n_classes {
        let mut rows: Vec<usize> = y
            .iter()
            .enumerate()
            .filter_map(|(i, &c)| if c == class { Some(i) } else { None })
            .collect();
        if rows.len() < k {
            return Err(PipelineError::DegenerateClasses(format!(
                "class {} has {} row(s), fewer than {} folds",
                class,
                rows.len(),
                k
            ))
            .into());
        }
        rows.shuffle(&mut rng);
        for (i, row) in rows.into_iter().enumerate() {
            folds[i % k].push(row);
        }
    }

    Ok(folds)
}

/// Out-of-fold probability of the positive class for every row. Binary only.
pub fn out_of_fold_proba(
    params: &AlgorithmParams,
    x: &Array2<f64>,
    y: &Array1<usize>,
    k: usize,
) -> Result<Array1<f64>> {
    let folds = stratified_folds(y, 2, k)?;
    let mut scores = Array1::zeros(x.nrows());

    for held_out in &folds {
        let train: Vec<usize> = (0..x.nrows()).filter(|i| !held_out.contains(i)).collect();
        let mut model = build_model(params);
        model.fit(
            &x.select(Axis(0), &train),
            &y.select(Axis(0), &train),
            2,
        )?;
        let fold_scores = model.predict_proba(&x.select(Axis(0), held_out))?;
        for (&row, &score) in held_out.iter().zip(fold_scores.iter()) {
            scores[row] = score;
        }
    }

    Ok(scores)
}

/// Out-of-fold predicted class codes for every row.
pub fn out_of_fold_labels(
    params: &AlgorithmParams,
    x: &Array2<f64>,
    y: &Array1<usize>,
    n_classes: usize,
    k: usize,
) -> Result<Array1<usize>> {
    let folds = stratified_folds(y, n_classes, k)?;
    let mut labels = Array1::zeros(x.nrows());

    for held_out in &folds {
        let train: Vec<usize> = (0..x.nrows()).filter(|i| !held_out.contains(i)).collect();
        let mut model = build_model(params);
        model.fit(
            &x.select(Axis(0), &train),
            &y.select(Axis(0), &train),
            n_classes,
        )?;
        let fold_labels = model.predict(&x.select(Axis(0), held_out))?;
        for (&row, &label) in held_out.iter().zip(fold_labels.iter()) {
            labels[row] = label;
        }
    }

    Ok(labels)
}
