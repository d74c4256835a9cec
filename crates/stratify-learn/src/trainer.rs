//! The balanced-round trainer/evaluator.
//!
//! For each balanced subsample the trainer cross-validates the classifier on
//! the subsample (out-of-fold scores), fits it on the full subsample, and
//! applies the fit to the unsampled remainder and, when requested, the
//! apply-to rows that never enter training. Per-round metrics go to the
//! aggregator; per-row scores accumulate in the score table.
use std::collections::HashSet;

use anyhow::{anyhow, Result};
use ndarray::{Array1, Array2, Axis};

use crate::config::AlgorithmParams;
use crate::cross_validation::{out_of_fold_labels, out_of_fold_proba};
use crate::error::PipelineError;
use crate::frame::FeatureFrame;
use crate::metrics::{
    accuracy, best_threshold, confusion_matrix, f1_per_class, macro_f1, pr_auc, roc_curve,
    trapezoid_auc, BinaryConfusion,
};
use crate::models::build_model;

/// The class universe of a run: sorted class names plus the positive
/// designation for binary runs.
#[derive(Debug, Clone)]
pub struct ClassLayout {
    pub classes: Vec<String>,
    pub positive: Option<String>,
}

impl ClassLayout {
    pub fn new(mut classes: Vec<String>, positive: Option<String>) -> Result<Self> {
        classes.sort();
        classes.dedup();
        if classes.len() < 2 {
            return Err(PipelineError::DegenerateClasses(format!(
                "need at least two training classes, found {}",
                classes.len()
            ))
            .into());
        }
        if classes.len() == 2 {
            let positive = positive.ok_or_else(|| {
                PipelineError::DegenerateClasses(
                    "binary runs need a positive class designation".to_string(),
                )
            })?;
            if !classes.contains(&positive) {
                return Err(PipelineError::DegenerateClasses(format!(
                    "positive class '{}' is not among the training classes",
                    positive
                ))
                .into());
            }
            Ok(ClassLayout {
                classes,
                positive: Some(positive),
            })
        } else {
            Ok(ClassLayout {
                classes,
                positive: None,
            })
        }
    }

    pub fn is_binary(&self) -> bool {
        self.classes.len() == 2
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// The non-positive class of a binary run.
    pub fn negative(&self) -> Option<&str> {
        let positive = self.positive.as_deref()?;
        self.classes
            .iter()
            .map(String::as_str)
            .find(|c| *c != positive)
    }

    /// Index of the positive class in the sorted class list.
    pub fn positive_index(&self) -> Option<usize> {
        let positive = self.positive.as_deref()?;
        self.classes.iter().position(|c| c == positive)
    }

    /// Encode frame labels as model codes: binary runs use 1 = positive and
    /// 0 = negative, multiclass runs index the sorted class list.
    pub fn encode(&self, frame: &FeatureFrame) -> Result<Array1<usize>> {
        if self.is_binary() {
            let positive = self.positive.as_deref().unwrap_or_default();
            let negative = self.negative().unwrap_or_default();
            frame.encode_binary(positive, negative)
        } else {
            frame.encode_classes(&self.classes)
        }
    }

    /// Map a model code back to a sorted-class index.
    pub fn code_to_class_index(&self, code: usize) -> usize {
        if let Some(positive_idx) = self.positive_index() {
            let negative_idx = 1 - positive_idx;
            if code == 1 {
                positive_idx
            } else {
                negative_idx
            }
        } else {
            code
        }
    }
}

/// Metrics from one binary round, computed from the out-of-fold scores on
/// the balanced subsample.
#[derive(Debug, Clone)]
pub struct BinaryRound {
    /// Confusion counts at the 0.5 default cutoff, sorted-class order.
    pub confusion: Array2<f64>,
    pub auc_roc: f64,
    pub auc_prc: f64,
    /// ROC threshold maximizing TPR - FPR.
    pub threshold: f64,
    pub importances: Option<Vec<f64>>,
}

/// Metrics from one multiclass round.
#[derive(Debug, Clone)]
pub struct MulticlassRound {
    pub accuracy: f64,
    pub class_f1: Vec<f64>,
    pub macro_f1: f64,
    pub confusion: Array2<f64>,
}

/// One round's result; the variant carries exactly the fields its class
/// regime produces.
#[derive(Debug, Clone)]
pub enum RoundResult {
    Binary(BinaryRound),
    Multiclass(MulticlassRound),
}

/// Per-round output: the metric record plus, for binary runs, one score per
/// row of the training frame followed by the apply-to rows.
#[derive(Debug, Clone)]
pub struct RoundOutput {
    pub result: RoundResult,
    pub scores: Option<Vec<f64>>,
}

/// Per-instance score accumulation across rounds.
#[derive(Debug, Clone)]
pub struct ScoreTable {
    pub ids: Vec<String>,
    pub true_labels: Vec<String>,
    /// Rows with training-class labels; apply-to rows are false.
    pub known: Vec<bool>,
    /// One column per round, aligned with `ids`.
    pub columns: Vec<Vec<f64>>,
}

/// Train and evaluate one balanced round.
pub fn run_round(
    frame: &FeatureFrame,
    y: &Array1<usize>,
    layout: &ClassLayout,
    unknowns: Option<&FeatureFrame>,
    balanced_rows: &[usize],
    params: &AlgorithmParams,
    cv_folds: usize,
) -> Result<RoundOutput> {
    let x_bal = frame.x.select(Axis(0), balanced_rows);
    let y_bal = y.select(Axis(0), balanced_rows);

    let balanced_set: HashSet<usize> = balanced_rows.iter().copied().collect();
    let not_selected: Vec<usize> = (0..frame.n_rows())
        .filter(|i| !balanced_set.contains(i))
        .collect();

    if layout.is_binary() {
        let cv_scores = out_of_fold_proba(params, &x_bal, &y_bal, cv_folds)?;
        let is_pos: Vec<bool> = y_bal.iter().map(|&c| c == 1).collect();
        let score_vec = cv_scores.to_vec();

        let counts = BinaryConfusion::from_scores(&score_vec, &is_pos, 0.5);
        let positive_idx = layout
            .positive_index()
            .ok_or_else(|| anyhow!("binary layout without positive class"))?;
        let negative_idx = 1 - positive_idx;
        let mut confusion = Array2::zeros((2, 2));
        confusion[(positive_idx, positive_idx)] = counts.tp as f64;
        confusion[(positive_idx, negative_idx)] = counts.fn_ as f64;
        confusion[(negative_idx, positive_idx)] = counts.fp as f64;
        confusion[(negative_idx, negative_idx)] = counts.tn as f64;

        let roc = roc_curve(&score_vec, &is_pos)?;
        let auc_roc = trapezoid_auc(&roc.fpr, &roc.tpr);
        let auc_prc = pr_auc(&score_vec, &is_pos)?;
        let threshold = best_threshold(&roc);

        // Final fit on the whole balanced subsample drives the remainder,
        // the apply-to rows, and the importance column.
        let mut model = build_model(params);
        model.fit(&x_bal, &y_bal, 2)?;
        let importances = model.feature_importance();

        let mut scores = vec![0.0; frame.n_rows() + unknowns.map_or(0, |u| u.n_rows())];
        for (&row, &score) in balanced_rows.iter().zip(cv_scores.iter()) {
            scores[row] = score;
        }
        if !not_selected.is_empty() {
            let rest = model.predict_proba(&frame.x.select(Axis(0), &not_selected))?;
            for (&row, &score) in not_selected.iter().zip(rest.iter()) {
                scores[row] = score;
            }
        }
        if let Some(unknown_frame) = unknowns {
            let applied = model.predict_proba(&unknown_frame.x)?;
            for (offset, &score) in applied.iter().enumerate() {
                scores[frame.n_rows() + offset] = score;
            }
        }

        Ok(RoundOutput {
            result: RoundResult::Binary(BinaryRound {
                confusion,
                auc_roc,
                auc_prc,
                threshold,
                importances,
            }),
            scores: Some(scores),
        })
    } else {
        let n_classes = layout.n_classes();
        let cv_labels = out_of_fold_labels(params, &x_bal, &y_bal, n_classes, cv_folds)?;
        let y_true = y_bal.to_vec();
        let y_pred = cv_labels.to_vec();

        let confusion = confusion_matrix(&y_true, &y_pred, n_classes);
        let class_f1 = f1_per_class(&confusion);

        Ok(RoundOutput {
            result: RoundResult::Multiclass(MulticlassRound {
                accuracy: accuracy(&y_true, &y_pred),
                macro_f1: macro_f1(&confusion),
                class_f1,
                confusion,
            }),
            scores: None,
        })
    }
}

/// Outcome of the full B-round loop.
#[derive(Debug, Clone)]
pub struct RoundsOutcome {
    pub rounds: Vec<RoundResult>,
    pub score_table: Option<ScoreTable>,
}

/// Run every balanced round and accumulate results and scores.
pub fn run_rounds(
    frame: &FeatureFrame,
    layout: &ClassLayout,
    unknowns: Option<&FeatureFrame>,
    balanced: &[Vec<String>],
    params: &AlgorithmParams,
    cv_folds: usize,
) -> Result<RoundsOutcome> {
    let y = layout.encode(frame)?;
    let id_index = frame.id_index();

    let mut table = if layout.is_binary() {
        let mut ids = frame.ids.clone();
        let mut true_labels = frame.labels.clone();
        let mut known = vec![true; frame.n_rows()];
        if let Some(unknown_frame) = unknowns {
            ids.extend(unknown_frame.ids.iter().cloned());
            true_labels.extend(unknown_frame.labels.iter().cloned());
            known.extend(std::iter::repeat(false).take(unknown_frame.n_rows()));
        }
        Some(ScoreTable {
            ids,
            true_labels,
            known,
            columns: Vec::with_capacity(balanced.len()),
        })
    } else {
        None
    };

    let mut rounds = Vec::with_capacity(balanced.len());
    for (j, round_ids) in balanced.iter().enumerate() {
        log::info!("Round {} of {}", j + 1, balanced.len());

        let mut rows = Vec::with_capacity(round_ids.len());
        for id in round_ids {
            let row = id_index.get(id.as_str()).ok_or_else(|| {
                PipelineError::MalformedTable(format!(
                    "balanced id '{}' is not in the training frame",
                    id
                ))
            })?;
            rows.push(*row);
        }

        let output = run_round(frame, &y, layout, unknowns, &rows, params, cv_folds)?;
        rounds.push(output.result);
        if let (Some(table), Some(scores)) = (table.as_mut(), output.scores) {
            table.columns.push(scores);
        }
    }

    Ok(RoundsOutcome {
        rounds,
        score_table: table,
    })
}
