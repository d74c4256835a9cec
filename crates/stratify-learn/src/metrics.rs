//! Classification metrics: ROC/PR curves, confusion counts, F1, and the
//! mean/SD/SE summaries used by the round aggregator.
use ndarray::Array2;

use crate::error::PipelineError;

/// A receiver-operating-characteristic curve. Points are ordered from the
/// most permissive threshold (0,0) to (1,1).
#[derive(Debug, Clone)]
pub struct RocCurve {
    pub fpr: Vec<f64>,
    pub tpr: Vec<f64>,
    pub thresholds: Vec<f64>,
}

/// A precision-recall curve ordered by increasing recall.
#[derive(Debug, Clone)]
pub struct PrCurve {
    pub recall: Vec<f64>,
    pub precision: Vec<f64>,
}

/// Binary confusion counts at a fixed probability cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryConfusion {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl BinaryConfusion {
    pub fn from_scores(scores: &[f64], is_pos: &[bool], threshold: f64) -> Self {
        let mut counts = BinaryConfusion {
            tp: 0,
            tn: 0,
            fp: 0,
            fn_: 0,
        };
        for (&score, &pos) in scores.iter().zip(is_pos.iter()) {
            let called = score >= threshold;
            match (pos, called) {
                (true, true) => counts.tp += 1,
                (true, false) => counts.fn_ += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
            }
        }
        counts
    }

    pub fn tpr(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn fpr(&self) -> f64 {
        ratio(self.fp, self.fp + self.tn)
    }

    pub fn fnr(&self) -> f64 {
        ratio(self.fn_, self.fn_ + self.tp)
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.tp + self.tn + self.fp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.tpr();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn check_two_classes(is_pos: &[bool], what: &'static str) -> Result<(), PipelineError> {
    let positives = is_pos.iter().filter(|&&p| p).count();
    if is_pos.is_empty() || positives == 0 || positives == is_pos.len() {
        return Err(PipelineError::EmptyMetricInput(what));
    }
    Ok(())
}

/// Compute the ROC curve by sweeping unique score thresholds from high to
/// low, accumulating true/false positive counts.
pub fn roc_curve(scores: &[f64], is_pos: &[bool]) -> Result<RocCurve, PipelineError> {
    assert_eq!(scores.len(), is_pos.len(), "scores and labels must align");
    check_two_classes(is_pos, "ROC curve")?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let n_pos = is_pos.iter().filter(|&&p| p).count() as f64;
    let n_neg = is_pos.len() as f64 - n_pos;

    let mut fpr = vec![0.0];
    let mut tpr = vec![0.0];
    let mut thresholds = vec![f64::INFINITY];

    let mut cum_tp = 0usize;
    let mut cum_fp = 0usize;
    let mut i = 0usize;
    while i < order.len() {
        let threshold = scores[order[i]];
        // Consume the whole tie group before emitting a point.
        while i < order.len() && scores[order[i]] == threshold {
            if is_pos[order[i]] {
                cum_tp += 1;
            } else {
                cum_fp += 1;
            }
            i += 1;
        }
        fpr.push(cum_fp as f64 / n_neg);
        tpr.push(cum_tp as f64 / n_pos);
        thresholds.push(threshold);
    }

    Ok(RocCurve {
        fpr,
        tpr,
        thresholds,
    })
}

/// Area under a curve by trapezoidal rule; x must be non-decreasing.
pub fn trapezoid_auc(x: &[f64], y: &[f64]) -> f64 {
    let mut area = 0.0;
    for i in 1..x.len() {
        area += (x[i] - x[i - 1]) * (y[i] + y[i - 1]) / 2.0;
    }
    area
}

/// Area under the ROC curve.
pub fn roc_auc(scores: &[f64], is_pos: &[bool]) -> Result<f64, PipelineError> {
    let roc = roc_curve(scores, is_pos)?;
    Ok(trapezoid_auc(&roc.fpr, &roc.tpr))
}

/// The ROC threshold maximizing TPR - FPR (Youden's J). Ties resolve to the
/// more permissive (higher) threshold encountered first in the sweep.
pub fn best_threshold(roc: &RocCurve) -> f64 {
    let mut best = 0.5;
    let mut best_j = f64::NEG_INFINITY;
    for i in 1..roc.thresholds.len() {
        let j = roc.tpr[i] - roc.fpr[i];
        if j > best_j {
            best_j = j;
            best = roc.thresholds[i];
        }
    }
    best
}

/// Compute the precision-recall curve over unique thresholds, high to low.
pub fn pr_curve(scores: &[f64], is_pos: &[bool]) -> Result<PrCurve, PipelineError> {
    assert_eq!(scores.len(), is_pos.len(), "scores and labels must align");
    check_two_classes(is_pos, "precision-recall curve")?;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let n_pos = is_pos.iter().filter(|&&p| p).count() as f64;

    let mut recall = vec![0.0];
    let mut precision = vec![1.0];

    let mut cum_tp = 0usize;
    let mut cum_all = 0usize;
    let mut i = 0usize;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if is_pos[order[i]] {
                cum_tp += 1;
            }
            cum_all += 1;
            i += 1;
        }
        recall.push(cum_tp as f64 / n_pos);
        precision.push(cum_tp as f64 / cum_all as f64);
    }

    Ok(PrCurve { recall, precision })
}

/// Area under the precision-recall curve.
pub fn pr_auc(scores: &[f64], is_pos: &[bool]) -> Result<f64, PipelineError> {
    let pr = pr_curve(scores, is_pos)?;
    Ok(trapezoid_auc(&pr.recall, &pr.precision))
}

/// Confusion matrix with true classes on rows and predicted on columns.
pub fn confusion_matrix(y_true: &[usize], y_pred: &[usize], n_classes: usize) -> Array2<f64> {
    let mut cm = Array2::zeros((n_classes, n_classes));
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        cm[(t, p)] += 1.0;
    }
    cm
}

pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let hits = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    hits as f64 / y_true.len() as f64
}

/// Per-class F1 from a confusion matrix.
pub fn f1_per_class(cm: &Array2<f64>) -> Vec<f64> {
    let n = cm.nrows();
    (0..n)
        .map(|k| {
            let tp = cm[(k, k)];
            let fp: f64 = (0..n).filter(|&i| i != k).map(|i| cm[(i, k)]).sum();
            let fn_: f64 = (0..n).filter(|&j| j != k).map(|j| cm[(k, j)]).sum();
            if 2.0 * tp + fp + fn_ == 0.0 {
                0.0
            } else {
                2.0 * tp / (2.0 * tp + fp + fn_)
            }
        })
        .collect()
}

pub fn macro_f1(cm: &Array2<f64>) -> f64 {
    let per_class = f1_per_class(cm);
    per_class.iter().sum::<f64>() / per_class.len() as f64
}

/// Mean, population standard deviation, and standard error of a metric
/// series across rounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSummary {
    pub mean: f64,
    pub sd: f64,
    pub se: f64,
}

pub fn summarize(values: &[f64]) -> MetricSummary {
    if values.is_empty() {
        return MetricSummary {
            mean: f64::NAN,
            sd: f64::NAN,
            se: f64::NAN,
        };
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sd = var.sqrt();
    MetricSummary {
        mean,
        sd,
        se: sd / n.sqrt(),
    }
}

/// Median of a value series (average of the middle pair for even counts).
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}
