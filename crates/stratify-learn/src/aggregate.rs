//! Round aggregation and report writing.
//!
//! Collects one result record per balanced round, reduces every numeric
//! metric to mean/SD (and SE for binary runs), derives the final decision
//! threshold as the mean of per-round thresholds, and writes the per-run
//! artifacts plus the directory-wide cumulative `RESULTS.txt` table.
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ndarray::Array2;

use crate::config::Algorithm;
use crate::metrics::{median, summarize, BinaryConfusion, MetricSummary};
use crate::trainer::{BinaryRound, ClassLayout, MulticlassRound, RoundResult, ScoreTable};

/// Fixed header of the cumulative results table.
const RESULTS_HEADER: &str = "DateTime\tID\tTag\tAlg\tClasses\tFeatureNum\tBalancedSize\tCVfold\tBalancedRuns\t\
AUCROC\tAUCROC_sd\tAUCROC_se\tAUCPRc\tAUCPRc_sd\tAUCPRc_se\tAc\tAc_sd\tAc_se\tF1\tF1_sd\tF1_se\t\
Pr\tPr_sd\tPr_se\tTPR\tTPR_sd\tTPR_se\tFPR\tFPR_sd\tFPR_se\tFNR\tFNR_sd\tFNR_se\t\
TP\tTP_sd\tTP_se\tTN\tTN_sd\tTN_se\tFP\tFP_sd\tFP_se\tFN\tFN_sd\tFN_se";

/// Local timestamp for report headers and the cumulative table.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Run-level facts echoed into every report header.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub timestamp: String,
    pub save: String,
    pub tag: String,
    pub algorithm: Algorithm,
    pub apply_desc: String,
    pub n_features: usize,
    pub min_size: usize,
    pub cv_folds: usize,
    pub rounds: usize,
    pub grid_search: bool,
    pub params_desc: String,
}

/// Per-round confusion metrics at the final threshold, summarized across
/// rounds.
#[derive(Debug, Clone)]
pub struct ThresholdPerformance {
    pub accuracy: MetricSummary,
    pub f1: MetricSummary,
    pub precision: MetricSummary,
    pub tpr: MetricSummary,
    pub fpr: MetricSummary,
    pub fnr: MetricSummary,
    pub tp: MetricSummary,
    pub tn: MetricSummary,
    pub fp: MetricSummary,
    pub fn_: MetricSummary,
}

/// Aggregated binary run.
#[derive(Debug, Clone)]
pub struct BinarySummary {
    pub auc_roc: MetricSummary,
    pub auc_prc: MetricSummary,
    /// Mean of per-round thresholds, rounded to two decimals.
    pub threshold: f64,
    pub performance: ThresholdPerformance,
    pub mean_confusion: Array2<f64>,
    /// Mean importance per feature, ranked descending; None when the
    /// algorithm family produces no importances.
    pub importance: Option<Vec<(String, f64)>>,
    pub medians: Vec<f64>,
    pub means: Vec<f64>,
    pub stdevs: Vec<f64>,
    /// Final per-instance calls: median >= threshold goes positive.
    pub calls: Vec<String>,
}

/// Aggregated multiclass run.
#[derive(Debug, Clone)]
pub struct MulticlassSummary {
    pub accuracy: MetricSummary,
    pub macro_f1: MetricSummary,
    pub class_f1: Vec<(String, MetricSummary)>,
    pub mean_confusion: Array2<f64>,
}

fn binary_rounds(rounds: &[RoundResult]) -> Result<Vec<&BinaryRound>> {
    rounds
        .iter()
        .map(|r| match r {
            RoundResult::Binary(b) => Ok(b),
            RoundResult::Multiclass(_) => {
                Err(anyhow!("multiclass round in a binary aggregation"))
            }
        })
        .collect()
}

fn multiclass_rounds(rounds: &[RoundResult]) -> Result<Vec<&MulticlassRound>> {
    rounds
        .iter()
        .map(|r| match r {
            RoundResult::Multiclass(m) => Ok(m),
            RoundResult::Binary(_) => Err(anyhow!("binary round in a multiclass aggregation")),
        })
        .collect()
}

fn mean_confusion_of(matrices: &[&Array2<f64>]) -> Array2<f64> {
    let shape = matrices[0].dim();
    let mut mean = Array2::zeros(shape);
    for m in matrices {
        mean += *m;
    }
    mean /= matrices.len() as f64;
    mean
}

/// Reduce the per-round binary records and the score table into the final
/// summary.
pub fn aggregate_binary(
    rounds: &[RoundResult],
    table: &ScoreTable,
    layout: &ClassLayout,
    feature_names: &[String],
) -> Result<BinarySummary> {
    let rounds = binary_rounds(rounds)?;
    if rounds.is_empty() {
        return Err(anyhow!("no rounds to aggregate"));
    }

    let auc_roc = summarize(&rounds.iter().map(|r| r.auc_roc).collect::<Vec<_>>());
    let auc_prc = summarize(&rounds.iter().map(|r| r.auc_prc).collect::<Vec<_>>());

    let thresholds: Vec<f64> = rounds.iter().map(|r| r.threshold).collect();
    let threshold = (summarize(&thresholds).mean * 100.0).round() / 100.0;

    let confusion_refs: Vec<&Array2<f64>> = rounds.iter().map(|r| &r.confusion).collect();
    let mean_confusion = mean_confusion_of(&confusion_refs);

    // Mean importance over the rounds that produced one.
    let importance = {
        let present: Vec<&Vec<f64>> = rounds.iter().filter_map(|r| r.importances.as_ref()).collect();
        if present.is_empty() {
            None
        } else {
            let mut mean = vec![0.0; feature_names.len()];
            for imp in &present {
                for (i, v) in imp.iter().enumerate() {
                    mean[i] += v;
                }
            }
            for v in mean.iter_mut() {
                *v /= present.len() as f64;
            }
            let mut ranked: Vec<(String, f64)> = feature_names
                .iter()
                .cloned()
                .zip(mean.into_iter())
                .collect();
            ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            Some(ranked)
        }
    };

    // Per-row score summaries and the final call.
    let positive = layout
        .positive
        .clone()
        .ok_or_else(|| anyhow!("binary aggregation without a positive class"))?;
    let negative = layout
        .negative()
        .ok_or_else(|| anyhow!("binary aggregation without a negative class"))?
        .to_string();

    let n_rows = table.ids.len();
    let mut medians = Vec::with_capacity(n_rows);
    let mut means = Vec::with_capacity(n_rows);
    let mut stdevs = Vec::with_capacity(n_rows);
    let mut calls = Vec::with_capacity(n_rows);
    for row in 0..n_rows {
        let values: Vec<f64> = table.columns.iter().map(|col| col[row]).collect();
        let summary = summarize(&values);
        let med = median(&values);
        medians.push(med);
        means.push(summary.mean);
        stdevs.push(summary.sd);
        // Tie at exact equality deliberately goes to the positive class.
        calls.push(if med >= threshold {
            positive.clone()
        } else {
            negative.clone()
        });
    }

    // Per-round confusion metrics at the final threshold over known rows.
    let known_rows: Vec<usize> = (0..n_rows).filter(|&i| table.known[i]).collect();
    let is_pos: Vec<bool> = known_rows
        .iter()
        .map(|&i| table.true_labels[i] == positive)
        .collect();

    let mut accuracy = Vec::new();
    let mut f1 = Vec::new();
    let mut precision = Vec::new();
    let mut tpr = Vec::new();
    let mut fpr = Vec::new();
    let mut fnr = Vec::new();
    let mut tp = Vec::new();
    let mut tn = Vec::new();
    let mut fp = Vec::new();
    let mut fn_ = Vec::new();
    for column in &table.columns {
        let scores: Vec<f64> = known_rows.iter().map(|&i| column[i]).collect();
        let counts = BinaryConfusion::from_scores(&scores, &is_pos, threshold);
        accuracy.push(counts.accuracy());
        f1.push(counts.f1());
        precision.push(counts.precision());
        tpr.push(counts.tpr());
        fpr.push(counts.fpr());
        fnr.push(counts.fnr());
        tp.push(counts.tp as f64);
        tn.push(counts.tn as f64);
        fp.push(counts.fp as f64);
        fn_.push(counts.fn_ as f64);
    }

    let performance = ThresholdPerformance {
        accuracy: summarize(&accuracy),
        f1: summarize(&f1),
        precision: summarize(&precision),
        tpr: summarize(&tpr),
        fpr: summarize(&fpr),
        fnr: summarize(&fnr),
        tp: summarize(&tp),
        tn: summarize(&tn),
        fp: summarize(&fp),
        fn_: summarize(&fn_),
    };

    Ok(BinarySummary {
        auc_roc,
        auc_prc,
        threshold,
        performance,
        mean_confusion,
        importance,
        medians,
        means,
        stdevs,
        calls,
    })
}

/// Reduce the per-round multiclass records.
pub fn aggregate_multiclass(
    rounds: &[RoundResult],
    layout: &ClassLayout,
) -> Result<MulticlassSummary> {
    let rounds = multiclass_rounds(rounds)?;
    if rounds.is_empty() {
        return Err(anyhow!("no rounds to aggregate"));
    }

    let accuracy = summarize(&rounds.iter().map(|r| r.accuracy).collect::<Vec<_>>());
    let macro_f1 = summarize(&rounds.iter().map(|r| r.macro_f1).collect::<Vec<_>>());

    let class_f1 = layout
        .classes
        .iter()
        .enumerate()
        .map(|(k, class)| {
            let series: Vec<f64> = rounds.iter().map(|r| r.class_f1[k]).collect();
            (class.clone(), summarize(&series))
        })
        .collect();

    let confusion_refs: Vec<&Array2<f64>> = rounds.iter().map(|r| &r.confusion).collect();

    Ok(MulticlassSummary {
        accuracy,
        macro_f1,
        class_f1,
        mean_confusion: mean_confusion_of(&confusion_refs),
    })
}

fn summary_triple(s: &MetricSummary) -> String {
    format!("{:.6}\t{:.6}\t{:.6}", s.mean, s.sd, s.se)
}

fn write_report_header(file: &mut std::fs::File, info: &RunInfo, layout: &ClassLayout) -> Result<()> {
    writeln!(file, "{}", info.timestamp)?;
    writeln!(file, "ID: {}", info.save)?;
    writeln!(file, "Tag: {}", info.tag)?;
    writeln!(file, "Algorithm: {}", info.algorithm)?;
    writeln!(file, "Trained on classes: {}", layout.classes.join(", "))?;
    writeln!(file, "Applied to: {}", info.apply_desc)?;
    writeln!(file, "Number of features: {}", info.n_features)?;
    writeln!(file, "Min class size: {}", info.min_size)?;
    writeln!(file, "CV folds: {}", info.cv_folds)?;
    writeln!(file, "Number of balanced datasets: {}", info.rounds)?;
    writeln!(file, "Grid Search Used: {}", info.grid_search)?;
    writeln!(file, "Parameters used: {}", info.params_desc)?;
    Ok(())
}

fn write_confusion_block(
    file: &mut std::fs::File,
    classes: &[String],
    cm: &Array2<f64>,
) -> Result<()> {
    writeln!(file, "\nMean Balanced Confusion Matrix:")?;
    writeln!(file, "Class\t{}", classes.join("\t"))?;
    for (i, class) in classes.iter().enumerate() {
        write!(file, "{}", class)?;
        for j in 0..classes.len() {
            write!(file, "\t{:.6}", cm[(i, j)])?;
        }
        writeln!(file)?;
    }
    Ok(())
}

/// Write the detailed per-run report for a binary run.
pub fn write_binary_results<P: AsRef<Path>>(
    path: P,
    info: &RunInfo,
    summary: &BinarySummary,
    layout: &ClassLayout,
) -> Result<()> {
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
    write_report_header(&mut file, info, layout)?;

    writeln!(file, "\nPrediction threshold: {}", summary.threshold)?;
    writeln!(file, "\nMetric\tMean\tSD\tSE")?;
    writeln!(file, "AucROC\t{}", summary_triple(&summary.auc_roc))?;
    writeln!(file, "AucPRc\t{}", summary_triple(&summary.auc_prc))?;
    writeln!(file, "Accuracy\t{}", summary_triple(&summary.performance.accuracy))?;
    writeln!(file, "F1\t{}", summary_triple(&summary.performance.f1))?;
    writeln!(file, "Precision\t{}", summary_triple(&summary.performance.precision))?;
    writeln!(file, "TPR\t{}", summary_triple(&summary.performance.tpr))?;
    writeln!(file, "FPR\t{}", summary_triple(&summary.performance.fpr))?;
    writeln!(file, "FNR\t{}", summary_triple(&summary.performance.fnr))?;
    writeln!(file, "TP\t{}", summary_triple(&summary.performance.tp))?;
    writeln!(file, "TN\t{}", summary_triple(&summary.performance.tn))?;
    writeln!(file, "FP\t{}", summary_triple(&summary.performance.fp))?;
    writeln!(file, "FN\t{}", summary_triple(&summary.performance.fn_))?;

    write_confusion_block(&mut file, &layout.classes, &summary.mean_confusion)?;
    Ok(())
}

/// Write the detailed per-run report for a multiclass run.
pub fn write_multiclass_results<P: AsRef<Path>>(
    path: P,
    info: &RunInfo,
    summary: &MulticlassSummary,
    layout: &ClassLayout,
) -> Result<()> {
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
    write_report_header(&mut file, info, layout)?;

    writeln!(file, "\nMetric\tMean\tSD")?;
    writeln!(
        file,
        "Accuracy\t{:.6}\t{:.6}",
        summary.accuracy.mean, summary.accuracy.sd
    )?;
    writeln!(
        file,
        "F1_macro\t{:.6}\t{:.6}",
        summary.macro_f1.mean, summary.macro_f1.sd
    )?;
    for (class, f1) in &summary.class_f1 {
        writeln!(file, "{}_F1\t{:.6}\t{:.6}", class, f1.mean, f1.sd)?;
    }

    write_confusion_block(&mut file, &layout.classes, &summary.mean_confusion)?;
    Ok(())
}

/// Write the per-instance score table. Column positions are fixed: the
/// comparator reads identifier (0), true label (1), and final call (5).
pub fn write_score_table<P: AsRef<Path>>(
    path: P,
    table: &ScoreTable,
    summary: &BinarySummary,
) -> Result<()> {
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;

    write!(file, "#ID\tClass\tMedian\tMean\tstdev\tPredicted_{}", summary.threshold)?;
    for j in 0..table.columns.len() {
        write!(file, "\tscore_{}", j)?;
    }
    writeln!(file)?;

    for row in 0..table.ids.len() {
        write!(
            file,
            "{}\t{}\t{:.6}\t{:.6}\t{:.6}\t{}",
            table.ids[row],
            table.true_labels[row],
            summary.medians[row],
            summary.means[row],
            summary.stdevs[row],
            summary.calls[row]
        )?;
        for column in &table.columns {
            write!(file, "\t{:.6}", column[row])?;
        }
        writeln!(file)?;
    }
    Ok(())
}

/// Write the ranked mean importance column.
pub fn write_importance<P: AsRef<Path>>(path: P, ranked: &[(String, f64)]) -> Result<()> {
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
    writeln!(file, "Feature\tmean_imp")?;
    for (name, value) in ranked {
        writeln!(file, "{}\t{:.6}", name, value)?;
    }
    Ok(())
}

/// Write the mean confusion matrix as its own table.
pub fn write_mean_confusion<P: AsRef<Path>>(
    path: P,
    classes: &[String],
    cm: &Array2<f64>,
) -> Result<()> {
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
    writeln!(file, "Class\t{}", classes.join("\t"))?;
    for (i, class) in classes.iter().enumerate() {
        write!(file, "{}", class)?;
        for j in 0..classes.len() {
            write!(file, "\t{:.6}", cm[(i, j)])?;
        }
        writeln!(file)?;
    }
    Ok(())
}

/// Append one line to the cumulative results table, creating it with the
/// fixed header when absent. Appends are unlocked; concurrent runs racing
/// on the same path is accepted behavior.
pub fn append_results_row<P: AsRef<Path>>(
    path: P,
    info: &RunInfo,
    summary: &BinarySummary,
    layout: &ClassLayout,
) -> Result<()> {
    let exists = path.as_ref().exists();
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open {}", path.as_ref().display()))?;
    if !exists {
        writeln!(file, "{}", RESULTS_HEADER)?;
    }

    let positive = layout.positive.clone().unwrap_or_default();
    let negative = layout.negative().unwrap_or_default().to_string();

    writeln!(
        file,
        "{}\t{}\t{}\t{}\t[{}, {}]\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        info.timestamp,
        info.save,
        info.tag,
        info.algorithm,
        positive,
        negative,
        info.n_features,
        info.min_size,
        info.cv_folds,
        info.rounds,
        summary_triple(&summary.auc_roc),
        summary_triple(&summary.auc_prc),
        summary_triple(&summary.performance.accuracy),
        summary_triple(&summary.performance.f1),
        summary_triple(&summary.performance.precision),
        summary_triple(&summary.performance.tpr),
        summary_triple(&summary.performance.fpr),
        summary_triple(&summary.performance.fnr),
        summary_triple(&summary.performance.tp),
        summary_triple(&summary.performance.tn),
        summary_triple(&summary.performance.fp),
        summary_triple(&summary.performance.fn_),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn toy_layout() -> ClassLayout {
        ClassLayout::new(
            vec!["neg".to_string(), "pos".to_string()],
            Some("pos".to_string()),
        )
        .unwrap()
    }

    fn toy_rounds(thresholds: &[f64]) -> Vec<RoundResult> {
        thresholds
            .iter()
            .map(|&t| {
                RoundResult::Binary(BinaryRound {
                    confusion: array![[4.0, 1.0], [1.0, 4.0]],
                    auc_roc: 0.9,
                    auc_prc: 0.85,
                    threshold: t,
                    importances: Some(vec![0.7, 0.3]),
                })
            })
            .collect()
    }

    fn toy_table(columns: Vec<Vec<f64>>) -> ScoreTable {
        let n = columns[0].len();
        ScoreTable {
            ids: (0..n).map(|i| format!("g{}", i)).collect(),
            true_labels: (0..n)
                .map(|i| if i < n / 2 { "pos" } else { "neg" }.to_string())
                .collect(),
            known: vec![true; n],
            columns,
        }
    }

    #[test]
    fn final_threshold_is_mean_of_round_thresholds() {
        let rounds = toy_rounds(&[0.4, 0.6]);
        let table = toy_table(vec![vec![0.9, 0.8, 0.2, 0.1], vec![0.9, 0.8, 0.2, 0.1]]);
        let layout = toy_layout();
        let summary =
            aggregate_binary(&rounds, &table, &layout, &["f1".into(), "f2".into()]).unwrap();
        assert!((summary.threshold - 0.5).abs() < 1e-12);
    }

    #[test]
    fn identical_metric_series_has_zero_sd() {
        let rounds = toy_rounds(&[0.5, 0.5, 0.5]);
        let table = toy_table(vec![
            vec![0.9, 0.8, 0.2, 0.1],
            vec![0.9, 0.8, 0.2, 0.1],
            vec![0.9, 0.8, 0.2, 0.1],
        ]);
        let layout = toy_layout();
        let summary =
            aggregate_binary(&rounds, &table, &layout, &["f1".into(), "f2".into()]).unwrap();
        assert!((summary.auc_roc.mean - 0.9).abs() < 1e-12);
        assert_eq!(summary.auc_roc.sd, 0.0);
        assert_eq!(summary.auc_roc.se, 0.0);
    }

    #[test]
    fn tie_at_threshold_goes_positive() {
        let rounds = toy_rounds(&[0.5]);
        // Row 0 median exactly at the threshold
        let table = toy_table(vec![vec![0.5, 0.8, 0.2, 0.1]]);
        let layout = toy_layout();
        let summary =
            aggregate_binary(&rounds, &table, &layout, &["f1".into(), "f2".into()]).unwrap();
        assert_eq!(summary.calls[0], "pos");
        assert_eq!(summary.calls[3], "neg");
    }

    #[test]
    fn importance_ranking_is_descending() {
        let rounds = toy_rounds(&[0.5]);
        let table = toy_table(vec![vec![0.9, 0.8, 0.2, 0.1]]);
        let layout = toy_layout();
        let summary =
            aggregate_binary(&rounds, &table, &layout, &["weak".into(), "strong".into()])
                .unwrap();
        let ranked = summary.importance.unwrap();
        assert_eq!(ranked[0].0, "weak"); // 0.7 ranks above 0.3
        assert!(ranked[0].1 >= ranked[1].1);
    }

    #[test]
    fn results_file_is_created_with_header_then_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("RESULTS.txt");
        let rounds = toy_rounds(&[0.5]);
        let table = toy_table(vec![vec![0.9, 0.8, 0.2, 0.1]]);
        let layout = toy_layout();
        let summary =
            aggregate_binary(&rounds, &table, &layout, &["f1".into(), "f2".into()]).unwrap();
        let info = RunInfo {
            timestamp: "2024-01-01 00:00:00".to_string(),
            save: "toy".to_string(),
            tag: "".to_string(),
            algorithm: Algorithm::LogReg,
            apply_desc: "none".to_string(),
            n_features: 2,
            min_size: 2,
            cv_folds: 2,
            rounds: 1,
            grid_search: false,
            params_desc: "penalty=l2, C=1, intercept=true".to_string(),
        };

        append_results_row(&path, &info, &summary, &layout).unwrap();
        append_results_row(&path, &info, &summary, &layout).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("DateTime\tID\tTag\tAlg"));
        assert!(lines[1].starts_with("2024-01-01 00:00:00\ttoy"));
    }
}
