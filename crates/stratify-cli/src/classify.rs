//! The `classify` subcommand: the balanced-resampling classification driver.
//!
//! Loads the table, splits off apply-to rows, draws (or grid-searches with)
//! balanced samples, runs the round trainer, and writes every per-run
//! artifact plus the cumulative `RESULTS.txt` line.
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use stratify_learn::aggregate::{
    aggregate_binary, aggregate_multiclass, append_results_row, timestamp_now,
    write_binary_results, write_importance, write_mean_confusion, write_multiclass_results,
    write_score_table, RunInfo,
};
use stratify_learn::config::Algorithm;
use stratify_learn::frame::{read_feature_list, read_frame_tsv, FeatureFrame, FrameReaderConfig};
use stratify_learn::grid_search::{grid_search, write_grid_report};
use stratify_learn::metrics::{pr_curve, roc_curve};
use stratify_learn::preprocessing::{fit_scaler, transform_all};
use stratify_learn::report::plots::{plot_pr_curves, plot_roc_curves};
use stratify_learn::sampling::{default_min_size, establish_balanced, write_balanced_ids};
use stratify_learn::trainer::{run_rounds, ClassLayout, ScoreTable};

use crate::util::{split_comma_list, validate_input_file};

/// Which non-training rows the final models are applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplySet {
    None,
    All,
    Labels(Vec<String>),
}

impl Default for ApplySet {
    fn default() -> Self {
        ApplySet::None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub dataframe: String,
    pub algorithm: Algorithm,
    pub class_column: String,
    /// Classes included in training; None trains on every class found.
    pub cl_train: Option<Vec<String>>,
    pub positive: Option<String>,
    pub apply: ApplySet,
    pub grid_search: bool,
    pub cv_folds: usize,
    pub rounds: usize,
    pub min_size: Option<usize>,
    pub procs: usize,
    pub tag: String,
    pub save: Option<String>,
    pub feature_file: Option<String>,
    pub write_cm: bool,
    pub write_plots: bool,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        ClassifyConfig {
            dataframe: String::new(),
            algorithm: Algorithm::RandomForest,
            class_column: "Class".to_string(),
            cl_train: None,
            positive: None,
            apply: ApplySet::None,
            grid_search: false,
            cv_folds: 10,
            rounds: 100,
            min_size: None,
            procs: 1,
            tag: String::new(),
            save: None,
            feature_file: None,
            write_cm: false,
            write_plots: false,
        }
    }
}

impl ClassifyConfig {
    /// Build from an optional JSON config file with CLI overrides applied,
    /// flag by flag.
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let mut config = if let Some(path) = matches.get_one::<PathBuf>("config") {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            ClassifyConfig::default()
        };

        if let Some(df) = matches.get_one::<String>("df") {
            validate_input_file(df)?;
            config.dataframe = df.clone();
        }
        if let Some(alg) = matches.get_one::<String>("alg") {
            config.algorithm = alg.parse()?;
        }
        if let Some(class_col) = matches.get_one::<String>("class_col") {
            config.class_column = class_col.clone();
        }
        if let Some(cl_train) = matches.get_one::<String>("cl_train") {
            let classes = split_comma_list(cl_train);
            // First listed training class doubles as the positive class.
            if config.positive.is_none() {
                config.positive = classes.first().cloned();
            }
            config.cl_train = Some(classes);
        }
        if let Some(pos) = matches.get_one::<String>("pos") {
            config.positive = Some(pos.clone());
        }
        if let Some(apply) = matches.get_one::<String>("apply") {
            config.apply = if apply.eq_ignore_ascii_case("all") {
                ApplySet::All
            } else if apply.eq_ignore_ascii_case("none") {
                ApplySet::None
            } else {
                ApplySet::Labels(split_comma_list(apply))
            };
        }
        if matches.get_flag("gs") {
            config.grid_search = true;
        }
        if let Some(cv) = matches.get_one::<usize>("cv") {
            config.cv_folds = *cv;
        }
        if let Some(rounds) = matches.get_one::<usize>("rounds") {
            config.rounds = *rounds;
        }
        if let Some(min_size) = matches.get_one::<usize>("min_size") {
            config.min_size = Some(*min_size);
        }
        if let Some(procs) = matches.get_one::<usize>("procs") {
            config.procs = *procs;
        }
        if let Some(tag) = matches.get_one::<String>("tag") {
            config.tag = tag.clone();
        }
        if let Some(save) = matches.get_one::<String>("save") {
            config.save = Some(save.clone());
        }
        if let Some(feat) = matches.get_one::<String>("feat") {
            validate_input_file(feat)?;
            config.feature_file = Some(feat.clone());
        }
        if matches.get_flag("cm") {
            config.write_cm = true;
        }
        if matches.get_flag("plots") {
            config.write_plots = true;
        }

        if config.dataframe.is_empty() {
            anyhow::bail!("an input table is required (--df)");
        }
        Ok(config)
    }

    pub fn save_name(&self) -> String {
        if let Some(save) = &self.save {
            return save.clone();
        }
        if self.tag.is_empty() {
            format!("{}_{}", self.dataframe, self.algorithm)
        } else {
            format!("{}_{}_{}", self.dataframe, self.algorithm, self.tag)
        }
    }

    fn apply_desc(&self) -> String {
        match &self.apply {
            ApplySet::None => "none".to_string(),
            ApplySet::All => "all".to_string(),
            ApplySet::Labels(labels) => labels.join(","),
        }
    }
}

/// Split the loaded frame into the training-class frame and the optional
/// apply-to frame.
fn split_training_and_apply(
    frame: FeatureFrame,
    config: &ClassifyConfig,
) -> Result<(FeatureFrame, Option<FeatureFrame>)> {
    let Some(train_classes) = &config.cl_train else {
        if config.apply != ApplySet::None {
            log::warn!("--apply has no effect without --cl-train; ignoring");
        }
        return Ok((frame, None));
    };

    let train_rows = frame.rows_where(|l| train_classes.iter().any(|c| c == l));
    if train_rows.is_empty() {
        anyhow::bail!("no rows belong to the requested training classes");
    }

    let unknowns = match &config.apply {
        ApplySet::None => None,
        ApplySet::All => {
            let rows = frame.rows_where(|l| !train_classes.iter().any(|c| c == l));
            (!rows.is_empty()).then(|| frame.select_rows(&rows))
        }
        ApplySet::Labels(labels) => {
            let rows = frame.rows_where(|l| labels.iter().any(|c| c == l));
            (!rows.is_empty()).then(|| frame.select_rows(&rows))
        }
    };

    Ok((frame.select_rows(&train_rows), unknowns))
}

pub fn run_classify(config: &ClassifyConfig) -> Result<()> {
    let reader = FrameReaderConfig {
        label_column: config.class_column.clone(),
        ..FrameReaderConfig::default()
    };
    let mut frame = read_frame_tsv(&config.dataframe, &reader)
        .with_context(|| format!("Failed to load {}", config.dataframe))?;

    if let Some(feature_file) = &config.feature_file {
        let keep = read_feature_list(feature_file)?;
        frame = frame.restrict_features(&keep)?;
    }

    let (mut frame, mut unknowns) = split_training_and_apply(frame, config)?;

    let classes: Vec<String> = match &config.cl_train {
        Some(train_classes) => train_classes.clone(),
        None => frame.class_counts().keys().cloned().collect(),
    };
    let positive = if classes.len() == 2 {
        Some(
            config
                .positive
                .clone()
                .unwrap_or_else(|| "1".to_string()),
        )
    } else {
        None
    };
    let layout = ClassLayout::new(classes, positive)?;

    let counts = frame.class_counts();
    let min_size = match config.min_size {
        Some(size) => size,
        None => default_min_size(&counts)?,
    };
    log::info!(
        "Balanced dataset will include {} instances of each class",
        min_size
    );

    // The SVM families train on min-max scaled features; the scaler is fit
    // on the training frame and applied to the apply-to rows as well.
    if config.algorithm.needs_scaling() {
        let scaler = fit_scaler(&frame.x);
        frame.x = transform_all(&frame.x, &scaler);
        if let Some(unknown_frame) = unknowns.as_mut() {
            unknown_frame.x = transform_all(&unknown_frame.x, &scaler);
        }
    }

    if !layout.is_binary() && unknowns.is_some() {
        log::warn!("apply-to scoring is a binary-run output; ignoring for multiclass");
        unknowns = None;
    }

    let save = config.save_name();

    let (params, balanced) = if config.grid_search {
        log::info!("===> Grid search started <===");
        let outcome = grid_search(
            &frame,
            &layout,
            config.algorithm,
            min_size,
            config.rounds,
            config.cv_folds,
            config.procs,
        )?;
        write_grid_report(format!("{}_GridSearch", save), &outcome.ranked)?;
        log::info!("Parameters selected: {}", outcome.best);
        (outcome.best, outcome.balanced)
    } else {
        (
            config.algorithm.default_params(config.procs),
            establish_balanced(&frame, &layout.classes, min_size, config.rounds)?,
        )
    };
    write_balanced_ids(format!("{}_BalancedIDs", save), &balanced)?;

    log::info!("===> ML Pipeline started <===");
    let outcome = run_rounds(
        &frame,
        &layout,
        unknowns.as_ref(),
        &balanced,
        &params,
        config.cv_folds,
    )?;

    let info = RunInfo {
        timestamp: timestamp_now(),
        save: save.clone(),
        tag: config.tag.clone(),
        algorithm: config.algorithm,
        apply_desc: config.apply_desc(),
        n_features: frame.n_features(),
        min_size,
        cv_folds: config.cv_folds,
        rounds: config.rounds,
        grid_search: config.grid_search,
        params_desc: params.to_string(),
    };

    if layout.is_binary() {
        let table = outcome
            .score_table
            .ok_or_else(|| anyhow!("binary run produced no score table"))?;
        let summary = aggregate_binary(&outcome.rounds, &table, &layout, &frame.feature_names)?;

        write_binary_results(format!("{}_results.txt", save), &info, &summary, &layout)?;
        write_score_table(format!("{}_scores.txt", save), &table, &summary)?;
        if let Some(importance) = &summary.importance {
            write_importance(format!("{}_imp", save), importance)?;
        }
        if config.write_cm {
            write_mean_confusion(
                format!("{}_cm.csv", save),
                &layout.classes,
                &summary.mean_confusion,
            )?;
        }
        if config.write_plots {
            write_curve_plots(&save, &table, &layout, summary.auc_roc.mean, summary.auc_prc.mean)?;
        }
        append_results_row("RESULTS.txt", &info, &summary, &layout)?;

        log::info!("===> ML Results <===");
        log::info!(
            "Accuracy: {:.3} (+/- stdev {:.3})",
            summary.performance.accuracy.mean,
            summary.performance.accuracy.sd
        );
        log::info!(
            "F1: {:.3} (+/- stdev {:.3})",
            summary.performance.f1.mean,
            summary.performance.f1.sd
        );
        log::info!(
            "AUC-ROC: {:.3} (+/- stdev {:.3})",
            summary.auc_roc.mean,
            summary.auc_roc.sd
        );
        log::info!(
            "AUC-PRC: {:.3} (+/- stdev {:.3})",
            summary.auc_prc.mean,
            summary.auc_prc.sd
        );
    } else {
        let summary = aggregate_multiclass(&outcome.rounds, &layout)?;
        write_multiclass_results(format!("{}_results.txt", save), &info, &summary, &layout)?;
        if config.write_cm {
            write_mean_confusion(
                format!("{}_cm.csv", save),
                &layout.classes,
                &summary.mean_confusion,
            )?;
        }

        log::info!("===> ML Results <===");
        log::info!(
            "Accuracy: {:.3} (+/- stdev {:.3})",
            summary.accuracy.mean,
            summary.accuracy.sd
        );
        log::info!(
            "F1 (macro): {:.3} (+/- stdev {:.3})",
            summary.macro_f1.mean,
            summary.macro_f1.sd
        );
    }

    Ok(())
}

/// Render per-round ROC and PR curves over the known (training-class) rows.
fn write_curve_plots(
    save: &str,
    table: &ScoreTable,
    layout: &ClassLayout,
    mean_roc: f64,
    mean_prc: f64,
) -> Result<()> {
    let positive = layout
        .positive
        .as_deref()
        .ok_or_else(|| anyhow!("curve plots need a binary run"))?;

    let known_rows: Vec<usize> = (0..table.ids.len()).filter(|&i| table.known[i]).collect();
    let is_pos: Vec<bool> = known_rows
        .iter()
        .map(|&i| table.true_labels[i] == positive)
        .collect();

    let mut roc_curves = Vec::with_capacity(table.columns.len());
    let mut pr_curves = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        let scores: Vec<f64> = known_rows.iter().map(|&i| column[i]).collect();
        roc_curves.push(roc_curve(&scores, &is_pos)?);
        pr_curves.push(pr_curve(&scores, &is_pos)?);
    }

    let roc_plot = plot_roc_curves(&roc_curves, mean_roc, save);
    roc_plot.write_html(format!("{}_ROCcurves.html", save));
    let pr_plot = plot_pr_curves(&pr_curves, mean_prc, save);
    pr_plot.write_html(format!("{}_PRcurves.html", save));
    Ok(())
}
