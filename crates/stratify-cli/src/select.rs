//! The `select` subcommand: run one feature-selection method over a table
//! and write the reduced matrix (and optionally a plain feature-name list).
use anyhow::{Context, Result};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use stratify_learn::config::{SelectionMethod, TaskKind};
use stratify_learn::frame::{read_feature_list, read_frame_tsv, FrameReaderConfig};
use stratify_learn::selection::{run_selection, SelectionSpec};

use crate::util::{file_stem_name, validate_input_file};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectConfig {
    pub dataframe: String,
    pub method: SelectionMethod,
    /// Feature count for the top-N methods.
    pub n: usize,
    /// p-value cutoff (Fisher) or regularization parameter (Lasso).
    pub param: f64,
    pub task: TaskKind,
    pub feature_file: Option<String>,
    pub class_column: String,
    pub positive: String,
    pub negative: String,
    pub save: Option<String>,
    pub write_list: bool,
}

impl Default for SelectConfig {
    fn default() -> Self {
        SelectConfig {
            dataframe: String::new(),
            method: SelectionMethod::Chi2,
            n: 50,
            param: 0.05,
            task: TaskKind::Classification,
            feature_file: None,
            class_column: "Class".to_string(),
            positive: "1".to_string(),
            negative: "0".to_string(),
            save: None,
            write_list: false,
        }
    }
}

impl SelectConfig {
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let mut config = SelectConfig::default();

        if let Some(df) = matches.get_one::<String>("df") {
            validate_input_file(df)?;
            config.dataframe = df.clone();
        }
        if let Some(method) = matches.get_one::<String>("method") {
            config.method = method.parse()?;
        }
        if let Some(n) = matches.get_one::<usize>("n") {
            config.n = *n;
        }
        if let Some(param) = matches.get_one::<f64>("param") {
            config.param = *param;
        }
        if let Some(task) = matches.get_one::<String>("model_type") {
            config.task = task.parse()?;
        }
        if let Some(feat) = matches.get_one::<String>("feat") {
            validate_input_file(feat)?;
            config.feature_file = Some(feat.clone());
        }
        if let Some(class_col) = matches.get_one::<String>("class_col") {
            config.class_column = class_col.clone();
        }
        if let Some(pos) = matches.get_one::<String>("pos") {
            config.positive = pos.clone();
        }
        if let Some(neg) = matches.get_one::<String>("neg") {
            config.negative = neg.clone();
        }
        if let Some(save) = matches.get_one::<String>("save") {
            config.save = Some(save.clone());
        }
        config.write_list = matches.get_flag("list");

        Ok(config)
    }

    /// Default save name: input file name plus a method-specific suffix.
    pub fn save_name(&self) -> String {
        if let Some(save) = &self.save {
            return save.clone();
        }
        let stem = file_stem_name(&self.dataframe);
        match self.method {
            SelectionMethod::RandomForest | SelectionMethod::Chi2 => {
                format!("{}_{}_{}", stem, self.method, self.n)
            }
            SelectionMethod::Lasso => {
                let task = match self.task {
                    TaskKind::Classification => "c",
                    TaskKind::Regression => "r",
                };
                format!("{}_{}_{}_{}", stem, self.method, task, self.param)
            }
            SelectionMethod::Fisher => format!("{}_{}_{}", stem, self.method, self.param),
        }
    }
}

pub fn run_select(config: &SelectConfig) -> Result<()> {
    let reader = FrameReaderConfig {
        label_column: config.class_column.clone(),
        ..FrameReaderConfig::default()
    };
    let mut frame = read_frame_tsv(&config.dataframe, &reader)
        .with_context(|| format!("Failed to load {}", config.dataframe))?;
    log::info!(
        "Loaded {} rows x {} features",
        frame.n_rows(),
        frame.n_features()
    );

    if let Some(feature_file) = &config.feature_file {
        let keep = read_feature_list(feature_file)?;
        frame = frame.restrict_features(&keep)?;
        log::info!("Restricted to {} listed features", frame.n_features());
    }

    frame.recode_labels(&config.positive, &config.negative);

    let spec = match config.method {
        SelectionMethod::RandomForest => SelectionSpec::RandomForest {
            n: config.n,
            n_jobs: 1,
        },
        SelectionMethod::Chi2 => SelectionSpec::Chi2 { n: config.n },
        SelectionMethod::Lasso => SelectionSpec::Lasso {
            param: config.param,
            task: config.task,
        },
        SelectionMethod::Fisher => SelectionSpec::Fisher {
            p_cutoff: config.param,
        },
    };

    let outcome = run_selection(&frame, &spec)?;
    log::info!(
        "Selected {} of {} features with {}",
        outcome.kept.len(),
        frame.n_features(),
        config.method
    );

    let save = config.save_name();
    outcome.frame.write_tsv(&save, "Class")?;
    log::info!("Wrote {}", save);

    if config.write_list {
        let list_path = format!("{}_list", save);
        std::fs::write(&list_path, outcome.kept.join("\n") + "\n")
            .with_context(|| format!("Failed to write {}", list_path))?;
        log::info!("Wrote {}", list_path);
    }

    Ok(())
}
