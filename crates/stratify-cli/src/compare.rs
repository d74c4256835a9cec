//! The `compare` subcommand: cross-run comparison of score tables.
use anyhow::Result;
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use stratify_learn::compare::{compare_runs, region_labels, write_compare_report};
use stratify_learn::report::plots::plot_overlap_counts;

use crate::util::{split_comma_list, validate_input_file};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub scores: Vec<String>,
    pub run_ids: Vec<String>,
    pub save: String,
    pub positive: String,
    pub negative: String,
    pub plot: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        CompareConfig {
            scores: Vec::new(),
            run_ids: Vec::new(),
            save: "compare_clf".to_string(),
            positive: "1".to_string(),
            negative: "0".to_string(),
            plot: true,
        }
    }
}

impl CompareConfig {
    pub fn from_arguments(matches: &ArgMatches) -> Result<Self> {
        let mut config = CompareConfig::default();

        if let Some(scores) = matches.get_one::<String>("scores") {
            config.scores = split_comma_list(scores);
            for path in &config.scores {
                validate_input_file(path)?;
            }
        }
        if let Some(ids) = matches.get_one::<String>("ids") {
            config.run_ids = split_comma_list(ids);
        }
        if let Some(save) = matches.get_one::<String>("save") {
            config.save = save.clone();
        }
        if let Some(pos) = matches.get_one::<String>("pos") {
            config.positive = pos.clone();
        }
        if let Some(neg) = matches.get_one::<String>("neg") {
            config.negative = neg.clone();
        }
        if matches.get_flag("no_plot") {
            config.plot = false;
        }

        if config.scores.is_empty() {
            anyhow::bail!("at least one scores file is required (--scores)");
        }
        Ok(config)
    }
}

pub fn run_compare(config: &CompareConfig) -> Result<()> {
    let outcome = compare_runs(&config.scores, &config.run_ids, &config.positive)?;

    let report_path = format!("{}_pred_compared.txt", config.save);
    write_compare_report(&report_path, &outcome)?;
    log::info!("Wrote {}", report_path);

    if config.plot {
        if let Some(counts) = &outcome.region_counts {
            let labels = region_labels(&outcome.run_ids);
            let plot = plot_overlap_counts(&labels, counts, &config.save);
            let plot_path = format!("{}_overlap.html", config.save);
            plot.write_html(&plot_path);
            log::info!("Wrote {}", plot_path);
        } else {
            log::warn!("Overlap diagram skipped; it needs 2-5 runs");
        }
    }

    Ok(())
}
