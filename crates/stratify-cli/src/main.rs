use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use stratify_cli::classify::{run_classify, ClassifyConfig};
use stratify_cli::compare::{run_compare, CompareConfig};
use stratify_cli::select::{run_select, SelectConfig};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or(
            "STRATIFY_LOG",
            "error,stratify=info,stratify_cli=info,stratify_learn=info",
        ))
        .init();

    let matches = Command::new("stratify")
        .version(clap::crate_version!())
        .about("Balanced-resampling classification and feature selection for tabular datasets")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("select")
                .about("Run a feature-selection method over a feature table")
                .arg(
                    Arg::new("df")
                        .long("df")
                        .help("Tab-separated feature table (col 1 = id, one label column)")
                        .required(true)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("method")
                        .short('f')
                        .long("method")
                        .help("Selection method: RandomForest (rf), Chi2 (c2), Lasso (l1), Fisher (fet)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("n")
                        .short('n')
                        .long("n")
                        .help("Number of features to keep (RandomForest, Chi2)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("param")
                        .short('p')
                        .long("param")
                        .help("p-value cutoff (Fisher) or regularization parameter (Lasso)")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    Arg::new("model_type")
                        .long("type")
                        .help("Lasso variant: c = classification, r = regression")
                        .value_parser(["c", "r", "classification", "regression"]),
                )
                .arg(
                    Arg::new("feat")
                        .long("feat")
                        .help("Newline-delimited feature allow-list file")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("class_col")
                        .long("class")
                        .help("Name of the label column (default: Class)"),
                )
                .arg(
                    Arg::new("pos")
                        .long("pos")
                        .help("Positive class label (default: 1)"),
                )
                .arg(
                    Arg::new("neg")
                        .long("neg")
                        .help("Negative class label (default: 0)"),
                )
                .arg(
                    Arg::new("save")
                        .long("save")
                        .help("Save-name prefix (default derived from the input name)"),
                )
                .arg(
                    Arg::new("list")
                        .long("list")
                        .help("Additionally write a plain feature-name list")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("classify")
                .about("Train and evaluate classifiers over balanced subsamples")
                .arg(
                    Arg::new("df")
                        .long("df")
                        .help("Tab-separated feature table (col 1 = id, one label column)")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("alg")
                        .long("alg")
                        .help("Algorithm: RF, SVM, SVMpoly, SVMrbf, LogReg"),
                )
                .arg(
                    Arg::new("cl_train")
                        .long("cl-train")
                        .help("Comma list of classes to train on; first is the positive class"),
                )
                .arg(
                    Arg::new("pos")
                        .long("pos")
                        .help("Positive class label (default: 1 or first of --cl-train)"),
                )
                .arg(
                    Arg::new("apply")
                        .long("apply")
                        .help("Non-training classes to score: 'all', 'none', or a comma list"),
                )
                .arg(
                    Arg::new("gs")
                        .long("gs")
                        .help("Grid search the hyperparameter space first")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("cv")
                        .long("cv")
                        .help("Cross-validation fold count (default: 10)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("rounds")
                        .short('b')
                        .long("rounds")
                        .help("Number of balanced datasets to run (default: 100)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("min_size")
                        .long("min-size")
                        .help("Instances drawn per class (default: smallest class - 1)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("procs")
                        .short('p')
                        .long("procs")
                        .help("Worker count for the tree-ensemble fit (default: 1)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("tag")
                        .long("tag")
                        .help("Tag string for save names and the RESULTS.txt row"),
                )
                .arg(
                    Arg::new("save")
                        .long("save")
                        .help("Save-name prefix; existing outputs are overwritten"),
                )
                .arg(
                    Arg::new("feat")
                        .long("feat")
                        .help("Newline-delimited feature allow-list file")
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("class_col")
                        .long("class")
                        .help("Name of the label column (default: Class)"),
                )
                .arg(
                    Arg::new("cm")
                        .long("cm")
                        .help("Write the mean confusion matrix table")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("plots")
                        .long("plots")
                        .help("Write ROC and PR curve plots")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .help("JSON configuration file; CLI flags override its fields")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("compare")
                .about("Compare prediction outputs across previously written score tables")
                .arg(
                    Arg::new("scores")
                        .long("scores")
                        .help("Comma list of _scores.txt paths")
                        .required(true)
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("ids")
                        .long("ids")
                        .help("Comma list of run labels, same order as --scores")
                        .required(true),
                )
                .arg(
                    Arg::new("save")
                        .long("save")
                        .help("Save-name prefix (default: compare_clf)"),
                )
                .arg(
                    Arg::new("pos")
                        .long("pos")
                        .help("Positive class label (default: 1)"),
                )
                .arg(
                    Arg::new("neg")
                        .long("neg")
                        .help("Negative class label (default: 0)"),
                )
                .arg(
                    Arg::new("no_plot")
                        .long("no-plot")
                        .help("Skip the overlap diagram")
                        .action(ArgAction::SetTrue),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("select", sub)) => handle_select(sub),
        Some(("classify", sub)) => handle_classify(sub),
        Some(("compare", sub)) => handle_compare(sub),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_select(matches: &ArgMatches) -> Result<()> {
    let config = SelectConfig::from_arguments(matches)?;
    log::info!(
        "[stratify::select] {} on {}",
        config.method,
        config.dataframe
    );
    match run_select(&config) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("Feature selection failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_classify(matches: &ArgMatches) -> Result<()> {
    let config = ClassifyConfig::from_arguments(matches)?;
    log::info!(
        "[stratify::classify] {} on {}",
        config.algorithm,
        config.dataframe
    );
    match run_classify(&config) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("Classification failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_compare(matches: &ArgMatches) -> Result<()> {
    let config = CompareConfig::from_arguments(matches)?;
    log::info!(
        "[stratify::compare] {} runs -> {}",
        config.scores.len(),
        config.save
    );
    match run_compare(&config) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::error!("Comparison failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
