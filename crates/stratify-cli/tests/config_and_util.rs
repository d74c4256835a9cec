//! Integration tests for CLI config types and util helpers.

use stratify_cli::classify::{ApplySet, ClassifyConfig};
use stratify_cli::compare::CompareConfig;
use stratify_cli::select::SelectConfig;
use stratify_cli::util::{file_stem_name, split_comma_list, validate_input_file};

// ---------------------------------------------------------------------------
// validate_input_file
// ---------------------------------------------------------------------------

#[test]
fn validate_existing_file_ok() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    std::fs::File::create(&path).unwrap();
    assert!(validate_input_file(path.to_str().unwrap()).is_ok());
}

#[test]
fn validate_nonexistent_file_errors() {
    assert!(validate_input_file("/nonexistent/path/data.txt").is_err());
}

#[test]
fn validate_directory_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(validate_input_file(dir.path().to_str().unwrap()).is_err());
}

// ---------------------------------------------------------------------------
// small helpers
// ---------------------------------------------------------------------------

#[test]
fn comma_lists_are_trimmed_and_filtered() {
    assert_eq!(
        split_comma_list(" a, b ,,c "),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
}

#[test]
fn file_stem_keeps_the_base_name() {
    assert_eq!(file_stem_name("/data/runs/df.txt"), "df.txt");
    assert_eq!(file_stem_name("df.txt"), "df.txt");
}

// ---------------------------------------------------------------------------
// SelectConfig
// ---------------------------------------------------------------------------

#[test]
fn select_config_default_values() {
    let cfg = SelectConfig::default();
    assert_eq!(cfg.class_column, "Class");
    assert_eq!(cfg.positive, "1");
    assert_eq!(cfg.negative, "0");
    assert!(!cfg.write_list);
    assert!((cfg.param - 0.05).abs() < 1e-12);
}

#[test]
fn select_save_name_embeds_method_and_parameter() {
    let mut cfg = SelectConfig {
        dataframe: "/data/df.txt".to_string(),
        n: 25,
        ..SelectConfig::default()
    };
    assert_eq!(cfg.save_name(), "df.txt_Chi2_25");

    cfg.method = "fisher".parse().unwrap();
    assert_eq!(cfg.save_name(), "df.txt_Fisher_0.05");

    cfg.save = Some("custom".to_string());
    assert_eq!(cfg.save_name(), "custom");
}

// ---------------------------------------------------------------------------
// ClassifyConfig
// ---------------------------------------------------------------------------

#[test]
fn classify_config_default_values() {
    let cfg = ClassifyConfig::default();
    assert_eq!(cfg.cv_folds, 10);
    assert_eq!(cfg.rounds, 100);
    assert_eq!(cfg.procs, 1);
    assert_eq!(cfg.apply, ApplySet::None);
    assert!(!cfg.grid_search);
    assert!(cfg.min_size.is_none());
}

#[test]
fn classify_config_round_trips_json() {
    let cfg = ClassifyConfig {
        dataframe: "df.txt".to_string(),
        rounds: 7,
        apply: ApplySet::Labels(vec!["unk".to_string()]),
        ..ClassifyConfig::default()
    };
    let json = serde_json::to_string(&cfg).unwrap();
    let back: ClassifyConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.rounds, 7);
    assert_eq!(back.apply, ApplySet::Labels(vec!["unk".to_string()]));
}

#[test]
fn classify_save_name_appends_algorithm_and_tag() {
    let mut cfg = ClassifyConfig {
        dataframe: "df.txt".to_string(),
        ..ClassifyConfig::default()
    };
    assert_eq!(cfg.save_name(), "df.txt_RF");
    cfg.tag = "featset1".to_string();
    assert_eq!(cfg.save_name(), "df.txt_RF_featset1");
}

// ---------------------------------------------------------------------------
// CompareConfig
// ---------------------------------------------------------------------------

#[test]
fn compare_config_default_values() {
    let cfg = CompareConfig::default();
    assert_eq!(cfg.save, "compare_clf");
    assert_eq!(cfg.positive, "1");
    assert!(cfg.plot);
}
