//! Integration tests for the feature-selection methods: shape invariants,
//! subset guarantees, and parameter monotonicity.

use ndarray::Array2;

use stratify_learn::config::TaskKind;
use stratify_learn::frame::FeatureFrame;
use stratify_learn::selection::{run_selection, SelectionSpec};

/// 20 rows, 5 binary features; "hit" separates the recoded classes, the
/// rest vary without tracking the class.
fn synthetic_frame() -> FeatureFrame {
    let mut values = Vec::new();
    let mut labels = Vec::new();
    let mut ids = Vec::new();
    for i in 0..20u32 {
        let positive = i % 2 == 0;
        values.push(if positive { 1.0 } else { 0.0 }); // hit
        values.push(if i % 4 < 2 { 1.0 } else { 0.0 }); // split
        values.push(if i % 3 == 0 { 1.0 } else { 0.0 }); // thirds
        values.push(if i % 5 == 0 { 1.0 } else { 0.0 }); // fifths
        values.push(if i % 7 == 0 { 1.0 } else { 0.0 }); // sparse
        labels.push(if positive { "1" } else { "0" }.to_string());
        ids.push(format!("g{}", i));
    }
    FeatureFrame {
        ids,
        labels,
        feature_names: vec![
            "hit".to_string(),
            "split".to_string(),
            "thirds".to_string(),
            "fifths".to_string(),
            "sparse".to_string(),
        ],
        x: Array2::from_shape_vec((20, 5), values).unwrap(),
    }
}

// ---------------------------------------------------------------------------
// Shape invariants
// ---------------------------------------------------------------------------

#[test]
fn selection_preserves_rows_and_identifiers() {
    let frame = synthetic_frame();
    let specs = vec![
        SelectionSpec::Chi2 { n: 2 },
        SelectionSpec::RandomForest { n: 2, n_jobs: 1 },
        SelectionSpec::Fisher { p_cutoff: 0.5 },
        SelectionSpec::Lasso {
            param: 10.0,
            task: TaskKind::Classification,
        },
    ];
    for spec in specs {
        let outcome = run_selection(&frame, &spec).unwrap();
        assert_eq!(outcome.frame.n_rows(), frame.n_rows());
        assert_eq!(outcome.frame.ids, frame.ids);
        assert_eq!(outcome.frame.labels, frame.labels);
    }
}

#[test]
fn top_n_methods_return_min_of_n_and_available() {
    let frame = synthetic_frame();

    let chi = run_selection(&frame, &SelectionSpec::Chi2 { n: 3 }).unwrap();
    assert_eq!(chi.frame.n_features(), 3);

    let chi_all = run_selection(&frame, &SelectionSpec::Chi2 { n: 99 }).unwrap();
    assert_eq!(chi_all.frame.n_features(), 5);

    let forest = run_selection(&frame, &SelectionSpec::RandomForest { n: 2, n_jobs: 1 }).unwrap();
    assert_eq!(forest.frame.n_features(), 2);
}

#[test]
fn selected_features_are_a_subset_of_the_input() {
    let frame = synthetic_frame();
    let outcome = run_selection(&frame, &SelectionSpec::Chi2 { n: 4 }).unwrap();
    for name in &outcome.kept {
        assert!(frame.feature_names.contains(name));
    }
}

// ---------------------------------------------------------------------------
// Method behavior
// ---------------------------------------------------------------------------

#[test]
fn chi2_with_n_one_selects_the_separable_feature() {
    let frame = synthetic_frame();
    let outcome = run_selection(&frame, &SelectionSpec::Chi2 { n: 1 }).unwrap();
    assert_eq!(outcome.kept, vec!["hit"]);
}

#[test]
fn forest_ranks_the_separable_feature_first() {
    let frame = synthetic_frame();
    let outcome = run_selection(&frame, &SelectionSpec::RandomForest { n: 1, n_jobs: 1 }).unwrap();
    assert_eq!(outcome.kept, vec!["hit"]);
}

#[test]
fn fisher_keeps_the_enriched_feature_and_drops_the_flat_one() {
    let frame = synthetic_frame();
    let outcome = run_selection(&frame, &SelectionSpec::Fisher { p_cutoff: 0.01 }).unwrap();
    assert!(outcome.kept.contains(&"hit".to_string()));
    assert!(!outcome.kept.contains(&"split".to_string()));
}

#[test]
fn lasso_classification_count_is_monotone_in_c() {
    let frame = synthetic_frame();
    let strict = run_selection(
        &frame,
        &SelectionSpec::Lasso {
            param: 0.01,
            task: TaskKind::Classification,
        },
    )
    .unwrap();
    let loose = run_selection(
        &frame,
        &SelectionSpec::Lasso {
            param: 100.0,
            task: TaskKind::Classification,
        },
    )
    .unwrap();
    // Smaller C means a heavier penalty and never more retained features.
    assert!(strict.frame.n_features() <= loose.frame.n_features());
}

#[test]
fn lasso_regression_needs_numeric_labels() {
    let mut frame = synthetic_frame();
    for label in frame.labels.iter_mut() {
        *label = format!("cls_{}", label);
    }
    let result = run_selection(
        &frame,
        &SelectionSpec::Lasso {
            param: 0.1,
            task: TaskKind::Regression,
        },
    );
    assert!(result.is_err());
}
