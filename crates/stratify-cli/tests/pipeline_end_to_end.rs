//! End-to-end runs of the compiled binary on a synthetic separable table:
//! selection, classification, and comparison, checking the written files.

use assert_cmd::Command;

fn cmd() -> Command {
    Command::cargo_bin("stratify").unwrap()
}

/// 20 rows, 5 features; "hit" is 1.0 for every positive and 0.0 for every
/// negative, the rest carry no class signal.
fn write_synthetic_table(dir: &std::path::Path) -> std::path::PathBuf {
    let mut content = String::from("ID\tClass\thit\tc1\tc2\tc3\tc4\n");
    for i in 0..20 {
        let positive = i % 2 == 0;
        content.push_str(&format!(
            "g{}\t{}\t{}\t0.5\t0.25\t0.75\t0.1\n",
            i,
            if positive { "1" } else { "0" },
            if positive { "1.0" } else { "0.0" },
        ));
    }
    let path = dir.join("df.txt");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn chi2_selection_with_n_one_keeps_the_separable_feature() {
    let dir = tempfile::tempdir().unwrap();
    let df = write_synthetic_table(dir.path());

    cmd()
        .current_dir(dir.path())
        .args([
            "select",
            "--df",
            df.to_str().unwrap(),
            "--method",
            "chi2",
            "--n",
            "1",
            "--list",
        ])
        .assert()
        .success();

    let matrix = std::fs::read_to_string(dir.path().join("df.txt_Chi2_1")).unwrap();
    let header = matrix.lines().next().unwrap();
    assert_eq!(header, "ID\tClass\thit");
    assert_eq!(matrix.lines().count(), 21);

    let list = std::fs::read_to_string(dir.path().join("df.txt_Chi2_1_list")).unwrap();
    assert_eq!(list.trim(), "hit");
}

#[test]
fn classify_driver_writes_scores_and_cumulative_results() {
    let dir = tempfile::tempdir().unwrap();
    let df = write_synthetic_table(dir.path());

    cmd()
        .current_dir(dir.path())
        .args([
            "classify",
            "--df",
            df.to_str().unwrap(),
            "--alg",
            "LogReg",
            "--rounds",
            "1",
            "--cv",
            "2",
        ])
        .assert()
        .success();

    let save_prefix = format!("{}_LogReg", df.to_str().unwrap());

    let scores = std::fs::read_to_string(format!("{}_scores.txt", save_prefix)).unwrap();
    assert!(scores.starts_with("#ID\tClass\tMedian"));
    assert_eq!(scores.lines().count(), 21);

    let results = std::fs::read_to_string(format!("{}_results.txt", save_prefix)).unwrap();
    // Perfect separation: AUC-ROC of exactly 1 across the single round.
    assert!(results.contains("AucROC\t1.000000"));

    let cumulative = std::fs::read_to_string(dir.path().join("RESULTS.txt")).unwrap();
    assert!(cumulative.lines().count() >= 2);
    assert!(cumulative.starts_with("DateTime\tID\tTag\tAlg"));

    let balanced = std::fs::read_to_string(format!("{}_BalancedIDs", save_prefix)).unwrap();
    assert_eq!(balanced.lines().count(), 1);
    assert_eq!(balanced.lines().next().unwrap().split('\t').count(), 18);
}

#[test]
fn compare_reports_overlap_between_two_runs() {
    let dir = tempfile::tempdir().unwrap();
    let df = write_synthetic_table(dir.path());

    for tag in ["a", "b"] {
        cmd()
            .current_dir(dir.path())
            .args([
                "classify",
                "--df",
                df.to_str().unwrap(),
                "--alg",
                "LogReg",
                "--rounds",
                "1",
                "--cv",
                "2",
                "--tag",
                tag,
            ])
            .assert()
            .success();
    }

    let scores_a = format!("{}_LogReg_a_scores.txt", df.to_str().unwrap());
    let scores_b = format!("{}_LogReg_b_scores.txt", df.to_str().unwrap());

    cmd()
        .current_dir(dir.path())
        .args([
            "compare",
            "--scores",
            &format!("{},{}", scores_a, scores_b),
            "--ids",
            "runA,runB",
            "--save",
            "cmp",
            "--no-plot",
        ])
        .assert()
        .success();

    let report = std::fs::read_to_string(dir.path().join("cmp_pred_compared.txt")).unwrap();
    assert!(report.contains("## Overlap matrix. Positives in dataset = 10"));
    assert!(report.contains("runA\tTP\t"));
    assert!(report.contains("## Overlap region list"));
}

#[test]
fn unknown_rows_are_scored_when_apply_all() {
    let dir = tempfile::tempdir().unwrap();

    // Add 4 rows of an extra class the model is applied to but not trained on.
    let mut content = String::from("ID\tClass\thit\tc1\tc2\tc3\tc4\n");
    for i in 0..20 {
        let positive = i % 2 == 0;
        content.push_str(&format!(
            "g{}\t{}\t{}\t0.5\t0.25\t0.75\t0.1\n",
            i,
            if positive { "pos" } else { "neg" },
            if positive { "1.0" } else { "0.0" },
        ));
    }
    for i in 0..4 {
        content.push_str(&format!("u{}\tunk\t0.5\t0.5\t0.25\t0.75\t0.1\n", i));
    }
    let df = dir.path().join("df.txt");
    std::fs::write(&df, content).unwrap();

    cmd()
        .current_dir(dir.path())
        .args([
            "classify",
            "--df",
            df.to_str().unwrap(),
            "--alg",
            "LogReg",
            "--cl-train",
            "pos,neg",
            "--apply",
            "all",
            "--rounds",
            "1",
            "--cv",
            "2",
        ])
        .assert()
        .success();

    let scores =
        std::fs::read_to_string(format!("{}_LogReg_scores.txt", df.to_str().unwrap())).unwrap();
    // 20 training-class rows + 4 apply-to rows + header
    assert_eq!(scores.lines().count(), 25);
    assert!(scores.contains("u0\tunk\t"));
}
