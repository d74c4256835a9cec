//! Cross-run comparison of per-instance score tables.
//!
//! Each previously written `_scores.txt` file is partitioned into the
//! true-positive and false-negative identifier sets of its run, using the
//! fixed column positions of the score table (0 identifier, 1 true label,
//! 5 final call). Overlaps between runs feed a symmetric count matrix and,
//! for 2-5 runs, the full inclusion-exclusion region list.
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::error::PipelineError;

const ID_COL: usize = 0;
const TRUE_COL: usize = 1;
const PRED_COL: usize = 5;

/// One run's positive-labeled instances split by outcome.
#[derive(Debug, Clone)]
pub struct RunPartition {
    pub tp: Vec<String>,
    pub fn_: Vec<String>,
}

/// Read a score table and partition its positive-labeled rows.
pub fn read_score_partition<P: AsRef<Path>>(path: P, positive: &str) -> Result<RunPartition> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read scores file: {}", path.as_ref().display()))?;

    let mut tp = Vec::new();
    let mut fn_ = Vec::new();
    for line in content.lines() {
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() <= PRED_COL {
            return Err(PipelineError::MalformedTable(format!(
                "scores row has {} columns, expected at least {}",
                fields.len(),
                PRED_COL + 1
            ))
            .into());
        }
        if fields[TRUE_COL] != positive {
            continue;
        }
        if fields[PRED_COL] == positive {
            tp.push(fields[ID_COL].to_string());
        } else {
            fn_.push(fields[ID_COL].to_string());
        }
    }

    Ok(RunPartition { tp, fn_ })
}

/// Comparison outputs across all runs.
#[derive(Debug, Clone)]
pub struct CompareOutcome {
    pub run_ids: Vec<String>,
    pub partitions: Vec<RunPartition>,
    /// Positive-labeled instance count, taken from the first run's table.
    pub positives_total: usize,
    /// Symmetric true-positive overlap counts; diagonal is each run's own
    /// true-positive count.
    pub overlap: Vec<Vec<usize>>,
    /// Inclusion-exclusion region counts for 2-5 runs, `None` otherwise.
    pub region_counts: Option<Vec<usize>>,
}

/// Compare N score tables.
pub fn compare_runs<P: AsRef<Path>>(
    paths: &[P],
    run_ids: &[String],
    positive: &str,
) -> Result<CompareOutcome> {
    if paths.len() != run_ids.len() {
        return Err(PipelineError::MalformedTable(format!(
            "{} score files but {} run labels",
            paths.len(),
            run_ids.len()
        ))
        .into());
    }
    if paths.is_empty() {
        return Err(PipelineError::MalformedTable("no score files given".to_string()).into());
    }

    let partitions: Vec<RunPartition> = paths
        .iter()
        .map(|p| read_score_partition(p, positive))
        .collect::<Result<_>>()?;

    let positives_total = partitions[0].tp.len() + partitions[0].fn_.len();

    let tp_sets: Vec<HashSet<&str>> = partitions
        .iter()
        .map(|p| p.tp.iter().map(String::as_str).collect())
        .collect();

    let overlap = overlap_matrix(&tp_sets);
    let region_counts = if (2..=5).contains(&tp_sets.len()) {
        Some(region_counts(&tp_sets))
    } else {
        log::warn!(
            "Region list needs 2-5 runs, got {}; writing the overlap matrix only",
            tp_sets.len()
        );
        None
    };

    Ok(CompareOutcome {
        run_ids: run_ids.to_vec(),
        partitions,
        positives_total,
        overlap,
        region_counts,
    })
}

/// Symmetric pairwise intersection counts over the true-positive sets.
pub fn overlap_matrix(tp_sets: &[HashSet<&str>]) -> Vec<Vec<usize>> {
    let n = tp_sets.len();
    let mut matrix = vec![vec![0usize; n]; n];
    for i in 0..n {
        for j in 0..n {
            matrix[i][j] = if i == j {
                tp_sets[i].len()
            } else {
                tp_sets[i].intersection(&tp_sets[j]).count()
            };
        }
    }
    matrix
}

/// All k-subsets of 0..n in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut combo: Vec<usize> = (0..k).collect();
    if k == 0 || k > n {
        return out;
    }
    loop {
        out.push(combo.clone());
        // Advance the rightmost index that can still move.
        let mut i = k;
        while i > 0 {
            i -= 1;
            if combo[i] != i + n - k {
                combo[i] += 1;
                for j in i + 1..k {
                    combo[j] = combo[j - 1] + 1;
                }
                break;
            }
            if i == 0 {
                return out;
            }
        }
    }
}

/// The inclusion-exclusion count list: per-run areas first, then every
/// pairwise, triple, ... up to the full intersection, subsets in
/// lexicographic order within each size.
pub fn region_counts(tp_sets: &[HashSet<&str>]) -> Vec<usize> {
    let n = tp_sets.len();
    let mut counts = Vec::new();
    for size in 1..=n {
        for combo in combinations(n, size) {
            let mut iter = combo.iter();
            let first = *iter.next().expect("non-empty combination");
            let mut intersection: HashSet<&str> = tp_sets[first].clone();
            for &idx in iter {
                intersection = intersection
                    .intersection(&tp_sets[idx])
                    .copied()
                    .collect();
            }
            counts.push(intersection.len());
        }
    }
    counts
}

/// Region labels aligned with `region_counts`.
pub fn region_labels(run_ids: &[String]) -> Vec<String> {
    let n = run_ids.len();
    let mut labels = Vec::new();
    for size in 1..=n {
        for combo in combinations(n, size) {
            let parts: Vec<&str> = combo.iter().map(|&i| run_ids[i].as_str()).collect();
            labels.push(parts.join("&"));
        }
    }
    labels
}

/// Write the comparison report: TP/FN lists, the overlap matrix, and the
/// region list when available.
pub fn write_compare_report<P: AsRef<Path>>(path: P, outcome: &CompareOutcome) -> Result<()> {
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;

    writeln!(
        file,
        "## True positives and false negatives predicted by each model:"
    )?;
    for (run_id, partition) in outcome.run_ids.iter().zip(outcome.partitions.iter()) {
        writeln!(file, "{}\tTP\t{}", run_id, partition.tp.join(","))?;
        writeln!(file, "{}\tFN\t{}", run_id, partition.fn_.join(","))?;
    }

    writeln!(
        file,
        "\n\n## Overlap matrix. Positives in dataset = {}\n",
        outcome.positives_total
    )?;
    writeln!(file, "\t{}", outcome.run_ids.join("\t"))?;
    for (run_id, row) in outcome.run_ids.iter().zip(outcome.overlap.iter()) {
        let cells: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        writeln!(file, "{}\t{}", run_id, cells.join("\t"))?;
    }

    if let Some(counts) = &outcome.region_counts {
        writeln!(file, "\n\n## Overlap region list for diagram rendering:\n")?;
        writeln!(file, "{}", outcome.run_ids.join(","))?;
        let cells: Vec<String> = counts.iter().map(|c| c.to_string()).collect();
        writeln!(file, "[{}]", cells.join(", "))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&'static str]) -> HashSet<&'static str> {
        items.iter().copied().collect()
    }

    #[test]
    fn overlap_matrix_is_symmetric_with_own_counts_on_diagonal() {
        let sets = vec![set(&["a", "b", "c"]), set(&["b", "c", "d", "e"])];
        let matrix = overlap_matrix(&sets);
        assert_eq!(matrix[0][0], 3);
        assert_eq!(matrix[1][1], 4);
        assert_eq!(matrix[0][1], matrix[1][0]);
        assert_eq!(matrix[0][1], 2);
        // Intersection never exceeds the smaller area
        assert!(matrix[0][1] <= matrix[0][0].min(matrix[1][1]));
    }

    #[test]
    fn two_run_region_list_is_areas_then_intersection() {
        let sets = vec![set(&["a", "b", "c"]), set(&["b", "c", "d"])];
        assert_eq!(region_counts(&sets), vec![3, 3, 2]);
    }

    #[test]
    fn three_run_region_list_order() {
        let sets = vec![
            set(&["a", "b", "c", "d"]),
            set(&["b", "c"]),
            set(&["c", "d"]),
        ];
        // area1 area2 area3 n12 n13 n23 n123
        assert_eq!(region_counts(&sets), vec![4, 2, 2, 2, 2, 1, 1]);
    }

    #[test]
    fn five_run_region_list_has_thirty_one_entries() {
        let sets: Vec<HashSet<&str>> = (0..5).map(|_| set(&["x"])).collect();
        assert_eq!(region_counts(&sets).len(), 31);
    }

    #[test]
    fn labels_align_with_counts() {
        let ids = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let labels = region_labels(&ids);
        assert_eq!(
            labels,
            vec!["A", "B", "C", "A&B", "A&C", "B&C", "A&B&C"]
        );
    }

    #[test]
    fn score_partition_reads_fixed_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_scores.txt");
        std::fs::write(
            &path,
            "#ID\tClass\tMedian\tMean\tstdev\tPredicted_0.5\tscore_0\n\
             g1\t1\t0.9\t0.9\t0.0\t1\t0.9\n\
             g2\t1\t0.2\t0.2\t0.0\t0\t0.2\n\
             g3\t0\t0.1\t0.1\t0.0\t0\t0.1\n",
        )
        .unwrap();
        let partition = read_score_partition(&path, "1").unwrap();
        assert_eq!(partition.tp, vec!["g1"]);
        assert_eq!(partition.fn_, vec!["g2"]);
    }

    #[test]
    fn compare_runs_rejects_mismatched_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_scores.txt");
        std::fs::write(&path, "#ID\tClass\tMedian\tMean\tstdev\tPredicted\n").unwrap();
        let result = compare_runs(&[&path], &["a".to_string(), "b".to_string()], "1");
        assert!(result.is_err());
    }
}
