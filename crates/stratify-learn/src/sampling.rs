//! Class-balanced subsample generation.
//!
//! Each round draws the same number of instances per class, uniformly at
//! random without replacement within the round. Rounds are independent, so
//! overlap across rounds is expected and unconstrained.
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::error::PipelineError;
use crate::frame::FeatureFrame;

/// Default per-class draw count: one less than the smallest class, guarding
/// against exhausting the smallest class.
pub fn default_min_size(counts: &BTreeMap<String, usize>) -> Result<usize> {
    let smallest = counts.values().copied().min().ok_or_else(|| {
        PipelineError::DegenerateClasses("no classes present".to_string())
    })?;
    if smallest < 2 {
        return Err(PipelineError::DegenerateClasses(format!(
            "smallest class has {} instance(s); need at least 2 to balance",
            smallest
        ))
        .into());
    }
    Ok(smallest - 1)
}

/// Draw `rounds` independent balanced samples of `min_size` identifiers per
/// class. Every round contains exactly `min_size * classes.len()` ids.
pub fn establish_balanced(
    frame: &FeatureFrame,
    classes: &[String],
    min_size: usize,
    rounds: usize,
) -> Result<Vec<Vec<String>>> {
    if min_size == 0 {
        return Err(
            PipelineError::DegenerateClasses("balanced sample size must be > 0".to_string()).into(),
        );
    }

    // Per-class identifier pools.
    let mut pools: Vec<(&String, Vec<&String>)> = Vec::with_capacity(classes.len());
    for class in classes {
        let ids: Vec<&String> = frame
            .labels
            .iter()
            .zip(frame.ids.iter())
            .filter_map(|(l, id)| if l == class { Some(id) } else { None })
            .collect();
        if ids.len() < min_size {
            return Err(PipelineError::DegenerateClasses(format!(
                "class '{}' has {} instance(s), fewer than the balanced size {}",
                class,
                ids.len(),
                min_size
            ))
            .into());
        }
        pools.push((class, ids));
    }

    let mut rng = thread_rng();
    let mut samples = Vec::with_capacity(rounds);
    for _ in 0..rounds {
        let mut round = Vec::with_capacity(min_size * classes.len());
        for (_, pool) in &pools {
            round.extend(
                pool.choose_multiple(&mut rng, min_size)
                    .map(|id| (*id).clone()),
            );
        }
        samples.push(round);
    }

    Ok(samples)
}

/// Write the balanced id sets, one tab-separated round per line.
pub fn write_balanced_ids<P: AsRef<Path>>(path: P, samples: &[Vec<String>]) -> Result<()> {
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
    for round in samples {
        writeln!(file, "{}", round.join("\t"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn toy_frame(per_class: &[(&str, usize)]) -> FeatureFrame {
        let mut ids = Vec::new();
        let mut labels = Vec::new();
        for (class, count) in per_class {
            for i in 0..*count {
                ids.push(format!("{}_{}", class, i));
                labels.push(class.to_string());
            }
        }
        let n = ids.len();
        FeatureFrame {
            ids,
            labels,
            feature_names: vec!["f".to_string()],
            x: Array2::zeros((n, 1)),
        }
    }

    #[test]
    fn default_min_size_is_smallest_minus_one() {
        let frame = toy_frame(&[("a", 10), ("b", 4)]);
        assert_eq!(default_min_size(&frame.class_counts()).unwrap(), 3);
    }

    #[test]
    fn default_min_size_rejects_singleton_class() {
        let frame = toy_frame(&[("a", 10), ("b", 1)]);
        assert!(default_min_size(&frame.class_counts()).is_err());
    }

    #[test]
    fn balanced_rounds_have_exact_counts_per_class() {
        let frame = toy_frame(&[("a", 8), ("b", 5), ("c", 6)]);
        let classes = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let samples = establish_balanced(&frame, &classes, 4, 7).unwrap();
        assert_eq!(samples.len(), 7);
        for round in &samples {
            assert_eq!(round.len(), 4 * 3);
            for class in &classes {
                let prefix = format!("{}_", class);
                let per_class = round.iter().filter(|id| id.starts_with(&prefix)).count();
                assert_eq!(per_class, 4);
            }
            // Without replacement within a round
            let unique: std::collections::HashSet<_> = round.iter().collect();
            assert_eq!(unique.len(), round.len());
        }
    }

    #[test]
    fn ids_come_from_the_true_population() {
        let frame = toy_frame(&[("a", 3), ("b", 3)]);
        let classes = vec!["a".to_string(), "b".to_string()];
        let samples = establish_balanced(&frame, &classes, 2, 3).unwrap();
        let population: std::collections::HashSet<_> = frame.ids.iter().collect();
        for round in &samples {
            assert!(round.iter().all(|id| population.contains(id)));
        }
    }

    #[test]
    fn oversized_min_size_is_error() {
        let frame = toy_frame(&[("a", 3), ("b", 3)]);
        let classes = vec!["a".to_string(), "b".to_string()];
        assert!(establish_balanced(&frame, &classes, 4, 1).is_err());
    }
}
