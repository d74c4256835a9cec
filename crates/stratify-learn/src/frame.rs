//! Tabular feature-frame loading and filtering.
//!
//! Input tables are tab-separated with the instance identifier in the first
//! column, one label column (configurable name, default `Class`), and numeric
//! feature columns for the rest. Rows containing missing values are dropped
//! on load.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use ndarray::{Array1, Array2, Axis};

use crate::error::PipelineError;

/// Configuration for reading a feature table.
#[derive(Debug, Clone)]
pub struct FrameReaderConfig {
    /// Column name holding the class label.
    pub label_column: String,
    /// Cell values treated as missing; rows containing one are dropped.
    pub na_values: Vec<String>,
}

impl Default for FrameReaderConfig {
    fn default() -> Self {
        Self {
            label_column: "Class".to_string(),
            na_values: vec!["?".to_string(), "NA".to_string(), String::new()],
        }
    }
}

/// A dense feature matrix with row identifiers and string labels held
/// out-of-band. Writers always emit the label column first, so the "label
/// column in front" invariant is structural rather than positional.
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub feature_names: Vec<String>,
    pub x: Array2<f64>,
}

/// Read a tab-separated feature table.
pub fn read_frame_tsv<P: AsRef<Path>>(path: P, config: &FrameReaderConfig) -> Result<FeatureFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(&path)
        .with_context(|| format!("Failed to open table: {}", path.as_ref().display()))?;

    let headers = reader
        .headers()
        .context("Failed to read table header row")?
        .clone();

    if headers.len() < 2 {
        return Err(PipelineError::MalformedTable(
            "table needs at least an identifier and a label column".to_string(),
        )
        .into());
    }

    let label_idx = find_column(&headers, &config.label_column).ok_or_else(|| {
        PipelineError::MalformedTable(format!(
            "missing label column '{}'",
            config.label_column
        ))
    })?;
    if label_idx == 0 {
        return Err(PipelineError::MalformedTable(
            "first column is reserved for instance identifiers".to_string(),
        )
        .into());
    }

    let feature_indices: Vec<usize> = (1..headers.len()).filter(|&i| i != label_idx).collect();
    let feature_names: Vec<String> = feature_indices
        .iter()
        .map(|&i| headers.get(i).unwrap_or("").to_string())
        .collect();

    let na: HashSet<&str> = config.na_values.iter().map(String::as_str).collect();

    let mut ids = Vec::new();
    let mut labels = Vec::new();
    let mut values = Vec::new();
    let mut dropped = 0usize;

    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;
        if record_has_missing(&record, &na) {
            dropped += 1;
            continue;
        }

        let id = record
            .get(0)
            .ok_or_else(|| anyhow!("Missing identifier at row {}", row_idx + 1))?
            .trim()
            .to_string();
        let label = record
            .get(label_idx)
            .ok_or_else(|| anyhow!("Missing label at row {}", row_idx + 1))?
            .trim()
            .to_string();

        for &idx in &feature_indices {
            let raw = record
                .get(idx)
                .ok_or_else(|| anyhow!("Missing value at row {}", row_idx + 1))?;
            let parsed = raw.trim().parse::<f64>().with_context(|| {
                format!(
                    "Invalid numeric value '{}' in column '{}' at row {}",
                    raw,
                    headers.get(idx).unwrap_or(""),
                    row_idx + 1
                )
            })?;
            values.push(parsed);
        }

        ids.push(id);
        labels.push(label);
    }

    if dropped > 0 {
        log::info!("Dropped {} rows with missing values", dropped);
    }
    if ids.is_empty() {
        return Err(PipelineError::MalformedTable("no usable rows".to_string()).into());
    }

    let mut seen = HashSet::with_capacity(ids.len());
    for id in &ids {
        if !seen.insert(id.as_str()) {
            return Err(
                PipelineError::MalformedTable(format!("duplicate identifier '{}'", id)).into(),
            );
        }
    }

    let x = Array2::from_shape_vec((ids.len(), feature_names.len()), values)
        .context("Failed to build feature matrix")?;

    Ok(FeatureFrame {
        ids,
        labels,
        feature_names,
        x,
    })
}

/// Read a newline-delimited feature allow-list file.
pub fn read_feature_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read feature list: {}", path.as_ref().display()))?;
    let features: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if features.is_empty() {
        return Err(PipelineError::MalformedTable("empty feature list".to_string()).into());
    }
    Ok(features)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(name))
}

fn record_has_missing(record: &StringRecord, na: &HashSet<&str>) -> bool {
    record.iter().any(|field| na.contains(field.trim()))
}

impl FeatureFrame {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Restrict the frame to the named features, preserving list order.
    pub fn restrict_features(&self, keep: &[String]) -> Result<FeatureFrame> {
        let mut indices = Vec::with_capacity(keep.len());
        for name in keep {
            let idx = self
                .feature_names
                .iter()
                .position(|f| f == name)
                .ok_or_else(|| {
                    PipelineError::MalformedTable(format!("unknown feature '{}'", name))
                })?;
            indices.push(idx);
        }
        Ok(self.select_features(&indices))
    }

    /// Keep only the feature columns at the given indices (in order).
    pub fn select_features(&self, indices: &[usize]) -> FeatureFrame {
        FeatureFrame {
            ids: self.ids.clone(),
            labels: self.labels.clone(),
            feature_names: indices
                .iter()
                .map(|&i| self.feature_names[i].clone())
                .collect(),
            x: self.x.select(Axis(1), indices),
        }
    }

    /// Keep only the rows at the given indices (in order).
    pub fn select_rows(&self, indices: &[usize]) -> FeatureFrame {
        FeatureFrame {
            ids: indices.iter().map(|&i| self.ids[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
            feature_names: self.feature_names.clone(),
            x: self.x.select(Axis(0), indices),
        }
    }

    /// Row indices whose label satisfies the predicate.
    pub fn rows_where<F: Fn(&str) -> bool>(&self, pred: F) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| if pred(l) { Some(i) } else { None })
            .collect()
    }

    /// Instance count per label value, sorted by label.
    pub fn class_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0usize) += 1;
        }
        counts
    }

    /// Map of identifier to row index.
    pub fn id_index(&self) -> HashMap<&str, usize> {
        self.ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect()
    }

    /// Recode labels in place: positive becomes "1", negative becomes "0".
    /// Other label values are left untouched.
    pub fn recode_labels(&mut self, positive: &str, negative: &str) {
        for label in self.labels.iter_mut() {
            if label == positive {
                *label = "1".to_string();
            } else if label == negative {
                *label = "0".to_string();
            }
        }
    }

    /// Encode labels as indices into the given sorted class list.
    pub fn encode_classes(&self, classes: &[String]) -> Result<Array1<usize>> {
        let lookup: HashMap<&str, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let mut codes = Vec::with_capacity(self.labels.len());
        for label in &self.labels {
            let code = lookup.get(label.as_str()).ok_or_else(|| {
                PipelineError::DegenerateClasses(format!(
                    "label '{}' is not in the training class set",
                    label
                ))
            })?;
            codes.push(*code);
        }
        Ok(Array1::from_vec(codes))
    }

    /// Binary encoding: 1 for the positive label, 0 for the negative label.
    pub fn encode_binary(&self, positive: &str, negative: &str) -> Result<Array1<usize>> {
        let mut codes = Vec::with_capacity(self.labels.len());
        for label in &self.labels {
            if label == positive {
                codes.push(1usize);
            } else if label == negative {
                codes.push(0usize);
            } else {
                return Err(PipelineError::DegenerateClasses(format!(
                    "label '{}' is neither positive '{}' nor negative '{}'",
                    label, positive, negative
                ))
                .into());
            }
        }
        Ok(Array1::from_vec(codes))
    }

    /// Parse labels as continuous values (for the L1 regression variant).
    pub fn numeric_labels(&self) -> Result<Array1<f64>> {
        let mut values = Vec::with_capacity(self.labels.len());
        for label in &self.labels {
            let v = label.parse::<f64>().map_err(|_| {
                PipelineError::MalformedTable(format!(
                    "label '{}' is not numeric; regression selection needs numeric labels",
                    label
                ))
            })?;
            values.push(v);
        }
        Ok(Array1::from_vec(values))
    }

    /// Write the frame as a tab-separated table, label column first.
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P, label_column: &str) -> Result<()> {
        let mut file = std::fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.as_ref().display()))?;
        write!(file, "ID\t{}", label_column)?;
        for name in &self.feature_names {
            write!(file, "\t{}", name)?;
        }
        writeln!(file)?;
        for row in 0..self.n_rows() {
            write!(file, "{}\t{}", self.ids[row], self.labels[row])?;
            for col in 0..self.n_features() {
                write!(file, "\t{}", self.x[(row, col)])?;
            }
            writeln!(file)?;
        }
        Ok(())
    }
}
