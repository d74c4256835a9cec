//! Feature-selection methods and their dispatcher.
//!
//! Every method consumes a recoded feature frame and returns the subset of
//! feature column indices to keep; the dispatcher materializes the reduced
//! frame with rows, identifiers and order untouched.
pub mod fisher;
pub mod forest;
pub mod lasso;
pub mod univariate;

use anyhow::Result;

use crate::config::TaskKind;
use crate::frame::FeatureFrame;

/// A fully-parameterized selection request.
#[derive(Debug, Clone)]
pub enum SelectionSpec {
    RandomForest { n: usize, n_jobs: usize },
    Chi2 { n: usize },
    Lasso { param: f64, task: TaskKind },
    Fisher { p_cutoff: f64 },
}

/// Outcome of a selection run: the reduced frame plus the kept names in
/// ranked order.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub frame: FeatureFrame,
    pub kept: Vec<String>,
}

/// Run one selection method against a frame whose labels have already been
/// recoded (positive -> "1", negative -> "0").
pub fn run_selection(frame: &FeatureFrame, spec: &SelectionSpec) -> Result<SelectionOutcome> {
    let indices = match spec {
        SelectionSpec::RandomForest { n, n_jobs } => {
            forest::forest_select(frame, *n, *n_jobs)?
        }
        SelectionSpec::Chi2 { n } => univariate::chi2_select(frame, *n)?,
        SelectionSpec::Lasso { param, task } => lasso::l1_select(frame, *param, *task)?,
        SelectionSpec::Fisher { p_cutoff } => fisher::fisher_select(frame, *p_cutoff)?,
    };

    let kept = indices
        .iter()
        .map(|&i| frame.feature_names[i].clone())
        .collect();

    Ok(SelectionOutcome {
        frame: frame.select_features(&indices),
        kept,
    })
}
