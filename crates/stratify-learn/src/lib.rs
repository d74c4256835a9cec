//! stratify-learn: balanced-resampling classification for tabular datasets.
//!
//! This crate provides the dataframe loading, feature selection, balanced
//! sampling, model training/evaluation, aggregation and cross-run comparison
//! routines behind the `stratify` command-line tool. Model fitting is
//! delegated to the linfa family of crates; the logic here is the
//! orchestration around them: draw class-balanced subsamples, train and
//! cross-validate per round, and aggregate per-round metrics into reports.
pub mod aggregate;
pub mod compare;
pub mod config;
pub mod cross_validation;
pub mod error;
pub mod frame;
pub mod grid_search;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod report;
pub mod sampling;
pub mod selection;
pub mod trainer;
