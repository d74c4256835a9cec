//! Plot rendering for the optional `--plots` outputs.
pub mod plots;
