//! Library surface of the stratify CLI: subcommand configs and runners.
pub mod classify;
pub mod compare;
pub mod select;
pub mod util;
