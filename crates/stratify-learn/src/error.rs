use std::error::Error;
use std::fmt;

/// Typed failures for the pipeline's own taxonomy. Unsupported names and
/// degenerate inputs surface here instead of falling through silently.
#[derive(Debug)]
pub enum PipelineError {
    /// A method or algorithm name outside the supported set.
    UnsupportedName { kind: &'static str, name: String },
    /// The input table is structurally unusable (missing columns, duplicate
    /// identifiers, no rows after filtering).
    MalformedTable(String),
    /// A class distribution that cannot support the requested operation,
    /// e.g. a class smaller than the balanced sample size.
    DegenerateClasses(String),
    /// A feature handed to Fisher's exact test that is not strictly 0/1.
    NonBinaryFeature { feature: String },
    /// A metric asked for on an empty or single-class score set.
    EmptyMetricInput(&'static str),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::UnsupportedName { kind, name } => {
                write!(f, "Unsupported {}: '{}'", kind, name)
            }
            PipelineError::MalformedTable(msg) => write!(f, "Malformed input table: {}", msg),
            PipelineError::DegenerateClasses(msg) => {
                write!(f, "Degenerate class distribution: {}", msg)
            }
            PipelineError::NonBinaryFeature { feature } => write!(
                f,
                "Feature '{}' is not binary; Fisher's exact enrichment requires 0/1 features",
                feature
            ),
            PipelineError::EmptyMetricInput(what) => {
                write!(f, "Cannot compute {} on empty or single-class input", what)
            }
        }
    }
}

impl Error for PipelineError {}
