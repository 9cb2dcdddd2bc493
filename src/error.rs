//! Error types for model construction, solving and solution extraction.

use thiserror::Error;

use crate::model::SolutionStatus;

/// The blend configuration (catalog or targets) is internally inconsistent. Always raised before
/// any solver is touched.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("invalid window for {what}: min {min} > max {max}")]
    InvalidWindow { what : String, min : f64, max : f64 },

    #[error("{what} must be non-negative, got {value}")]
    NegativeValue { what : String, value : f64 },

    #[error("{what} must be finite, got {value}")]
    NonFinite { what : String, value : f64 },

    #[error("max_distinct_ingredients must be non-negative, got {0}")]
    NegativeCardinality(i64),

    #[error("duplicate ingredient '{0}'")]
    DuplicateIngredient(String),

    #[error("unknown ingredient '{0}'")]
    UnknownIngredient(String),

    #[error("unknown solver backend '{0}'")]
    UnknownBackend(String),

    #[error("minimum share for '{name}' must lie in [0,1], got {share}")]
    InvalidShare { name : String, share : f64 },

    #[error("failed to read blend file: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse blend file: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("model construction failed: {0}")]
    Model(#[from] ModelError),
}

/// Misuse of the modeling layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("variable index {index} out of bounds for a model with {numvar} variables")]
    IndexOutOfBounds { index : usize, numvar : usize },

    #[error("mismatching sizes: expression has {expr} elements, domain has {domain}")]
    SizeMismatch { expr : usize, domain : usize },

    #[error("objective must be a scalar expression, got {0} elements")]
    NonScalarObjective(usize),

    #[error("invalid bounds [{lower},{upper}]")]
    InvalidBounds { lower : f64, upper : f64 },

    #[error("solution is not available (status {0:?})")]
    NoSolution(SolutionStatus),
}

/// Failure reported by, or while talking to, a solver backend.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("backend failure: {0}")]
    Native(String),

    #[error("backend panicked: {0}")]
    Panicked(String),
}

/// A solution snapshot could not be produced.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("model has no optimal solution (status {0:?})")]
    NotOptimal(SolutionStatus),

    #[error("total mixture size is zero, property values are undefined")]
    DegenerateMixture,

    #[error(transparent)]
    Model(#[from] ModelError),
}
