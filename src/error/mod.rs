use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::json::JsonModelError;
use crate::symbolic::SymbolicError;

/// Errors raised while generating sensitivity code for an explicit ODE model
///
/// Every variant is fatal for the invocation that raised it. Files written
/// before a failure are left on disk.
#[derive(Error, Debug)]
pub enum OdeGenError {
    /// The symbolic engine version is not known to be compatible
    #[error(
        "Please install symbolic engine version {} to ensure compatibility. Version {detected} currently in use.",
        allowed.join(" or ")
    )]
    IncompatibleEngineVersion {
        detected: String,
        allowed: Vec<String>,
    },

    /// The model name cannot be used as a C identifier prefix
    #[error("Invalid model name '{0}': expected a non-empty identifier")]
    InvalidModelName(String),

    /// Parameters were given as a non-empty plain collection
    #[error(
        "p is a non-empty collection of {len} element(s). It should be either an empty collection or a symbolic vector."
    )]
    InvalidParameterSpec { len: usize },

    /// The right-hand side is not a symbolic expression of a supported representation
    #[error("Invalid type for f_expl: {found}. Possible types are {}.", accepted.join(" and "))]
    UnsupportedExpressionType { found: String, accepted: Vec<String> },

    /// Inconsistent dimensions or representations reported by the symbolic engine
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(#[from] SymbolicError),

    /// The engine could not generate code for a function
    #[error("Code generation failed: {0}")]
    Codegen(SymbolicError),

    /// Directory creation or file write failed
    #[error("Failed to write generated code to {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Invalid JSON model description
    #[error("Error in the JSON model: {0}")]
    Json(#[from] JsonModelError),
}

impl OdeGenError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}
