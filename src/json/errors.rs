//! Error types for JSON model descriptions

use thiserror::Error;

use crate::symbolic::SymbolicError;

/// Errors that can occur when working with JSON models
#[derive(Debug, Error)]
pub enum JsonModelError {
    // ─────────────────────────────────────────────────────────────────────────
    // Parsing Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Failed to parse JSON
    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Unsupported schema version
    #[error("Unsupported schema version '{version}'. Supported versions: {supported}")]
    UnsupportedSchema { version: String, supported: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Structural Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// The model has no states
    #[error("Model must declare at least one state in 'x'")]
    MissingStates,

    /// Model name is not usable as a C identifier
    #[error("Invalid model name '{0}': expected a non-empty identifier")]
    InvalidName(String),

    /// Symbol name is not an identifier
    #[error("Invalid symbol name '{name}' in '{field}'")]
    InvalidSymbolName { name: String, field: String },

    /// The same symbol name is declared twice
    #[error("Duplicate symbol name: '{name}'")]
    DuplicateSymbol { name: String },

    /// A control or parameter is not referenced by any expression
    #[error("Symbol '{name}' declared in '{field}' is not used in 'f_expl'")]
    UnusedSymbol { name: String, field: String },

    /// Number of right-hand side expressions differs from the number of states
    #[error("'f_expl' has {actual} expression(s) but 'x' declares {expected} state(s)")]
    LengthMismatch { expected: usize, actual: usize },

    // ─────────────────────────────────────────────────────────────────────────
    // Expression Errors
    // ─────────────────────────────────────────────────────────────────────────
    /// Empty expression
    #[error("Empty expression in {context}")]
    EmptyExpression { context: String },

    /// Invalid expression syntax or reference to an unknown symbol
    #[error("Invalid expression in {context}: {source}")]
    InvalidExpression {
        context: String,
        #[source]
        source: SymbolicError,
    },
}

impl JsonModelError {
    /// Create an invalid symbol name error
    pub fn invalid_symbol(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidSymbolName {
            name: name.into(),
            field: field.into(),
        }
    }

    /// Create an invalid expression error
    pub fn invalid_expr(context: impl Into<String>, source: SymbolicError) -> Self {
        Self::InvalidExpression {
            context: context.into(),
            source,
        }
    }
}
