//! Errors raised by the symbolic engine

use thiserror::Error;

use crate::symbolic::matrix::MatrixKind;

/// Errors that can occur while building, differentiating or emitting symbolic expressions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SymbolicError {
    /// Operand shapes are incompatible for the requested operation
    #[error("Dimension mismatch in {op}: {lhs:?} vs {rhs:?}")]
    DimensionMismatch {
        op: &'static str,
        lhs: (usize, usize),
        rhs: (usize, usize),
    },

    /// Operands were built with different symbolic representations
    #[error("Cannot combine {lhs} and {rhs} expressions in {op}")]
    RepresentationMismatch {
        op: &'static str,
        lhs: MatrixKind,
        rhs: MatrixKind,
    },

    /// An argument that must consist of symbols only contains other expressions
    #[error("{context} must be purely symbolic")]
    NotSymbolic { context: String },

    /// Element access outside of the matrix
    #[error("Index ({row}, {col}) out of bounds for a {rows}x{cols} matrix")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Outputs of a function depend on symbols that are not among its inputs
    #[error("Function '{function}' has free symbols: {symbols:?}")]
    FreeSymbols {
        function: String,
        symbols: Vec<String>,
    },

    /// The same symbol appears in more than one function input
    #[error("Function '{function}' lists symbol '{symbol}' more than once in its inputs")]
    DuplicateInput { function: String, symbol: String },

    /// Numeric evaluation received the wrong number or shape of arguments
    #[error("Function '{function}' expects {expected}, got {actual}")]
    InvalidArguments {
        function: String,
        expected: String,
        actual: String,
    },

    /// Invalid expression syntax
    #[error("Failed to parse '{source_text}' at position {pos}: {message}")]
    Parse {
        source_text: String,
        pos: usize,
        message: String,
    },

    /// Identifier that is neither a known symbol nor a supported function
    #[error("Undefined symbol '{name}'")]
    UndefinedSymbol { name: String },

    /// Code generation options that cannot be honoured together
    #[error("Invalid code generation options: {reason}")]
    InvalidCodegenOptions { reason: String },

    /// Function call with an unknown name or wrong arity
    #[error("Unsupported function call '{name}' with {arity} argument(s)")]
    UnsupportedFunction { name: String, arity: usize },
}

impl SymbolicError {
    pub(crate) fn dims(op: &'static str, lhs: (usize, usize), rhs: (usize, usize)) -> Self {
        Self::DimensionMismatch { op, lhs, rhs }
    }

    pub(crate) fn not_symbolic(context: impl Into<String>) -> Self {
        Self::NotSymbolic {
            context: context.into(),
        }
    }
}
