//! Symbolic expressions, algorithmic differentiation and C code emission
//!
//! The sensitivity pipeline only talks to a symbolic backend through the
//! [`SymbolicEngine`] trait. [`SxEngine`] is the backend shipped with this
//! crate: a dense scalar expression graph with forward and reverse mode
//! directional derivatives and a C code generator.
//!
//! # Example
//!
//! ```ignore
//! use odesens::symbolic::{AdMode, Representation, SxEngine, SymbolicEngine};
//!
//! let engine = SxEngine::new();
//! let x = engine.sym(Representation::Sx, "x", 2, 1)?;
//! let f = engine.parse_column(Representation::Sx, &["x_1", "-sin(x_0)"], &[&x])?;
//! let seed = engine.sym(Representation::Sx, "v", 2, 1)?;
//! let jv = engine.jtimes(&f, &x, &seed, AdMode::Forward)?;
//! ```

pub mod ad;
pub mod codegen;
mod engine;
mod errors;
pub mod expr;
pub mod function;
pub mod matrix;
pub mod parser;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use codegen::{CodegenOptions, FloatWidth, GeneratedSource, IntegerWidth, InteropTarget};
pub use engine::{SxEngine, ENGINE_VERSION};
pub use errors::SymbolicError;
pub use expr::Sx;
pub use function::Function;
pub use matrix::{MatrixKind, SymMatrix};

/// The two symbolic graph representations an engine may offer
///
/// Every symbol introduced while processing a model must use the
/// representation of the model's right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    /// Scalar expression graph
    #[serde(rename = "SX")]
    Sx,
    /// Matrix expression graph
    #[serde(rename = "MX")]
    Mx,
}

impl Representation {
    /// Names of the accepted representations
    pub const ACCEPTED: [&'static str; 2] = ["SX", "MX"];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sx => "SX",
            Self::Mx => "MX",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SX" => Some(Self::Sx),
            "MX" => Some(Self::Mx),
            _ => None,
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Direction of a directional derivative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdMode {
    /// Jacobian times seed, `J * v`
    Forward,
    /// Transposed Jacobian times seed, `J^T * v`
    Reverse,
}

/// Capabilities the sensitivity pipeline needs from a symbolic backend
pub trait SymbolicEngine {
    /// Matrix-valued symbolic expression
    type Matrix: Clone + fmt::Debug;
    /// Named function from symbolic inputs to symbolic outputs
    type Function;

    /// Version reported to the compatibility gate
    fn version(&self) -> &str;

    /// Representation of `m`, `None` if it is not a symbolic expression
    fn representation(&self, m: &Self::Matrix) -> Option<Representation>;

    /// Human readable name of the kind of `m`
    fn kind_name(&self, m: &Self::Matrix) -> String;

    fn size(&self, m: &Self::Matrix) -> (usize, usize);

    /// Fresh symbols
    fn sym(
        &self,
        repr: Representation,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<Self::Matrix, SymbolicError>;

    fn zeros(&self, repr: Representation, rows: usize, cols: usize) -> Self::Matrix;

    fn eye(&self, repr: Representation, n: usize) -> Self::Matrix;

    fn add(&self, a: &Self::Matrix, b: &Self::Matrix) -> Result<Self::Matrix, SymbolicError>;

    fn mtimes(&self, a: &Self::Matrix, b: &Self::Matrix)
        -> Result<Self::Matrix, SymbolicError>;

    fn transpose(&self, m: &Self::Matrix) -> Self::Matrix;

    fn horzcat(&self, parts: &[&Self::Matrix]) -> Result<Self::Matrix, SymbolicError>;

    fn vertcat(&self, parts: &[&Self::Matrix]) -> Result<Self::Matrix, SymbolicError>;

    /// The `1x1` element at `(row, col)`
    fn element(
        &self,
        m: &Self::Matrix,
        row: usize,
        col: usize,
    ) -> Result<Self::Matrix, SymbolicError>;

    /// Jacobian of `expr` with respect to the symbols in `arg`
    fn jacobian(
        &self,
        expr: &Self::Matrix,
        arg: &Self::Matrix,
    ) -> Result<Self::Matrix, SymbolicError>;

    /// Directional derivative of `expr` with respect to `arg` along `seed`
    fn jtimes(
        &self,
        expr: &Self::Matrix,
        arg: &Self::Matrix,
        seed: &Self::Matrix,
        mode: AdMode,
    ) -> Result<Self::Matrix, SymbolicError>;

    fn function(
        &self,
        name: &str,
        inputs: &[&Self::Matrix],
        outputs: &[&Self::Matrix],
    ) -> Result<Self::Function, SymbolicError>;

    fn function_name<'f>(&self, f: &'f Self::Function) -> &'f str;

    /// Generate source code for `f`
    fn generate(
        &self,
        f: &Self::Function,
        options: &CodegenOptions,
    ) -> Result<GeneratedSource, SymbolicError>;
}
