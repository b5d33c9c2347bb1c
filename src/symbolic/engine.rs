use std::collections::HashMap;

use crate::symbolic::ad;
use crate::symbolic::codegen::{self, CodegenOptions, GeneratedSource};
use crate::symbolic::errors::SymbolicError;
use crate::symbolic::expr::Sx;
use crate::symbolic::function::Function;
use crate::symbolic::matrix::SymMatrix;
use crate::symbolic::parser::parse_expression;
use crate::symbolic::{AdMode, Representation, SymbolicEngine};

/// Version of the built-in engine
pub const ENGINE_VERSION: &str = "1.0.0";

/// The built-in symbolic engine
#[derive(Debug, Clone, Default)]
pub struct SxEngine;

impl SxEngine {
    pub fn new() -> Self {
        Self
    }

    /// Table of the symbols in `vars`, keyed by symbol name
    pub fn symbol_table(vars: &[&SymMatrix]) -> HashMap<String, Sx> {
        vars.iter()
            .flat_map(|m| m.elements().iter())
            .filter_map(|s| s.symbol_name().map(|name| (name.to_string(), s.clone())))
            .collect()
    }

    /// Parse one expression per row into a column vector
    pub fn parse_column(
        &self,
        repr: Representation,
        exprs: &[impl AsRef<str>],
        vars: &[&SymMatrix],
    ) -> Result<SymMatrix, SymbolicError> {
        let table = Self::symbol_table(vars);
        let elements = exprs
            .iter()
            .map(|e| parse_expression(e.as_ref(), &table))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SymMatrix::column(repr.into(), elements))
    }

    /// Column vector of individually named symbols
    pub fn named_symbols(&self, repr: Representation, names: &[impl AsRef<str>]) -> SymMatrix {
        SymMatrix::column(
            repr.into(),
            names.iter().map(|n| Sx::symbol(n.as_ref())).collect(),
        )
    }
}

impl SymbolicEngine for SxEngine {
    type Matrix = SymMatrix;
    type Function = Function;

    fn version(&self) -> &str {
        ENGINE_VERSION
    }

    fn representation(&self, m: &SymMatrix) -> Option<Representation> {
        m.kind().representation()
    }

    fn kind_name(&self, m: &SymMatrix) -> String {
        m.kind().to_string()
    }

    fn size(&self, m: &SymMatrix) -> (usize, usize) {
        m.size()
    }

    fn sym(
        &self,
        repr: Representation,
        name: &str,
        rows: usize,
        cols: usize,
    ) -> Result<SymMatrix, SymbolicError> {
        Ok(SymMatrix::sym(repr.into(), name, rows, cols))
    }

    fn zeros(&self, repr: Representation, rows: usize, cols: usize) -> SymMatrix {
        SymMatrix::zeros(repr.into(), rows, cols)
    }

    fn eye(&self, repr: Representation, n: usize) -> SymMatrix {
        SymMatrix::eye(repr.into(), n)
    }

    fn add(&self, a: &SymMatrix, b: &SymMatrix) -> Result<SymMatrix, SymbolicError> {
        a.add(b)
    }

    fn mtimes(&self, a: &SymMatrix, b: &SymMatrix) -> Result<SymMatrix, SymbolicError> {
        a.mtimes(b)
    }

    fn transpose(&self, m: &SymMatrix) -> SymMatrix {
        m.transpose()
    }

    fn horzcat(&self, parts: &[&SymMatrix]) -> Result<SymMatrix, SymbolicError> {
        SymMatrix::horzcat(parts)
    }

    fn vertcat(&self, parts: &[&SymMatrix]) -> Result<SymMatrix, SymbolicError> {
        SymMatrix::vertcat(parts)
    }

    fn element(&self, m: &SymMatrix, row: usize, col: usize) -> Result<SymMatrix, SymbolicError> {
        let e = m.get(row, col)?.clone();
        Ok(SymMatrix::column(m.kind(), vec![e]))
    }

    fn jacobian(&self, expr: &SymMatrix, arg: &SymMatrix) -> Result<SymMatrix, SymbolicError> {
        ad::jacobian(expr, arg)
    }

    fn jtimes(
        &self,
        expr: &SymMatrix,
        arg: &SymMatrix,
        seed: &SymMatrix,
        mode: AdMode,
    ) -> Result<SymMatrix, SymbolicError> {
        match mode {
            AdMode::Forward => ad::jtimes_forward(expr, arg, seed),
            AdMode::Reverse => ad::jtimes_reverse(expr, arg, seed),
        }
    }

    fn function(
        &self,
        name: &str,
        inputs: &[&SymMatrix],
        outputs: &[&SymMatrix],
    ) -> Result<Function, SymbolicError> {
        Function::new(name, inputs, outputs)
    }

    fn function_name<'f>(&self, f: &'f Function) -> &'f str {
        f.name()
    }

    fn generate(
        &self,
        f: &Function,
        options: &CodegenOptions,
    ) -> Result<GeneratedSource, SymbolicError> {
        codegen::generate(f, options)
    }
}
