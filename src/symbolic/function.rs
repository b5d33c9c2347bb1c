//! Named symbolic functions

use std::collections::{HashMap, HashSet};

use nalgebra::DMatrix;

use crate::symbolic::errors::SymbolicError;
use crate::symbolic::expr::{free_symbols, topological_order, Node};
use crate::symbolic::matrix::{MatrixKind, SymMatrix};

/// An immutable mapping from symbolic inputs to output expressions
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    kind: MatrixKind,
    inputs: Vec<SymMatrix>,
    outputs: Vec<SymMatrix>,
}

impl Function {
    /// Create a function
    ///
    /// Every input must consist of symbols only, no symbol may appear in two
    /// inputs, and the outputs may only depend on input symbols.
    pub fn new(
        name: impl Into<String>,
        inputs: &[&SymMatrix],
        outputs: &[&SymMatrix],
    ) -> Result<Self, SymbolicError> {
        let name = name.into();
        let kind = MatrixKind::combine_all(
            "Function",
            inputs.iter().chain(outputs).map(|m| m.kind()),
        )?;

        let mut known = HashSet::new();
        for (i, input) in inputs.iter().enumerate() {
            if !input.is_symbolic() {
                return Err(SymbolicError::not_symbolic(format!(
                    "Input {} of function '{}'",
                    i, name
                )));
            }
            for s in input.elements() {
                if let Some(id) = s.symbol_id() {
                    if !known.insert(id) {
                        return Err(SymbolicError::DuplicateInput {
                            function: name,
                            symbol: s.to_string(),
                        });
                    }
                }
            }
        }

        let all_outputs: Vec<_> = outputs
            .iter()
            .flat_map(|m| m.elements().iter().cloned())
            .collect();
        let free: Vec<String> = free_symbols(&all_outputs)
            .iter()
            .filter(|s| s.symbol_id().is_some_and(|id| !known.contains(&id)))
            .map(|s| s.to_string())
            .collect();
        if !free.is_empty() {
            return Err(SymbolicError::FreeSymbols {
                function: name,
                symbols: free,
            });
        }

        Ok(Self {
            name,
            kind,
            inputs: inputs.iter().map(|m| (*m).clone()).collect(),
            outputs: outputs.iter().map(|m| (*m).clone()).collect(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    pub fn n_in(&self) -> usize {
        self.inputs.len()
    }

    pub fn n_out(&self) -> usize {
        self.outputs.len()
    }

    pub fn inputs(&self) -> &[SymMatrix] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[SymMatrix] {
        &self.outputs
    }

    /// Name of input `i` (`i0`, `i1`, ...)
    pub fn name_in(i: usize) -> String {
        format!("i{}", i)
    }

    /// Name of output `i` (`o0`, `o1`, ...)
    pub fn name_out(i: usize) -> String {
        format!("o{}", i)
    }

    /// Evaluate numerically. Each argument must match the shape of its input.
    pub fn call(&self, args: &[DMatrix<f64>]) -> Result<Vec<DMatrix<f64>>, SymbolicError> {
        if args.len() != self.inputs.len() {
            return Err(SymbolicError::InvalidArguments {
                function: self.name.clone(),
                expected: format!("{} arguments", self.inputs.len()),
                actual: format!("{} arguments", args.len()),
            });
        }

        let mut values: HashMap<usize, f64> = HashMap::new();
        for (i, (input, arg)) in self.inputs.iter().zip(args).enumerate() {
            let arg_shape = (arg.nrows(), arg.ncols());
            if input.size() != arg_shape && input.numel() != arg.len() {
                return Err(SymbolicError::InvalidArguments {
                    function: self.name.clone(),
                    expected: format!("{:?} for {}", input.size(), Self::name_in(i)),
                    actual: format!("{:?}", arg_shape),
                });
            }
            for (s, v) in input.elements().iter().zip(arg.iter()) {
                if let Some(id) = s.symbol_id() {
                    values.insert(id, *v);
                }
            }
        }

        let roots: Vec<_> = self
            .outputs
            .iter()
            .flat_map(|m| m.elements().iter().cloned())
            .collect();
        let mut cache: HashMap<usize, f64> = HashMap::new();
        for node in topological_order(&roots) {
            let v = match node.node() {
                Node::Const(c) => *c,
                Node::Symbol { id, .. } => values.get(id).copied().unwrap_or(f64::NAN),
                Node::Unary(op, a) => op.apply(cache[&a.key()]),
                Node::Binary(op, a, b) => op.apply(cache[&a.key()], cache[&b.key()]),
            };
            cache.insert(node.key(), v);
        }

        Ok(self
            .outputs
            .iter()
            .map(|m| {
                DMatrix::from_iterator(
                    m.rows(),
                    m.cols(),
                    m.elements().iter().map(|e| cache[&e.key()]),
                )
            })
            .collect())
    }
}
