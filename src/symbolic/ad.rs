//! Forward and reverse mode algorithmic differentiation on the expression graph
//!
//! Both modes work on directional derivatives only. Forward mode pushes one
//! tangent per seed column from the inputs to the outputs, reverse mode pulls
//! one adjoint per seed column from the outputs back to the inputs. Full
//! Jacobians are assembled from unit seeds.

use std::collections::HashMap;

use crate::symbolic::errors::SymbolicError;
use crate::symbolic::expr::{topological_order, BinaryOp, Node, Sx, UnaryOp};
use crate::symbolic::matrix::{MatrixKind, SymMatrix};

/// Partial derivative of `node` with respect to its `which`-th argument
fn partial(node: &Sx, which: usize) -> Sx {
    match node.node() {
        Node::Unary(op, a) => match op {
            UnaryOp::Neg => Sx::constant(-1.0),
            UnaryOp::Sin => a.cos(),
            UnaryOp::Cos => -a.sin(),
            UnaryOp::Tan => {
                let c = a.cos();
                &Sx::one() / &(&c * &c)
            }
            UnaryOp::Asin => &Sx::one() / &(&Sx::one() - &(a * a)).sqrt(),
            UnaryOp::Acos => -(&Sx::one() / &(&Sx::one() - &(a * a)).sqrt()),
            UnaryOp::Atan => &Sx::one() / &(&Sx::one() + &(a * a)),
            UnaryOp::Sinh => Sx::unary(UnaryOp::Cosh, a),
            UnaryOp::Cosh => Sx::unary(UnaryOp::Sinh, a),
            UnaryOp::Tanh => &Sx::one() - &(node * node),
            UnaryOp::Exp => node.clone(),
            UnaryOp::Log => &Sx::one() / a,
            UnaryOp::Sqrt => &Sx::constant(0.5) / node,
        },
        Node::Binary(op, a, b) => match (op, which) {
            (BinaryOp::Add, _) => Sx::one(),
            (BinaryOp::Sub, 0) => Sx::one(),
            (BinaryOp::Sub, _) => Sx::constant(-1.0),
            (BinaryOp::Mul, 0) => b.clone(),
            (BinaryOp::Mul, _) => a.clone(),
            (BinaryOp::Div, 0) => &Sx::one() / b,
            (BinaryOp::Div, _) => -(node / b),
            (BinaryOp::Pow, 0) => b * &a.pow(&(b - 1.0)),
            (BinaryOp::Pow, _) => node * &a.log(),
        },
        Node::Const(_) | Node::Symbol { .. } => Sx::zero(),
    }
}

fn arguments(node: &Sx) -> Vec<&Sx> {
    match node.node() {
        Node::Unary(_, a) => vec![a],
        Node::Binary(_, a, b) => vec![a, b],
        Node::Const(_) | Node::Symbol { .. } => Vec::new(),
    }
}

/// Symbol ids of a purely symbolic argument, in column-major order
fn argument_ids(arg: &SymMatrix, op: &str) -> Result<Vec<usize>, SymbolicError> {
    arg.elements()
        .iter()
        .map(|e| {
            e.symbol_id().ok_or_else(|| {
                SymbolicError::not_symbolic(format!("Differentiation argument of {}", op))
            })
        })
        .collect()
}

/// Push one tangent direction through `order`
fn forward_sweep(order: &[Sx], outputs: &[Sx], seeds: &HashMap<usize, Sx>) -> Vec<Sx> {
    let mut dot: HashMap<usize, Sx> = HashMap::with_capacity(order.len());
    for node in order {
        let tangent = match node.node() {
            Node::Const(_) => Sx::zero(),
            Node::Symbol { id, .. } => seeds.get(id).cloned().unwrap_or_else(Sx::zero),
            Node::Unary(..) | Node::Binary(..) => {
                let mut acc = Sx::zero();
                for (which, arg) in arguments(node).into_iter().enumerate() {
                    let arg_dot = &dot[&arg.key()];
                    if !arg_dot.is_zero() {
                        acc = &acc + &(&partial(node, which) * arg_dot);
                    }
                }
                acc
            }
        };
        dot.insert(node.key(), tangent);
    }
    outputs.iter().map(|o| dot[&o.key()].clone()).collect()
}

/// Pull one adjoint direction back through `order`, returning adjoints per symbol id
fn reverse_sweep(order: &[Sx], outputs: &[Sx], seed: &[Sx]) -> HashMap<usize, Sx> {
    let mut bar: HashMap<usize, Sx> = HashMap::new();
    for (out, s) in outputs.iter().zip(seed) {
        if s.is_zero() {
            continue;
        }
        let entry = bar.entry(out.key()).or_insert_with(Sx::zero);
        *entry = &*entry + s;
    }

    let mut symbol_bar: HashMap<usize, Sx> = HashMap::new();
    for node in order.iter().rev() {
        let Some(node_bar) = bar.get(&node.key()).cloned() else {
            continue;
        };
        if node_bar.is_zero() {
            continue;
        }
        match node.node() {
            Node::Const(_) => {}
            Node::Symbol { id, .. } => {
                let entry = symbol_bar.entry(*id).or_insert_with(Sx::zero);
                *entry = &*entry + &node_bar;
            }
            Node::Unary(..) | Node::Binary(..) => {
                for (which, arg) in arguments(node).into_iter().enumerate() {
                    let contribution = &node_bar * &partial(node, which);
                    let entry = bar.entry(arg.key()).or_insert_with(Sx::zero);
                    *entry = &*entry + &contribution;
                }
            }
        }
    }
    symbol_bar
}

/// Forward directional derivative `J * seed`, where `J` is the Jacobian of
/// `expr` (flattened column-major) with respect to `arg`
pub fn jtimes_forward(
    expr: &SymMatrix,
    arg: &SymMatrix,
    seed: &SymMatrix,
) -> Result<SymMatrix, SymbolicError> {
    let kind = MatrixKind::combine_all("jtimes", [expr.kind(), arg.kind(), seed.kind()])?;
    if seed.rows() != arg.numel() {
        return Err(SymbolicError::dims(
            "jtimes",
            (arg.numel(), 1),
            seed.size(),
        ));
    }
    let ids = argument_ids(arg, "jtimes")?;
    let outputs = expr.elements();
    let order = topological_order(outputs);

    let mut data = Vec::with_capacity(outputs.len() * seed.cols());
    for j in 0..seed.cols() {
        let seeds: HashMap<usize, Sx> = ids
            .iter()
            .copied()
            .zip(seed.column_elements(j).iter().cloned())
            .collect();
        data.extend(forward_sweep(&order, outputs, &seeds));
    }
    SymMatrix::from_elements(kind, outputs.len(), seed.cols(), data)
}

/// Reverse directional derivative `J^T * seed`
pub fn jtimes_reverse(
    expr: &SymMatrix,
    arg: &SymMatrix,
    seed: &SymMatrix,
) -> Result<SymMatrix, SymbolicError> {
    let kind = MatrixKind::combine_all("jtimes", [expr.kind(), arg.kind(), seed.kind()])?;
    if seed.rows() != expr.numel() {
        return Err(SymbolicError::dims(
            "jtimes",
            (expr.numel(), 1),
            seed.size(),
        ));
    }
    let ids = argument_ids(arg, "jtimes")?;
    let outputs = expr.elements();
    let order = topological_order(outputs);

    let mut data = Vec::with_capacity(ids.len() * seed.cols());
    for j in 0..seed.cols() {
        let symbol_bar = reverse_sweep(&order, outputs, seed.column_elements(j));
        data.extend(
            ids.iter()
                .map(|id| symbol_bar.get(id).cloned().unwrap_or_else(Sx::zero)),
        );
    }
    SymMatrix::from_elements(kind, ids.len(), seed.cols(), data)
}

/// Full Jacobian of `expr` (flattened) with respect to `arg`
pub fn jacobian(expr: &SymMatrix, arg: &SymMatrix) -> Result<SymMatrix, SymbolicError> {
    let unit = SymMatrix::eye(MatrixKind::Dm, arg.numel());
    jtimes_forward(expr, arg, &unit)
}
