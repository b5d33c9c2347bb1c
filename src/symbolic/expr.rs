//! Scalar expression graph
//!
//! Every scalar is a reference-counted node in a directed acyclic graph. Nodes
//! are immutable once built, so subexpressions can be shared freely between
//! matrices, derivatives and generated functions. Construction goes through
//! [`Sx::unary`] and [`Sx::binary`], which fold constants and drop trivial
//! operations (`0 * a`, `a + 0`, `1 * a`, ...) so that derivative expressions
//! do not fill up with dead terms.

use std::collections::HashSet;
use std::fmt;
use std::ops;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_SYMBOL_ID: AtomicUsize = AtomicUsize::new(0);

/// Elementary functions of one argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Log,
    Sqrt,
}

impl UnaryOp {
    /// All functions that can be called by name from expression strings
    pub const CALLABLE: [UnaryOp; 12] = [
        UnaryOp::Sin,
        UnaryOp::Cos,
        UnaryOp::Tan,
        UnaryOp::Asin,
        UnaryOp::Acos,
        UnaryOp::Atan,
        UnaryOp::Sinh,
        UnaryOp::Cosh,
        UnaryOp::Tanh,
        UnaryOp::Exp,
        UnaryOp::Log,
        UnaryOp::Sqrt,
    ];

    /// Name of the C math library function (`neg` for negation)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Neg => "neg",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Exp => "exp",
            Self::Log => "log",
            Self::Sqrt => "sqrt",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::CALLABLE.iter().copied().find(|op| op.name() == name)
    }

    pub fn apply(&self, v: f64) -> f64 {
        match self {
            Self::Neg => -v,
            Self::Sin => v.sin(),
            Self::Cos => v.cos(),
            Self::Tan => v.tan(),
            Self::Asin => v.asin(),
            Self::Acos => v.acos(),
            Self::Atan => v.atan(),
            Self::Sinh => v.sinh(),
            Self::Cosh => v.cosh(),
            Self::Tanh => v.tanh(),
            Self::Exp => v.exp(),
            Self::Log => v.ln(),
            Self::Sqrt => v.sqrt(),
        }
    }
}

/// Arithmetic operations of two arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn apply(&self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Pow => a.powf(b),
        }
    }

    /// Infix operator symbol, `None` for operations emitted as calls
    pub fn infix(&self) -> Option<char> {
        match self {
            Self::Add => Some('+'),
            Self::Sub => Some('-'),
            Self::Mul => Some('*'),
            Self::Div => Some('/'),
            Self::Pow => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Node {
    Const(f64),
    Symbol { id: usize, name: String },
    Unary(UnaryOp, Sx),
    Binary(BinaryOp, Sx, Sx),
}

/// A scalar symbolic expression
#[derive(Clone)]
pub struct Sx(Arc<Node>);

impl Sx {
    fn from_node(node: Node) -> Self {
        Self(Arc::new(node))
    }

    pub fn constant(value: f64) -> Self {
        Self::from_node(Node::Const(value))
    }

    pub fn zero() -> Self {
        Self::constant(0.0)
    }

    pub fn one() -> Self {
        Self::constant(1.0)
    }

    /// Create a fresh symbol. Two calls with the same name yield distinct symbols.
    pub fn symbol(name: impl Into<String>) -> Self {
        let id = NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed);
        Self::from_node(Node::Symbol {
            id,
            name: name.into(),
        })
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    /// Identity of the underlying node, stable for the lifetime of the expression
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self.node() {
            Node::Const(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_constant() == Some(0.0)
    }

    pub fn is_one(&self) -> bool {
        self.as_constant() == Some(1.0)
    }

    fn is_minus_one(&self) -> bool {
        self.as_constant() == Some(-1.0)
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self.node(), Node::Symbol { .. })
    }

    pub fn symbol_id(&self) -> Option<usize> {
        match self.node() {
            Node::Symbol { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn symbol_name(&self) -> Option<&str> {
        match self.node() {
            Node::Symbol { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Structural identity: same node, same symbol or equal constants
    pub fn is_same(&self, other: &Sx) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (self.node(), other.node()) {
            (Node::Const(a), Node::Const(b)) => a == b,
            (Node::Symbol { id: a, .. }, Node::Symbol { id: b, .. }) => a == b,
            _ => false,
        }
    }

    pub fn unary(op: UnaryOp, arg: &Sx) -> Sx {
        if let Some(v) = arg.as_constant() {
            let folded = op.apply(v);
            if folded.is_finite() {
                return Sx::constant(folded);
            }
        }
        if op == UnaryOp::Neg {
            if let Node::Unary(UnaryOp::Neg, inner) = arg.node() {
                return inner.clone();
            }
        }
        Sx::from_node(Node::Unary(op, arg.clone()))
    }

    pub fn binary(op: BinaryOp, lhs: &Sx, rhs: &Sx) -> Sx {
        if let (Some(a), Some(b)) = (lhs.as_constant(), rhs.as_constant()) {
            let folded = op.apply(a, b);
            if folded.is_finite() {
                return Sx::constant(folded);
            }
        }
        match op {
            BinaryOp::Add => {
                if lhs.is_zero() {
                    return rhs.clone();
                }
                if rhs.is_zero() {
                    return lhs.clone();
                }
            }
            BinaryOp::Sub => {
                if rhs.is_zero() {
                    return lhs.clone();
                }
                if lhs.is_zero() {
                    return Sx::unary(UnaryOp::Neg, rhs);
                }
                if lhs.is_same(rhs) {
                    return Sx::zero();
                }
            }
            BinaryOp::Mul => {
                if lhs.is_zero() || rhs.is_zero() {
                    return Sx::zero();
                }
                if lhs.is_one() {
                    return rhs.clone();
                }
                if rhs.is_one() {
                    return lhs.clone();
                }
                if lhs.is_minus_one() {
                    return Sx::unary(UnaryOp::Neg, rhs);
                }
                if rhs.is_minus_one() {
                    return Sx::unary(UnaryOp::Neg, lhs);
                }
            }
            BinaryOp::Div => {
                if lhs.is_zero() {
                    return Sx::zero();
                }
                if rhs.is_one() {
                    return lhs.clone();
                }
            }
            BinaryOp::Pow => {
                if rhs.is_zero() {
                    return Sx::one();
                }
                if rhs.is_one() {
                    return lhs.clone();
                }
            }
        }
        Sx::from_node(Node::Binary(op, lhs.clone(), rhs.clone()))
    }

    pub fn pow(&self, exponent: &Sx) -> Sx {
        Sx::binary(BinaryOp::Pow, self, exponent)
    }

    pub fn sin(&self) -> Sx {
        Sx::unary(UnaryOp::Sin, self)
    }

    pub fn cos(&self) -> Sx {
        Sx::unary(UnaryOp::Cos, self)
    }

    pub fn exp(&self) -> Sx {
        Sx::unary(UnaryOp::Exp, self)
    }

    pub fn log(&self) -> Sx {
        Sx::unary(UnaryOp::Log, self)
    }

    pub fn sqrt(&self) -> Sx {
        Sx::unary(UnaryOp::Sqrt, self)
    }

    pub fn tanh(&self) -> Sx {
        Sx::unary(UnaryOp::Tanh, self)
    }
}

/// Nodes reachable from `roots`, children before parents
pub(crate) fn topological_order(roots: &[Sx]) -> Vec<Sx> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    // (node, children already pushed)
    let mut stack: Vec<(Sx, bool)> = Vec::new();

    for root in roots {
        stack.push((root.clone(), false));
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            if visited.contains(&node.key()) {
                continue;
            }
            visited.insert(node.key());
            stack.push((node.clone(), true));
            match node.node() {
                Node::Unary(_, arg) => {
                    if !visited.contains(&arg.key()) {
                        stack.push((arg.clone(), false));
                    }
                }
                Node::Binary(_, lhs, rhs) => {
                    if !visited.contains(&rhs.key()) {
                        stack.push((rhs.clone(), false));
                    }
                    if !visited.contains(&lhs.key()) {
                        stack.push((lhs.clone(), false));
                    }
                }
                Node::Const(_) | Node::Symbol { .. } => {}
            }
        }
    }
    order
}

/// Distinct symbols that `roots` depend on, in order of first appearance
pub(crate) fn free_symbols(roots: &[Sx]) -> Vec<Sx> {
    let mut seen = HashSet::new();
    topological_order(roots)
        .into_iter()
        .filter(|node| match node.symbol_id() {
            Some(id) => seen.insert(id),
            None => false,
        })
        .collect()
}

impl fmt::Display for Sx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Node::Const(v) => write!(f, "{}", v),
            Node::Symbol { name, .. } => write!(f, "{}", name),
            Node::Unary(UnaryOp::Neg, arg) => write!(f, "(-{})", arg),
            Node::Unary(op, arg) => write!(f, "{}({})", op.name(), arg),
            Node::Binary(op, lhs, rhs) => match op.infix() {
                Some(c) => write!(f, "({}{}{})", lhs, c, rhs),
                None => write!(f, "pow({},{})", lhs, rhs),
            },
        }
    }
}

impl fmt::Debug for Sx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<f64> for Sx {
    fn from(value: f64) -> Self {
        Sx::constant(value)
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait<&Sx> for &Sx {
            type Output = Sx;
            fn $method(self, rhs: &Sx) -> Sx {
                Sx::binary($op, self, rhs)
            }
        }

        impl ops::$trait<Sx> for Sx {
            type Output = Sx;
            fn $method(self, rhs: Sx) -> Sx {
                Sx::binary($op, &self, &rhs)
            }
        }

        impl ops::$trait<f64> for &Sx {
            type Output = Sx;
            fn $method(self, rhs: f64) -> Sx {
                Sx::binary($op, self, &Sx::constant(rhs))
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(Div, div, BinaryOp::Div);

impl ops::Neg for &Sx {
    type Output = Sx;
    fn neg(self) -> Sx {
        Sx::unary(UnaryOp::Neg, self)
    }
}

impl ops::Neg for Sx {
    type Output = Sx;
    fn neg(self) -> Sx {
        Sx::unary(UnaryOp::Neg, &self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivial_terms_are_dropped() {
        let x = Sx::symbol("x");
        assert!((&x * &Sx::zero()).is_zero());
        assert!((&x + &Sx::zero()).is_same(&x));
        assert!((&Sx::one() * &x).is_same(&x));
        assert!((&x - &x).is_zero());
        assert!((-(-x.clone())).is_same(&x));
    }

    #[test]
    fn test_constant_folding() {
        let v = &Sx::constant(2.0) * &Sx::constant(3.5);
        assert_eq!(v.as_constant(), Some(7.0));
        assert_eq!(Sx::constant(0.0).cos().as_constant(), Some(1.0));
        // 1/0 is not folded into a non-finite literal
        let div = &Sx::one() / &Sx::zero();
        assert!(div.as_constant().is_none());
    }

    #[test]
    fn test_symbols_are_unique() {
        let a = Sx::symbol("a");
        let b = Sx::symbol("a");
        assert!(!a.is_same(&b));
        assert!(a.is_same(&a.clone()));
    }

    #[test]
    fn test_topological_order_visits_shared_nodes_once() {
        let x = Sx::symbol("x");
        let s = x.sin();
        let e = &s * &s;
        let order = topological_order(&[e.clone(), s.clone()]);
        assert_eq!(order.len(), 3);
        assert!(order[0].is_same(&x));
        assert!(order[2].is_same(&e));
    }

    #[test]
    fn test_free_symbols() {
        let x = Sx::symbol("x");
        let u = Sx::symbol("u");
        let e = &(&x * &u) + &x.sin();
        let names: Vec<_> = free_symbols(&[e])
            .iter()
            .map(|s| s.symbol_name().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["x", "u"]);
    }

    #[test]
    fn test_display() {
        let x = Sx::symbol("x");
        let e = -(&x.sin() + &x.pow(&Sx::constant(2.0)));
        assert_eq!(e.to_string(), "(-(sin(x)+pow(x,2)))");
    }
}
