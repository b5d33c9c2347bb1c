//! Dense matrices of scalar expressions

use std::fmt;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::symbolic::errors::SymbolicError;
use crate::symbolic::expr::Sx;
use crate::symbolic::Representation;

/// The kind of graph a matrix belongs to
///
/// `Sx` and `Mx` are the two symbolic representations and never mix. `Dm`
/// matrices hold numeric constants only and combine with either of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixKind {
    #[serde(rename = "SX")]
    Sx,
    #[serde(rename = "MX")]
    Mx,
    #[serde(rename = "DM")]
    Dm,
}

impl MatrixKind {
    /// The symbolic representation of this kind, `None` for numeric matrices
    pub fn representation(&self) -> Option<Representation> {
        match self {
            Self::Sx => Some(Representation::Sx),
            Self::Mx => Some(Representation::Mx),
            Self::Dm => None,
        }
    }

    fn combine(op: &'static str, lhs: Self, rhs: Self) -> Result<Self, SymbolicError> {
        match (lhs, rhs) {
            (a, b) if a == b => Ok(a),
            (Self::Dm, other) | (other, Self::Dm) => Ok(other),
            (lhs, rhs) => Err(SymbolicError::RepresentationMismatch { op, lhs, rhs }),
        }
    }

    pub(crate) fn combine_all(
        op: &'static str,
        kinds: impl IntoIterator<Item = Self>,
    ) -> Result<Self, SymbolicError> {
        kinds
            .into_iter()
            .try_fold(Self::Dm, |acc, kind| Self::combine(op, acc, kind))
    }
}

impl From<Representation> for MatrixKind {
    fn from(repr: Representation) -> Self {
        match repr {
            Representation::Sx => Self::Sx,
            Representation::Mx => Self::Mx,
        }
    }
}

impl fmt::Display for MatrixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sx => write!(f, "SX"),
            Self::Mx => write!(f, "MX"),
            Self::Dm => write!(f, "DM"),
        }
    }
}

/// A dense `rows x cols` matrix of scalar expressions, stored column-major
#[derive(Clone)]
pub struct SymMatrix {
    kind: MatrixKind,
    rows: usize,
    cols: usize,
    data: Vec<Sx>,
}

impl SymMatrix {
    /// Build a matrix from column-major elements
    pub fn from_elements(
        kind: MatrixKind,
        rows: usize,
        cols: usize,
        data: Vec<Sx>,
    ) -> Result<Self, SymbolicError> {
        if data.len() != rows * cols {
            return Err(SymbolicError::dims(
                "from_elements",
                (rows, cols),
                (data.len(), 1),
            ));
        }
        Ok(Self {
            kind,
            rows,
            cols,
            data,
        })
    }

    /// Column vector from elements
    pub fn column(kind: MatrixKind, data: Vec<Sx>) -> Self {
        Self {
            kind,
            rows: data.len(),
            cols: 1,
            data,
        }
    }

    /// Fresh symbols, named `name` for a scalar and `name_k` (column-major) otherwise
    pub fn sym(kind: MatrixKind, name: &str, rows: usize, cols: usize) -> Self {
        let data = if rows * cols == 1 {
            vec![Sx::symbol(name)]
        } else {
            (0..rows * cols)
                .map(|k| Sx::symbol(format!("{}_{}", name, k)))
                .collect()
        };
        Self {
            kind,
            rows,
            cols,
            data,
        }
    }

    pub fn zeros(kind: MatrixKind, rows: usize, cols: usize) -> Self {
        Self {
            kind,
            rows,
            cols,
            data: vec![Sx::zero(); rows * cols],
        }
    }

    pub fn eye(kind: MatrixKind, n: usize) -> Self {
        let mut m = Self::zeros(kind, n, n);
        for i in 0..n {
            m.data[i + i * n] = Sx::one();
        }
        m
    }

    /// Numeric constant matrix
    pub fn from_dmatrix(values: &DMatrix<f64>) -> Self {
        Self {
            kind: MatrixKind::Dm,
            rows: values.nrows(),
            cols: values.ncols(),
            data: values.iter().map(|v| Sx::constant(*v)).collect(),
        }
    }

    /// Same elements, different kind
    pub fn with_kind(mut self, kind: MatrixKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements in column-major order
    pub fn elements(&self) -> &[Sx] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Result<&Sx, SymbolicError> {
        if row >= self.rows || col >= self.cols {
            return Err(SymbolicError::IndexOutOfBounds {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(&self.data[row + col * self.rows])
    }

    /// True if every element is a symbol
    pub fn is_symbolic(&self) -> bool {
        self.data.iter().all(Sx::is_symbol)
    }

    /// Column `col` as a vector of elements
    pub(crate) fn column_elements(&self, col: usize) -> &[Sx] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }

    pub fn add(&self, other: &SymMatrix) -> Result<SymMatrix, SymbolicError> {
        self.elementwise("plus", other, |a, b| a + b)
    }

    pub fn sub(&self, other: &SymMatrix) -> Result<SymMatrix, SymbolicError> {
        self.elementwise("minus", other, |a, b| a - b)
    }

    fn elementwise(
        &self,
        op: &'static str,
        other: &SymMatrix,
        f: impl Fn(&Sx, &Sx) -> Sx,
    ) -> Result<SymMatrix, SymbolicError> {
        let kind = MatrixKind::combine(op, self.kind, other.kind)?;
        if self.size() != other.size() {
            return Err(SymbolicError::dims(op, self.size(), other.size()));
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| f(a, b))
            .collect();
        Ok(SymMatrix {
            kind,
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    /// Matrix product
    pub fn mtimes(&self, other: &SymMatrix) -> Result<SymMatrix, SymbolicError> {
        let kind = MatrixKind::combine("mtimes", self.kind, other.kind)?;
        if self.cols != other.rows {
            return Err(SymbolicError::dims("mtimes", self.size(), other.size()));
        }
        let mut data = Vec::with_capacity(self.rows * other.cols);
        for j in 0..other.cols {
            for i in 0..self.rows {
                let mut acc = Sx::zero();
                for l in 0..self.cols {
                    let term = &self.data[i + l * self.rows] * &other.data[l + j * other.rows];
                    acc = &acc + &term;
                }
                data.push(acc);
            }
        }
        Ok(SymMatrix {
            kind,
            rows: self.rows,
            cols: other.cols,
            data,
        })
    }

    pub fn transpose(&self) -> SymMatrix {
        let mut data = Vec::with_capacity(self.data.len());
        for i in 0..self.rows {
            for j in 0..self.cols {
                data.push(self.data[i + j * self.rows].clone());
            }
        }
        SymMatrix {
            kind: self.kind,
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    /// Concatenate side by side. Empty `0x0` operands are skipped.
    pub fn horzcat(parts: &[&SymMatrix]) -> Result<SymMatrix, SymbolicError> {
        let kind = MatrixKind::combine_all("horzcat", parts.iter().map(|m| m.kind))?;
        let parts: Vec<&&SymMatrix> = parts.iter().filter(|m| m.size() != (0, 0)).collect();
        let Some(first) = parts.first() else {
            return Ok(SymMatrix::zeros(kind, 0, 0));
        };
        let rows = first.rows;
        let mut cols = 0;
        let mut data = Vec::new();
        for m in &parts {
            if m.rows != rows {
                return Err(SymbolicError::dims("horzcat", first.size(), m.size()));
            }
            cols += m.cols;
            data.extend(m.data.iter().cloned());
        }
        Ok(SymMatrix {
            kind,
            rows,
            cols,
            data,
        })
    }

    /// Stack on top of each other. Empty `0x0` operands are skipped.
    pub fn vertcat(parts: &[&SymMatrix]) -> Result<SymMatrix, SymbolicError> {
        let kind = MatrixKind::combine_all("vertcat", parts.iter().map(|m| m.kind))?;
        let parts: Vec<&&SymMatrix> = parts.iter().filter(|m| m.size() != (0, 0)).collect();
        let Some(first) = parts.first() else {
            return Ok(SymMatrix::zeros(kind, 0, 0));
        };
        let cols = first.cols;
        if let Some(m) = parts.iter().find(|m| m.cols != cols) {
            return Err(SymbolicError::dims("vertcat", first.size(), m.size()));
        }
        let rows = parts.iter().map(|m| m.rows).sum();
        let mut data = Vec::with_capacity(rows * cols);
        for j in 0..cols {
            for m in &parts {
                data.extend(m.column_elements(j).iter().cloned());
            }
        }
        Ok(SymMatrix {
            kind,
            rows,
            cols,
            data,
        })
    }
}

impl fmt::Debug for SymMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        fmt::Display::fmt(self, f)?;
        write!(f, ")")
    }
}

impl fmt::Display for SymMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.rows {
            if i > 0 {
                write!(f, "; ")?;
            }
            for j in 0..self.cols {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", self.data[i + j * self.rows])?;
            }
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consts(rows: usize, cols: usize, values: &[f64]) -> SymMatrix {
        SymMatrix::from_dmatrix(&DMatrix::from_row_slice(rows, cols, values))
    }

    fn values(m: &SymMatrix) -> Vec<f64> {
        m.elements()
            .iter()
            .map(|e| e.as_constant().unwrap_or(f64::NAN))
            .collect()
    }

    #[test]
    fn test_mtimes_and_transpose() {
        let a = consts(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = consts(3, 1, &[1.0, 0.0, -1.0]);
        let c = a.mtimes(&b).unwrap();
        assert_eq!(c.size(), (2, 1));
        assert_eq!(values(&c), vec![-2.0, -2.0]);

        let at = a.transpose();
        assert_eq!(at.size(), (3, 2));
        assert_eq!(at.get(2, 1).unwrap().as_constant(), Some(6.0));
    }

    #[test]
    fn test_mtimes_dimension_mismatch() {
        let a = consts(2, 3, &[0.0; 6]);
        let err = a.mtimes(&a).unwrap_err();
        assert_eq!(
            err,
            SymbolicError::DimensionMismatch {
                op: "mtimes",
                lhs: (2, 3),
                rhs: (2, 3)
            }
        );
    }

    #[test]
    fn test_block_concatenation() {
        let top = SymMatrix::horzcat(&[&consts(1, 1, &[1.0]), &consts(1, 2, &[2.0, 3.0])]).unwrap();
        let bottom = consts(1, 3, &[4.0, 5.0, 6.0]);
        let m = SymMatrix::vertcat(&[&top, &bottom]).unwrap();
        assert_eq!(m.size(), (2, 3));
        // column-major storage
        assert_eq!(values(&m), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_concatenation_skips_empty() {
        let x = SymMatrix::sym(MatrixKind::Sx, "x", 2, 1);
        let empty = SymMatrix::zeros(MatrixKind::Sx, 0, 0);
        let v = SymMatrix::vertcat(&[&x, &empty]).unwrap();
        assert_eq!(v.size(), (2, 1));
    }

    #[test]
    fn test_representations_do_not_mix() {
        let a = SymMatrix::sym(MatrixKind::Sx, "a", 2, 1);
        let b = SymMatrix::sym(MatrixKind::Mx, "b", 2, 1);
        assert!(matches!(
            a.add(&b),
            Err(SymbolicError::RepresentationMismatch { .. })
        ));
        // numeric constants promote to either representation
        let z = SymMatrix::from_dmatrix(&DMatrix::zeros(2, 1));
        assert_eq!(a.add(&z).unwrap().kind(), MatrixKind::Sx);
        assert_eq!(z.add(&b).unwrap().kind(), MatrixKind::Mx);
    }

    #[test]
    fn test_sym_naming() {
        let s = SymMatrix::sym(MatrixKind::Sx, "Sx", 2, 2);
        assert!(s.is_symbolic());
        assert_eq!(s.get(1, 0).unwrap().symbol_name(), Some("Sx_1"));
        let scalar = SymMatrix::sym(MatrixKind::Sx, "t", 1, 1);
        assert_eq!(scalar.elements()[0].symbol_name(), Some("t"));
    }
}
