//! Dense matrix engine.
//!
//! `Matrix` is the algebraic substrate for the whole crate: a rectangular grid
//! of `f64` stored as one contiguous row-major buffer.
//!
//! # Shapes and errors
//!
//! Every binary operation checks shapes and returns
//! [`Error::DimensionMismatch`](crate::Error::DimensionMismatch) on
//! disagreement; nothing truncates or wraps silently. `get`/`set` are
//! bounds-checked for the same reason.
//!
//! # Numeric reproducibility
//!
//! `dot` accumulates each output cell in a fixed left-to-right `k` order. The
//! right operand is transposed first so both inner-loop reads are sequential,
//! which changes memory access order but not the summation order.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::fmt;
use std::ops::Neg;

/// A `rows x cols` matrix of `f64`, row-major, exclusively owning its storage.
///
/// Column vectors (inputs, targets, activations) are ordinary matrices with
/// `cols == 1`; see [`Matrix::column`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Creates a zero-filled `rows x cols` matrix.
    ///
    /// Panics if either dimension is zero; a matrix has at least one row and
    /// one column.
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "matrix dimensions must be > 0");
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Creates a matrix with each element produced by `f(row, col)`.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut m = Self::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                m.data[r * cols + c] = f(r, c);
            }
        }
        m
    }

    /// Builds a matrix from a flat row-major buffer with shape `(rows, cols)`.
    pub fn from_flat(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::DimensionMismatch(format!(
                "matrix dimensions must be > 0, got {rows}x{cols}"
            )));
        }
        if data.len() != rows * cols {
            return Err(Error::DimensionMismatch(format!(
                "buffer length {} does not match shape {rows}x{cols}",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Column-vector adapter: a `values.len() x 1` matrix preserving order as
    /// the row index.
    ///
    /// Panics if `values` is empty.
    pub fn column(values: &[f64]) -> Self {
        assert!(!values.is_empty(), "column vector must have at least one row");
        Self {
            rows: values.len(),
            cols: 1,
            data: values.to_vec(),
        }
    }

    /// Identity factory: `1.0` on the main diagonal, `0.0` elsewhere.
    ///
    /// Rectangular shapes are allowed; the diagonal simply stops at the
    /// shorter dimension.
    pub fn identity(rows: usize, cols: usize) -> Self {
        Self::from_fn(rows, cols, |r, c| if r == c { 1.0 } else { 0.0 })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The backing row-major buffer.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Bounds-checked element read.
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.check_index(row, col)?;
        Ok(self.data[row * self.cols + col])
    }

    /// Bounds-checked element write.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        self.check_index(row, col)?;
        self.data[row * self.cols + col] = value;
        Ok(())
    }

    fn check_index(&self, row: usize, col: usize) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(Error::DimensionMismatch(format!(
                "index ({row}, {col}) is outside a {}x{} matrix",
                self.rows, self.cols
            )));
        }
        Ok(())
    }

    /// Returns the transpose: `result[c][r] == self[r][c]`.
    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::new(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        out
    }

    /// Applies `f` to every element in place.
    pub fn apply<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64,
    {
        for v in &mut self.data {
            *v = f(*v);
        }
    }

    /// Returns a new matrix with `f` applied to every element.
    pub fn map<F>(&self, f: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        let mut out = self.clone();
        out.apply(f);
        out
    }

    /// Broadcast `element + scalar`.
    pub fn add_scalar(&self, scalar: f64) -> Matrix {
        self.map(|v| v + scalar)
    }

    /// Broadcast `element - scalar`.
    pub fn sub_scalar(&self, scalar: f64) -> Matrix {
        self.map(|v| v - scalar)
    }

    /// Broadcast `scalar - element`.
    ///
    /// This is the reflected subtraction; the backward pass and the reverse
    /// activation both depend on it for the `1 - output` term.
    pub fn sub_from_scalar(&self, scalar: f64) -> Matrix {
        self.map(|v| scalar - v)
    }

    /// Broadcast `element * scalar`.
    pub fn mul_scalar(&self, scalar: f64) -> Matrix {
        self.map(|v| v * scalar)
    }

    /// Elementwise sum. Shapes must match.
    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.check_same_shape(other, "elementwise add")?;
        let mut out = self.clone();
        for (a, b) in out.data.iter_mut().zip(&other.data) {
            *a += *b;
        }
        Ok(out)
    }

    /// Elementwise difference. Shapes must match.
    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.check_same_shape(other, "elementwise sub")?;
        let mut out = self.clone();
        for (a, b) in out.data.iter_mut().zip(&other.data) {
            *a -= *b;
        }
        Ok(out)
    }

    /// Elementwise (Hadamard) product. Shapes must match.
    pub fn hadamard(&self, other: &Matrix) -> Result<Matrix> {
        self.check_same_shape(other, "hadamard product")?;
        let mut out = self.clone();
        for (a, b) in out.data.iter_mut().zip(&other.data) {
            *a *= *b;
        }
        Ok(out)
    }

    /// In-place elementwise sum, for `W += delta` style updates.
    pub fn add_in_place(&mut self, other: &Matrix) -> Result<()> {
        self.check_same_shape(other, "elementwise add")?;
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += *b;
        }
        Ok(())
    }

    /// Matrix product. Requires `self.cols == other.rows`.
    ///
    /// Each output cell is `sum over k of self[i][k] * other[k][j]`,
    /// accumulated in increasing `k` order.
    pub fn dot(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols != other.rows {
            return Err(Error::DimensionMismatch(format!(
                "dot product needs left cols == right rows, got {}x{} . {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }

        // Walk the right operand transposed so both inner reads are
        // sequential; the k summation order is unchanged.
        let other_t = other.transpose();
        let mut out = Matrix::new(self.rows, other.cols);

        for i in 0..self.rows {
            let a_row = i * self.cols;
            for j in 0..other.cols {
                let b_row = j * other_t.cols;
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self.data[a_row + k] * other_t.data[b_row + k];
                }
                out.data[i * out.cols + j] = sum;
            }
        }
        Ok(out)
    }

    fn check_same_shape(&self, other: &Matrix, op: &str) -> Result<()> {
        if self.rows != other.rows || self.cols != other.cols {
            return Err(Error::DimensionMismatch(format!(
                "{op} needs matching shapes, got {}x{} and {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(())
    }
}

impl Neg for Matrix {
    type Output = Matrix;

    fn neg(self) -> Matrix {
        self.map(|v| -v)
    }
}

impl Neg for &Matrix {
    type Output = Matrix;

    fn neg(self) -> Matrix {
        self.map(|v| -v)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            write!(f, "| ")?;
            for c in 0..self.cols {
                write!(f, "{} ", self.data[r * self.cols + c])?;
            }
            writeln!(f, "|")?;
        }
        Ok(())
    }
}
