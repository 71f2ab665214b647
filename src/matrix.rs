//! Dense GPU-resident matrix.

use std::fmt;
use std::ops::{Add, Mul};

use crate::context::{Context, ContextRef};
use crate::error::{Error, Result};
use crate::ops::{MatrixOps, TextOps};
use crate::storage::Storage;

/// A 4x4 transform in column-major order: `t[column][row]`.
pub type Transform = [[f32; 4]; 4];

/// Transpose a column-major transform into row-major floats.
pub(crate) fn transform_to_row_major(t: &Transform) -> [f32; 16] {
    let mut out = [0.0f32; 16];
    for (col, column) in t.iter().enumerate() {
        for (row, &value) in column.iter().enumerate() {
            out[row * 4 + col] = value;
        }
    }
    out
}

/// Rebuild a column-major transform from row-major floats.
pub(crate) fn transform_from_row_major(data: &[f32]) -> Transform {
    let mut t = [[0.0f32; 4]; 4];
    for (col, column) in t.iter_mut().enumerate() {
        for (row, value) in column.iter_mut().enumerate() {
            *value = data[row * 4 + col];
        }
    }
    t
}

/// Validate a (width, height) pair and return the element count.
pub(crate) fn checked_len(width: usize, height: usize) -> Result<usize> {
    if width == 0 {
        return Err(Error::invalid_argument("width", "must be positive"));
    }
    if height == 0 {
        return Err(Error::invalid_argument("height", "must be positive"));
    }
    let len = width
        .checked_mul(height)
        .filter(|&n| u32::try_from(n).is_ok())
        .ok_or_else(|| {
            Error::backend_limitation("allocate", format!("{width}x{height} elements"))
        })?;
    Ok(len)
}

/// A dense `height x width` matrix of `f32` in device memory.
///
/// Elements are stored row-major: element `(row, col)` lives at
/// `row * width + col`. The matrix holds a weak reference to the context
/// that created it; it does not keep the context alive.
pub struct Matrix {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) storage: Storage,
    pub(crate) owner: ContextRef,
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matrix")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("context", &self.owner.id())
            .finish()
    }
}

impl Matrix {
    /// Allocate a zero-filled matrix.
    pub fn zeros(ctx: &Context, width: usize, height: usize) -> Result<Self> {
        let len = checked_len(width, height)?;
        let storage = ctx
            .inner
            .allocate("bronze_matrix", (len * std::mem::size_of::<f32>()) as u64)?;
        Ok(Self {
            width,
            height,
            storage,
            owner: ctx.downgrade(),
        })
    }

    /// Create a matrix from row-major data.
    pub fn from_slice(ctx: &Context, width: usize, height: usize, data: &[f32]) -> Result<Self> {
        let len = checked_len(width, height)?;
        if data.len() != len {
            return Err(Error::invalid_argument(
                "data",
                format!("expected {} elements, got {}", len, data.len()),
            ));
        }
        let matrix = Self::zeros(ctx, width, height)?;
        ctx.inner.write_f32(&matrix.storage, 0, data)?;
        Ok(matrix)
    }

    /// Create a 4x4 matrix from a column-major transform.
    ///
    /// The buffer is row-major like every other matrix, so
    /// `m.get(row, col) == t[col][row]`.
    pub fn from_transform(ctx: &Context, transform: &Transform) -> Result<Self> {
        Self::from_slice(ctx, 4, 4, &transform_to_row_major(transform))
    }

    /// Number of columns
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Always false: matrices have positive dimensions
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Id of the owning context
    #[inline]
    pub fn context_id(&self) -> u64 {
        self.owner.id()
    }

    /// Whether `self` is a square matrix
    #[inline]
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    fn offset(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: row,
                size: self.height,
            });
        }
        if col >= self.width {
            return Err(Error::IndexOutOfBounds {
                index: col,
                size: self.width,
            });
        }
        Ok(row * self.width + col)
    }

    /// Read element `(row, col)`.
    ///
    /// Bounds are checked; each call is a blocking device read.
    pub fn get(&self, row: usize, col: usize) -> Result<f32> {
        let offset = self.offset(row, col)?;
        let ctx = self.owner.upgrade()?;
        let values = ctx.inner.read_f32(&self.storage, offset, 1)?;
        Ok(values[0])
    }

    /// Write element `(row, col)` through to device memory.
    ///
    /// Only the modified 4 bytes are written and, in managed mode, flushed.
    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        let offset = self.offset(row, col)?;
        let ctx = self.owner.upgrade()?;
        ctx.inner.write_f32(&self.storage, offset, &[value])
    }

    /// All elements, row-major.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        let ctx = self.owner.upgrade()?;
        ctx.inner.read_f32(&self.storage, 0, self.len())
    }

    /// Read a 4x4 matrix back as a column-major transform.
    pub fn to_transform(&self) -> Result<Transform> {
        if self.width != 4 || self.height != 4 {
            return Err(Error::shape_mismatch((4, 4), (self.width, self.height)));
        }
        Ok(transform_from_row_major(&self.to_vec()?))
    }
}

// ============================================================================
// Operator sugar
// ============================================================================
//
// Operators route through the owning context and panic on any error.

impl Add for &Matrix {
    type Output = Matrix;

    /// # Panics
    ///
    /// Panics if the shapes differ, the operands come from different
    /// contexts, or the dispatch fails.
    fn add(self, rhs: &Matrix) -> Matrix {
        if self.owner.id() != rhs.owner.id() {
            panic!("Adding two matrices from different bronze instances");
        }
        self.owner
            .upgrade()
            .and_then(|ctx| ctx.add(self, rhs))
            .unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Mul for &Matrix {
    type Output = Matrix;

    /// # Panics
    ///
    /// Panics if the inner dimensions disagree, the operands come from
    /// different contexts, or the dispatch fails.
    fn mul(self, rhs: &Matrix) -> Matrix {
        self.owner
            .upgrade()
            .and_then(|ctx| ctx.multiply(self, rhs))
            .unwrap_or_else(|e| panic!("{e}"))
    }
}

impl Mul<f32> for &Matrix {
    type Output = Matrix;

    /// # Panics
    ///
    /// Panics if the dispatch fails.
    fn mul(self, rhs: f32) -> Matrix {
        self.owner
            .upgrade()
            .and_then(|ctx| ctx.scalar_multiply(self, rhs))
            .unwrap_or_else(|e| panic!("{e}"))
    }
}

impl fmt::Display for Matrix {
    /// Rendered on the GPU by the text kernel.
    ///
    /// If rendering fails the error message is written in place of the
    /// elements, as `<error: ...>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.owner.upgrade().and_then(|ctx| ctx.to_text(self)) {
            Ok(text) => f.write_str(&text),
            Err(e) => write!(f, "<error: {e}>"),
        }
    }
}

// ============================================================================
// Context shorthands
// ============================================================================

impl Context {
    /// Allocate a zero-filled matrix. See [`Matrix::zeros`].
    pub fn zeros(&self, width: usize, height: usize) -> Result<Matrix> {
        Matrix::zeros(self, width, height)
    }

    /// Create a matrix from row-major data. See [`Matrix::from_slice`].
    pub fn matrix_from_slice(&self, width: usize, height: usize, data: &[f32]) -> Result<Matrix> {
        Matrix::from_slice(self, width, height, data)
    }

    /// Create a 4x4 matrix from a transform. See [`Matrix::from_transform`].
    pub fn matrix_from_transform(&self, transform: &Transform) -> Result<Matrix> {
        Matrix::from_transform(self, transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transform {
        [
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
            [13.0, 14.0, 15.0, 16.0],
        ]
    }

    #[test]
    fn test_transform_transposes_columns_into_rows() {
        let rows = transform_to_row_major(&sample());
        // First row is the first element of every column
        assert_eq!(&rows[0..4], &[1.0, 5.0, 9.0, 13.0]);
        assert_eq!(&rows[12..16], &[4.0, 8.0, 12.0, 16.0]);
    }

    #[test]
    fn test_transform_round_trip() {
        let t = sample();
        assert_eq!(transform_from_row_major(&transform_to_row_major(&t)), t);
    }

    #[test]
    fn test_checked_len() {
        assert_eq!(checked_len(3, 2).unwrap(), 6);
        assert!(matches!(
            checked_len(0, 2),
            Err(Error::InvalidArgument { arg: "width", .. })
        ));
        assert!(matches!(
            checked_len(2, 0),
            Err(Error::InvalidArgument { arg: "height", .. })
        ));
        assert!(checked_len(1 << 20, 1 << 20).is_err());
    }
}
