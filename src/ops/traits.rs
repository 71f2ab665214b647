//! Operation traits.

use crate::batch::MatrixBatch;
use crate::error::Result;
use crate::matrix::Matrix;

/// Which side of each batch element the single matrix multiplies from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Side {
    /// `a[i] * b`
    #[default]
    Right,
    /// `b * a[i]`
    Left,
}

/// Elementwise and product operations on single matrices.
///
/// # Example
///
/// ```ignore
/// # use bronze::prelude::*;
/// let ctx = Context::new()?;
/// let a = ctx.matrix_from_slice(2, 2, &[1.0, 2.0, 3.0, 4.0])?;
/// let b = ctx.matrix_from_slice(2, 2, &[5.0, 6.0, 7.0, 8.0])?;
///
/// let sum = ctx.add(&a, &b)?;          // [6, 8, 10, 12]
/// let product = ctx.multiply(&a, &b)?; // [19, 22, 43, 50]
/// # Ok::<(), bronze::Error>(())
/// ```
pub trait MatrixOps {
    /// Element-wise addition: a + b
    ///
    /// # Errors
    ///
    /// - [`CrossContextOperand`](crate::Error::CrossContextOperand) if either
    ///   operand belongs to another context
    /// - [`ShapeMismatch`](crate::Error::ShapeMismatch) if the shapes differ
    fn add(&self, a: &Matrix, b: &Matrix) -> Result<Matrix>;

    /// Multiply every element by `scalar`
    fn scalar_multiply(&self, a: &Matrix, scalar: f32) -> Result<Matrix>;

    /// Matrix product a * b, shaped `b.width() x a.height()`
    ///
    /// # Errors
    ///
    /// - [`CrossContextOperand`](crate::Error::CrossContextOperand) if either
    ///   operand belongs to another context
    /// - [`IncompatibleShapes`](crate::Error::IncompatibleShapes) unless
    ///   `a.width() == b.height()`
    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix>;
}

/// Products of every batch element against one matrix.
pub trait BatchOps {
    /// `out[i] = a[i] * b` for every element, into a new batch.
    ///
    /// Each output element may hold at most
    /// [`MAX_BATCH_ELEMENT`](super::MAX_BATCH_ELEMENT) floats.
    fn multiply_batch(&self, a: &MatrixBatch, b: &Matrix) -> Result<MatrixBatch>;

    /// `a[i] = a[i] * b` ([`Side::Right`]) or `a[i] = b * a[i]`
    /// ([`Side::Left`]), written into `a`'s own buffer.
    ///
    /// # Errors
    ///
    /// [`NonSquareBatch`](crate::Error::NonSquareBatch) unless the batch
    /// elements and `b` are square with one width.
    fn multiply_batch_in_place(&self, a: &mut MatrixBatch, b: &Matrix, side: Side) -> Result<()>;
}

/// Random fills.
pub trait RandomOps {
    /// New matrix of uniform values in [0, 1), freshly seeded per call
    fn random_matrix(&self, width: usize, height: usize) -> Result<Matrix>;
}

/// Debug rendering.
pub trait TextOps {
    /// Render every element row-major on the GPU.
    ///
    /// Elements are right-aligned in 13-character fields (4 decimals),
    /// separated by spaces, with a newline after each row but the last.
    fn to_text(&self, matrix: &Matrix) -> Result<String>;
}
