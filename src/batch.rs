//! Contiguous batches of equally shaped matrices.

use std::fmt;

use crate::context::{Context, ContextRef};
use crate::error::{Error, Result};
use crate::matrix::{Matrix, Transform, checked_len, transform_from_row_major, transform_to_row_major};
use crate::storage::Storage;

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// `count` matrices of one shape packed back to back in a single buffer.
///
/// Element `i` occupies floats `i * width * height .. (i + 1) * width * height`
/// with no padding in between, each stored row-major.
pub struct MatrixBatch {
    pub(crate) width: usize,
    pub(crate) height: usize,
    pub(crate) count: usize,
    pub(crate) storage: Storage,
    pub(crate) owner: ContextRef,
}

impl fmt::Debug for MatrixBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatrixBatch")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("count", &self.count)
            .field("context", &self.owner.id())
            .finish()
    }
}

impl MatrixBatch {
    /// Allocate a zero-filled batch.
    pub fn zeros(ctx: &Context, width: usize, height: usize, count: usize) -> Result<Self> {
        let per_matrix = checked_len(width, height)?;
        if count == 0 {
            return Err(Error::invalid_argument("count", "a batch holds at least one matrix"));
        }
        let bytes = per_matrix
            .checked_mul(count)
            .and_then(|n| n.checked_mul(F32_SIZE))
            .ok_or(Error::OutOfMemory { size: u64::MAX })?;
        let storage = ctx.inner.allocate("bronze_batch", bytes as u64)?;
        Ok(Self {
            width,
            height,
            count,
            storage,
            owner: ctx.downgrade(),
        })
    }

    /// Pack individually allocated matrices into one batch.
    ///
    /// All matrices must share one shape and come from `ctx`. Packing is a
    /// sequence of device-side copies in a single submission.
    pub fn from_matrices<'a>(
        ctx: &Context,
        matrices: impl IntoIterator<Item = &'a Matrix>,
    ) -> Result<Self> {
        let matrices: Vec<&Matrix> = matrices.into_iter().collect();
        let Some(first) = matrices.first() else {
            return Err(Error::invalid_argument("matrices", "cannot pack an empty sequence"));
        };
        let (width, height) = (first.width, first.height);

        for matrix in &matrices {
            ctx.check_owner(&matrix.owner)?;
            if (matrix.width, matrix.height) != (width, height) {
                return Err(Error::shape_mismatch(
                    (width, height),
                    (matrix.width, matrix.height),
                ));
            }
        }

        let batch = Self::zeros(ctx, width, height, matrices.len())?;
        let stride = (width * height * F32_SIZE) as u64;

        let inner = &ctx.inner;
        let mut encoder = inner.create_encoder("batch_from_matrices");
        for (i, matrix) in matrices.iter().enumerate() {
            encoder.copy_buffer_to_buffer(
                matrix.storage.buffer(),
                0,
                batch.storage.buffer(),
                i as u64 * stride,
                stride,
            );
        }
        if inner.coherency.needs_sync() {
            batch.storage.encode_sync_all(&mut encoder);
        }
        inner.submit_and_wait(encoder)?;

        Ok(batch)
    }

    /// Pack column-major transforms into a 4x4 batch.
    ///
    /// Each transform is stored row-major, as in [`Matrix::from_transform`].
    pub fn from_transforms(ctx: &Context, transforms: &[Transform]) -> Result<Self> {
        let batch = Self::zeros(ctx, 4, 4, transforms.len())?;
        let data: Vec<f32> = transforms.iter().flat_map(transform_to_row_major).collect();
        ctx.inner.write_f32(&batch.storage, 0, &data)?;
        Ok(batch)
    }

    /// Columns of each element
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Rows of each element
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of matrices
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Id of the owning context
    #[inline]
    pub fn context_id(&self) -> u64 {
        self.owner.id()
    }

    /// Whether the elements are square
    #[inline]
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Elements per matrix
    #[inline]
    pub(crate) fn matrix_len(&self) -> usize {
        self.width * self.height
    }

    /// Copy element `index` out into a new, independent matrix.
    pub fn matrix(&self, index: usize) -> Result<Matrix> {
        if index >= self.count {
            return Err(Error::IndexOutOfBounds {
                index,
                size: self.count,
            });
        }
        let ctx = self.owner.upgrade()?;
        let matrix = Matrix::zeros(&ctx, self.width, self.height)?;
        let stride = (self.matrix_len() * F32_SIZE) as u64;

        let inner = &ctx.inner;
        let mut encoder = inner.create_encoder("batch_copy_matrix");
        encoder.copy_buffer_to_buffer(
            self.storage.buffer(),
            index as u64 * stride,
            matrix.storage.buffer(),
            0,
            stride,
        );
        if inner.coherency.needs_sync() {
            matrix.storage.encode_sync_all(&mut encoder);
        }
        inner.submit_and_wait(encoder)?;

        Ok(matrix)
    }

    /// All elements of all matrices, in storage order.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        let ctx = self.owner.upgrade()?;
        ctx.inner
            .read_f32(&self.storage, 0, self.matrix_len() * self.count)
    }

    /// Read a 4x4 batch back as column-major transforms.
    pub fn to_transforms(&self) -> Result<Vec<Transform>> {
        if self.width != 4 || self.height != 4 {
            return Err(Error::shape_mismatch((4, 4), (self.width, self.height)));
        }
        Ok(self
            .to_vec()?
            .chunks_exact(16)
            .map(transform_from_row_major)
            .collect())
    }
}

// ============================================================================
// Context shorthands
// ============================================================================

impl Context {
    /// Allocate a zero-filled batch. See [`MatrixBatch::zeros`].
    pub fn batch_zeros(&self, width: usize, height: usize, count: usize) -> Result<MatrixBatch> {
        MatrixBatch::zeros(self, width, height, count)
    }

    /// Pack matrices into a batch. See [`MatrixBatch::from_matrices`].
    pub fn batch_from_matrices<'a>(
        &self,
        matrices: impl IntoIterator<Item = &'a Matrix>,
    ) -> Result<MatrixBatch> {
        MatrixBatch::from_matrices(self, matrices)
    }

    /// Pack transforms into a batch. See [`MatrixBatch::from_transforms`].
    pub fn batch_from_transforms(&self, transforms: &[Transform]) -> Result<MatrixBatch> {
        MatrixBatch::from_transforms(self, transforms)
    }
}
