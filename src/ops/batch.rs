//! Batched products.
//!
//! Both entry points launch one thread per output float across the whole
//! batch. Only the out-of-place form bounds the element size. The in-place
//! form cannot bind `a` as both input and output of a single dispatch, so it
//! computes into a transient buffer and copies the result over `a` inside the
//! same submission.

use super::MAX_BATCH_ELEMENT;
use super::launch::{BatchParams, Launch, dim};
use super::traits::{BatchOps, Side};
use crate::batch::MatrixBatch;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::shaders::{Grid, Kernel};

fn check_element_size(operation: &'static str, width: usize, height: usize) -> Result<()> {
    let len = width * height;
    if len > MAX_BATCH_ELEMENT {
        return Err(Error::backend_limitation(
            operation,
            format!("{width}x{height} = {len} floats per element exceeds {MAX_BATCH_ELEMENT}"),
        ));
    }
    Ok(())
}

fn batch_params(a: &MatrixBatch, b: &Matrix, out_width: usize, out_height: usize) -> BatchParams {
    BatchParams {
        a_width: dim(a.width),
        a_height: dim(a.height),
        b_width: dim(b.width),
        b_height: dim(b.height),
        out_width: dim(out_width),
        out_height: dim(out_height),
        count: dim(a.count),
        _pad: 0,
    }
}

impl BatchOps for Context {
    fn multiply_batch(&self, a: &MatrixBatch, b: &Matrix) -> Result<MatrixBatch> {
        self.check_owner(&a.owner)?;
        self.check_owner(&b.owner)?;
        if a.width != b.height {
            return Err(Error::IncompatibleShapes {
                lhs: (a.width, a.height),
                rhs: (b.width, b.height),
            });
        }

        let (out_width, out_height) = (b.width, a.height);
        check_element_size("multiply_batch", out_width, out_height)?;

        let out = MatrixBatch::zeros(self, out_width, out_height, a.count)?;
        let params = batch_params(a, b, out_width, out_height);

        let inner = &self.inner;
        inner.launch(Launch {
            kernel: Kernel::MatMultMultiRight,
            grid: Grid::linear(out_width * out_height * a.count, &inner.limits)?,
            inputs: vec![a.storage.buffer(), b.storage.buffer()],
            output: &out.storage,
            params: inner.create_params_buffer(&params),
            seed: None,
            write_back: None,
        })?;
        Ok(out)
    }

    fn multiply_batch_in_place(&self, a: &mut MatrixBatch, b: &Matrix, side: Side) -> Result<()> {
        self.check_owner(&a.owner)?;
        self.check_owner(&b.owner)?;
        if !a.is_square() || !b.is_square() || a.width != b.width {
            return Err(Error::NonSquareBatch {
                batch: (a.width, a.height),
                matrix: (b.width, b.height),
            });
        }

        let kernel = match side {
            Side::Right => Kernel::MatMultMultiRight,
            Side::Left => Kernel::MatMultMultiLeft,
        };
        let params = batch_params(a, b, a.width, a.height);

        let inner = &self.inner;
        let scratch = inner.allocate("bronze_batch_scratch", a.storage.size())?;
        inner.launch(Launch {
            kernel,
            grid: Grid::linear(a.matrix_len() * a.count, &inner.limits)?,
            inputs: vec![a.storage.buffer(), b.storage.buffer()],
            output: &scratch,
            params: inner.create_params_buffer(&params),
            seed: None,
            write_back: Some(&a.storage),
        })
    }
}
