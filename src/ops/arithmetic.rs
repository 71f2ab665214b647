//! Elementwise and product operations.

use super::launch::{ElementwiseParams, Launch, MatmulParams, ScalarParams, dim};
use super::traits::MatrixOps;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::shaders::{Grid, Kernel};

impl MatrixOps for Context {
    fn add(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        self.check_owner(&a.owner)?;
        self.check_owner(&b.owner)?;
        if (a.width, a.height) != (b.width, b.height) {
            return Err(Error::shape_mismatch((a.width, a.height), (b.width, b.height)));
        }

        let out = Matrix::zeros(self, a.width, a.height)?;
        let numel = a.len();
        let params = ElementwiseParams {
            numel: dim(numel),
            _pad: [0; 3],
        };

        let inner = &self.inner;
        inner.launch(Launch {
            kernel: Kernel::MatAddSimple,
            grid: Grid::linear(numel, &inner.limits)?,
            inputs: vec![a.storage.buffer(), b.storage.buffer()],
            output: &out.storage,
            params: inner.create_params_buffer(&params),
            seed: None,
            write_back: None,
        })?;
        Ok(out)
    }

    fn scalar_multiply(&self, a: &Matrix, scalar: f32) -> Result<Matrix> {
        self.check_owner(&a.owner)?;

        let out = Matrix::zeros(self, a.width, a.height)?;
        let numel = a.len();
        let params = ScalarParams {
            numel: dim(numel),
            scalar,
            _pad: [0; 2],
        };

        let inner = &self.inner;
        inner.launch(Launch {
            kernel: Kernel::MatMultScalar,
            grid: Grid::linear(numel, &inner.limits)?,
            inputs: vec![a.storage.buffer()],
            output: &out.storage,
            params: inner.create_params_buffer(&params),
            seed: None,
            write_back: None,
        })?;
        Ok(out)
    }

    fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        self.check_owner(&a.owner)?;
        self.check_owner(&b.owner)?;
        if a.width != b.height {
            return Err(Error::IncompatibleShapes {
                lhs: (a.width, a.height),
                rhs: (b.width, b.height),
            });
        }

        // [a.height x a.width] @ [b.height x b.width] -> [a.height x b.width]
        let (out_width, out_height) = (b.width, a.height);
        let out = Matrix::zeros(self, out_width, out_height)?;
        let params = MatmulParams {
            a_width: dim(a.width),
            b_width: dim(b.width),
            out_height: dim(out_height),
            _pad: 0,
        };

        let inner = &self.inner;
        inner.launch(Launch {
            kernel: Kernel::MatMultSimple,
            grid: Grid::planar(out_width, out_height, &inner.limits)?,
            inputs: vec![a.storage.buffer(), b.storage.buffer()],
            output: &out.storage,
            params: inner.create_params_buffer(&params),
            seed: None,
            write_back: None,
        })?;
        Ok(out)
    }
}
