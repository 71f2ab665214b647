//! Random fill.

use super::launch::{ElementwiseParams, Launch, dim};
use super::traits::RandomOps;
use crate::context::Context;
use crate::error::Result;
use crate::matrix::Matrix;
use crate::shaders::{Grid, Kernel};

impl RandomOps for Context {
    fn random_matrix(&self, width: usize, height: usize) -> Result<Matrix> {
        let out = Matrix::zeros(self, width, height)?;
        let numel = out.len();
        let params = ElementwiseParams {
            numel: dim(numel),
            _pad: [0; 3],
        };
        // The seed is baked into the pipeline, so a fresh one is compiled each call
        let seed = rand::random::<i32>();

        let inner = &self.inner;
        inner.launch(Launch {
            kernel: Kernel::FillRandom,
            grid: Grid::linear(numel, &inner.limits)?,
            inputs: Vec::new(),
            output: &out.storage,
            params: inner.create_params_buffer(&params),
            seed: Some(seed),
            write_back: None,
        })?;
        Ok(out)
    }
}
