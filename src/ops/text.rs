//! GPU-side text rendering.

use std::ffi::CStr;

use super::TEXT_BYTES_PER_ELEMENT;
use super::launch::{Launch, TextParams, dim};
use super::traits::TextOps;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use crate::shaders::{Grid, Kernel};

impl TextOps for Context {
    fn to_text(&self, matrix: &Matrix) -> Result<String> {
        self.check_owner(&matrix.owner)?;

        let numel = matrix.len();
        let bytes = numel
            .checked_mul(TEXT_BYTES_PER_ELEMENT)
            .ok_or(Error::OutOfMemory { size: u64::MAX })?;

        let inner = &self.inner;
        // Zero-initialized: the kernel ORs characters into place
        let text = inner.allocate("bronze_text", bytes as u64)?;
        let params = TextParams {
            width: dim(matrix.width),
            numel: dim(numel),
            _pad: [0; 2],
        };

        inner.launch(Launch {
            kernel: Kernel::GenerateString,
            grid: Grid::linear(numel, &inner.limits)?,
            inputs: vec![matrix.storage.buffer()],
            output: &text,
            params: inner.create_params_buffer(&params),
            seed: None,
            write_back: None,
        })?;

        let raw = inner.read_bytes(&text, 0..text.size())?;
        let rendered = CStr::from_bytes_until_nul(&raw)
            .map_err(|_| Error::Internal("text buffer is not NUL-terminated".into()))?;
        let rendered = rendered
            .to_str()
            .map_err(|e| Error::Internal(format!("text kernel produced invalid UTF-8: {e}")))?;
        Ok(rendered.to_owned())
    }
}
