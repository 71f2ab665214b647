//! WGSL kernel library, pipeline cache and dispatch geometry.

pub mod grid;
pub mod kernels_wgsl;
pub mod pipeline;

pub use grid::{Grid, ThreadLimits};
pub use pipeline::{Kernel, LayoutKey, PipelineCache};
