//! # bronze
//!
//! **GPU-resident dense `f32` matrices with batched matrix kernels on wgpu.**
//!
//! bronze keeps matrices in device memory and runs every operation as a
//! WGSL compute kernel. A [`Context`] owns one device and its queue; every
//! matrix remembers which context created it and refuses to mix with
//! matrices from another.
//!
//! ## Features
//!
//! - **Matrices**: row-major `f32`, element access, 4x4 transform conversion
//! - **Arithmetic**: add, scalar multiply, matrix product
//! - **Batches**: many same-shape matrices in one buffer, multiplied against
//!   a single matrix in one dispatch, out of place or in place
//! - **Random fill** and **GPU-side text rendering** for debugging
//! - **Coherency**: host-visible mirrors on discrete GPUs, one mappable
//!   buffer on unified-memory adapters
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bronze::prelude::*;
//!
//! let ctx = Context::new()?;
//! let a = ctx.matrix_from_slice(2, 2, &[1.0, 2.0, 3.0, 4.0])?;
//! let b = ctx.random_matrix(2, 2)?;
//!
//! let c = &a + &b;
//! let d = ctx.multiply(&a, &c)?;
//! println!("{d}");
//! ```
//!
//! ## Logging
//!
//! Diagnostics go through `tracing`: context initialization at `info`,
//! pipeline compilation at `debug`, each dispatch at `trace`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod context;
pub mod device;
pub mod error;
pub mod matrix;
pub mod ops;
pub mod options;
pub mod shaders;
mod storage;

pub use batch::MatrixBatch;
pub use context::Context;
pub use device::{AdapterDescription, CoherencyMode};
pub use error::{Error, Result};
pub use matrix::{Matrix, Transform};
pub use options::ContextOptions;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::batch::MatrixBatch;
    pub use crate::context::Context;
    pub use crate::device::CoherencyMode;
    pub use crate::error::{Error, Result};
    pub use crate::matrix::{Matrix, Transform};
    pub use crate::ops::{BatchOps, MatrixOps, RandomOps, Side, TextOps};
    pub use crate::options::ContextOptions;
}
