//! Matrix operations
//!
//! Operations are defined as traits implemented by [`Context`](crate::Context),
//! which owns the queue and pipelines needed to allocate and dispatch.
//!
//! ```text
//! Context
//!   ├── MatrixOps   add, scalar_multiply, multiply
//!   ├── BatchOps    multiply_batch, multiply_batch_in_place
//!   ├── RandomOps   random_matrix
//!   └── TextOps     to_text
//! ```
//!
//! # Dispatch protocol
//!
//! Every operation validates its operands, allocates its output, records
//! one compute pass into a fresh command encoder, appends the synchronize
//! copy when the context runs in managed mode, submits and blocks until
//! the submission completes. No operation returns while GPU work it issued
//! is still in flight.

mod arithmetic;
mod batch;
mod launch;
mod random;
mod text;
mod traits;

pub use traits::{BatchOps, MatrixOps, RandomOps, Side, TextOps};

/// Largest per-element output [`BatchOps::multiply_batch`] accepts
pub const MAX_BATCH_ELEMENT: usize = 1024;

/// Bytes of text reserved per rendered element
pub const TEXT_BYTES_PER_ELEMENT: usize = 14;
