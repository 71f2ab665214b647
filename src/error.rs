//! Error types for bronze

use thiserror::Error;

/// Result type alias using bronze's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bronze operations
///
/// Every precondition violation is reported as its own variant. The
/// operator overloads on [`Matrix`](crate::Matrix) turn these into panics.
#[derive(Error, Debug)]
pub enum Error {
    /// No suitable compute adapter found
    #[error("No suitable compute adapter found")]
    NoAdapter,

    /// Device request failed, or the adapter cannot honor the requested options
    #[error("Device initialization failed: {0}")]
    DeviceInit(String),

    /// Operands of an elementwise or packing operation differ in shape
    #[error("Matrices must be the same size: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected (width, height)
        expected: (usize, usize),
        /// Actual (width, height)
        got: (usize, usize),
    },

    /// Inner dimensions of a product do not agree
    #[error("Cannot multiply incompatible matrices: {lhs:?} x {rhs:?}")]
    IncompatibleShapes {
        /// Left operand (width, height)
        lhs: (usize, usize),
        /// Right operand (width, height)
        rhs: (usize, usize),
    },

    /// In-place batch multiply requires square operands of one width
    #[error("Not Square: batch elements {batch:?}, matrix {matrix:?}")]
    NonSquareBatch {
        /// Batch element (width, height)
        batch: (usize, usize),
        /// Matrix (width, height)
        matrix: (usize, usize),
    },

    /// Operands were created by different contexts
    #[error("Two different bronze instances")]
    CrossContextOperand,

    /// The context that owns a matrix has been dropped
    #[error("The owning bronze instance has been released")]
    ContextReleased,

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Index out of bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Size of the dimension
        size: usize,
    },

    /// Buffer larger than the device allows
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: u64,
    },

    /// Operation valid but exceeds backend capabilities
    #[error("{backend} limitation: {operation} - {reason}")]
    BackendLimitation {
        /// The backend that has the limitation
        backend: &'static str,
        /// The operation being attempted
        operation: &'static str,
        /// Description of the limitation
        reason: String,
    },

    /// Backend-specific error
    #[error("Backend error: {0}")]
    Backend(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: (usize, usize), got: (usize, usize)) -> Self {
        Self::ShapeMismatch { expected, got }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create a backend limitation error
    pub fn backend_limitation(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::BackendLimitation {
            backend: "wgpu",
            operation,
            reason: reason.into(),
        }
    }
}
