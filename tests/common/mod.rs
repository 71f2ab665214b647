//! Common test utilities
#![allow(dead_code)]

use bronze::prelude::*;
use bronze::{ContextOptions, device};

/// Create a context, returning None if no compute adapter is available
pub fn create_context() -> Option<Context> {
    create_context_with(ContextOptions::default())
}

/// Route library logs to the test output, filtered by `RUST_LOG` (default `warn`)
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Create a context with explicit options, returning None if unavailable
pub fn create_context_with(options: ContextOptions) -> Option<Context> {
    init_tracing();
    if !device::is_available() {
        return None;
    }
    Context::with_options(options).ok()
}

/// Assert two f32 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Row-major reference product: `[m x k] @ [k x n] -> [m x n]`
pub fn reference_matmul(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; m * n];
    for row in 0..m {
        for col in 0..n {
            out[row * n + col] = (0..k).map(|i| a[row * k + i] * b[i * n + col]).sum();
        }
    }
    out
}

/// Deterministic test data: `len` values spread over [-2, 2]
pub fn ramp(len: usize, phase: f32) -> Vec<f32> {
    (0..len)
        .map(|i| ((i as f32 * 0.37 + phase).sin() * 2.0 * 1000.0).round() / 1000.0)
        .collect()
}

/// The 4x4 identity as a column-major transform
pub fn identity_transform() -> Transform {
    let mut t = [[0.0f32; 4]; 4];
    for (i, column) in t.iter_mut().enumerate() {
        column[i] = 1.0;
    }
    t
}
