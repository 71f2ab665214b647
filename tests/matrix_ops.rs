//! Single-matrix operations on the GPU.

mod common;

use std::panic::AssertUnwindSafe;

use bronze::prelude::*;
use common::{assert_allclose_f32, create_context, ramp, reference_matmul};

#[test]
fn test_zeros_are_zero() {
    let Some(ctx) = create_context() else {
        return;
    };
    let m = ctx.zeros(5, 3).unwrap();
    assert_eq!((m.width(), m.height(), m.len()), (5, 3, 15));
    assert!(m.to_vec().unwrap().iter().all(|&v| v == 0.0));
}

#[test]
fn test_get_set_round_trip() {
    let Some(ctx) = create_context() else {
        return;
    };
    let mut m = ctx.zeros(3, 2).unwrap();
    m.set(1, 2, 7.5).unwrap();
    m.set(0, 0, -1.25).unwrap();

    assert_eq!(m.get(1, 2).unwrap(), 7.5);
    assert_eq!(m.get(0, 0).unwrap(), -1.25);
    assert_eq!(
        m.to_vec().unwrap(),
        vec![-1.25, 0.0, 0.0, 0.0, 0.0, 7.5]
    );
}

#[test]
fn test_get_out_of_bounds() {
    let Some(ctx) = create_context() else {
        return;
    };
    let m = ctx.zeros(3, 2).unwrap();
    assert!(matches!(
        m.get(2, 0),
        Err(Error::IndexOutOfBounds { index: 2, size: 2 })
    ));
    assert!(matches!(
        m.get(0, 3),
        Err(Error::IndexOutOfBounds { index: 3, size: 3 })
    ));
}

#[test]
fn test_from_slice_length_checked() {
    let Some(ctx) = create_context() else {
        return;
    };
    assert!(matches!(
        ctx.matrix_from_slice(2, 2, &[1.0, 2.0, 3.0]),
        Err(Error::InvalidArgument { arg: "data", .. })
    ));
    assert!(matches!(
        ctx.zeros(0, 4),
        Err(Error::InvalidArgument { arg: "width", .. })
    ));
}

#[test]
fn test_add() {
    let Some(ctx) = create_context() else {
        return;
    };
    let a = ctx.matrix_from_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    let b = ctx.matrix_from_slice(2, 2, &[10.0, 20.0, 30.0, 40.0]).unwrap();

    let c = ctx.add(&a, &b).unwrap();
    assert_eq!(c.to_vec().unwrap(), vec![11.0, 22.0, 33.0, 44.0]);

    let d = &a + &b;
    assert_eq!(d.to_vec().unwrap(), vec![11.0, 22.0, 33.0, 44.0]);
}

#[test]
fn test_add_large_folds_grid() {
    let Some(ctx) = create_context() else {
        return;
    };
    let (w, h) = (1000, 300);
    let a_data = ramp(w * h, 0.0);
    let b_data = ramp(w * h, 1.0);
    let a = ctx.matrix_from_slice(w, h, &a_data).unwrap();
    let b = ctx.matrix_from_slice(w, h, &b_data).unwrap();

    let expected: Vec<f32> = a_data.iter().zip(&b_data).map(|(x, y)| x + y).collect();
    let c = ctx.add(&a, &b).unwrap();
    assert_allclose_f32(&c.to_vec().unwrap(), &expected, 1e-6, 1e-6, "large add");
}

#[test]
fn test_add_shape_mismatch() {
    let Some(ctx) = create_context() else {
        return;
    };
    let a = ctx.zeros(2, 3).unwrap();
    let b = ctx.zeros(3, 2).unwrap();
    let err = ctx.add(&a, &b).unwrap_err();
    assert!(matches!(
        err,
        Error::ShapeMismatch {
            expected: (2, 3),
            got: (3, 2)
        }
    ));
    assert!(err.to_string().starts_with("Matrices must be the same size"));
}

#[test]
fn test_add_operator_panics_on_mismatch() {
    let Some(ctx) = create_context() else {
        return;
    };
    let a = ctx.zeros(2, 3).unwrap();
    let b = ctx.zeros(3, 2).unwrap();

    let panic = std::panic::catch_unwind(AssertUnwindSafe(|| &a + &b)).unwrap_err();
    let message = panic
        .downcast_ref::<String>()
        .cloned()
        .unwrap_or_default();
    assert!(message.starts_with("Matrices must be the same size"), "{message}");
}

#[test]
fn test_scalar_multiply() {
    let Some(ctx) = create_context() else {
        return;
    };
    let a = ctx.matrix_from_slice(3, 1, &[1.0, -2.0, 0.5]).unwrap();
    let b = ctx.scalar_multiply(&a, 4.0).unwrap();
    assert_eq!(b.to_vec().unwrap(), vec![4.0, -8.0, 2.0]);

    let c = &a * -1.0;
    assert_eq!(c.to_vec().unwrap(), vec![-1.0, 2.0, -0.5]);
}

#[test]
fn test_scalar_multiply_by_zero_and_one() {
    let Some(ctx) = create_context() else {
        return;
    };
    let data = ramp(12, 0.7);
    let a = ctx.matrix_from_slice(4, 3, &data).unwrap();
    assert_eq!(ctx.scalar_multiply(&a, 1.0).unwrap().to_vec().unwrap(), data);
    assert!(ctx
        .scalar_multiply(&a, 0.0)
        .unwrap()
        .to_vec()
        .unwrap()
        .iter()
        .all(|&v| v == 0.0));
}

#[test]
fn test_identity_product_is_noop() {
    let Some(ctx) = create_context() else {
        return;
    };
    let n = 5;
    let mut identity = vec![0.0f32; n * n];
    for i in 0..n {
        identity[i * n + i] = 1.0;
    }
    let data = ramp(n * 3, 0.1);
    let id = ctx.matrix_from_slice(n, n, &identity).unwrap();
    let m = ctx.matrix_from_slice(n, 3, &data).unwrap();
    assert_eq!(ctx.multiply(&m, &id).unwrap().to_vec().unwrap(), data);

    let id3 = ctx
        .matrix_from_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
        .unwrap();
    assert_eq!(ctx.multiply(&id3, &m).unwrap().to_vec().unwrap(), data);
}

#[test]
fn test_multiply_square() {
    let Some(ctx) = create_context() else {
        return;
    };
    let a = ctx.matrix_from_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    let b = ctx.matrix_from_slice(2, 2, &[5.0, 6.0, 7.0, 8.0]).unwrap();

    let c = ctx.multiply(&a, &b).unwrap();
    assert_eq!(c.to_vec().unwrap(), vec![19.0, 22.0, 43.0, 50.0]);

    let d = &a * &b;
    assert_eq!(d.to_vec().unwrap(), vec![19.0, 22.0, 43.0, 50.0]);
}

#[test]
fn test_multiply_rectangular_shape() {
    let Some(ctx) = create_context() else {
        return;
    };
    // A: 3 rows x 2 cols, B: 2 rows x 4 cols
    let a_data = ramp(6, 0.0);
    let b_data = ramp(8, 2.0);
    let a = ctx.matrix_from_slice(2, 3, &a_data).unwrap();
    let b = ctx.matrix_from_slice(4, 2, &b_data).unwrap();

    let c = ctx.multiply(&a, &b).unwrap();
    assert_eq!((c.width(), c.height()), (4, 3));

    let expected = reference_matmul(&a_data, &b_data, 3, 2, 4);
    assert_allclose_f32(&c.to_vec().unwrap(), &expected, 1e-5, 1e-5, "rectangular matmul");
}

#[test]
fn test_multiply_wide_output() {
    let Some(ctx) = create_context() else {
        return;
    };
    // Output wider than one workgroup row
    let (m, k, n) = (7, 5, 300);
    let a_data = ramp(m * k, 0.3);
    let b_data = ramp(k * n, 0.9);
    let a = ctx.matrix_from_slice(k, m, &a_data).unwrap();
    let b = ctx.matrix_from_slice(n, k, &b_data).unwrap();

    let c = ctx.multiply(&a, &b).unwrap();
    let expected = reference_matmul(&a_data, &b_data, m, k, n);
    assert_allclose_f32(&c.to_vec().unwrap(), &expected, 1e-5, 1e-4, "wide matmul");
}

#[test]
fn test_multiply_incompatible() {
    let Some(ctx) = create_context() else {
        return;
    };
    let a = ctx.zeros(3, 2).unwrap();
    let b = ctx.zeros(3, 2).unwrap();
    let err = ctx.multiply(&a, &b).unwrap_err();
    assert!(matches!(err, Error::IncompatibleShapes { .. }));
    assert!(err.to_string().starts_with("Cannot multiply incompatible matrices"));
}

#[test]
fn test_random_matrix_in_unit_interval() {
    let Some(ctx) = create_context() else {
        return;
    };
    let m = ctx.random_matrix(64, 64).unwrap();
    let values = m.to_vec().unwrap();
    assert!(values.iter().all(|v| (0.0..1.0).contains(v)));

    let mean = values.iter().sum::<f32>() / values.len() as f32;
    assert!((mean - 0.5).abs() < 0.05, "mean {mean}");
}

#[test]
fn test_random_matrix_reseeds_each_call() {
    let Some(ctx) = create_context() else {
        return;
    };
    let a = ctx.random_matrix(8, 8).unwrap().to_vec().unwrap();
    let b = ctx.random_matrix(8, 8).unwrap().to_vec().unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_transform_layout() {
    let Some(ctx) = create_context() else {
        return;
    };
    let mut t = [[0.0f32; 4]; 4];
    // Translation lives in the last column
    t[3] = [5.0, 6.0, 7.0, 1.0];
    t[0][0] = 1.0;
    t[1][1] = 1.0;
    t[2][2] = 1.0;

    let m = ctx.matrix_from_transform(&t).unwrap();
    assert_eq!(m.get(0, 3).unwrap(), 5.0);
    assert_eq!(m.get(1, 3).unwrap(), 6.0);
    assert_eq!(m.get(3, 0).unwrap(), 0.0);
    assert_eq!(m.to_transform().unwrap(), t);
}

#[test]
fn test_operations_reuse_pipelines() {
    let Some(ctx) = create_context() else {
        return;
    };
    let a = ctx.matrix_from_slice(2, 2, &[1.0; 4]).unwrap();
    let _ = ctx.add(&a, &a).unwrap();
    let after_first = ctx.cached_pipelines();
    let _ = ctx.add(&a, &a).unwrap();
    assert_eq!(ctx.cached_pipelines(), after_first);
}

#[test]
fn test_growing_sizes_in_one_context() {
    let Some(ctx) = create_context() else {
        return;
    };
    // Each size gets its own workgroup width
    for n in 1..=6 {
        let data: Vec<f32> = (1..=n).map(|i| i as f32).collect();
        let a = ctx.matrix_from_slice(n, 1, &data).unwrap();

        let doubled: Vec<f32> = data.iter().map(|v| v * 2.0).collect();
        assert_eq!(ctx.add(&a, &a).unwrap().to_vec().unwrap(), doubled, "add n={n}");
        assert_eq!(
            ctx.scalar_multiply(&a, 2.0).unwrap().to_vec().unwrap(),
            doubled,
            "scalar n={n}"
        );

        let column = ctx.matrix_from_slice(1, n, &data).unwrap();
        let outer = ctx.multiply(&column, &a).unwrap();
        let expected = reference_matmul(&data, &data, n, 1, n);
        assert_eq!(outer.to_vec().unwrap(), expected, "multiply n={n}");

        let random = ctx.random_matrix(n, 1).unwrap().to_vec().unwrap();
        assert!(random.iter().all(|v| (0.0..1.0).contains(v)), "random n={n}");
    }
}
