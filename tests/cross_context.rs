//! Operands from different contexts, and matrices outliving their context.

mod common;

use std::panic::AssertUnwindSafe;

use bronze::prelude::*;
use common::create_context;

fn two_contexts() -> Option<(Context, Context)> {
    Some((create_context()?, create_context()?))
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_default()
}

#[test]
fn test_contexts_have_distinct_ids() {
    let Some((first, second)) = two_contexts() else {
        return;
    };
    assert_ne!(first.id(), second.id());
    assert_eq!(first.clone().id(), first.id());
}

#[test]
fn test_cross_context_operations_fail() {
    let Some((first, second)) = two_contexts() else {
        return;
    };
    let a = first.zeros(4, 4).unwrap();
    let b = second.zeros(4, 4).unwrap();

    assert!(matches!(first.add(&a, &b), Err(Error::CrossContextOperand)));
    assert!(matches!(first.multiply(&a, &b), Err(Error::CrossContextOperand)));
    assert!(matches!(
        second.scalar_multiply(&a, 2.0),
        Err(Error::CrossContextOperand)
    ));
    assert!(matches!(second.to_text(&a), Err(Error::CrossContextOperand)));

    let mut batch = first.batch_from_matrices([&a]).unwrap();
    assert!(matches!(
        first.multiply_batch(&batch, &b),
        Err(Error::CrossContextOperand)
    ));
    assert!(matches!(
        first.multiply_batch_in_place(&mut batch, &b, Side::Right),
        Err(Error::CrossContextOperand)
    ));
    assert!(matches!(
        first.batch_from_matrices([&a, &b]),
        Err(Error::CrossContextOperand)
    ));
}

#[test]
fn test_cross_context_add_operator_panics() {
    let Some((first, second)) = two_contexts() else {
        return;
    };
    let a = first.zeros(2, 2).unwrap();
    let b = second.zeros(2, 2).unwrap();

    let payload = std::panic::catch_unwind(AssertUnwindSafe(|| &a + &b)).unwrap_err();
    assert_eq!(
        panic_message(payload),
        "Adding two matrices from different bronze instances"
    );
}

#[test]
fn test_cross_context_multiply_operator_panics() {
    let Some((first, second)) = two_contexts() else {
        return;
    };
    let a = first.zeros(2, 2).unwrap();
    let b = second.zeros(2, 2).unwrap();

    let payload = std::panic::catch_unwind(AssertUnwindSafe(|| &a * &b)).unwrap_err();
    assert_eq!(panic_message(payload), "Two different bronze instances");
}

#[test]
fn test_matrix_outliving_context() {
    let Some(ctx) = create_context() else {
        return;
    };
    let m = ctx.matrix_from_slice(2, 1, &[1.0, 2.0]).unwrap();
    let ctx_id = ctx.id();
    drop(ctx);

    assert_eq!(m.context_id(), ctx_id);
    assert!(matches!(m.to_vec(), Err(Error::ContextReleased)));
    assert!(matches!(m.get(0, 0), Err(Error::ContextReleased)));
    assert_eq!(
        m.to_string(),
        "<error: The owning bronze instance has been released>"
    );
}
