use tessera_core::{
    abs, add, apply, div, mul, neg, sub, with_broadcast, Array, BinaryOp, DType, Dim4, Error,
};

#[test]
fn scalar_add_keeps_shape_and_dtype() {
    let data: Vec<f32> = (0..9).map(|i| i as f32).collect();
    let a = Array::from_slice(&data, Some(Dim4::from([3, 3]))).unwrap();
    let b = add(&a, 2.0f64).unwrap();
    assert_eq!(b.dims().unwrap().get(), [3, 3, 1, 1]);
    assert_eq!(b.dtype().unwrap(), DType::F32);
    let expected: Vec<f32> = data.iter().map(|x| x + 2.0).collect();
    assert_eq!(b.to_vec::<f32>(false).unwrap(), expected);
}

#[test]
fn array_array_elementwise() {
    let a = Array::from_slice(&[1.0f32, 2.0, 3.0, 4.0], Some(Dim4::from([2, 2]))).unwrap();
    let b = Array::from_slice(&[4.0f32, 3.0, 2.0, 1.0], Some(Dim4::from([2, 2]))).unwrap();
    assert_eq!(
        add(&a, &b).unwrap().to_vec::<f32>(false).unwrap(),
        vec![5.0; 4]
    );
    assert_eq!(
        sub(&a, &b).unwrap().to_vec::<f32>(false).unwrap(),
        vec![-3.0, -1.0, 1.0, 3.0]
    );
    assert_eq!(
        mul(&a, &b).unwrap().to_vec::<f32>(false).unwrap(),
        vec![4.0, 6.0, 6.0, 4.0]
    );
    assert_eq!(
        div(&a, &b).unwrap().to_vec::<f32>(false).unwrap(),
        vec![0.25, 2.0 / 3.0, 1.5, 4.0]
    );
}

#[test]
fn scalar_side_is_preserved() {
    let a = Array::from_slice(&[1.0f32, 2.0, 4.0], None).unwrap();
    let left = sub(10.0f32, &a).unwrap();
    assert_eq!(left.to_vec::<f32>(false).unwrap(), vec![9.0, 8.0, 6.0]);
    let right = sub(&a, 10.0f32).unwrap();
    assert_eq!(right.to_vec::<f32>(false).unwrap(), vec![-9.0, -8.0, -6.0]);
}

#[test]
fn int_scalar_promotes_through_i64() {
    let a = Array::from_slice(&[1i32, 2, 3], None).unwrap();
    let b = add(&a, 2i32).unwrap();
    // The materialized constant is i64, so the native op promotes the pair.
    assert_eq!(b.dtype().unwrap(), DType::I64);
    assert_eq!(b.to_vec::<i64>(false).unwrap(), vec![3, 4, 5]);
}

#[test]
fn int_scalar_next_to_f32_stays_f32() {
    let a = Array::from_slice(&[1.0f32, 2.0], None).unwrap();
    let b = add(&a, 3i32).unwrap();
    assert_eq!(b.dtype().unwrap(), DType::F32);
    assert_eq!(b.to_vec::<f32>(false).unwrap(), vec![4.0, 5.0]);
}

#[test]
fn two_scalars_are_rejected_before_any_native_call() {
    let err = apply(2.0f32, 3.0f32, BinaryOp::Add).unwrap_err();
    assert!(matches!(err.kind(), Error::InvalidOperand(_)));
}

#[test]
fn broadcast_mode_gates_shape_expansion() {
    let col = Array::from_slice(&[1.0f32, 2.0, 3.0], Some(Dim4::from([3, 1]))).unwrap();
    let mat = Array::from_slice(
        &(0..12).map(|i| i as f32).collect::<Vec<_>>(),
        Some(Dim4::from([3, 4])),
    )
    .unwrap();

    // Outside a broadcast scope the mismatch is an error.
    let err = add(&col, &mat).unwrap_err();
    assert!(matches!(err.kind(), Error::IncompatibleShapes(_)));

    // Inside the scope the same call succeeds with the broadcast shape.
    let sum = with_broadcast(|| add(&col, &mat)).unwrap();
    assert_eq!(sum.dims().unwrap().get(), [3, 4, 1, 1]);
    let expected: Vec<f32> = (0..12)
        .map(|i| i as f32 + (i % 3 + 1) as f32)
        .collect();
    assert_eq!(sum.to_vec::<f32>(false).unwrap(), expected);

    // The scope restored the flag, so the mismatch fails again.
    assert!(add(&col, &mat).is_err());
}

#[test]
fn unary_ops() {
    let a = Array::from_slice(&[-2.0f32, 0.5, 3.0], None).unwrap();
    assert_eq!(
        neg(&a).unwrap().to_vec::<f32>(false).unwrap(),
        vec![2.0, -0.5, -3.0]
    );
    assert_eq!(
        abs(&a).unwrap().to_vec::<f32>(false).unwrap(),
        vec![2.0, 0.5, 3.0]
    );
}

#[test]
fn negating_an_unsigned_array_is_a_type_error() {
    let a = Array::from_slice(&[1u32, 2], None).unwrap();
    assert!(matches!(
        neg(&a).unwrap_err().kind(),
        Error::TypeMismatch(_)
    ));
}
