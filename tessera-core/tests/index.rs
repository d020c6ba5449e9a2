use tessera_core::{Array, DType, Dim4, Error, IndexKey, Indexer, Seq};

fn iota_5x5() -> Array {
    let data: Vec<i32> = (0..25).collect();
    Array::from_slice(&data, Some(Dim4::from([5, 5]))).unwrap()
}

#[test]
fn range_and_single_key_slice() {
    let a = iota_5x5();
    let idx = Indexer::new(vec![IndexKey::from(0..3), IndexKey::from(1)]).unwrap();
    let sliced = a.index(&idx).unwrap();
    assert_eq!(sliced.dims().unwrap().get(), [3, 1, 1, 1]);
    assert_eq!(sliced.rank().unwrap(), 2);
    // Column-major: element (i, j) holds i + 5j.
    assert_eq!(sliced.to_vec::<i32>(false).unwrap(), vec![5, 6, 7]);
}

#[test]
fn fancy_index_through_an_array_key() {
    let a = Array::from_slice(&[10i32, 11, 12, 13, 14], None).unwrap();
    let picks = Array::from_slice(&[0i64, 2, 4], None).unwrap();
    let idx = Indexer::new(vec![IndexKey::from(picks)]).unwrap();

    let dims = idx.assignment_dims(&a.dims().unwrap()).unwrap();
    assert_eq!(dims.get(), [3, 1, 1, 1]);
    assert_eq!(dims.rank(), 1);

    let taken = a.index(&idx).unwrap();
    assert_eq!(taken.dims().unwrap().get(), [3, 1, 1, 1]);
    assert_eq!(taken.to_vec::<i32>(false).unwrap(), vec![10, 12, 14]);
}

#[test]
fn fancy_index_requires_an_integral_array() {
    let a = Array::from_slice(&[10i32, 11, 12], None).unwrap();
    let picks = Array::from_slice(&[0.0f32, 1.0], None).unwrap();
    let idx = Indexer::new(vec![IndexKey::from(picks)]).unwrap();
    assert!(matches!(
        a.index(&idx).unwrap_err().kind(),
        Error::TypeMismatch(_)
    ));
}

#[test]
fn strided_and_reversed_sequences() {
    let a = Array::from_slice(&[0i32, 1, 2, 3, 4], None).unwrap();

    let every_other = Seq::with_step(0..5, 2).unwrap();
    let idx = Indexer::new(vec![every_other.into()]).unwrap();
    assert_eq!(a.index(&idx).unwrap().to_vec::<i32>(false).unwrap(), vec![0, 2, 4]);

    let reversed = Seq::with_step(0..5, -1).unwrap();
    let idx = Indexer::new(vec![reversed.into()]).unwrap();
    assert_eq!(
        a.index(&idx).unwrap().to_vec::<i32>(false).unwrap(),
        vec![4, 3, 2, 1, 0]
    );
}

#[test]
fn negative_single_index_counts_from_the_end() {
    let a = Array::from_slice(&[0i32, 1, 2, 3, 4], None).unwrap();
    let idx = Indexer::new(vec![IndexKey::Single(-1)]).unwrap();
    assert_eq!(a.index(&idx).unwrap().to_vec::<i32>(false).unwrap(), vec![4]);
}

#[test]
fn batch_marker_selects_the_same_elements() {
    let a = iota_5x5();
    let plain = Indexer::new(vec![IndexKey::Range(Seq::span()), IndexKey::from(2)]).unwrap();
    let batched = Indexer::new(vec![IndexKey::Batch(Seq::span()), IndexKey::from(2)]).unwrap();
    assert_eq!(
        a.index(&plain).unwrap().to_vec::<i32>(false).unwrap(),
        a.index(&batched).unwrap().to_vec::<i32>(false).unwrap()
    );
}

#[test]
fn omitted_trailing_keys_select_everything() {
    let a = iota_5x5();
    let idx = Indexer::new(vec![IndexKey::from(1)]).unwrap();
    let row = a.index(&idx).unwrap();
    assert_eq!(row.dims().unwrap().get(), [1, 5, 1, 1]);
    assert_eq!(row.to_vec::<i32>(false).unwrap(), vec![1, 6, 11, 16, 21]);
}

#[test]
fn assign_writes_the_selected_region() {
    let mut a = Array::zeros(Dim4::from([5]), DType::F32).unwrap();
    let value = Array::from_slice(&[9.0f32, 8.0, 7.0], None).unwrap();
    let idx = Indexer::new(vec![IndexKey::from(1..4)]).unwrap();
    a.assign(&idx, &value).unwrap();
    assert_eq!(
        a.to_vec::<f32>(false).unwrap(),
        vec![0.0, 9.0, 8.0, 7.0, 0.0]
    );
}

#[test]
fn assign_into_a_2d_region() {
    let mut a = iota_5x5();
    let value = Array::from_slice(&[0i32; 4], Some(Dim4::from([2, 2]))).unwrap();
    let idx = Indexer::new(vec![IndexKey::from(0..2), IndexKey::from(0..2)]).unwrap();
    a.assign(&idx, &value).unwrap();
    let out = a.to_vec::<i32>(false).unwrap();
    assert_eq!(out[0], 0);
    assert_eq!(out[1], 0);
    assert_eq!(out[5], 0);
    assert_eq!(out[6], 0);
    // Everything outside the region is untouched.
    assert_eq!(out[2], 2);
    assert_eq!(out[12], 12);
}

#[test]
fn assign_rejects_a_mismatched_value_shape() {
    let mut a = Array::zeros(Dim4::from([5]), DType::F32).unwrap();
    let value = Array::from_slice(&[1.0f32, 2.0], None).unwrap();
    let idx = Indexer::new(vec![IndexKey::from(1..4)]).unwrap();
    assert!(matches!(
        a.assign(&idx, &value).unwrap_err().kind(),
        Error::IncompatibleShapes(_)
    ));
}

#[test]
fn aliases_keep_the_old_contents_across_assign() {
    let mut a = Array::from_slice(&[1i32, 2, 3], None).unwrap();
    let alias = a.retain().unwrap();
    let value = Array::from_slice(&[9i32], None).unwrap();
    let idx = Indexer::new(vec![IndexKey::from(0)]).unwrap();
    a.assign(&idx, &value).unwrap();
    assert_eq!(a.to_vec::<i32>(false).unwrap(), vec![9, 2, 3]);
    assert_eq!(alias.to_vec::<i32>(false).unwrap(), vec![1, 2, 3]);
}

#[test]
fn assignment_dims_match_slice_semantics() {
    let parent = Dim4::from([5, 5]);
    let idx = Indexer::new(vec![Seq::with_step(0..5, 2).unwrap().into(), 1.into()]).unwrap();
    assert_eq!(idx.assignment_dims(&parent).unwrap().get(), [3, 1, 1, 1]);

    let reversed = Indexer::new(vec![Seq::with_step(0..5, -1).unwrap().into()]).unwrap();
    assert_eq!(
        reversed.assignment_dims(&parent).unwrap().get(),
        [5, 5, 1, 1]
    );
}
