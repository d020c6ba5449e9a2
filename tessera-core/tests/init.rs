use num_complex::Complex32;
use tessera_core::{Array, DType, Dim4, Error};

macro_rules! test_zeros_dtype {
    ($t:ty, $dtype:expr, $zero:expr, $name:ident) => {
        mod $name {
            use super::*;

            #[test]
            fn zeros() {
                let a = Array::zeros(Dim4::from([3, 4]), $dtype).unwrap();
                assert_eq!(a.dims().unwrap().get(), [3, 4, 1, 1]);
                assert_eq!(a.dtype().unwrap(), $dtype);
                assert_eq!(a.elements().unwrap(), 12);
                assert_eq!(a.to_vec::<$t>(false).unwrap(), vec![$zero; 12]);
            }
        }
    };
}

test_zeros_dtype!(f32, DType::F32, 0.0, zeros_f32);
test_zeros_dtype!(f64, DType::F64, 0.0, zeros_f64);
test_zeros_dtype!(i32, DType::I32, 0, zeros_i32);
test_zeros_dtype!(u8, DType::U8, 0, zeros_u8);
test_zeros_dtype!(bool, DType::Bool, false, zeros_bool);
test_zeros_dtype!(Complex32, DType::C32, Complex32::new(0.0, 0.0), zeros_c32);

#[test]
fn dim4_invariants() {
    let d = Dim4::new(&[2, 3, 4]).unwrap();
    assert_eq!(d.rank(), 3);
    assert_eq!(d.elements(), 24);
    assert_eq!(d.get(), [2, 3, 4, 1]);

    // Trailing explicit 1s are not trimmed from the rank.
    assert_eq!(Dim4::new(&[3]).unwrap().rank(), 1);
    assert_eq!(Dim4::new(&[3, 1]).unwrap().rank(), 2);
    assert_eq!(Dim4::new(&[3, 1]).unwrap().elements(), 3);

    assert!(matches!(
        Dim4::new(&[1, 2, 3, 4, 5]).unwrap_err().kind(),
        Error::InvalidShape(_)
    ));
}

#[test]
fn from_slice_preserves_order() {
    let a = Array::from_slice(&[1.0f32, 2.0, 3.0], None).unwrap();
    assert_eq!(a.to_vec::<f32>(false).unwrap(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn from_slice_collapses_to_1d() {
    let a = Array::from_slice(&[0i32; 6], None).unwrap();
    assert_eq!(a.dims().unwrap().get(), [6, 1, 1, 1]);
    assert_eq!(a.rank().unwrap(), 1);
}

#[test]
fn from_slice_rejects_empty_buffer_without_shape() {
    let err = Array::from_slice::<f32>(&[], None).unwrap_err();
    assert!(matches!(err.kind(), Error::InvalidShape(_)));
}

#[test]
fn from_slice_rejects_wrong_element_count() {
    let err = Array::from_slice(&[1.0f32, 2.0], Some(Dim4::from([3]))).unwrap_err();
    assert!(matches!(err.kind(), Error::InvalidShape(_)));
}

#[test]
fn explicit_dtype_must_match_the_buffer() {
    let err = Array::from_slice_as(&[1.0f32, 2.0], None, DType::F64).unwrap_err();
    assert!(matches!(err.kind(), Error::TypeMismatch(_)));

    let a = Array::from_slice_as(&[1.0f32, 2.0], None, DType::F32).unwrap();
    assert_eq!(a.dtype().unwrap(), DType::F32);
}

#[test]
fn retain_release_round_trip() {
    let a = Array::from_slice(&[1.0f32, 2.0, 3.0], None).unwrap();
    let b = a.retain().unwrap();
    drop(b);
    // The source stays valid after the retained copy is released.
    assert_eq!(a.to_vec::<f32>(false).unwrap(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn retained_copy_outlives_the_source() {
    let a = Array::from_slice(&[7i64, 8, 9], None).unwrap();
    let b = a.retain().unwrap();
    drop(a);
    assert_eq!(b.to_vec::<i64>(false).unwrap(), vec![7, 8, 9]);
}

#[test]
fn clone_goes_through_retain() {
    let a = Array::from_slice(&[1u8, 2], None).unwrap();
    let b = a.clone();
    drop(a);
    assert_eq!(b.to_vec::<u8>(false).unwrap(), vec![1, 2]);
}

#[test]
fn device_pointer_wrap_copies_nothing() {
    let backing = vec![5.0f64, 6.0, 7.0, 8.0];
    let a = unsafe {
        Array::from_device_ptr(
            backing.as_ptr() as *mut std::os::raw::c_void,
            Dim4::from([4]),
            DType::F64,
        )
    }
    .unwrap();
    assert_eq!(a.to_vec::<f64>(false).unwrap(), backing);
    drop(a);
    // The caller still owns the buffer after the handle is gone.
    assert_eq!(backing[0], 5.0);
}

#[test]
fn row_major_extraction_reverses_dimension_order() {
    // Column-major (2, 3): [[1, 3, 5], [2, 4, 6]].
    let a = Array::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], Some(Dim4::from([2, 3]))).unwrap();
    assert_eq!(
        a.to_vec::<f32>(true).unwrap(),
        vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]
    );
    assert_eq!(
        a.to_vec::<f32>(false).unwrap(),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );
}

#[test]
fn empty_array_yields_an_empty_vec() {
    let a = Array::zeros(Dim4::from([0]), DType::F32).unwrap();
    assert_eq!(a.elements().unwrap(), 0);
    assert_eq!(a.to_vec::<f32>(false).unwrap(), Vec::<f32>::new());
    assert_eq!(a.to_vec::<f32>(true).unwrap(), Vec::<f32>::new());
}

#[test]
fn to_vec_checks_the_requested_type() {
    let a = Array::from_slice(&[1i32, 2], None).unwrap();
    assert!(matches!(
        a.to_vec::<f32>(false).unwrap_err().kind(),
        Error::TypeMismatch(_)
    ));
}

#[test]
fn eval_and_sync_are_callable() {
    let a = Array::from_slice(&[1.0f32], None).unwrap();
    a.eval().unwrap();
    tessera_core::sync().unwrap();
    assert_eq!(tessera_core::active_backend().unwrap(), tessera_core::Backend::Cpu);
}
