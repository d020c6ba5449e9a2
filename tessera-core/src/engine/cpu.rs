//! Reference CPU engine.
//!
//! Implements the `ts_*` ABI in-process over a global handle registry so the
//! runtime works without an accelerated library. Storage is reference-counted
//! here, at the native layer: retain registers a new handle sharing the same
//! buffer, release drops one alias, and the buffer is freed when the last
//! alias goes away. Execution is eager; `ts_eval`/`ts_sync` only validate.

use std::cell::RefCell;
use std::collections::HashMap;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex};

use num_complex::{Complex32, Complex64};
use rayon::prelude::*;

use crate::dtype::DType;
use crate::index::resolve_seq;

use super::{
    IndexSlot, NativeHandle, TS_BACKEND_CPU, TS_ERR_ALLOC, TS_ERR_ARG, TS_ERR_HANDLE, TS_ERR_INDEX,
    TS_ERR_SHAPE, TS_ERR_TYPE, TS_ERR_UNSUPPORTED, TS_OP_ABS, TS_OP_ADD, TS_OP_DIV, TS_OP_MUL,
    TS_OP_NEG, TS_OP_SUB, TS_SLOT_ARRAY, TS_SLOT_SEQ, TS_SUCCESS,
};

#[derive(Clone)]
enum Buffer {
    Owned(Arc<Vec<u8>>),
    External(ExternalBuf),
}

#[derive(Clone, Copy)]
struct ExternalBuf {
    ptr: *const u8,
    len: usize,
}

// The engine never frees or reallocates an external buffer; the caller keeps
// it alive and valid for the lifetime of the wrapping handle.
unsafe impl Send for ExternalBuf {}

impl Buffer {
    fn bytes(&self) -> &[u8] {
        match self {
            Buffer::Owned(v) => v,
            Buffer::External(ext) => unsafe { std::slice::from_raw_parts(ext.ptr, ext.len) },
        }
    }
}

#[derive(Clone)]
struct Entry {
    data: Buffer,
    dims: [u64; 4],
    ndims: u32,
    dtype: DType,
}

impl Entry {
    fn elements(&self) -> u64 {
        self.dims.iter().product()
    }
}

static REGISTRY: LazyLock<Mutex<HashMap<NativeHandle, Entry>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));
static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

fn fail(code: i32, message: impl Into<String>) -> i32 {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message.into());
    code
}

fn register(entry: Entry) -> NativeHandle {
    let handle = NEXT_HANDLE.fetch_add(1, Ordering::Relaxed);
    REGISTRY.lock().unwrap().insert(handle, entry);
    handle
}

fn lookup(handle: NativeHandle) -> Option<Entry> {
    REGISTRY.lock().unwrap().get(&handle).cloned()
}

/// Column-major strides: slot 0 varies fastest.
fn strides(dims: &[u64; 4]) -> [u64; 4] {
    let mut s = [1u64; 4];
    for k in 1..4 {
        s[k] = s[k - 1] * dims[k - 1];
    }
    s
}

/// Strides for reading an operand under an output shape; size-1 axes repeat.
fn broadcast_strides(dims: &[u64; 4], out: &[u64; 4]) -> [u64; 4] {
    let s = strides(dims);
    let mut r = [0u64; 4];
    for k in 0..4 {
        r[k] = if dims[k] == out[k] { s[k] } else { 0 };
    }
    r
}

trait Elem: bytemuck::Pod + Send + Sync {
    const DTYPE: DType;

    fn from_parts(re: f64, im: f64) -> Self;
    fn to_parts(self) -> (f64, f64);
    fn binary(op: i32, a: Self, b: Self) -> Option<Self>;
    fn unary(op: i32, a: Self) -> Option<Self>;
    fn as_index(self) -> Option<i64>;
}

/// Boolean storage element. One byte, values 0 and 1.
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(transparent)]
struct B8(u8);

impl Elem for B8 {
    const DTYPE: DType = DType::Bool;

    fn from_parts(re: f64, _im: f64) -> Self {
        B8((re != 0.0) as u8)
    }

    fn to_parts(self) -> (f64, f64) {
        (self.0 as f64, 0.0)
    }

    fn binary(op: i32, a: Self, b: Self) -> Option<Self> {
        match op {
            TS_OP_ADD => Some(B8(((a.0 | b.0) != 0) as u8)),
            TS_OP_MUL => Some(B8(((a.0 & b.0) != 0) as u8)),
            _ => None,
        }
    }

    fn unary(op: i32, a: Self) -> Option<Self> {
        match op {
            TS_OP_ABS => Some(a),
            _ => None,
        }
    }

    fn as_index(self) -> Option<i64> {
        None
    }
}

macro_rules! signed_elem {
    ($t:ty, $dtype:expr) => {
        impl Elem for $t {
            const DTYPE: DType = $dtype;

            fn from_parts(re: f64, _im: f64) -> Self {
                re as $t
            }

            fn to_parts(self) -> (f64, f64) {
                (self as f64, 0.0)
            }

            fn binary(op: i32, a: Self, b: Self) -> Option<Self> {
                match op {
                    TS_OP_ADD => Some(a.wrapping_add(b)),
                    TS_OP_SUB => Some(a.wrapping_sub(b)),
                    TS_OP_MUL => Some(a.wrapping_mul(b)),
                    // Integer division by zero yields zero.
                    TS_OP_DIV => Some(a.checked_div(b).unwrap_or(0)),
                    _ => None,
                }
            }

            fn unary(op: i32, a: Self) -> Option<Self> {
                match op {
                    TS_OP_NEG => Some(a.wrapping_neg()),
                    TS_OP_ABS => Some(a.wrapping_abs()),
                    _ => None,
                }
            }

            fn as_index(self) -> Option<i64> {
                Some(self as i64)
            }
        }
    };
}

macro_rules! unsigned_elem {
    ($t:ty, $dtype:expr) => {
        impl Elem for $t {
            const DTYPE: DType = $dtype;

            fn from_parts(re: f64, _im: f64) -> Self {
                re as $t
            }

            fn to_parts(self) -> (f64, f64) {
                (self as f64, 0.0)
            }

            fn binary(op: i32, a: Self, b: Self) -> Option<Self> {
                match op {
                    TS_OP_ADD => Some(a.wrapping_add(b)),
                    TS_OP_SUB => Some(a.wrapping_sub(b)),
                    TS_OP_MUL => Some(a.wrapping_mul(b)),
                    TS_OP_DIV => Some(a.checked_div(b).unwrap_or(0)),
                    _ => None,
                }
            }

            fn unary(op: i32, a: Self) -> Option<Self> {
                match op {
                    TS_OP_ABS => Some(a),
                    _ => None,
                }
            }

            fn as_index(self) -> Option<i64> {
                Some(self as i64)
            }
        }
    };
}

macro_rules! float_elem {
    ($t:ty, $dtype:expr) => {
        impl Elem for $t {
            const DTYPE: DType = $dtype;

            fn from_parts(re: f64, _im: f64) -> Self {
                re as $t
            }

            fn to_parts(self) -> (f64, f64) {
                (self as f64, 0.0)
            }

            fn binary(op: i32, a: Self, b: Self) -> Option<Self> {
                match op {
                    TS_OP_ADD => Some(a + b),
                    TS_OP_SUB => Some(a - b),
                    TS_OP_MUL => Some(a * b),
                    TS_OP_DIV => Some(a / b),
                    _ => None,
                }
            }

            fn unary(op: i32, a: Self) -> Option<Self> {
                match op {
                    TS_OP_NEG => Some(-a),
                    TS_OP_ABS => Some(a.abs()),
                    _ => None,
                }
            }

            fn as_index(self) -> Option<i64> {
                None
            }
        }
    };
}

macro_rules! complex_elem {
    ($t:ty, $f:ty, $dtype:expr) => {
        impl Elem for $t {
            const DTYPE: DType = $dtype;

            fn from_parts(re: f64, im: f64) -> Self {
                <$t>::new(re as $f, im as $f)
            }

            fn to_parts(self) -> (f64, f64) {
                (self.re as f64, self.im as f64)
            }

            fn binary(op: i32, a: Self, b: Self) -> Option<Self> {
                match op {
                    TS_OP_ADD => Some(a + b),
                    TS_OP_SUB => Some(a - b),
                    TS_OP_MUL => Some(a * b),
                    TS_OP_DIV => Some(a / b),
                    _ => None,
                }
            }

            fn unary(op: i32, a: Self) -> Option<Self> {
                match op {
                    TS_OP_NEG => Some(-a),
                    _ => None,
                }
            }

            fn as_index(self) -> Option<i64> {
                None
            }
        }
    };
}

signed_elem!(i8, DType::I8);
signed_elem!(i16, DType::I16);
signed_elem!(i32, DType::I32);
signed_elem!(i64, DType::I64);
unsigned_elem!(u8, DType::U8);
unsigned_elem!(u16, DType::U16);
unsigned_elem!(u32, DType::U32);
unsigned_elem!(u64, DType::U64);
float_elem!(f32, DType::F32);
float_elem!(f64, DType::F64);
complex_elem!(Complex32, f32, DType::C32);
complex_elem!(Complex64, f64, DType::C64);

macro_rules! with_elem {
    ($dtype:expr, $T:ident, $body:block) => {
        match $dtype {
            DType::F64 => {
                type $T = f64;
                $body
            }
            DType::F32 => {
                type $T = f32;
                $body
            }
            DType::I64 => {
                type $T = i64;
                $body
            }
            DType::I32 => {
                type $T = i32;
                $body
            }
            DType::I16 => {
                type $T = i16;
                $body
            }
            DType::I8 => {
                type $T = i8;
                $body
            }
            DType::U64 => {
                type $T = u64;
                $body
            }
            DType::U32 => {
                type $T = u32;
                $body
            }
            DType::U16 => {
                type $T = u16;
                $body
            }
            DType::U8 => {
                type $T = u8;
                $body
            }
            DType::Bool => {
                type $T = B8;
                $body
            }
            DType::C32 => {
                type $T = Complex32;
                $body
            }
            DType::C64 => {
                type $T = Complex64;
                $body
            }
        }
    };
}

/// Materialize an entry's storage as typed elements. Copies, so alignment of
/// the underlying byte buffer never matters.
fn typed<T: Elem>(entry: &Entry) -> Vec<T> {
    bytemuck::pod_collect_to_vec(entry.data.bytes())
}

/// Materialize an entry's storage as `TO` elements, converting through the
/// element's (real, imaginary) parts when the stored dtype differs.
fn cast_entry<TO: Elem>(entry: &Entry) -> Vec<TO> {
    if entry.dtype == TO::DTYPE {
        return typed(entry);
    }
    with_elem!(entry.dtype, FROM, {
        typed::<FROM>(entry)
            .into_iter()
            .map(|v| {
                let (re, im) = v.to_parts();
                TO::from_parts(re, im)
            })
            .collect()
    })
}

fn store<T: Elem>(values: Vec<T>, dims: [u64; 4], ndims: u32) -> NativeHandle {
    let bytes = bytemuck::cast_slice(&values).to_vec();
    register(Entry {
        data: Buffer::Owned(Arc::new(bytes)),
        dims,
        ndims,
        dtype: T::DTYPE,
    })
}

fn read_dims(dims: *const u64, ndims: u32) -> [u64; 4] {
    let mut slots = [1u64; 4];
    for (k, slot) in slots.iter_mut().enumerate().take(ndims as usize) {
        *slot = unsafe { *dims.add(k) };
    }
    slots
}

#[no_mangle]
pub unsafe extern "C" fn ts_create_array(
    out: *mut NativeHandle,
    dims: *const u64,
    ndims: u32,
    dtype: i32,
) -> i32 {
    if out.is_null() || dims.is_null() || ndims > 4 {
        return fail(TS_ERR_ARG, "bad argument to ts_create_array");
    }
    let Ok(dtype) = DType::try_from_native(dtype) else {
        return fail(TS_ERR_TYPE, format!("unknown dtype code {dtype}"));
    };
    let slots = read_dims(dims, ndims);
    let elements: u64 = slots.iter().product();
    let Some(nbytes) = elements.checked_mul(dtype.size_of() as u64) else {
        return fail(TS_ERR_ALLOC, "allocation size overflow");
    };
    if nbytes > isize::MAX as u64 {
        return fail(TS_ERR_ALLOC, format!("cannot allocate {nbytes} bytes"));
    }
    let handle = register(Entry {
        data: Buffer::Owned(Arc::new(vec![0u8; nbytes as usize])),
        dims: slots,
        ndims,
        dtype,
    });
    tracing::trace!(handle, dtype = %dtype, "allocated array");
    *out = handle;
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_create_from_host(
    out: *mut NativeHandle,
    data: *const u8,
    nbytes: u64,
    dims: *const u64,
    ndims: u32,
    dtype: i32,
) -> i32 {
    if out.is_null() || dims.is_null() || ndims > 4 || (data.is_null() && nbytes > 0) {
        return fail(TS_ERR_ARG, "bad argument to ts_create_from_host");
    }
    let Ok(dtype) = DType::try_from_native(dtype) else {
        return fail(TS_ERR_TYPE, format!("unknown dtype code {dtype}"));
    };
    let slots = read_dims(dims, ndims);
    let elements: u64 = slots.iter().product();
    let Some(expected) = elements.checked_mul(dtype.size_of() as u64) else {
        return fail(TS_ERR_ALLOC, "allocation size overflow");
    };
    if nbytes != expected {
        return fail(
            TS_ERR_ARG,
            format!("host buffer holds {nbytes} bytes, shape expects {expected}"),
        );
    }
    let bytes = if nbytes == 0 {
        Vec::new()
    } else {
        std::slice::from_raw_parts(data, nbytes as usize).to_vec()
    };
    let handle = register(Entry {
        data: Buffer::Owned(Arc::new(bytes)),
        dims: slots,
        ndims,
        dtype,
    });
    *out = handle;
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_wrap_device_ptr(
    out: *mut NativeHandle,
    ptr: *const c_void,
    dims: *const u64,
    ndims: u32,
    dtype: i32,
) -> i32 {
    if out.is_null() || dims.is_null() || ndims > 4 {
        return fail(TS_ERR_ARG, "bad argument to ts_wrap_device_ptr");
    }
    if ptr.is_null() {
        return fail(TS_ERR_ARG, "null device pointer");
    }
    let Ok(dtype) = DType::try_from_native(dtype) else {
        return fail(TS_ERR_TYPE, format!("unknown dtype code {dtype}"));
    };
    let slots = read_dims(dims, ndims);
    let elements: u64 = slots.iter().product();
    let Some(nbytes) = elements.checked_mul(dtype.size_of() as u64) else {
        return fail(TS_ERR_ALLOC, "buffer size overflow");
    };
    let handle = register(Entry {
        data: Buffer::External(ExternalBuf {
            ptr: ptr as *const u8,
            len: nbytes as usize,
        }),
        dims: slots,
        ndims,
        dtype,
    });
    tracing::trace!(handle, "wrapped external buffer");
    *out = handle;
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_retain_array(out: *mut NativeHandle, handle: NativeHandle) -> i32 {
    if out.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_retain_array");
    }
    let Some(entry) = lookup(handle) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {handle}"));
    };
    *out = register(entry);
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_release_array(handle: NativeHandle) -> i32 {
    // Releasing an unknown or already-released handle is a no-op.
    let removed = REGISTRY.lock().unwrap().remove(&handle);
    if removed.is_some() {
        tracing::trace!(handle, "released array");
    }
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_get_dims(
    dims_out: *mut u64,
    ndims_out: *mut u32,
    handle: NativeHandle,
) -> i32 {
    if dims_out.is_null() || ndims_out.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_get_dims");
    }
    let Some(entry) = lookup(handle) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {handle}"));
    };
    for (k, d) in entry.dims.iter().enumerate() {
        *dims_out.add(k) = *d;
    }
    *ndims_out = entry.ndims;
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_get_dtype(out: *mut i32, handle: NativeHandle) -> i32 {
    if out.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_get_dtype");
    }
    let Some(entry) = lookup(handle) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {handle}"));
    };
    *out = entry.dtype.native_code();
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_get_elements(out: *mut u64, handle: NativeHandle) -> i32 {
    if out.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_get_elements");
    }
    let Some(entry) = lookup(handle) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {handle}"));
    };
    *out = entry.elements();
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_copy_to_host(dst: *mut u8, handle: NativeHandle) -> i32 {
    let Some(entry) = lookup(handle) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {handle}"));
    };
    let bytes = entry.data.bytes();
    if bytes.is_empty() {
        return TS_SUCCESS;
    }
    if dst.is_null() {
        return fail(TS_ERR_ARG, "null destination buffer");
    }
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_reorder(
    out: *mut NativeHandle,
    handle: NativeHandle,
    perm: *const u32,
) -> i32 {
    if out.is_null() || perm.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_reorder");
    }
    let mut p = [0u32; 4];
    for (k, slot) in p.iter_mut().enumerate() {
        *slot = *perm.add(k);
    }
    let mut seen = [false; 4];
    for &axis in &p {
        if axis > 3 || seen[axis as usize] {
            return fail(TS_ERR_ARG, format!("invalid permutation {p:?}"));
        }
        seen[axis as usize] = true;
    }
    let Some(entry) = lookup(handle) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {handle}"));
    };
    let mut od = [1u64; 4];
    for k in 0..4 {
        od[k] = entry.dims[p[k] as usize];
    }
    with_elem!(entry.dtype, T, {
        let src: Vec<T> = typed(&entry);
        let istr = strides(&entry.dims);
        let mut dst: Vec<T> = Vec::with_capacity(src.len());
        for j3 in 0..od[3] {
            for j2 in 0..od[2] {
                for j1 in 0..od[1] {
                    for j0 in 0..od[0] {
                        let j = [j0, j1, j2, j3];
                        let mut lin = 0u64;
                        for k in 0..4 {
                            lin += j[k] * istr[p[k] as usize];
                        }
                        dst.push(src[lin as usize]);
                    }
                }
            }
        }
        *out = store(dst, od, entry.ndims);
        TS_SUCCESS
    })
}

#[no_mangle]
pub unsafe extern "C" fn ts_constant(
    out: *mut NativeHandle,
    real: f64,
    imag: f64,
    dims: *const u64,
    ndims: u32,
    dtype: i32,
) -> i32 {
    if out.is_null() || dims.is_null() || ndims > 4 {
        return fail(TS_ERR_ARG, "bad argument to ts_constant");
    }
    let Ok(dtype) = DType::try_from_native(dtype) else {
        return fail(TS_ERR_TYPE, format!("unknown dtype code {dtype}"));
    };
    let slots = read_dims(dims, ndims);
    let elements: u64 = slots.iter().product();
    with_elem!(dtype, T, {
        let v = <T as Elem>::from_parts(real, imag);
        *out = store(vec![v; elements as usize], slots, ndims);
        TS_SUCCESS
    })
}

#[no_mangle]
pub unsafe extern "C" fn ts_binary(
    out: *mut NativeHandle,
    op: i32,
    lhs: NativeHandle,
    rhs: NativeHandle,
    broadcast: i32,
) -> i32 {
    if out.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_binary");
    }
    let Some(l) = lookup(lhs) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {lhs}"));
    };
    let Some(r) = lookup(rhs) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {rhs}"));
    };
    let common = crate::dtype::promote(l.dtype, r.dtype);
    let ld = l.dims;
    let rd = r.dims;
    let mut od = [1u64; 4];
    if broadcast == 0 {
        if ld != rd {
            return fail(
                TS_ERR_SHAPE,
                format!("{ld:?} vs {rd:?} with broadcast disabled"),
            );
        }
        od = ld;
    } else {
        for k in 0..4 {
            od[k] = if ld[k] == rd[k] || rd[k] == 1 {
                ld[k]
            } else if ld[k] == 1 {
                rd[k]
            } else {
                return fail(TS_ERR_SHAPE, format!("{ld:?} and {rd:?} do not broadcast"));
            };
        }
    }
    let ndims = l.ndims.max(r.ndims);
    with_elem!(common, T, {
        let probe = <T as Elem>::from_parts(1.0, 0.0);
        if <T as Elem>::binary(op, probe, probe).is_none() {
            return fail(
                TS_ERR_UNSUPPORTED,
                format!("binary operator {op} unsupported for {common}"),
            );
        }
        let a: Vec<T> = cast_entry(&l);
        let b: Vec<T> = cast_entry(&r);
        let zero = <T as Elem>::from_parts(0.0, 0.0);
        let result: Vec<T> = if ld == rd {
            a.par_iter()
                .zip(b.par_iter())
                .map(|(&x, &y)| <T as Elem>::binary(op, x, y).unwrap_or(zero))
                .collect()
        } else {
            let astr = broadcast_strides(&ld, &od);
            let bstr = broadcast_strides(&rd, &od);
            let mut result = Vec::with_capacity(od.iter().product::<u64>() as usize);
            for i3 in 0..od[3] {
                for i2 in 0..od[2] {
                    for i1 in 0..od[1] {
                        for i0 in 0..od[0] {
                            let ai = i0 * astr[0] + i1 * astr[1] + i2 * astr[2] + i3 * astr[3];
                            let bi = i0 * bstr[0] + i1 * bstr[1] + i2 * bstr[2] + i3 * bstr[3];
                            result.push(
                                <T as Elem>::binary(op, a[ai as usize], b[bi as usize])
                                    .unwrap_or(zero),
                            );
                        }
                    }
                }
            }
            result
        };
        *out = store(result, od, ndims);
        TS_SUCCESS
    })
}

#[no_mangle]
pub unsafe extern "C" fn ts_unary(out: *mut NativeHandle, op: i32, handle: NativeHandle) -> i32 {
    if out.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_unary");
    }
    let Some(entry) = lookup(handle) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {handle}"));
    };
    with_elem!(entry.dtype, T, {
        let probe = <T as Elem>::from_parts(1.0, 0.0);
        if <T as Elem>::unary(op, probe).is_none() {
            return fail(
                TS_ERR_TYPE,
                format!("unary operator {op} unsupported for {}", entry.dtype),
            );
        }
        let src: Vec<T> = typed(&entry);
        let zero = <T as Elem>::from_parts(0.0, 0.0);
        let result: Vec<T> = src
            .par_iter()
            .map(|&x| <T as Elem>::unary(op, x).unwrap_or(zero))
            .collect();
        *out = store(result, entry.dims, entry.ndims);
        TS_SUCCESS
    })
}

/// Resolve the four descriptor slots into per-axis index lists.
///
/// Batch slots select the same elements as plain sequences; the flag only
/// matters to the lazy batching layer, which the eager engine does not have.
fn resolve_slots(parent: &Entry, slots: &[IndexSlot]) -> Result<[Vec<u64>; 4], i32> {
    let mut axes: [Vec<u64>; 4] = [vec![], vec![], vec![], vec![]];
    for k in 0..4 {
        let extent = parent.dims[k];
        let slot = slots[k];
        match slot.kind {
            TS_SLOT_SEQ => {
                let Some((start, count, step)) = resolve_seq(slot.begin, slot.end, slot.step, extent)
                else {
                    return Err(fail(
                        TS_ERR_INDEX,
                        format!("invalid sequence in slot {k}: step must be nonzero"),
                    ));
                };
                axes[k] = (0..count)
                    .map(|i| (start + step * i as i64) as u64)
                    .collect();
            }
            TS_SLOT_ARRAY => {
                let Some(idx) = lookup(slot.handle) else {
                    return Err(fail(
                        TS_ERR_HANDLE,
                        format!("unknown index-array handle {}", slot.handle),
                    ));
                };
                if !idx.dtype.is_integral() {
                    return Err(fail(
                        TS_ERR_TYPE,
                        format!("index array must be integral, got {}", idx.dtype),
                    ));
                }
                let raw: Vec<i64> = with_elem!(idx.dtype, T, {
                    typed::<T>(&idx)
                        .into_iter()
                        .filter_map(|v| v.as_index())
                        .collect()
                });
                let mut resolved = Vec::with_capacity(raw.len());
                for v in raw {
                    let i = if v < 0 { v + extent as i64 } else { v };
                    if i < 0 || i as u64 >= extent {
                        return Err(fail(
                            TS_ERR_INDEX,
                            format!("index {v} out of bounds for axis {k} of extent {extent}"),
                        ));
                    }
                    resolved.push(i as u64);
                }
                axes[k] = resolved;
            }
            _ => {
                return Err(fail(TS_ERR_ARG, format!("unknown slot kind {}", slot.kind)));
            }
        }
    }
    Ok(axes)
}

#[no_mangle]
pub unsafe extern "C" fn ts_index(
    out: *mut NativeHandle,
    handle: NativeHandle,
    slots: *const IndexSlot,
) -> i32 {
    if out.is_null() || slots.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_index");
    }
    let Some(parent) = lookup(handle) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {handle}"));
    };
    let slots = std::slice::from_raw_parts(slots, 4);
    let axes = match resolve_slots(&parent, slots) {
        Ok(axes) => axes,
        Err(code) => return code,
    };
    let mut od = [1u64; 4];
    for k in 0..4 {
        od[k] = axes[k].len() as u64;
    }
    with_elem!(parent.dtype, T, {
        let src: Vec<T> = typed(&parent);
        let istr = strides(&parent.dims);
        let mut dst: Vec<T> = Vec::with_capacity(od.iter().product::<u64>() as usize);
        for &i3 in &axes[3] {
            for &i2 in &axes[2] {
                for &i1 in &axes[1] {
                    for &i0 in &axes[0] {
                        let lin = i0 * istr[0] + i1 * istr[1] + i2 * istr[2] + i3 * istr[3];
                        dst.push(src[lin as usize]);
                    }
                }
            }
        }
        *out = store(dst, od, parent.ndims);
        TS_SUCCESS
    })
}

#[no_mangle]
pub unsafe extern "C" fn ts_assign(
    out: *mut NativeHandle,
    dst: NativeHandle,
    slots: *const IndexSlot,
    src: NativeHandle,
) -> i32 {
    if out.is_null() || slots.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_assign");
    }
    let Some(target) = lookup(dst) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {dst}"));
    };
    let Some(value) = lookup(src) else {
        return fail(TS_ERR_HANDLE, format!("unknown handle {src}"));
    };
    if target.dtype != value.dtype {
        return fail(
            TS_ERR_TYPE,
            format!("cannot assign {} into {}", value.dtype, target.dtype),
        );
    }
    let slots = std::slice::from_raw_parts(slots, 4);
    let axes = match resolve_slots(&target, slots) {
        Ok(axes) => axes,
        Err(code) => return code,
    };
    let region: u64 = axes.iter().map(|a| a.len() as u64).product();
    if region != value.elements() {
        return fail(
            TS_ERR_SHAPE,
            format!(
                "assignment region holds {region} elements, value holds {}",
                value.elements()
            ),
        );
    }
    with_elem!(target.dtype, T, {
        let mut data: Vec<T> = typed(&target);
        let srcv: Vec<T> = typed(&value);
        let istr = strides(&target.dims);
        let mut si = 0usize;
        for &i3 in &axes[3] {
            for &i2 in &axes[2] {
                for &i1 in &axes[1] {
                    for &i0 in &axes[0] {
                        let lin = i0 * istr[0] + i1 * istr[1] + i2 * istr[2] + i3 * istr[3];
                        data[lin as usize] = srcv[si];
                        si += 1;
                    }
                }
            }
        }
        *out = store(data, target.dims, target.ndims);
        TS_SUCCESS
    })
}

#[no_mangle]
pub unsafe extern "C" fn ts_eval(handle: NativeHandle) -> i32 {
    // The reference engine executes eagerly; evaluation only validates.
    if lookup(handle).is_none() {
        return fail(TS_ERR_HANDLE, format!("unknown handle {handle}"));
    }
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_sync() -> i32 {
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_get_backend(out: *mut i32) -> i32 {
    if out.is_null() {
        return fail(TS_ERR_ARG, "bad argument to ts_get_backend");
    }
    *out = TS_BACKEND_CPU;
    TS_SUCCESS
}

#[no_mangle]
pub unsafe extern "C" fn ts_last_error(buf: *mut u8, capacity: u64) -> u64 {
    LAST_ERROR.with(|slot| {
        let msg = slot.borrow();
        let n = msg.len().min(capacity as usize);
        if n > 0 && !buf.is_null() {
            std::ptr::copy_nonoverlapping(msg.as_ptr(), buf, n);
        }
        n as u64
    })
}
