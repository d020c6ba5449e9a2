//! Flat call surface of the native compute engine.
//!
//! Every entry point takes plain handles, dimension arrays, and dtype codes,
//! returns an `i32` status, and writes results through out-parameters (the
//! one exception is [`ts_last_error`], which returns a byte count). The
//! bundled reference CPU engine ([`cpu`]) implements this exact ABI so the
//! crate runs stand-alone; an accelerated shared library can provide the same
//! symbols instead.
//!
//! [`check`] is the single point where a non-success status becomes a typed
//! [`Error`](crate::Error), carrying the engine's last diagnostic message.
//! Nothing below it retries: these are parameter and resource errors, not
//! transient ones.

pub mod cpu;

pub use cpu::{
    ts_assign, ts_binary, ts_constant, ts_copy_to_host, ts_create_array, ts_create_from_host,
    ts_eval, ts_get_backend, ts_get_dims, ts_get_dtype, ts_get_elements, ts_index, ts_last_error,
    ts_release_array, ts_reorder, ts_retain_array, ts_sync, ts_unary, ts_wrap_device_ptr,
};

use crate::{Error, Result};

/// Opaque token for native-side array storage.
pub type NativeHandle = u64;

pub const TS_SUCCESS: i32 = 0;
pub const TS_ERR_ALLOC: i32 = 101;
pub const TS_ERR_TYPE: i32 = 102;
pub const TS_ERR_SHAPE: i32 = 103;
pub const TS_ERR_HANDLE: i32 = 104;
pub const TS_ERR_INDEX: i32 = 105;
pub const TS_ERR_ARG: i32 = 106;
pub const TS_ERR_UNSUPPORTED: i32 = 107;

pub const TS_BACKEND_CPU: i32 = 0;
pub const TS_BACKEND_CUDA: i32 = 1;
pub const TS_BACKEND_OPENCL: i32 = 2;

/// Binary elementwise operator codes.
pub const TS_OP_ADD: i32 = 0;
pub const TS_OP_SUB: i32 = 1;
pub const TS_OP_MUL: i32 = 2;
pub const TS_OP_DIV: i32 = 3;

/// Unary elementwise operator codes.
pub const TS_OP_NEG: i32 = 100;
pub const TS_OP_ABS: i32 = 101;

pub const TS_SLOT_SEQ: i32 = 0;
pub const TS_SLOT_ARRAY: i32 = 1;

/// One slot of the fixed four-slot native index descriptor.
///
/// A sequence slot walks `begin..=end` by `step`, bounds inclusive, negative
/// values counted from the end of the axis. An array slot addresses the axis
/// through the elements of another array, referenced by handle. The `batch`
/// flag marks the axis as independently iterable.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct IndexSlot {
    pub kind: i32,
    pub batch: i32,
    pub begin: i64,
    pub end: i64,
    pub step: i64,
    pub handle: NativeHandle,
}

impl IndexSlot {
    /// The "select everything" slot: `begin = 0, end = -1, step = 1`.
    pub fn span() -> Self {
        Self {
            kind: TS_SLOT_SEQ,
            batch: 0,
            begin: 0,
            end: -1,
            step: 1,
            handle: 0,
        }
    }
}

/// Translate a native status code into a typed error.
///
/// The engine's last diagnostic message for this thread is fetched once and
/// attached to whichever variant the code classifies as.
pub(crate) fn check(code: i32) -> Result<()> {
    if code == TS_SUCCESS {
        return Ok(());
    }
    let message = last_error_message();
    let err = match code {
        TS_ERR_ALLOC => Error::AllocationFailed(message),
        TS_ERR_TYPE => Error::TypeMismatch(message),
        TS_ERR_SHAPE => Error::IncompatibleShapes(message),
        _ => Error::NativeError { code, message },
    };
    Err(err.bt())
}

pub(crate) fn last_error_message() -> String {
    let mut buf = [0u8; 512];
    let written = unsafe { ts_last_error(buf.as_mut_ptr(), buf.len() as u64) };
    String::from_utf8_lossy(&buf[..written as usize]).into_owned()
}
