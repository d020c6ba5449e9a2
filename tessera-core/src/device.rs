//! Backend selection and evaluation collaborators.
//!
//! Which native library variant is active (CPU or an accelerated build) is
//! resolved outside this crate; the handle runtime only asks. Likewise the
//! engine's lazy queue is drained by [`sync`] and `Array::eval`, not managed
//! here.

use crate::engine::{self, TS_BACKEND_CPU, TS_BACKEND_CUDA, TS_BACKEND_OPENCL};
use crate::{Error, Result};

/// The native library variant servicing all calls in this process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Cpu,
    Cuda,
    OpenCl,
}

/// Ask the engine which backend is active.
pub fn active_backend() -> Result<Backend> {
    let mut code = 0i32;
    engine::check(unsafe { engine::ts_get_backend(&mut code) })?;
    match code {
        TS_BACKEND_CPU => Ok(Backend::Cpu),
        TS_BACKEND_CUDA => Ok(Backend::Cuda),
        TS_BACKEND_OPENCL => Ok(Backend::OpenCl),
        _ => Err(Error::NativeError {
            code,
            message: "unrecognized backend code".into(),
        }
        .bt()),
    }
}

/// Block until every operation queued so far by the engine has completed.
pub fn sync() -> Result<()> {
    engine::check(unsafe { engine::ts_sync() })
}
