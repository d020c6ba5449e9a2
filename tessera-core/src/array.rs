use std::fmt;
use std::os::raw::c_void;

use crate::dtype::Element;
use crate::engine::{self, NativeHandle};
use crate::index::Indexer;
use crate::{DType, Dim4, Error, Result};

/// An n-dimensional array backed by native-side storage.
///
/// Each `Array` owns exactly one native handle: dropping it releases the
/// handle, cloning goes through native retain, so the underlying storage
/// lives until the last alias is gone. Every method is a synchronous call
/// into the engine; the engine may defer actual computation internally until
/// [`Array::eval`] or [`sync`](crate::sync).
pub struct Array {
    handle: NativeHandle,
}

impl Array {
    pub(crate) fn from_handle(handle: NativeHandle) -> Self {
        Self { handle }
    }

    pub(crate) fn native_handle(&self) -> NativeHandle {
        self.handle
    }

    /// Allocate zero-initialized storage of the given shape and dtype.
    pub fn zeros(dims: Dim4, dtype: DType) -> Result<Self> {
        let slots = dims.get();
        let mut handle = 0;
        engine::check(unsafe {
            engine::ts_create_array(&mut handle, slots.as_ptr(), dims.rank(), dtype.native_code())
        })?;
        Ok(Self::from_handle(handle))
    }

    /// Copy a host buffer into new native storage.
    ///
    /// With no explicit shape the buffer collapses to a 1-D array of its
    /// element count; an empty buffer with no shape is an
    /// [`Error::InvalidShape`].
    pub fn from_slice<T: Element>(data: &[T], dims: Option<Dim4>) -> Result<Self> {
        let dims = match dims {
            Some(dims) => {
                if dims.elements() != data.len() as u64 {
                    return Err(Error::InvalidShape(format!(
                        "shape {dims} expects {} elements, buffer holds {}",
                        dims.elements(),
                        data.len()
                    ))
                    .bt());
                }
                dims
            }
            None => {
                if data.is_empty() {
                    return Err(Error::InvalidShape(
                        "cannot infer a shape from an empty buffer".into(),
                    )
                    .bt());
                }
                Dim4::from([data.len() as u64])
            }
        };
        let bytes = T::to_bytes(data);
        let slots = dims.get();
        let mut handle = 0;
        engine::check(unsafe {
            engine::ts_create_from_host(
                &mut handle,
                bytes.as_ptr(),
                bytes.len() as u64,
                slots.as_ptr(),
                dims.rank(),
                T::DTYPE.native_code(),
            )
        })?;
        Ok(Self::from_handle(handle))
    }

    /// Like [`Array::from_slice`], with an explicitly requested dtype that
    /// must agree with the buffer's element type.
    pub fn from_slice_as<T: Element>(data: &[T], dims: Option<Dim4>, dtype: DType) -> Result<Self> {
        if dtype != T::DTYPE {
            return Err(Error::type_mismatch(dtype, T::DTYPE));
        }
        Self::from_slice(data, dims)
    }

    /// Wrap an externally allocated device buffer without copying.
    ///
    /// The engine pins the buffer for the lifetime of the handle but never
    /// frees it; the caller stays responsible for that.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least `dims.elements() * dtype.size_of()` bytes
    /// of initialized memory that outlives the returned `Array` and every
    /// handle retained from it.
    pub unsafe fn from_device_ptr(ptr: *mut c_void, dims: Dim4, dtype: DType) -> Result<Self> {
        let slots = dims.get();
        let mut handle = 0;
        engine::check(engine::ts_wrap_device_ptr(
            &mut handle,
            ptr,
            slots.as_ptr(),
            dims.rank(),
            dtype.native_code(),
        ))?;
        Ok(Self::from_handle(handle))
    }

    /// A new handle referencing the same native storage; no data is copied,
    /// the native reference count goes up by one.
    pub fn retain(&self) -> Result<Self> {
        let mut handle = 0;
        engine::check(unsafe { engine::ts_retain_array(&mut handle, self.handle) })?;
        Ok(Self::from_handle(handle))
    }

    pub fn dims(&self) -> Result<Dim4> {
        let mut dims = [0u64; 4];
        let mut ndims = 0u32;
        engine::check(unsafe { engine::ts_get_dims(dims.as_mut_ptr(), &mut ndims, self.handle) })?;
        Ok(Dim4::from_raw(dims, ndims))
    }

    pub fn dtype(&self) -> Result<DType> {
        let mut code = 0i32;
        engine::check(unsafe { engine::ts_get_dtype(&mut code, self.handle) })?;
        DType::try_from_native(code)
    }

    pub fn elements(&self) -> Result<u64> {
        let mut count = 0u64;
        engine::check(unsafe { engine::ts_get_elements(&mut count, self.handle) })?;
        Ok(count)
    }

    pub fn rank(&self) -> Result<u32> {
        Ok(self.dims()?.rank())
    }

    /// Materialize every element into a host vector.
    ///
    /// The native order is column-major (first dimension fastest). With
    /// `row_major` the dimension order is logically reversed first, at the
    /// cost of one extra native reorder and allocation. An empty array yields
    /// an empty vector.
    pub fn to_vec<T: Element>(&self, row_major: bool) -> Result<Vec<T>> {
        let dtype = self.dtype()?;
        if dtype != T::DTYPE {
            return Err(Error::type_mismatch(T::DTYPE, dtype));
        }
        if self.elements()? == 0 {
            return Ok(Vec::new());
        }
        if row_major {
            let reversed: [u32; 4] = [3, 2, 1, 0];
            let mut handle = 0;
            engine::check(unsafe {
                engine::ts_reorder(&mut handle, self.handle, reversed.as_ptr())
            })?;
            return Self::from_handle(handle).to_vec::<T>(false);
        }
        let nbytes = self.elements()? as usize * dtype.size_of();
        let mut bytes = vec![0u8; nbytes];
        engine::check(unsafe { engine::ts_copy_to_host(bytes.as_mut_ptr(), self.handle) })?;
        Ok(T::from_bytes(&bytes))
    }

    /// Gather the elements selected by an index expression into a new array.
    pub fn index(&self, indexer: &Indexer) -> Result<Array> {
        let slots = indexer.slots();
        let mut handle = 0;
        engine::check(unsafe { engine::ts_index(&mut handle, self.handle, slots.as_ptr()) })?;
        Ok(Self::from_handle(handle))
    }

    /// Assign `value` into the region selected by an index expression.
    ///
    /// The value's shape must equal the indexer's assignment shape. Aliases
    /// retained before the assignment keep seeing the old contents: the
    /// engine produces a fresh array and this handle moves to it.
    pub fn assign(&mut self, indexer: &Indexer, value: &Array) -> Result<()> {
        let region = indexer.assignment_dims(&self.dims()?)?;
        let vdims = value.dims()?;
        if region.get() != vdims.get() {
            return Err(Error::IncompatibleShapes(format!(
                "assignment region is {region}, value is {vdims}"
            ))
            .bt());
        }
        let slots = indexer.slots();
        let mut out = 0;
        engine::check(unsafe {
            engine::ts_assign(&mut out, self.handle, slots.as_ptr(), value.handle)
        })?;
        let old = std::mem::replace(&mut self.handle, out);
        unsafe { engine::ts_release_array(old) };
        Ok(())
    }

    /// Force materialization of any lazily queued native work for this array.
    pub fn eval(&self) -> Result<()> {
        engine::check(unsafe { engine::ts_eval(self.handle) })
    }
}

impl Drop for Array {
    fn drop(&mut self) {
        // Release is idempotent on the native side; this handle is dropped
        // exactly once, so the reference count goes down exactly once.
        unsafe { engine::ts_release_array(self.handle) };
    }
}

impl Clone for Array {
    fn clone(&self) -> Self {
        // A live Array's handle is always registered, so retain cannot fail.
        self.retain().expect("retain of a live array handle")
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array").field("handle", &self.handle).finish()
    }
}
