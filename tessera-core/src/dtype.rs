use std::fmt;

use num_complex::{Complex32, Complex64};

use crate::{Error, Result};

/// Element type of an array, as the native engine sees it.
///
/// The discriminants are the wire codes passed across the native boundary and
/// are stable for the lifetime of the process (and of the serialized form):
/// floats occupy 0-9, signed integers 10-19, unsigned integers 20-29, boolean
/// 30, complex 40-49. Existing values are never changed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DType {
    /// 64-bit floating point.
    F64 = 0,
    /// 32-bit floating point.
    F32 = 1,
    /// 64-bit signed integer.
    I64 = 10,
    /// 32-bit signed integer.
    I32 = 11,
    /// 16-bit signed integer.
    I16 = 12,
    /// 8-bit signed integer.
    I8 = 13,
    /// 64-bit unsigned integer.
    U64 = 20,
    /// 32-bit unsigned integer.
    U32 = 21,
    /// 16-bit unsigned integer.
    U16 = 22,
    /// 8-bit unsigned integer.
    U8 = 23,
    /// Boolean, stored as one byte.
    Bool = 30,
    /// Single-precision complex: two `f32` parts, interleaved.
    C32 = 40,
    /// Double-precision complex: two `f64` parts, interleaved.
    C64 = 41,
}

impl DType {
    /// The wire code handed to the native engine.
    pub fn native_code(self) -> i32 {
        self as i32
    }

    /// Look a descriptor up by native wire code.
    pub fn try_from_native(code: i32) -> Result<Self> {
        use DType::*;
        let dtype = match code {
            0 => F64,
            1 => F32,
            10 => I64,
            11 => I32,
            12 => I16,
            13 => I8,
            20 => U64,
            21 => U32,
            22 => U16,
            23 => U8,
            30 => Bool,
            40 => C32,
            41 => C64,
            _ => return Err(Error::UnknownDtype(code).bt()),
        };
        Ok(dtype)
    }

    /// Element width in bytes.
    pub fn size_of(self) -> usize {
        use DType::*;
        match self {
            Bool | U8 | I8 => 1,
            U16 | I16 => 2,
            U32 | I32 | F32 => 4,
            U64 | I64 | F64 | C32 => 8,
            C64 => 16,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        use DType::*;
        match self {
            F64 => "f64",
            F32 => "f32",
            I64 => "i64",
            I32 => "i32",
            I16 => "i16",
            I8 => "i8",
            U64 => "u64",
            U32 => "u32",
            U16 => "u16",
            U8 => "u8",
            Bool => "bool",
            C32 => "c32",
            C64 => "c64",
        }
    }

    pub fn is_integral(self) -> bool {
        use DType::*;
        matches!(self, I64 | I32 | I16 | I8 | U64 | U32 | U16 | U8)
    }

    pub fn is_signed_int(self) -> bool {
        use DType::*;
        matches!(self, I64 | I32 | I16 | I8)
    }

    pub fn is_unsigned_int(self) -> bool {
        use DType::*;
        matches!(self, U64 | U32 | U16 | U8)
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DType::C32 | DType::C64)
    }
}

/// Promote two array dtypes to the common dtype of a binary operation.
///
/// Complex wins over float, float over integer, larger widths over smaller.
/// Mixing signed and unsigned integers promotes to a signed type wide enough
/// for both.
pub fn promote(lhs: DType, rhs: DType) -> DType {
    use DType::*;

    if lhs == rhs {
        return lhs;
    }

    if lhs.is_signed_int() && rhs.is_unsigned_int() {
        return match (lhs, rhs) {
            (I64, _) => I64,
            (I32, U64 | U32) => I64,
            (I32, _) => I32,
            (I16, U64 | U32 | U16) => I32,
            (I16, _) => I16,
            (I8, _) => I16,
            _ => I64,
        };
    }
    if rhs.is_signed_int() && lhs.is_unsigned_int() {
        return promote(rhs, lhs);
    }

    let priority = |dt: DType| -> u8 {
        match dt {
            C64 => 120,
            C32 => 110,
            F64 => 100,
            F32 => 90,
            I64 => 65,
            U64 => 60,
            I32 => 55,
            U32 => 50,
            I16 => 45,
            U16 => 40,
            I8 => 35,
            U8 => 30,
            Bool => 25,
        }
    };

    if priority(lhs) >= priority(rhs) {
        lhs
    } else {
        rhs
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) mod private {
    pub trait Sealed {}

    impl Sealed for u8 {}
    impl Sealed for i8 {}
    impl Sealed for u16 {}
    impl Sealed for i16 {}
    impl Sealed for u32 {}
    impl Sealed for i32 {}
    impl Sealed for u64 {}
    impl Sealed for i64 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
    impl Sealed for bool {}
    impl Sealed for num_complex::Complex32 {}
    impl Sealed for num_complex::Complex64 {}
}

/// Host interop tag: maps a Rust element type to its [`DType`] and provides
/// the byte-level marshaling used when copying buffers across the native
/// boundary.
pub trait Element: private::Sealed + Copy + Send + Sync + 'static {
    const DTYPE: DType;

    fn to_bytes(values: &[Self]) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> Vec<Self>;
}

macro_rules! pod_element {
    ($t:ty, $dtype:expr) => {
        impl Element for $t {
            const DTYPE: DType = $dtype;

            fn to_bytes(values: &[Self]) -> Vec<u8> {
                bytemuck::cast_slice(values).to_vec()
            }

            fn from_bytes(bytes: &[u8]) -> Vec<Self> {
                bytemuck::pod_collect_to_vec(bytes)
            }
        }
    };
}

pod_element!(u8, DType::U8);
pod_element!(i8, DType::I8);
pod_element!(u16, DType::U16);
pod_element!(i16, DType::I16);
pod_element!(u32, DType::U32);
pod_element!(i32, DType::I32);
pod_element!(u64, DType::U64);
pod_element!(i64, DType::I64);
pod_element!(f32, DType::F32);
pod_element!(f64, DType::F64);
pod_element!(Complex32, DType::C32);
pod_element!(Complex64, DType::C64);

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn to_bytes(values: &[Self]) -> Vec<u8> {
        values.iter().map(|&b| b as u8).collect()
    }

    fn from_bytes(bytes: &[u8]) -> Vec<Self> {
        bytes.iter().map(|&b| b != 0).collect()
    }
}

/// A host scalar operand, classified by kind.
///
/// The dispatcher materializes these into constant-filled arrays; the kind
/// drives promotion against the other operand's dtype.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex(Complex64),
}

impl Scalar {
    /// The dtype a constant array built from this scalar should use, given
    /// the dtype of the live array operand.
    ///
    /// Single-precision arrays keep their dtype (a float scalar next to an
    /// `f32` array must not widen the whole operation to `f64`); against
    /// everything else the scalar takes the natural 64-bit representation of
    /// its own kind. Booleans resolve before integers and stay boolean.
    pub fn promote(&self, array_dtype: DType) -> DType {
        match array_dtype {
            DType::F32 | DType::C32 => array_dtype,
            _ => match self {
                Scalar::Bool(_) => DType::Bool,
                Scalar::Int(_) => DType::I64,
                Scalar::Float(_) => DType::F64,
                Scalar::Complex(_) => DType::C64,
            },
        }
    }

    /// Real and imaginary parts, as the native constant constructor takes
    /// them. Non-complex scalars have a zero imaginary part.
    pub(crate) fn parts(&self) -> (f64, f64) {
        match *self {
            Scalar::Bool(b) => (b as u8 as f64, 0.0),
            Scalar::Int(v) => (v as f64, 0.0),
            Scalar::Float(v) => (v, 0.0),
            Scalar::Complex(z) => (z.re, z.im),
        }
    }
}

macro_rules! scalar_from {
    ($t:ty, $variant:ident) => {
        impl From<$t> for Scalar {
            fn from(value: $t) -> Self {
                Scalar::$variant(value.into())
            }
        }
    };
}

scalar_from!(bool, Bool);
scalar_from!(i8, Int);
scalar_from!(i16, Int);
scalar_from!(i32, Int);
scalar_from!(i64, Int);
scalar_from!(u8, Int);
scalar_from!(u16, Int);
scalar_from!(u32, Int);
scalar_from!(f32, Float);
scalar_from!(f64, Float);
scalar_from!(Complex64, Complex);

impl From<Complex32> for Scalar {
    fn from(z: Complex32) -> Self {
        Scalar::Complex(Complex64::new(z.re as f64, z.im as f64))
    }
}
