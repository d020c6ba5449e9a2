//! Operation dispatcher.
//!
//! Operands are a closed variant: an array handle or a host scalar. A scalar
//! next to an array is promoted and materialized into a constant-filled array
//! of the array's shape, so every native entry point stays binary and
//! array-shaped; the extra constant allocation is cheap next to the
//! elementwise kernel it feeds. Two scalars never reach the native layer.

use num_complex::{Complex32, Complex64};

use crate::broadcast::broadcast_enabled;
use crate::dtype::Scalar;
use crate::engine::{
    self, TS_OP_ABS, TS_OP_ADD, TS_OP_DIV, TS_OP_MUL, TS_OP_NEG, TS_OP_SUB,
};
use crate::{Array, Error, Result};

/// Elementwise binary operators understood by the native engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn native_code(self) -> i32 {
        match self {
            BinaryOp::Add => TS_OP_ADD,
            BinaryOp::Sub => TS_OP_SUB,
            BinaryOp::Mul => TS_OP_MUL,
            BinaryOp::Div => TS_OP_DIV,
        }
    }
}

/// Elementwise unary operators understood by the native engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Abs,
}

impl UnaryOp {
    fn native_code(self) -> i32 {
        match self {
            UnaryOp::Neg => TS_OP_NEG,
            UnaryOp::Abs => TS_OP_ABS,
        }
    }
}

/// One side of a binary operation: an array or a host scalar.
pub enum Operand<'a> {
    Array(&'a Array),
    Scalar(Scalar),
}

impl<'a> From<&'a Array> for Operand<'a> {
    fn from(array: &'a Array) -> Self {
        Operand::Array(array)
    }
}

macro_rules! operand_from_scalar {
    ($t:ty) => {
        impl From<$t> for Operand<'_> {
            fn from(value: $t) -> Self {
                Operand::Scalar(value.into())
            }
        }
    };
}

operand_from_scalar!(bool);
operand_from_scalar!(i8);
operand_from_scalar!(i16);
operand_from_scalar!(i32);
operand_from_scalar!(i64);
operand_from_scalar!(u8);
operand_from_scalar!(u16);
operand_from_scalar!(u32);
operand_from_scalar!(f32);
operand_from_scalar!(f64);
operand_from_scalar!(Complex32);
operand_from_scalar!(Complex64);
operand_from_scalar!(Scalar);

/// Build a constant-filled array matching the live operand's shape, with the
/// scalar promoted against the live operand's dtype.
fn materialize(scalar: Scalar, like: &Array) -> Result<Array> {
    let dtype = scalar.promote(like.dtype()?);
    let dims = like.dims()?;
    let (real, imag) = scalar.parts();
    tracing::debug!(%dtype, %dims, "materializing scalar operand");
    let slots = dims.get();
    let mut handle = 0;
    engine::check(unsafe {
        engine::ts_constant(
            &mut handle,
            real,
            imag,
            slots.as_ptr(),
            dims.rank(),
            dtype.native_code(),
        )
    })?;
    Ok(Array::from_handle(handle))
}

fn binary(lhs: &Array, rhs: &Array, op: BinaryOp) -> Result<Array> {
    let mut handle = 0;
    engine::check(unsafe {
        engine::ts_binary(
            &mut handle,
            op.native_code(),
            lhs.native_handle(),
            rhs.native_handle(),
            broadcast_enabled() as i32,
        )
    })?;
    Ok(Array::from_handle(handle))
}

/// Apply a binary elementwise operation, resolving operand kinds once.
///
/// At least one operand must be an array; operand order is preserved when a
/// scalar is materialized.
pub fn apply<'a>(
    lhs: impl Into<Operand<'a>>,
    rhs: impl Into<Operand<'a>>,
    op: BinaryOp,
) -> Result<Array> {
    match (lhs.into(), rhs.into()) {
        (Operand::Array(l), Operand::Array(r)) => binary(l, r, op),
        (Operand::Array(l), Operand::Scalar(s)) => {
            let filled = materialize(s, l)?;
            binary(l, &filled, op)
        }
        (Operand::Scalar(s), Operand::Array(r)) => {
            let filled = materialize(s, r)?;
            binary(&filled, r, op)
        }
        (Operand::Scalar(_), Operand::Scalar(_)) => Err(Error::InvalidOperand(
            "at least one operand must be an array".into(),
        )
        .bt()),
    }
}

/// Apply a unary elementwise operation. No promotion is involved.
pub fn apply_unary(operand: &Array, op: UnaryOp) -> Result<Array> {
    let mut handle = 0;
    engine::check(unsafe {
        engine::ts_unary(&mut handle, op.native_code(), operand.native_handle())
    })?;
    Ok(Array::from_handle(handle))
}

pub fn add<'a>(lhs: impl Into<Operand<'a>>, rhs: impl Into<Operand<'a>>) -> Result<Array> {
    apply(lhs, rhs, BinaryOp::Add)
}

pub fn sub<'a>(lhs: impl Into<Operand<'a>>, rhs: impl Into<Operand<'a>>) -> Result<Array> {
    apply(lhs, rhs, BinaryOp::Sub)
}

pub fn mul<'a>(lhs: impl Into<Operand<'a>>, rhs: impl Into<Operand<'a>>) -> Result<Array> {
    apply(lhs, rhs, BinaryOp::Mul)
}

pub fn div<'a>(lhs: impl Into<Operand<'a>>, rhs: impl Into<Operand<'a>>) -> Result<Array> {
    apply(lhs, rhs, BinaryOp::Div)
}

pub fn neg(operand: &Array) -> Result<Array> {
    apply_unary(operand, UnaryOp::Neg)
}

pub fn abs(operand: &Array) -> Result<Array> {
    apply_unary(operand, UnaryOp::Abs)
}
