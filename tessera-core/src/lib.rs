//! Tessera is a tensor handle and indexing runtime for the Tessera native
//! compute engine.
//!
//! The engine owns storage, reference counts, and every numeric kernel; this
//! crate is the safe layer on top of its flat C call surface: it creates and
//! reference-counts opaque array handles, translates host slicing into the
//! engine's fixed four-slot index descriptor, and dispatches elementwise
//! operations under a process-wide broadcast mode. A reference CPU engine is
//! bundled, so everything here runs without an accelerated build.
//!
//! ## A quick guide
//! - Arrays are created through [`Array`]: from a shape and dtype, from a
//!   host buffer, or by wrapping an external device pointer.
//! - Shapes are [`Dim4`] values: up to four extents, trailing slots
//!   implicitly 1.
//! - Slicing goes through [`Indexer`]: integers, ranges, other arrays, and
//!   batch markers, decoded once into the native descriptor.
//! - Elementwise math goes through [`apply`]/[`apply_unary`] or the named
//!   wrappers; scalars are accepted on either side and materialized to match
//!   the array operand.
//! - Shape-mismatched operands only combine inside [`with_broadcast`].
//!
//! ## What it looks like
//! ```
//! use tessera_core::{add, Array, Dim4, IndexKey, Indexer};
//!
//! let a = Array::from_slice(&[1.0f32, 2.0, 3.0, 4.0], Some(Dim4::from([2, 2]))).unwrap();
//! let b = add(&a, 1.5f32).unwrap();
//! assert_eq!(b.to_vec::<f32>(false).unwrap(), vec![2.5, 3.5, 4.5, 5.5]);
//!
//! let idx = Indexer::new(vec![IndexKey::from(0..2), IndexKey::from(1)]).unwrap();
//! let col = b.index(&idx).unwrap();
//! assert_eq!(col.to_vec::<f32>(false).unwrap(), vec![4.5, 5.5]);
//! ```

mod array;
mod broadcast;
mod device;
mod dtype;
pub mod engine;
mod error;
mod index;
mod ops;
mod shape;

pub use array::Array;
pub use broadcast::{broadcast_enabled, with_broadcast};
pub use device::{active_backend, sync, Backend};
pub use dtype::{promote, DType, Element, Scalar};
pub use error::{Error, Result};
pub use index::{IndexKey, Indexer, Seq};
pub use ops::{abs, add, apply, apply_unary, div, mul, neg, sub, BinaryOp, Operand, UnaryOp};
pub use shape::Dim4;
