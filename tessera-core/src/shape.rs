use std::fmt;

use crate::{Error, Result};

/// Fixed-rank shape descriptor.
///
/// The native engine addresses storage through exactly four extents; shapes of
/// lower rank pad the trailing slots with 1. The rank recorded at construction
/// is preserved: a `(3,)` and a `(3, 1)` array hold the same elements but keep
/// ranks 1 and 2 respectively.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Dim4 {
    dims: [u64; 4],
    ndims: u32,
}

impl Dim4 {
    /// Build a shape from up to four extents. Trailing slots default to 1.
    ///
    /// Zero extents are permitted and describe empty arrays. More than four
    /// explicit dimensions is an [`Error::InvalidShape`].
    pub fn new(dims: &[u64]) -> Result<Self> {
        if dims.len() > 4 {
            return Err(Error::InvalidShape(format!(
                "at most 4 dimensions are supported, got {}",
                dims.len()
            ))
            .bt());
        }
        let mut slots = [1u64; 4];
        slots[..dims.len()].copy_from_slice(dims);
        Ok(Self {
            dims: slots,
            ndims: dims.len() as u32,
        })
    }

    pub(crate) fn from_raw(dims: [u64; 4], ndims: u32) -> Self {
        Self { dims, ndims }
    }

    /// The explicit dimension count given at construction. Trailing implicit
    /// 1s do not reduce it.
    pub fn rank(&self) -> u32 {
        self.ndims
    }

    /// Total element count: the product of all four slots.
    pub fn elements(&self) -> u64 {
        self.dims.iter().product()
    }

    /// All four slots, padded with 1s past the explicit rank.
    pub fn get(&self) -> [u64; 4] {
        self.dims
    }
}

macro_rules! dim4_from {
    ($n:expr) => {
        impl From<[u64; $n]> for Dim4 {
            fn from(dims: [u64; $n]) -> Self {
                let mut slots = [1u64; 4];
                slots[..$n].copy_from_slice(&dims);
                Self {
                    dims: slots,
                    ndims: $n,
                }
            }
        }
    };
}

dim4_from!(1);
dim4_from!(2);
dim4_from!(3);
dim4_from!(4);

impl fmt::Display for Dim4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = self.ndims.max(1) as usize;
        write!(f, "(")?;
        for (i, d) in self.dims[..rank].iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, ")")
    }
}
