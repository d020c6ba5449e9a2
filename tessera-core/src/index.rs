use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo};

use crate::engine::{IndexSlot, TS_SLOT_ARRAY};
use crate::{Array, Dim4, Error, Result};

/// A sequence over one axis: inclusive `begin..=end`, walked by `step`.
///
/// Negative values count from the end of the axis (`-1` is the last element);
/// bounds are clamped to the axis, the way host-language slices behave. The
/// walk direction follows the sign of `step`, which is never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seq {
    pub begin: i64,
    pub end: i64,
    pub step: i64,
}

/// Canonical empty sequence: no axis extent makes `1..=0` walkable forward.
const EMPTY: Seq = Seq {
    begin: 1,
    end: 0,
    step: 1,
};

impl Seq {
    /// The "select everything" sequence, `begin = 0, end = -1, step = 1`.
    pub fn span() -> Self {
        Seq {
            begin: 0,
            end: -1,
            step: 1,
        }
    }

    /// Explicit inclusive bounds. `step == 0` is an [`Error::InvalidIndexType`].
    pub fn new(begin: i64, end: i64, step: i64) -> Result<Self> {
        if step == 0 {
            return Err(Error::InvalidIndexType("sequence step must be nonzero".into()).bt());
        }
        Ok(Seq { begin, end, step })
    }

    /// Translate a half-open range plus step, the way host slicing does.
    ///
    /// With a positive step the exclusive end moves inward by one; with a
    /// negative step begin and end swap so that the end of the walk stays
    /// reachable from begin in the step's direction: `with_step(0..5, -1)`
    /// walks `4, 3, 2, 1, 0`.
    pub fn with_step(range: Range<i64>, step: i64) -> Result<Self> {
        if step == 0 {
            return Err(Error::InvalidIndexType("sequence step must be nonzero".into()).bt());
        }
        if range.start >= range.end {
            return Ok(EMPTY);
        }
        Ok(if step > 0 {
            Seq {
                begin: range.start,
                end: range.end - 1,
                step,
            }
        } else {
            Seq {
                begin: range.end - 1,
                end: range.start,
                step,
            }
        })
    }

    /// Number of elements this sequence selects on an axis of the given
    /// extent, after resolving negatives and clamping.
    pub fn extent(&self, axis_extent: u64) -> u64 {
        resolve_seq(self.begin, self.end, self.step, axis_extent)
            .map(|(_, count, _)| count)
            .unwrap_or(0)
    }
}

impl From<Range<i64>> for Seq {
    fn from(range: Range<i64>) -> Self {
        if range.start >= range.end {
            EMPTY
        } else {
            Seq {
                begin: range.start,
                end: range.end - 1,
                step: 1,
            }
        }
    }
}

impl From<RangeInclusive<i64>> for Seq {
    fn from(range: RangeInclusive<i64>) -> Self {
        Seq {
            begin: *range.start(),
            end: *range.end(),
            step: 1,
        }
    }
}

impl From<RangeFrom<i64>> for Seq {
    fn from(range: RangeFrom<i64>) -> Self {
        Seq {
            begin: range.start,
            end: -1,
            step: 1,
        }
    }
}

impl From<RangeTo<i64>> for Seq {
    fn from(range: RangeTo<i64>) -> Self {
        if range.end == 0 {
            EMPTY
        } else {
            Seq {
                begin: 0,
                end: range.end - 1,
                step: 1,
            }
        }
    }
}

impl From<RangeFull> for Seq {
    fn from(_: RangeFull) -> Self {
        Seq::span()
    }
}

/// One key of an index expression, decoded once into the native descriptor.
#[derive(Clone, Debug)]
pub enum IndexKey {
    /// A single position along the axis; degenerate one-element sequence.
    Single(i64),
    /// A strided sequence.
    Range(Seq),
    /// Fancy indexing: the axis is addressed through the elements of another
    /// array, referenced by handle without copying.
    Array(Array),
    /// A sequence whose axis is independently iterable: the native layer runs
    /// one batched operation per step instead of N separate ones.
    Batch(Seq),
}

impl From<i64> for IndexKey {
    fn from(i: i64) -> Self {
        IndexKey::Single(i)
    }
}

impl From<i32> for IndexKey {
    fn from(i: i32) -> Self {
        IndexKey::Single(i as i64)
    }
}

impl From<Seq> for IndexKey {
    fn from(seq: Seq) -> Self {
        IndexKey::Range(seq)
    }
}

impl From<Array> for IndexKey {
    fn from(array: Array) -> Self {
        IndexKey::Array(array)
    }
}

macro_rules! key_from_range {
    ($t:ty) => {
        impl From<$t> for IndexKey {
            fn from(range: $t) -> Self {
                IndexKey::Range(range.into())
            }
        }
    };
}

key_from_range!(Range<i64>);
key_from_range!(RangeInclusive<i64>);
key_from_range!(RangeFrom<i64>);
key_from_range!(RangeTo<i64>);
key_from_range!(RangeFull);

/// A translated index expression: up to four keys, consumed left to right
/// into the fixed four-slot native descriptor. Omitted trailing slots select
/// everything.
#[derive(Clone, Debug)]
pub struct Indexer {
    keys: Vec<IndexKey>,
}

impl Indexer {
    pub fn new(keys: Vec<IndexKey>) -> Result<Self> {
        if keys.len() > 4 {
            return Err(Error::InvalidIndexType(format!(
                "at most 4 index keys are supported, got {}",
                keys.len()
            ))
            .bt());
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[IndexKey] {
        &self.keys
    }

    pub(crate) fn slots(&self) -> [IndexSlot; 4] {
        let mut slots = [IndexSlot::span(); 4];
        for (slot, key) in slots.iter_mut().zip(&self.keys) {
            match key {
                IndexKey::Single(i) => {
                    slot.begin = *i;
                    slot.end = *i;
                    slot.step = 1;
                }
                IndexKey::Range(seq) => {
                    slot.begin = seq.begin;
                    slot.end = seq.end;
                    slot.step = seq.step;
                }
                IndexKey::Batch(seq) => {
                    slot.begin = seq.begin;
                    slot.end = seq.end;
                    slot.step = seq.step;
                    slot.batch = 1;
                }
                IndexKey::Array(array) => {
                    slot.kind = TS_SLOT_ARRAY;
                    slot.handle = array.native_handle();
                }
            }
        }
        slots
    }

    /// The shape selected out of (or assigned into) an array of the given
    /// shape: extent 1 for a single index, the walked length for a sequence,
    /// the index array's element count for a fancy slot.
    pub fn assignment_dims(&self, parent: &Dim4) -> Result<Dim4> {
        let extents = parent.get();
        let mut dims = [1u64; 4];
        for k in 0..4 {
            dims[k] = match self.keys.get(k) {
                None => extents[k],
                Some(IndexKey::Single(i)) => Seq {
                    begin: *i,
                    end: *i,
                    step: 1,
                }
                .extent(extents[k]),
                Some(IndexKey::Range(seq)) | Some(IndexKey::Batch(seq)) => seq.extent(extents[k]),
                Some(IndexKey::Array(array)) => array.elements()?,
            };
        }
        Ok(Dim4::from_raw(dims, parent.rank()))
    }
}

/// Resolve a sequence against an axis extent.
///
/// Returns the first index, the walked count, and the step; `None` only for a
/// zero step. Negative bounds are counted from the end of the axis, then both
/// bounds clamp to it; an unwalkable pair yields a count of 0.
pub(crate) fn resolve_seq(begin: i64, end: i64, step: i64, extent: u64) -> Option<(i64, u64, i64)> {
    if step == 0 {
        return None;
    }
    let n = extent as i64;
    if n == 0 {
        return Some((0, 0, step));
    }
    let mut b = if begin < 0 { begin + n } else { begin };
    let mut e = if end < 0 { end + n } else { end };
    if step > 0 {
        b = b.max(0);
        e = e.min(n - 1);
        if b > e {
            return Some((0, 0, step));
        }
        Some((b, ((e - b) / step) as u64 + 1, step))
    } else {
        b = b.min(n - 1);
        e = e.max(0);
        if b < e {
            return Some((0, 0, step));
        }
        Some((b, ((b - e) / (-step)) as u64 + 1, step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_extent_matches_slice_semantics() {
        // 0, 2, 4 out of five elements.
        let seq = Seq::with_step(0..5, 2).unwrap();
        assert_eq!(seq.extent(5), 3);
    }

    #[test]
    fn reversed_full_range_covers_the_axis() {
        let seq = Seq::with_step(0..5, -1).unwrap();
        assert_eq!((seq.begin, seq.end, seq.step), (4, 0, -1));
        assert_eq!(seq.extent(5), 5);
    }

    #[test]
    fn span_selects_everything() {
        assert_eq!(Seq::span().extent(5), 5);
        assert_eq!(Seq::span().extent(0), 0);
    }

    #[test]
    fn empty_range_selects_nothing() {
        let seq: Seq = (3..3).into();
        assert_eq!(seq.extent(5), 0);
    }

    #[test]
    fn negative_bounds_count_from_the_end() {
        // All but the last two elements.
        let seq: Seq = (..-2i64).into();
        assert_eq!(seq.extent(5), 3);
        assert_eq!(Seq::new(-3, -1, 1).unwrap().extent(5), 3);
    }

    #[test]
    fn out_of_range_bounds_clamp() {
        let seq: Seq = (0..100).into();
        assert_eq!(seq.extent(5), 5);
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(Seq::new(0, 4, 0).is_err());
        assert!(Seq::with_step(0..4, 0).is_err());
    }

    #[test]
    fn too_many_keys_are_rejected() {
        let keys: Vec<IndexKey> = vec![0.into(), 0.into(), 0.into(), 0.into(), 0.into()];
        assert!(matches!(
            Indexer::new(keys).unwrap_err().kind(),
            Error::InvalidIndexType(_)
        ));
    }

    #[test]
    fn assignment_dims_for_sequence_keys() {
        let parent = Dim4::from([5, 5]);
        let idx = Indexer::new(vec![(0..3).into(), 1.into()]).unwrap();
        let dims = idx.assignment_dims(&parent).unwrap();
        assert_eq!(dims.get(), [3, 1, 1, 1]);
        assert_eq!(dims.rank(), 2);
    }

    #[test]
    fn trailing_slots_default_to_the_full_axis() {
        let parent = Dim4::from([4, 6]);
        let idx = Indexer::new(vec![2.into()]).unwrap();
        assert_eq!(idx.assignment_dims(&parent).unwrap().get(), [1, 6, 1, 1]);
    }
}
