/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The rank-reducing slice transform.
//!
//! A slice takes a base [`StridedView`] and a sequence of
//! [`Indexing`]s, one per leading dimension of the base:
//!
//! - a [`Range`] keeps its dimension, restricted to
//!   `min..max` by `step` (see [`StridedView::select`]);
//! - a scalar index drops its dimension, folding
//!   `stride × index` into the offset (see [`StridedView::at`]).
//!
//! Dimensions past the last indexing pass through unchanged, so
//!
//! ```text
//! rank(slice(v, idx)) = #ranges(idx) + (rank(v) - len(idx))
//! ```
//!
//! Bounds are never checked here. They are dynamic, and a slice that
//! runs past a dimension describes undefined accesses; truncating it
//! would hide the bug instead.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::index::IndexExpr;
use crate::view::StridedView;

/// The type of error for slice transforms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SliceError {
    #[error("indexing count {indexings} exceeds view rank {rank}")]
    TooManyIndexings { indexings: usize, rank: usize },
}

/// A half-open interval `min..max` walked with `step`.
///
/// No relation between the bounds is enforced; `step` may be zero or
/// negative. Whether the range makes sense is a run-time property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub min: IndexExpr,
    pub max: IndexExpr,
    pub step: IndexExpr,
}

impl Range {
    pub fn new(
        min: impl Into<IndexExpr>,
        max: impl Into<IndexExpr>,
        step: impl Into<IndexExpr>,
    ) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
            step: step.into(),
        }
    }

    /// The number of elements visited: `⌈(max - min) / step⌉`.
    pub fn extent(&self) -> IndexExpr {
        (self.max.clone() - self.min.clone()).ceil_div(self.step.clone())
    }

    /// Offset contribution, size and stride of a dimension with
    /// stride `stride` restricted to this range.
    pub(crate) fn restrict(&self, stride: &IndexExpr) -> (IndexExpr, IndexExpr, IndexExpr) {
        (
            stride.clone() * self.min.clone(),
            self.extent(),
            stride.clone() * self.step.clone(),
        )
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.min, self.max, self.step)
    }
}

impl From<std::ops::Range<i64>> for Range {
    fn from(r: std::ops::Range<i64>) -> Self {
        Self::new(r.start, r.end, 1)
    }
}

/// One position of a slice's indexing list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Indexing {
    Range(Range),
    /// An exact position; the dimension is dropped.
    Index(IndexExpr),
}

impl Indexing {
    pub fn kind(&self) -> SliceDim {
        match self {
            Indexing::Range(_) => SliceDim::Kept,
            Indexing::Index(_) => SliceDim::Dropped,
        }
    }
}

impl From<Range> for Indexing {
    fn from(r: Range) -> Self {
        Indexing::Range(r)
    }
}

impl From<IndexExpr> for Indexing {
    fn from(e: IndexExpr) -> Self {
        Indexing::Index(e)
    }
}

/// What a slice does to one dimension of its base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SliceDim {
    Kept,
    Dropped,
}

/// The rank of the result of slicing a rank-`base_rank` view with
/// indexings of the given kinds. Assumes `kinds.len() <= base_rank`.
pub fn result_rank(base_rank: usize, kinds: &[SliceDim]) -> usize {
    let kept = kinds.iter().filter(|k| **k == SliceDim::Kept).count();
    kept + base_rank.saturating_sub(kinds.len())
}

/// Whether any indexing drops a dimension.
pub fn is_rank_reducing(kinds: &[SliceDim]) -> bool {
    kinds.contains(&SliceDim::Dropped)
}

/// Slice `base` by `indexings`. Indexing `i` applies to dimension `i`;
/// trailing dimensions pass through in order.
///
/// ```
/// use linalg_ir::IndexExpr;
/// use linalg_ir::Indexing;
/// use linalg_ir::Range;
/// use linalg_ir::slice::slice;
///
/// let base = linalg_ir::view!(F32; 4, 5);
/// let row = slice(&base, &[Indexing::Index(2.into()), Range::from(0..5).into()]).unwrap();
/// assert_eq!(row.rank(), 1);
/// assert_eq!(row.offset(), &IndexExpr::from(10));
/// ```
pub fn slice(base: &StridedView, indexings: &[Indexing]) -> Result<StridedView, SliceError> {
    if indexings.len() > base.rank() {
        return Err(SliceError::TooManyIndexings {
            indexings: indexings.len(),
            rank: base.rank(),
        });
    }

    let mut offset = base.offset().clone();
    let mut sizes = Vec::with_capacity(base.rank());
    let mut strides = Vec::with_capacity(base.rank());

    for (indexing, stride) in indexings.iter().zip(base.strides()) {
        match indexing {
            Indexing::Range(range) => {
                let (delta, size, stride) = range.restrict(stride);
                offset = offset + delta;
                sizes.push(size);
                strides.push(stride);
            }
            Indexing::Index(index) => {
                offset = offset + stride.clone() * index.clone();
            }
        }
    }
    sizes.extend_from_slice(&base.sizes()[indexings.len()..]);
    strides.extend_from_slice(&base.strides()[indexings.len()..]);

    Ok(StridedView::from_parts(
        base.element_type(),
        sizes,
        strides,
        offset,
    ))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;
    use crate::index::ValueId;
    use crate::strategy::gen_view_and_indexings;
    use crate::view;

    fn consts(xs: &[i64]) -> Vec<IndexExpr> {
        xs.iter().copied().map(IndexExpr::from).collect()
    }

    #[test]
    fn test_scalar_then_range() {
        let base = view!(F32; 4, 5);
        let i = ValueId(3);
        let out = slice(
            &base,
            &[Indexing::Index(i.into()), Range::new(0, 5, 1).into()],
        )
        .unwrap();
        assert_eq!(out.rank(), 1);
        assert_eq!(out.sizes(), consts(&[5]).as_slice());
        assert_eq!(out.strides(), consts(&[1]).as_slice());
        assert_eq!(out.offset(), &(IndexExpr::from(5) * IndexExpr::from(i)));
    }

    #[test]
    fn test_trailing_dims_pass_through() {
        let base = view!(F64; 2, 3, 4);
        let out = slice(&base, &[Indexing::Index(1.into())]).unwrap();
        assert_eq!(out.sizes(), consts(&[3, 4]).as_slice());
        assert_eq!(out.strides(), consts(&[4, 1]).as_slice());
        assert_eq!(out.offset(), &IndexExpr::from(12));

        let out = slice(&base, &[]).unwrap();
        assert_eq!(out, base);
    }

    #[test]
    fn test_strided_range() {
        let base = view!(F32; 8, 8);
        let out = slice(
            &base,
            &[Range::new(1, 8, 3).into(), Indexing::Index(2.into())],
        )
        .unwrap();
        assert_eq!(out.sizes(), consts(&[3]).as_slice());
        assert_eq!(out.strides(), consts(&[24]).as_slice());
        assert_eq!(out.offset(), &IndexExpr::from(10));
    }

    #[test]
    fn test_dynamic_range() {
        let base = view!(F32; 16);
        let (lo, hi, step) = (ValueId(0), ValueId(1), ValueId(2));
        let out = slice(&base, &[Range::new(lo, hi, step).into()]).unwrap();
        let bindings = HashMap::from([(lo, 3), (hi, 12), (step, 2)]);
        assert_eq!(out.sizes()[0].eval(&bindings), Some(5));
        assert_eq!(out.strides()[0].eval(&bindings), Some(2));
        assert_eq!(out.offset().eval(&bindings), Some(3));
    }

    #[test]
    fn test_out_of_bounds_is_not_clamped() {
        let base = view!(F32; 4, 5);
        let out = slice(&base, &[Range::from(2..9).into()]).unwrap();
        assert_eq!(out.sizes(), consts(&[7, 5]).as_slice());
    }

    #[test]
    fn test_extreme_constant_range_does_not_fold_overflow() {
        let base = view!(F32; 4);
        let range = Range::new(0, i64::MIN, -1);
        let out = slice(&base, &[range.clone().into()]).unwrap();
        assert_eq!(out.sizes(), &[range.extent()]);
        assert!(matches!(out.sizes()[0], IndexExpr::CeilDiv(_, _)));
        assert_eq!(out.sizes()[0].eval(&HashMap::new()), None);
        assert_eq!(out.strides(), consts(&[-1]).as_slice());
    }

    #[test]
    fn test_too_many_indexings() {
        let base = view!(F32; 4);
        assert_eq!(
            slice(
                &base,
                &[Indexing::Index(0.into()), Indexing::Index(0.into())]
            ),
            Err(SliceError::TooManyIndexings {
                indexings: 2,
                rank: 1
            })
        );
    }

    #[test]
    fn test_rank_helpers() {
        let kinds = [SliceDim::Dropped, SliceDim::Kept];
        assert_eq!(result_rank(3, &kinds), 2);
        assert!(is_rank_reducing(&kinds));
        assert!(!is_rank_reducing(&[SliceDim::Kept]));
        assert_eq!(result_rank(2, &[]), 2);
    }

    proptest! {
        #[test]
        fn slice_rank_counts_ranges_and_passthrough(
            (base, indexings) in gen_view_and_indexings(4, 6)
        ) {
            let kinds: Vec<_> = indexings.iter().map(Indexing::kind).collect();
            let out = slice(&base, &indexings).unwrap();
            let ranges = kinds.iter().filter(|k| **k == SliceDim::Kept).count();
            prop_assert_eq!(out.rank(), ranges + (base.rank() - indexings.len()));
            prop_assert_eq!(out.rank(), result_rank(base.rank(), &kinds));
        }

        #[test]
        fn slice_agrees_with_base_locations(
            (base, indexings) in gen_view_and_indexings(4, 6)
        ) {
            // The slice's origin is the base element at the indexed
            // coordinate.
            let out = slice(&base, &indexings).unwrap();
            let zero = vec![IndexExpr::from(0); out.rank()];
            let mut base_coord = Vec::new();
            for indexing in &indexings {
                match indexing {
                    Indexing::Range(r) => base_coord.push(r.min.clone()),
                    Indexing::Index(i) => base_coord.push(i.clone()),
                }
            }
            base_coord.resize(base.rank(), IndexExpr::from(0));
            prop_assert_eq!(
                out.location(&zero).unwrap().as_const(),
                base.location(&base_coord).unwrap().as_const()
            );
        }
    }
}
