/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;

use crate::index::IndexExpr;
use crate::slice::Range;
use crate::types::ElementType;
use crate::types::ViewType;

/// The type of error for view descriptor operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ViewError {
    #[error("invalid dims: expected {expected}, got {got}")]
    InvalidDims { expected: usize, got: usize },

    #[error("dimension {dim} out of range for {ndims}-dimensional view")]
    DimensionOutOfRange { dim: usize, ndims: usize },
}

/// A strided view is a metadata window `(offset, sizes, strides)` over
/// a buffer it does not own. Each coordinate maps to a flat element
/// index using the formula:
///
/// ```text
/// index = offset + ∑ iₖ × strides[k]
/// ```
///
/// where `iₖ` is the coordinate in dimension `k`. All three
/// components are [`IndexExpr`]s, so a view may be fully static,
/// fully dynamic, or anything in between.
///
/// Views never copy data, and nothing here tracks aliasing: two views
/// over the same buffer may overlap, and keeping that sound is the
/// caller's business.
///
/// ```
/// use linalg_ir::ElementType;
/// use linalg_ir::IndexExpr;
/// use linalg_ir::StridedView;
/// let v = StridedView::new_row_major(ElementType::F32, [4, 5]);
/// assert_eq!(v.rank(), 2);
/// assert_eq!(v.strides(), &[IndexExpr::from(5), IndexExpr::from(1)]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StridedView {
    element_type: ElementType,
    sizes: Vec<IndexExpr>,
    strides: Vec<IndexExpr>,
    offset: IndexExpr,
}

impl StridedView {
    /// Create a view with the provided layout. `sizes` and `strides`
    /// must have the same length; nothing else is checked, since the
    /// components are in general only known at run time.
    pub fn new(
        element_type: ElementType,
        sizes: Vec<IndexExpr>,
        strides: Vec<IndexExpr>,
        offset: IndexExpr,
    ) -> Result<Self, ViewError> {
        if sizes.len() != strides.len() {
            return Err(ViewError::InvalidDims {
                expected: sizes.len(),
                got: strides.len(),
            });
        }
        Ok(Self {
            element_type,
            sizes,
            strides,
            offset,
        })
    }

    /// Create a dense, zero-offset view of the given constant sizes in
    /// row-major order. A stride product that overflows `i64` stays
    /// symbolic.
    pub fn new_row_major(element_type: ElementType, sizes: impl Into<Vec<i64>>) -> Self {
        let sizes: Vec<IndexExpr> = sizes.into().into_iter().map(IndexExpr::from).collect();
        let mut strides = vec![IndexExpr::Const(1); sizes.len()];
        for d in (1..sizes.len()).rev() {
            strides[d - 1] = strides[d].clone() * sizes[d].clone();
        }
        Self {
            element_type,
            sizes,
            strides,
            offset: IndexExpr::Const(0),
        }
    }

    /// Deconstruct the view into its sizes, strides, and offset.
    pub fn into_inner(self) -> (Vec<IndexExpr>, Vec<IndexExpr>, IndexExpr) {
        (self.sizes, self.strides, self.offset)
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The number of dimensions in this view.
    pub fn rank(&self) -> usize {
        self.sizes.len()
    }

    pub fn sizes(&self) -> &[IndexExpr] {
        &self.sizes
    }

    pub fn strides(&self) -> &[IndexExpr] {
        &self.strides
    }

    /// The element index at which the view begins.
    pub fn offset(&self) -> &IndexExpr {
        &self.offset
    }

    /// The IR type of a value carrying this view.
    pub fn view_type(&self) -> ViewType {
        ViewType::new(self.element_type, self.rank())
    }

    /// Fix dimension `dim` at `index`, removing that dimension.
    ///
    /// The fixed coordinate's contribution `index × strides[dim]` is
    /// absorbed into the offset; the remaining dimensions keep their
    /// strides. `index` is not checked against `sizes[dim]`: an
    /// out-of-bounds index yields a view whose accesses are undefined.
    pub fn at(&self, dim: usize, index: impl Into<IndexExpr>) -> Result<Self, ViewError> {
        self.check_dim(dim)?;
        let mut sizes = self.sizes.clone();
        let mut strides = self.strides.clone();
        sizes.remove(dim);
        let stride = strides.remove(dim);
        Ok(Self {
            element_type: self.element_type,
            sizes,
            strides,
            offset: self.offset.clone() + stride * index.into(),
        })
    }

    /// Restrict dimension `dim` to `range`, keeping the dimension:
    ///
    /// ```text
    /// offset       += min × strides[dim]
    /// sizes[dim]    = ⌈(max - min) / step⌉
    /// strides[dim] ×= step
    /// ```
    ///
    /// The range is neither clamped nor validated against
    /// `sizes[dim]`; a range running past the dimension describes
    /// undefined accesses rather than a silently truncated view.
    pub fn select(&self, dim: usize, range: &Range) -> Result<Self, ViewError> {
        self.check_dim(dim)?;
        let mut view = self.clone();
        let (offset, size, stride) = range.restrict(&self.strides[dim]);
        view.offset = view.offset + offset;
        view.sizes[dim] = size;
        view.strides[dim] = stride;
        Ok(view)
    }

    /// The (symbolic) element index of the provided coordinates.
    pub fn location(&self, coord: &[IndexExpr]) -> Result<IndexExpr, ViewError> {
        if coord.len() != self.rank() {
            return Err(ViewError::InvalidDims {
                expected: self.rank(),
                got: coord.len(),
            });
        }
        Ok(coord
            .iter()
            .zip(&self.strides)
            .fold(self.offset.clone(), |acc, (i, s)| {
                acc + s.clone() * i.clone()
            }))
    }

    fn check_dim(&self, dim: usize) -> Result<(), ViewError> {
        if dim >= self.rank() {
            return Err(ViewError::DimensionOutOfRange {
                dim,
                ndims: self.rank(),
            });
        }
        Ok(())
    }

    pub(crate) fn from_parts(
        element_type: ElementType,
        sizes: Vec<IndexExpr>,
        strides: Vec<IndexExpr>,
        offset: IndexExpr,
    ) -> Self {
        debug_assert_eq!(sizes.len(), strides.len());
        Self {
            element_type,
            sizes,
            strides,
            offset,
        }
    }
}

impl std::fmt::Display for StridedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{{offset={}, sizes=[{}], strides=[{}]}}",
            self.element_type,
            self.offset,
            self.sizes.iter().join(", "),
            self.strides.iter().join(", ")
        )
    }
}

/// Construct a dense row-major [`StridedView`] with constant sizes.
///
/// Each size must fit in an `i64`; the macro panics otherwise.
///
/// ```
/// use linalg_ir::IndexExpr;
/// let v = linalg_ir::view!(F32; 2, 3, 4);
/// assert_eq!(v.rank(), 3);
/// assert_eq!(v.offset(), &IndexExpr::from(0));
/// ```
#[macro_export]
macro_rules! view {
    ( $elem:ident ; $( $size:expr ),* $(,)? ) => {
        $crate::StridedView::new_row_major(
            $crate::ElementType::$elem,
            vec![$(
                <i64 as ::std::convert::TryFrom<_>>::try_from($size)
                    .expect("view size does not fit in i64")
            ),*],
        )
    };
}
