/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Dimension permutations and the transpose transform.

use std::fmt;

use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;

use crate::view::StridedView;

/// The type of error for transpose.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PermutationError {
    #[error("{permutation} is not a permutation")]
    NotAPermutation { permutation: Permutation },

    #[error("permutation {permutation} has length {len}, expected rank {rank}")]
    RankMismatch {
        permutation: Permutation,
        len: usize,
        rank: usize,
    },
}

/// A permutation attribute: an ordered list of dimension numbers.
///
/// The attribute is stored as given. Whether it is actually a
/// bijection on `0..len` is a property checked by
/// [`Permutation::is_bijection`], not an invariant of the type, so
/// that ill-formed attributes can be represented and diagnosed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    pub fn new(dims: impl Into<Vec<usize>>) -> Self {
        Self(dims.into())
    }

    /// `(0, 1, ..., rank - 1)`.
    pub fn identity(rank: usize) -> Self {
        Self((0..rank).collect())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True iff every number in `0..len` appears exactly once.
    pub fn is_bijection(&self) -> bool {
        let mut seen = vec![false; self.0.len()];
        for &d in &self.0 {
            match seen.get_mut(d) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }

    /// The permutation `q` with `q[p[k]] = k`, or `None` if `self` is
    /// not a bijection.
    pub fn inverse(&self) -> Option<Self> {
        if !self.is_bijection() {
            return None;
        }
        let mut inv = vec![0; self.0.len()];
        for (k, &d) in self.0.iter().enumerate() {
            inv[d] = k;
        }
        Some(Self(inv))
    }

    /// Check that this permutation applies to a view of rank `rank`.
    ///
    /// The bijection check runs first; a malformed attribute is
    /// reported as such even when its length is also wrong.
    pub fn check(&self, rank: usize) -> Result<(), PermutationError> {
        if !self.is_bijection() {
            return Err(PermutationError::NotAPermutation {
                permutation: self.clone(),
            });
        }
        if self.len() != rank {
            return Err(PermutationError::RankMismatch {
                permutation: self.clone(),
                len: self.len(),
                rank,
            });
        }
        Ok(())
    }
}

impl From<Vec<usize>> for Permutation {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

/// Permute the dimensions of `view`:
///
/// ```text
/// sizes'[k]   = sizes[p[k]]
/// strides'[k] = strides[p[k]]
/// offset'     = offset
/// ```
///
/// ```
/// use linalg_ir::Permutation;
/// use linalg_ir::transpose::transpose;
///
/// let v = linalg_ir::view!(F32; 4, 5);
/// let t = transpose(&v, &Permutation::new([1, 0])).unwrap();
/// assert_eq!(t.sizes(), linalg_ir::view!(F32; 5, 4).sizes());
/// ```
pub fn transpose(
    view: &StridedView,
    permutation: &Permutation,
) -> Result<StridedView, PermutationError> {
    permutation.check(view.rank())?;
    let (sizes, strides) = permutation
        .dims()
        .iter()
        .map(|&d| (view.sizes()[d].clone(), view.strides()[d].clone()))
        .unzip();
    Ok(StridedView::from_parts(
        view.element_type(),
        sizes,
        strides,
        view.offset().clone(),
    ))
}
