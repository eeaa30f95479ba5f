/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Property-based generators for views, indexings and permutations.
//!
//! All generated quantities are constants, so results can be compared
//! structurally after constant folding.
//!
//! This module is only included in test builds (`#[cfg(test)]`).

use proptest::prelude::*;

use crate::index::IndexExpr;
use crate::slice::Indexing;
use crate::slice::Range;
use crate::transpose::Permutation;
use crate::types::ElementType;
use crate::view::StridedView;

/// Generates a [`StridedView`] of rank `0..=max_dims` with sizes in
/// `1..=max_len`, arbitrary nonnegative strides and a small offset.
///
/// Views need not be dense or even non-aliasing; nothing in the view
/// algebra depends on it.
pub fn gen_view(max_dims: usize, max_len: i64) -> impl Strategy<Value = StridedView> {
    (0..=max_dims)
        .prop_flat_map(move |rank| {
            (
                prop::collection::vec(1..=max_len, rank),
                prop::collection::vec(0..=max_len * max_len, rank),
                0..64i64,
            )
        })
        .prop_map(|(sizes, strides, offset)| {
            StridedView::new(
                ElementType::F32,
                sizes.into_iter().map(IndexExpr::from).collect(),
                strides.into_iter().map(IndexExpr::from).collect(),
                IndexExpr::from(offset),
            )
            .expect("sizes and strides have equal length")
        })
}

/// Generates an in-bounds indexing for a dimension of size `size`.
fn gen_indexing(size: i64) -> BoxedStrategy<Indexing> {
    prop_oneof![
        (0..size).prop_map(|i| Indexing::Index(IndexExpr::from(i))),
        (0..size)
            .prop_flat_map(move |min| (Just(min), (min + 1)..=size, 1..=3i64))
            .prop_map(|(min, max, step)| Indexing::Range(Range::new(min, max, step))),
    ]
    .boxed()
}

/// Generates a pair `(view, indexings)` where `indexings` covers a
/// prefix (possibly empty, possibly all) of the view's dimensions.
pub fn gen_view_and_indexings(
    max_dims: usize,
    max_len: i64,
) -> impl Strategy<Value = (StridedView, Vec<Indexing>)> {
    gen_view(max_dims, max_len).prop_flat_map(|view| {
        let sizes: Vec<i64> = view
            .sizes()
            .iter()
            .map(|s| s.as_const().expect("constant size"))
            .collect();
        (0..=sizes.len()).prop_flat_map(move |n| {
            let view = view.clone();
            sizes[..n]
                .iter()
                .map(|&size| gen_indexing(size))
                .collect::<Vec<_>>()
                .prop_map(move |indexings| (view.clone(), indexings))
        })
    })
}

/// Generates a pair `(view, permutation)` where `permutation` is a
/// valid permutation of the view's dimensions.
pub fn gen_view_and_permutation(
    max_dims: usize,
    max_len: i64,
) -> impl Strategy<Value = (StridedView, Permutation)> {
    gen_view(max_dims, max_len).prop_flat_map(|view| {
        let dims: Vec<usize> = (0..view.rank()).collect();
        (Just(view), Just(dims).prop_shuffle().prop_map(Permutation::new))
    })
}

/// Generates a list of dimension numbers that is *not* a bijection on
/// `0..len` (it repeats or skips an entry), with `len` in
/// `1..=max_len`.
pub fn gen_non_permutation(max_len: usize) -> impl Strategy<Value = Permutation> {
    prop::collection::vec(0..=max_len, 1..=max_len)
        .prop_filter("must not be a bijection", |dims| {
            !Permutation::new(dims.clone()).is_bijection()
        })
        .prop_map(Permutation::new)
}
