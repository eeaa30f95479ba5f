/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Strided views and the operations that reshape them.
//!
//! Provides [`StridedView`], a descriptor of a rectangular window over
//! a linear buffer (`element at (i0, .., in) = base[offset + Σ ik *
//! strideₖ]`), together with a small IR of view-manipulating
//! operations:
//!
//! - `range`: bundle `min:max:step` into a [`Range`] value;
//! - `slice`: restrict a view with a list of ranges and indices,
//!   dropping one dimension per index;
//! - `transpose`: reorder dimensions by a [`Permutation`];
//! - `yield`: terminate a generic op's body.
//!
//! Operations are built in an explicit [`Context`] and checked by
//! [`Context::verify`]. Sizes, strides and offsets are symbolic
//! [`IndexExpr`]s, so views over dynamically-shaped buffers work the
//! same way as static ones.

mod context;
pub use context::BuildError;
pub use context::Context;

/// Verifier configuration.
pub mod config;
pub use config::VerifierConfig;

mod index;
pub use index::IndexExpr;
pub use index::ValueId;

/// Operation nodes.
pub mod op;
pub use op::Op;
pub use op::OpId;
pub use op::OpKind;
pub use op::RangeOp;
pub use op::SliceOp;
pub use op::TransposeOp;
pub use op::YieldOp;

mod parse;
pub use parse::ParserError;

/// Textual rendering of operations.
pub mod pretty;

/// Ranges, indexings and the rank-reducing slice transform.
pub mod slice;
pub use slice::Indexing;
pub use slice::Range;
pub use slice::SliceDim;
pub use slice::SliceError;

/// Permutations and the transpose transform.
pub mod transpose;
pub use transpose::Permutation;
pub use transpose::PermutationError;

mod types;
pub use types::ElementType;
pub use types::Type;
pub use types::ViewType;

mod verify;
pub use verify::InvalidReason;
pub use verify::VerificationError;

/// Strided view descriptors.
pub mod view;
pub use view::StridedView;
pub use view::ViewError;

/// Property-based generators for randomized test input.
#[cfg(test)]
pub mod strategy;
