/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Operation nodes.
//!
//! The set of operations is closed: [`Op`] is an enum with one variant
//! per operation, and everything that differs between operations
//! (verification, printing) is a `match` over it.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::index::ValueId;
use crate::transpose::Permutation;

/// Handle to an operation owned by a [`Context`](crate::Context).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize
)]
pub struct OpId(pub(crate) usize);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Range,
    Slice,
    Transpose,
    Yield,
}

impl OpKind {
    /// The mnemonic used in the textual syntax.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpKind::Range => "range",
            OpKind::Slice => "slice",
            OpKind::Transpose => "transpose",
            OpKind::Yield => "yield",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "linalg.{}", self.mnemonic())
    }
}

/// `%r = range %min:%max:%step`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeOp {
    pub(crate) min: ValueId,
    pub(crate) max: ValueId,
    pub(crate) step: ValueId,
    pub(crate) result: ValueId,
}

impl RangeOp {
    pub fn min(&self) -> ValueId {
        self.min
    }

    pub fn max(&self) -> ValueId {
        self.max
    }

    pub fn step(&self) -> ValueId {
        self.step
    }

    pub fn result(&self) -> ValueId {
        self.result
    }
}

/// `%r = slice %view[%i0, %i1, ...]`
///
/// Each indexing operand is either a `!linalg.range` (dimension kept)
/// or an `index` (dimension dropped). The kinds are not stored; they
/// are read back off the operand types when needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceOp {
    pub(crate) view: ValueId,
    pub(crate) indexings: Vec<ValueId>,
    pub(crate) result: ValueId,
}

impl SliceOp {
    pub fn view(&self) -> ValueId {
        self.view
    }

    pub fn indexings(&self) -> &[ValueId] {
        &self.indexings
    }

    pub fn result(&self) -> ValueId {
        self.result
    }
}

/// `%r = transpose %view (p0, p1, ...)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransposeOp {
    pub(crate) view: ValueId,
    pub(crate) permutation: Permutation,
    pub(crate) result: ValueId,
}

impl TransposeOp {
    pub fn view(&self) -> ValueId {
        self.view
    }

    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    pub fn result(&self) -> ValueId {
        self.result
    }
}

/// Terminator of a generic op's body: hands `values`, in order, back
/// to the enclosing operation. Matching them against the enclosing
/// operation's results, and keeping the yield last in its block, is
/// the host's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldOp {
    pub(crate) values: Vec<ValueId>,
}

impl YieldOp {
    pub fn values(&self) -> &[ValueId] {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Range(RangeOp),
    Slice(SliceOp),
    Transpose(TransposeOp),
    Yield(YieldOp),
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Range(_) => OpKind::Range,
            Op::Slice(_) => OpKind::Slice,
            Op::Transpose(_) => OpKind::Transpose,
            Op::Yield(_) => OpKind::Yield,
        }
    }

    /// Operands in syntactic order.
    pub fn operands(&self) -> Vec<ValueId> {
        match self {
            Op::Range(op) => vec![op.min, op.max, op.step],
            Op::Slice(op) => std::iter::once(op.view)
                .chain(op.indexings.iter().copied())
                .collect(),
            Op::Transpose(op) => vec![op.view],
            Op::Yield(op) => op.values.clone(),
        }
    }

    /// The single result, if the operation has one.
    pub fn result(&self) -> Option<ValueId> {
        match self {
            Op::Range(op) => Some(op.result),
            Op::Slice(op) => Some(op.result),
            Op::Transpose(op) => Some(op.result),
            Op::Yield(_) => None,
        }
    }
}
