/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Operation verification.
//!
//! Each operation kind has exactly one rule, selected by matching on
//! [`Op`]. Rules look only at operand types and attributes: dynamic
//! index values are never inspected, so a slice that runs past its
//! view's bounds verifies fine (and is undefined at run time).
//!
//! | kind        | rule                                                  |
//! |-------------|-------------------------------------------------------|
//! | `range`     | always valid                                          |
//! | `slice`     | view operand; range/index indexings; count ≤ rank     |
//! | `transpose` | view operand; bijection; length == rank (in order)    |
//! | `yield`     | always valid                                          |
//!
//! Verification is pure and is recomputed on every call.

use crate::context::Context;
use crate::index::ValueId;
use crate::op::Op;
use crate::op::OpId;
use crate::op::OpKind;
use crate::op::RangeOp;
use crate::op::SliceOp;
use crate::op::TransposeOp;
use crate::op::YieldOp;
use crate::transpose::Permutation;
use crate::transpose::PermutationError;
use crate::types::Type;
use crate::types::ViewType;

/// Why an operation is ill-formed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum InvalidReason {
    #[error("operand is not a view: expected a strided view, got {actual}")]
    NotAView { actual: Type },

    #[error("indexing operand {position} is neither a range nor an index: got {actual}")]
    InvalidIndexing { position: usize, actual: Type },

    #[error("indexing count exceeds view rank: {indexings} indexings for rank {rank}")]
    IndexingCountExceedsRank { indexings: usize, rank: usize },

    #[error("not a permutation: {permutation}")]
    NotAPermutation { permutation: Permutation },

    #[error("rank mismatch: permutation of length {len} for view of rank {rank}")]
    RankMismatch { len: usize, rank: usize },
}

impl From<PermutationError> for InvalidReason {
    fn from(err: PermutationError) -> Self {
        match err {
            PermutationError::NotAPermutation { permutation } => {
                InvalidReason::NotAPermutation { permutation }
            }
            PermutationError::RankMismatch { len, rank, .. } => {
                InvalidReason::RankMismatch { len, rank }
            }
        }
    }
}

/// A failed verification, reported to the host's diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum VerificationError {
    #[error("'{kind}' op {reason}")]
    Invalid {
        op: OpId,
        kind: OpKind,
        reason: InvalidReason,
    },

    #[error("unknown operation {op}")]
    UnknownOperation { op: OpId },
}

impl VerificationError {
    /// The human-readable diagnostic.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn reason(&self) -> Option<&InvalidReason> {
        match self {
            VerificationError::Invalid { reason, .. } => Some(reason),
            VerificationError::UnknownOperation { .. } => None,
        }
    }
}

impl Context {
    /// Verify a single operation.
    pub fn verify(&self, id: OpId) -> Result<(), VerificationError> {
        let Some(op) = self.operation(id) else {
            return Err(VerificationError::UnknownOperation { op: id });
        };
        let outcome = match op {
            Op::Range(op) => verify_range(op),
            Op::Slice(op) => verify_slice(self, op),
            Op::Transpose(op) => verify_transpose(self, op),
            Op::Yield(op) => verify_yield(op),
        };
        match outcome {
            Ok(()) => {
                tracing::debug!(op = %op.kind(), id = %id, "verified");
                Ok(())
            }
            Err(reason) => {
                let err = VerificationError::Invalid {
                    op: id,
                    kind: op.kind(),
                    reason,
                };
                if self.config().log_failures {
                    tracing::warn!(op = %op.kind(), id = %id, error = %err, "verification failed");
                }
                Err(err)
            }
        }
    }

    /// Verify every operation, returning all failures in construction
    /// order.
    #[tracing::instrument(level = "debug", skip(self), fields(ops = self.operations().count()))]
    pub fn verify_all(&self) -> Vec<VerificationError> {
        self.operations()
            .filter_map(|(id, _)| self.verify(id).err())
            .collect()
    }
}

fn verify_range(_op: &RangeOp) -> Result<(), InvalidReason> {
    Ok(())
}

fn verify_yield(_op: &YieldOp) -> Result<(), InvalidReason> {
    Ok(())
}

fn verify_slice(cx: &Context, op: &SliceOp) -> Result<(), InvalidReason> {
    let base = view_operand(cx, op.view())?;
    for (position, &v) in op.indexings().iter().enumerate() {
        if cx.indexing_kind(v).is_none() {
            return Err(InvalidReason::InvalidIndexing {
                position,
                actual: operand_type(cx, v),
            });
        }
    }
    if op.indexings().len() > base.rank() {
        return Err(InvalidReason::IndexingCountExceedsRank {
            indexings: op.indexings().len(),
            rank: base.rank(),
        });
    }
    Ok(())
}

fn verify_transpose(cx: &Context, op: &TransposeOp) -> Result<(), InvalidReason> {
    let base = view_operand(cx, op.view())?;
    op.permutation().check(base.rank())?;
    Ok(())
}

fn view_operand(cx: &Context, value: ValueId) -> Result<ViewType, InvalidReason> {
    let actual = operand_type(cx, value);
    actual
        .as_view()
        .copied()
        .ok_or(InvalidReason::NotAView { actual })
}

// Operands are checked to exist when the operation is built.
fn operand_type(cx: &Context, value: ValueId) -> Type {
    cx.value_type(value).unwrap_or(Type::Index)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::config::VerifierConfig;
    use crate::context::BuildError;
    use crate::strategy::gen_non_permutation;
    use crate::strategy::gen_view_and_permutation;
    use crate::types::ElementType;
    use crate::view;
    use crate::view::StridedView;

    fn lazy() -> Context {
        Context::with_config(VerifierConfig {
            verify_on_build: false,
            log_failures: true,
        })
    }

    fn op_of(cx: &Context, v: ValueId) -> OpId {
        cx.defining_op(v).unwrap()
    }

    #[test]
    fn test_range_always_valid() {
        let mut cx = Context::new();
        let (a, b, c) = (cx.add_index(), cx.add_index(), cx.constant_index(-3));
        let r = cx.build_range(b, a, c).unwrap();
        assert_eq!(cx.verify(op_of(&cx, r)), Ok(()));
    }

    #[test]
    fn test_yield_always_valid() {
        let mut cx = Context::new();
        let empty = cx.build_yield(&[]).unwrap();
        assert_eq!(cx.verify(empty), Ok(()));
        let a = cx.add_view(view!(F32; 2));
        let y = cx.build_yield(&[a, a]).unwrap();
        assert_eq!(cx.verify(y), Ok(()));
    }

    #[test]
    fn test_slice_too_many_indexings() {
        let mut cx = lazy();
        let a = cx.add_view(view!(F32; 4));
        let (i, j) = (cx.add_index(), cx.add_index());
        let s = cx.build_slice(a, &[i, j]).unwrap();
        let err = cx.verify(op_of(&cx, s)).unwrap_err();
        assert_eq!(
            err.reason(),
            Some(&InvalidReason::IndexingCountExceedsRank {
                indexings: 2,
                rank: 1
            })
        );
        assert!(err.message().contains("indexing count exceeds view rank"));
        assert!(cx.view_of(s).is_none());
    }

    #[test]
    fn test_slice_full_rank_is_valid() {
        let mut cx = Context::new();
        let a = cx.add_view(view!(F32; 4, 5));
        let (i, j) = (cx.add_index(), cx.add_index());
        let s = cx.build_slice(a, &[i, j]).unwrap();
        assert_eq!(cx.value_type(s), Some(Type::view(ElementType::F32, 0)));
        assert_eq!(cx.verify(op_of(&cx, s)), Ok(()));
    }

    #[test]
    fn test_slice_of_non_view() {
        let mut cx = Context::new();
        let x = cx.add_value(Type::Scalar(ElementType::F32));
        let err = cx.build_slice(x, &[]).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Verification(VerificationError::Invalid {
                kind: OpKind::Slice,
                reason: InvalidReason::NotAView { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_transpose_of_non_view_ignores_permutation() {
        let mut cx = lazy();
        let x = cx.add_value(Type::Scalar(ElementType::F32));
        let t = cx.build_transpose(x, Permutation::new([0, 0])).unwrap();
        assert_eq!(cx.value_type(t).and_then(|ty| ty.as_view().copied()), None);
        let err = cx.verify(op_of(&cx, t)).unwrap_err();
        assert_eq!(
            err.reason(),
            Some(&InvalidReason::NotAView {
                actual: Type::Scalar(ElementType::F32)
            })
        );
        assert!(err.message().contains("operand is not a view"));
    }

    #[test]
    fn test_slice_bad_indexing_operand() {
        let mut cx = Context::new();
        let a = cx.add_view(view!(F32; 4, 5));
        let i = cx.add_index();
        let err = cx.build_slice(a, &[i, a]).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Verification(VerificationError::Invalid {
                reason: InvalidReason::InvalidIndexing { position: 1, .. },
                ..
            })
        ));
    }

    #[test]
    fn test_slice_verify_on_build_reports_error() {
        let mut cx = Context::new();
        let a = cx.add_view(view!(F32; 4));
        let (i, j) = (cx.add_index(), cx.add_index());
        let err = cx.build_slice(a, &[i, j]).unwrap_err();
        assert!(err.to_string().contains("indexing count exceeds view rank"));
        // The failed operation is kept, and still fails on re-verification.
        let (id, _) = cx.operations().last().unwrap();
        assert!(cx.verify(id).is_err());
    }

    #[test]
    fn test_transpose_not_a_permutation() {
        let mut cx = lazy();
        let a = cx.add_view(view!(F32; 4, 5));
        let t = cx.build_transpose(a, Permutation::new([0, 0])).unwrap();
        let err = cx.verify(op_of(&cx, t)).unwrap_err();
        assert!(matches!(
            err.reason(),
            Some(InvalidReason::NotAPermutation { .. })
        ));
        assert_eq!(
            err.message(),
            "'linalg.transpose' op not a permutation: (0, 0)"
        );
    }

    #[test]
    fn test_transpose_rank_mismatch() {
        let mut cx = lazy();
        let a = cx.add_view(view!(F32; 4, 5));
        let t = cx.build_transpose(a, Permutation::new([0, 2, 1])).unwrap();
        assert_eq!(
            cx.verify(op_of(&cx, t)).unwrap_err().reason(),
            Some(&InvalidReason::RankMismatch { len: 3, rank: 2 })
        );
    }

    #[test]
    fn test_transpose_bijection_checked_first() {
        let mut cx = lazy();
        let a = cx.add_view(view!(F32; 4, 5));
        let t = cx.build_transpose(a, Permutation::new([1, 1, 1])).unwrap();
        assert!(matches!(
            cx.verify(op_of(&cx, t)).unwrap_err().reason(),
            Some(InvalidReason::NotAPermutation { .. })
        ));
    }

    #[test]
    fn test_verify_is_idempotent() {
        let mut cx = lazy();
        let a = cx.add_view(view!(F32; 4, 5));
        let good = cx.build_transpose(a, Permutation::new([1, 0])).unwrap();
        let bad = cx.build_transpose(a, Permutation::new([0])).unwrap();
        for v in [good, bad] {
            let id = op_of(&cx, v);
            assert_eq!(cx.verify(id), cx.verify(id));
        }
    }

    #[test]
    fn test_verify_all() {
        let mut cx = lazy();
        let a = cx.add_view(view!(F32; 4, 5));
        cx.build_transpose(a, Permutation::new([1, 0])).unwrap();
        cx.build_transpose(a, Permutation::new([3])).unwrap();
        cx.build_yield(&[]).unwrap();
        let errs = cx.verify_all();
        assert_eq!(errs.len(), 1);
        assert!(matches!(
            errs[0],
            VerificationError::Invalid {
                op: OpId(1),
                kind: OpKind::Transpose,
                ..
            }
        ));
    }

    proptest! {
        #[test]
        fn non_permutation_is_reported_first(
            p in gen_non_permutation(5),
            rank in 0..6usize,
        ) {
            let mut cx = lazy();
            let a = cx.add_view(StridedView::new_row_major(ElementType::F32, vec![2; rank]));
            let t = cx.build_transpose(a, p.clone()).unwrap();
            let err = cx.verify(op_of(&cx, t)).unwrap_err();
            prop_assert_eq!(
                err.reason(),
                Some(&InvalidReason::NotAPermutation { permutation: p })
            );
        }

        #[test]
        fn valid_transposes_verify(
            (v, p) in gen_view_and_permutation(5, 4),
        ) {
            let mut cx = Context::new();
            let a = cx.add_view(v);
            let t = cx.build_transpose(a, p).unwrap();
            prop_assert!(cx.verify(op_of(&cx, t)).is_ok());
        }
    }

    #[test]
    fn test_unknown_operation() {
        let cx = Context::new();
        assert_eq!(
            cx.verify(OpId(3)),
            Err(VerificationError::UnknownOperation { op: OpId(3) })
        );
    }
}
