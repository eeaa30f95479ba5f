/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! The construction context.
//!
//! A [`Context`] owns every value and operation built through it and
//! is passed explicitly to every construction call; nothing here is
//! global. Building takes `&mut Context`, querying and verifying take
//! `&Context`, so a finished context can be shared across threads and
//! verified concurrently.
//!
//! ```
//! use linalg_ir::Context;
//! use linalg_ir::Permutation;
//!
//! let mut cx = Context::new();
//! let a = cx.add_view(linalg_ir::view!(F32; 4, 5));
//! let t = cx.build_transpose(a, Permutation::new([1, 0])).unwrap();
//! assert_eq!(cx.value_type(t).unwrap().to_string(), "!linalg.view<?x?xf32>");
//! ```

use crate::config::VerifierConfig;
use crate::index::IndexExpr;
use crate::index::ValueId;
use crate::op::Op;
use crate::op::OpId;
use crate::op::RangeOp;
use crate::op::SliceOp;
use crate::op::TransposeOp;
use crate::op::YieldOp;
use crate::slice;
use crate::slice::Indexing;
use crate::slice::Range;
use crate::slice::SliceDim;
use crate::transpose;
use crate::transpose::Permutation;
use crate::types::Type;
use crate::verify::VerificationError;
use crate::view::StridedView;

/// Errors raised while constructing an operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("unknown value {value}")]
    UnknownValue { value: ValueId },

    #[error("operand {value} of '{op}' must be {expected}, got {actual}")]
    OperandType {
        op: &'static str,
        value: ValueId,
        expected: &'static str,
        actual: Type,
    },

    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// What, beyond its type, is statically known about a value.
#[derive(Debug, Clone, PartialEq)]
enum Binding {
    Opaque,
    Index(IndexExpr),
    Range(Range),
    View(StridedView),
}

#[derive(Debug, Clone, PartialEq)]
struct ValueInfo {
    ty: Type,
    binding: Binding,
    def: Option<OpId>,
}

/// Owner of all values and operations.
#[derive(Debug, Clone, Default)]
pub struct Context {
    config: VerifierConfig,
    values: Vec<ValueInfo>,
    ops: Vec<Op>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: VerifierConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Register a view over some buffer, e.g. a function argument.
    pub fn add_view(&mut self, view: StridedView) -> ValueId {
        let ty = Type::View(view.view_type());
        self.push_value(ty, Binding::View(view), None)
    }

    /// Register an opaque dynamic `index` quantity.
    pub fn add_index(&mut self) -> ValueId {
        let id = ValueId(self.values.len());
        self.push_value(Type::Index, Binding::Index(IndexExpr::Value(id)), None)
    }

    /// Register an `index` value known to be `value`.
    pub fn constant_index(&mut self, value: i64) -> ValueId {
        self.push_value(Type::Index, Binding::Index(IndexExpr::Const(value)), None)
    }

    /// Register an opaque value of any type (block arguments, scalars
    /// computed in a generic body, ...).
    pub fn add_value(&mut self, ty: Type) -> ValueId {
        self.push_value(ty, Binding::Opaque, None)
    }

    pub fn value_type(&self, value: ValueId) -> Option<Type> {
        self.values.get(value.index()).map(|info| info.ty)
    }

    /// The view descriptor carried by `value`, if it is a view whose
    /// layout is known.
    pub fn view_of(&self, value: ValueId) -> Option<&StridedView> {
        match &self.values.get(value.index())?.binding {
            Binding::View(view) => Some(view),
            _ => None,
        }
    }

    /// The range carried by `value`, if it is the result of a `range`.
    pub fn range_of(&self, value: ValueId) -> Option<&Range> {
        match &self.values.get(value.index())?.binding {
            Binding::Range(range) => Some(range),
            _ => None,
        }
    }

    /// The index quantity `value` stands for.
    pub fn index_of(&self, value: ValueId) -> Option<&IndexExpr> {
        match &self.values.get(value.index())?.binding {
            Binding::Index(expr) => Some(expr),
            _ => None,
        }
    }

    /// The operation defining `value`, if any.
    pub fn defining_op(&self, value: ValueId) -> Option<OpId> {
        self.values.get(value.index())?.def
    }

    pub fn operation(&self, op: OpId) -> Option<&Op> {
        self.ops.get(op.0)
    }

    /// All operations, in construction order.
    pub fn operations(&self) -> impl Iterator<Item = (OpId, &Op)> {
        self.ops.iter().enumerate().map(|(i, op)| (OpId(i), op))
    }

    /// `%r = range %min:%max:%step`. Any index values are accepted;
    /// ordering of the bounds and the sign of the step are not
    /// checked.
    pub fn build_range(
        &mut self,
        min: ValueId,
        max: ValueId,
        step: ValueId,
    ) -> Result<ValueId, BuildError> {
        let lo = self.expect_index("range", min)?;
        let hi = self.expect_index("range", max)?;
        let st = self.expect_index("range", step)?;
        let op = OpId(self.ops.len());
        let result = self.push_value(
            Type::Range,
            Binding::Range(Range::new(lo, hi, st)),
            Some(op),
        );
        self.push_op(Op::Range(RangeOp {
            min,
            max,
            step,
            result,
        }));
        Ok(result)
    }

    /// `%r = slice %view[%indexings...]`.
    ///
    /// The result type is derived from the operands: a view of the
    /// base's element type whose rank drops by one per `index`
    /// indexing. With [`VerifierConfig::verify_on_build`] set, a
    /// verification failure is returned instead of the result (the
    /// failed operation is still recorded in the context).
    pub fn build_slice(
        &mut self,
        view: ValueId,
        indexings: &[ValueId],
    ) -> Result<ValueId, BuildError> {
        let base_ty = self.lookup(view)?.ty;
        for &v in indexings {
            self.lookup(v)?;
        }

        let result_ty = match base_ty {
            Type::View(vt) => {
                let dropped = indexings
                    .iter()
                    .filter(|v| self.indexing_kind(**v) == Some(SliceDim::Dropped))
                    .count();
                Type::view(vt.element_type(), vt.rank().saturating_sub(dropped))
            }
            other => other,
        };
        let binding = self
            .slice_descriptor(view, indexings)
            .map_or(Binding::Opaque, Binding::View);

        let op = OpId(self.ops.len());
        let result = self.push_value(result_ty, binding, Some(op));
        self.push_op(Op::Slice(SliceOp {
            view,
            indexings: indexings.to_vec(),
            result,
        }));
        self.verify_built(op)?;
        Ok(result)
    }

    /// `%r = transpose %view (permutation)`.
    ///
    /// With [`VerifierConfig::verify_on_build`] set, a malformed
    /// permutation is returned as a verification failure.
    pub fn build_transpose(
        &mut self,
        view: ValueId,
        permutation: Permutation,
    ) -> Result<ValueId, BuildError> {
        let ty = self.lookup(view)?.ty;
        let binding = self
            .view_of(view)
            .and_then(|v| transpose::transpose(v, &permutation).ok())
            .map_or(Binding::Opaque, Binding::View);

        let op = OpId(self.ops.len());
        let result = self.push_value(ty, binding, Some(op));
        self.push_op(Op::Transpose(TransposeOp {
            view,
            permutation,
            result,
        }));
        self.verify_built(op)?;
        Ok(result)
    }

    /// `yield %values...`, terminating a generic op's body.
    pub fn build_yield(&mut self, values: &[ValueId]) -> Result<OpId, BuildError> {
        for &v in values {
            self.lookup(v)?;
        }
        Ok(self.push_op(Op::Yield(YieldOp {
            values: values.to_vec(),
        })))
    }

    /// The kind of indexing `value` performs in a slice: ranges keep
    /// their dimension, indices drop it. `None` for anything else.
    pub fn indexing_kind(&self, value: ValueId) -> Option<SliceDim> {
        match self.value_type(value)? {
            Type::Range => Some(SliceDim::Kept),
            Type::Index => Some(SliceDim::Dropped),
            _ => None,
        }
    }

    /// The indexing carried by `value`: its range, or the index
    /// quantity it stands for.
    pub fn indexing_of(&self, value: ValueId) -> Option<Indexing> {
        match &self.values.get(value.index())?.binding {
            Binding::Range(range) => Some(Indexing::Range(range.clone())),
            Binding::Index(expr) => Some(Indexing::Index(expr.clone())),
            Binding::Opaque if self.value_type(value)? == Type::Index => {
                Some(Indexing::Index(IndexExpr::Value(value)))
            }
            Binding::Opaque | Binding::View(_) => None,
        }
    }

    fn slice_descriptor(&self, view: ValueId, indexings: &[ValueId]) -> Option<StridedView> {
        let base = self.view_of(view)?;
        let indexings = indexings
            .iter()
            .map(|v| self.indexing_of(*v))
            .collect::<Option<Vec<_>>>()?;
        slice::slice(base, &indexings).ok()
    }

    fn verify_built(&self, op: OpId) -> Result<(), BuildError> {
        if self.config.verify_on_build {
            self.verify(op)?;
        }
        Ok(())
    }

    fn expect_index(&self, op: &'static str, value: ValueId) -> Result<IndexExpr, BuildError> {
        let info = self.lookup(value)?;
        match (&info.ty, &info.binding) {
            (Type::Index, Binding::Index(expr)) => Ok(expr.clone()),
            (Type::Index, _) => Ok(IndexExpr::Value(value)),
            (actual, _) => Err(BuildError::OperandType {
                op,
                value,
                expected: "index",
                actual: *actual,
            }),
        }
    }

    fn lookup(&self, value: ValueId) -> Result<&ValueInfo, BuildError> {
        self.values
            .get(value.index())
            .ok_or(BuildError::UnknownValue { value })
    }

    fn push_value(&mut self, ty: Type, binding: Binding, def: Option<OpId>) -> ValueId {
        let id = ValueId(self.values.len());
        self.values.push(ValueInfo { ty, binding, def });
        id
    }

    fn push_op(&mut self, op: Op) -> OpId {
        let id = OpId(self.ops.len());
        tracing::debug!(op = %op.kind(), id = %id, "built operation");
        self.ops.push(op);
        id
    }
}
