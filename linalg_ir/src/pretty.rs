/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Pretty-printing of operations in their textual syntax.
//!
//! ```text
//! %3 = range %0:%1:%2 : !linalg.range
//! %5 = slice %0[%1, %3] : !linalg.view<?x?xf32>, index, !linalg.range, !linalg.view<?xf32>
//! %4 = transpose %0 (1, 0) : !linalg.view<?x?xf32>
//! yield %1, %2 : f32, f32
//! ```
//!
//! Operand types are looked up in the owning [`Context`].

use itertools::Itertools;

use crate::context::Context;
use crate::index::ValueId;
use crate::op::Op;
use crate::op::OpId;
use crate::op::OpKind;
use crate::types::Type;

/// A rendered operation.
///
/// ```rust
/// use linalg_ir::Context;
/// use linalg_ir::Permutation;
/// use linalg_ir::pretty::pretty;
///
/// let mut cx = Context::new();
/// let a = cx.add_view(linalg_ir::view!(F32; 4, 5));
/// let t = cx.build_transpose(a, Permutation::new([1, 0])).unwrap();
/// let op = cx.defining_op(t).unwrap();
/// assert_eq!(
///     pretty(&cx, op).unwrap().to_string(),
///     "%1 = transpose %0 (1, 0) : !linalg.view<?x?xf32>"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPretty(String);

impl std::fmt::Display for OperationPretty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render operation `op` of `cx`, or `None` if `op` (or one of its
/// values) does not belong to `cx`.
pub fn pretty(cx: &Context, op: OpId) -> Option<OperationPretty> {
    let ty = |v: ValueId| cx.value_type(v);
    let text = match cx.operation(op)? {
        Op::Range(r) => format!(
            "{} = {} {}:{}:{} : {}",
            r.result(),
            OpKind::Range.mnemonic(),
            r.min(),
            r.max(),
            r.step(),
            ty(r.result())?,
        ),
        Op::Slice(s) => {
            let operand_types = std::iter::once(s.view())
                .chain(s.indexings().iter().copied())
                .chain(std::iter::once(s.result()))
                .map(ty)
                .collect::<Option<Vec<Type>>>()?;
            format!(
                "{} = {} {}[{}] : {}",
                s.result(),
                OpKind::Slice.mnemonic(),
                s.view(),
                s.indexings().iter().join(", "),
                operand_types.iter().join(", "),
            )
        }
        Op::Transpose(t) => format!(
            "{} = {} {} {} : {}",
            t.result(),
            OpKind::Transpose.mnemonic(),
            t.view(),
            t.permutation(),
            ty(t.view())?,
        ),
        Op::Yield(y) if y.values().is_empty() => OpKind::Yield.mnemonic().to_string(),
        Op::Yield(y) => {
            let types = y
                .values()
                .iter()
                .map(|v| ty(*v))
                .collect::<Option<Vec<Type>>>()?;
            format!(
                "{} {} : {}",
                OpKind::Yield.mnemonic(),
                y.values().iter().join(", "),
                types.iter().join(", "),
            )
        }
    };
    Some(OperationPretty(text))
}

impl Context {
    /// Render every operation, one per line, in construction order.
    pub fn dump(&self) -> String {
        self.operations()
            .filter_map(|(id, _)| pretty(self, id))
            .join("\n")
    }
}
