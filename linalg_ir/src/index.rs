/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Index quantities threaded through view descriptors.
//!
//! Sizes, strides and offsets of a [`StridedView`](crate::StridedView)
//! are not, in general, known at compile time. Each one is an
//! [`IndexExpr`]: a small expression tree over integer constants and
//! opaque dynamic values ([`ValueId`]). Transforms only ever *build*
//! these expressions; they never need to know what a dynamic value
//! is. Constants are folded eagerly so that fully static views stay
//! readable:
//!
//! ```
//! use linalg_ir::IndexExpr;
//! let e = IndexExpr::from(5) * IndexExpr::from(1) + IndexExpr::from(0);
//! assert_eq!(e.as_const(), Some(5));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::ops;

use serde::Deserialize;
use serde::Serialize;

/// Handle to an SSA value owned by a [`Context`](crate::Context).
///
/// Printed as `%N`.
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
pub struct ValueId(pub(crate) usize);

impl ValueId {
    /// The position of this value in its context's value table.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A symbolic integer quantity.
///
/// Use the arithmetic operators (and [`IndexExpr::ceil_div`]) rather
/// than the variants directly; the operators fold constants and drop
/// identities (`x + 0`, `x * 1`, `ceildiv(x, 1)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexExpr {
    Const(i64),
    Value(ValueId),
    Add(Box<IndexExpr>, Box<IndexExpr>),
    Sub(Box<IndexExpr>, Box<IndexExpr>),
    Mul(Box<IndexExpr>, Box<IndexExpr>),
    CeilDiv(Box<IndexExpr>, Box<IndexExpr>),
}

impl IndexExpr {
    /// The folded constant, if this expression is one.
    pub fn as_const(&self) -> Option<i64> {
        match self {
            IndexExpr::Const(c) => Some(*c),
            _ => None,
        }
    }

    /// The dynamic value, if this expression is exactly one.
    pub fn as_value(&self) -> Option<ValueId> {
        match self {
            IndexExpr::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// `⌈self / rhs⌉`. Division by a constant zero, and a quotient
    /// that overflows, are left unfolded.
    pub fn ceil_div(self, rhs: IndexExpr) -> IndexExpr {
        match (&self, &rhs) {
            (IndexExpr::Const(a), IndexExpr::Const(b)) => match ceil_div_i64(*a, *b) {
                Some(c) => IndexExpr::Const(c),
                None => IndexExpr::CeilDiv(Box::new(self), Box::new(rhs)),
            },
            (_, IndexExpr::Const(1)) => self,
            _ => IndexExpr::CeilDiv(Box::new(self), Box::new(rhs)),
        }
    }

    /// Evaluate with concrete values for every referenced
    /// [`ValueId`].
    ///
    /// Returns `None` if a binding is missing, a division by zero is
    /// encountered, or the arithmetic overflows.
    pub fn eval(&self, bindings: &HashMap<ValueId, i64>) -> Option<i64> {
        match self {
            IndexExpr::Const(c) => Some(*c),
            IndexExpr::Value(v) => bindings.get(v).copied(),
            IndexExpr::Add(a, b) => a.eval(bindings)?.checked_add(b.eval(bindings)?),
            IndexExpr::Sub(a, b) => a.eval(bindings)?.checked_sub(b.eval(bindings)?),
            IndexExpr::Mul(a, b) => a.eval(bindings)?.checked_mul(b.eval(bindings)?),
            IndexExpr::CeilDiv(a, b) => ceil_div_i64(a.eval(bindings)?, b.eval(bindings)?),
        }
    }

    /// All dynamic values referenced by this expression, in
    /// left-to-right order (duplicates included).
    pub fn values(&self) -> Vec<ValueId> {
        let mut out = Vec::new();
        self.collect_values(&mut out);
        out
    }

    fn collect_values(&self, out: &mut Vec<ValueId>) {
        match self {
            IndexExpr::Const(_) => {}
            IndexExpr::Value(v) => out.push(*v),
            IndexExpr::Add(a, b)
            | IndexExpr::Sub(a, b)
            | IndexExpr::Mul(a, b)
            | IndexExpr::CeilDiv(a, b) => {
                a.collect_values(out);
                b.collect_values(out);
            }
        }
    }
}

/// Ceiling division rounding toward positive infinity for any sign
/// combination. `None` for a zero divisor or an overflowing quotient.
fn ceil_div_i64(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    let r = a.checked_rem(b)?;
    if r != 0 && ((r > 0) == (b > 0)) {
        q.checked_add(1)
    } else {
        Some(q)
    }
}

impl From<i64> for IndexExpr {
    fn from(c: i64) -> Self {
        IndexExpr::Const(c)
    }
}

impl From<ValueId> for IndexExpr {
    fn from(v: ValueId) -> Self {
        IndexExpr::Value(v)
    }
}

impl ops::Add for IndexExpr {
    type Output = IndexExpr;

    fn add(self, rhs: IndexExpr) -> IndexExpr {
        match (&self, &rhs) {
            (IndexExpr::Const(a), IndexExpr::Const(b)) => match a.checked_add(*b) {
                Some(c) => IndexExpr::Const(c),
                None => IndexExpr::Add(Box::new(self), Box::new(rhs)),
            },
            (_, IndexExpr::Const(0)) => self,
            (IndexExpr::Const(0), _) => rhs,
            _ => IndexExpr::Add(Box::new(self), Box::new(rhs)),
        }
    }
}

impl ops::Sub for IndexExpr {
    type Output = IndexExpr;

    fn sub(self, rhs: IndexExpr) -> IndexExpr {
        match (&self, &rhs) {
            (IndexExpr::Const(a), IndexExpr::Const(b)) => match a.checked_sub(*b) {
                Some(c) => IndexExpr::Const(c),
                None => IndexExpr::Sub(Box::new(self), Box::new(rhs)),
            },
            (_, IndexExpr::Const(0)) => self,
            _ if self == rhs => IndexExpr::Const(0),
            _ => IndexExpr::Sub(Box::new(self), Box::new(rhs)),
        }
    }
}

impl ops::Mul for IndexExpr {
    type Output = IndexExpr;

    fn mul(self, rhs: IndexExpr) -> IndexExpr {
        match (&self, &rhs) {
            (IndexExpr::Const(a), IndexExpr::Const(b)) => match a.checked_mul(*b) {
                Some(c) => IndexExpr::Const(c),
                None => IndexExpr::Mul(Box::new(self), Box::new(rhs)),
            },
            (_, IndexExpr::Const(0)) | (IndexExpr::Const(0), _) => IndexExpr::Const(0),
            (_, IndexExpr::Const(1)) => self,
            (IndexExpr::Const(1), _) => rhs,
            _ => IndexExpr::Mul(Box::new(self), Box::new(rhs)),
        }
    }
}

impl fmt::Display for IndexExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexExpr::Const(c) => write!(f, "{}", c),
            IndexExpr::Value(v) => write!(f, "{}", v),
            IndexExpr::Add(a, b) => write!(f, "({} + {})", a, b),
            IndexExpr::Sub(a, b) => write!(f, "({} - {})", a, b),
            IndexExpr::Mul(a, b) => write!(f, "({} * {})", a, b),
            IndexExpr::CeilDiv(a, b) => write!(f, "ceildiv({}, {})", a, b),
        }
    }
}
