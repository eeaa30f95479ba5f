/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! IR types.
//!
//! The printed forms are the ones used in the textual surface syntax:
//!
//! ```text
//! index
//! f32
//! !linalg.range
//! !linalg.view<?x?xf32>
//! ```
//!
//! A view type records only the element type and the rank; sizes,
//! strides and offset are dynamic and live in the
//! [`StridedView`](crate::StridedView) descriptor bound to a value.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::parse::Parser;
use crate::parse::ParserError;

/// Scalar element types a view may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    I1,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
}

impl ElementType {
    fn name(&self) -> &'static str {
        match self {
            ElementType::I1 => "i1",
            ElementType::I8 => "i8",
            ElementType::I16 => "i16",
            ElementType::I32 => "i32",
            ElementType::I64 => "i64",
            ElementType::F16 => "f16",
            ElementType::F32 => "f32",
            ElementType::F64 => "f64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementType {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "i1" => ElementType::I1,
            "i8" => ElementType::I8,
            "i16" => ElementType::I16,
            "i32" => ElementType::I32,
            "i64" => ElementType::I64,
            "f16" => ElementType::F16,
            "f32" => ElementType::F32,
            "f64" => ElementType::F64,
            _ => {
                return Err(ParserError::UnknownType {
                    token: s.to_string(),
                });
            }
        })
    }
}

/// The type of a strided view value: element type and rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViewType {
    element_type: ElementType,
    rank: usize,
}

impl ViewType {
    pub fn new(element_type: ElementType, rank: usize) -> Self {
        Self { element_type, rank }
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn rank(&self) -> usize {
        self.rank
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!linalg.view<")?;
        for _ in 0..self.rank {
            write!(f, "?x")?;
        }
        write!(f, "{}>", self.element_type)
    }
}

/// The type of an SSA value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A dynamic integer quantity.
    Index,
    /// The result of a `range` operation.
    Range,
    View(ViewType),
    Scalar(ElementType),
}

impl Type {
    pub fn view(element_type: ElementType, rank: usize) -> Self {
        Type::View(ViewType::new(element_type, rank))
    }

    pub fn as_view(&self) -> Option<&ViewType> {
        match self {
            Type::View(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Index => f.write_str("index"),
            Type::Range => f.write_str("!linalg.range"),
            Type::View(v) => write!(f, "{}", v),
            Type::Scalar(e) => write!(f, "{}", e),
        }
    }
}

impl FromStr for Type {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser::new(s, &["<", ">"]);
        let head = parser.next_or_err("a type")?;
        let ty = match head {
            "index" => Type::Index,
            "!linalg.range" => Type::Range,
            "!linalg.view" => {
                parser.expect("<")?;
                let body = parser.next_or_err("view dimensions")?;
                parser.expect(">")?;
                parse_view_body(body)?
            }
            other => Type::Scalar(other.parse()?),
        };
        if !parser.is_empty() {
            return Err(ParserError::TrailingInput {
                rest: parser.collect::<Vec<_>>().join(""),
            });
        }
        Ok(ty)
    }
}

/// Parses `?x?xf32`: one `?` per dimension, then the element type.
fn parse_view_body(body: &str) -> Result<Type, ParserError> {
    let mut parts: Vec<&str> = body.split('x').collect();
    let element = parts.pop().unwrap_or_default();
    if let Some(bad) = parts.iter().find(|p| **p != "?") {
        return Err(ParserError::WrongToken {
            expected: "?",
            actual: bad.to_string(),
        });
    }
    Ok(Type::view(element.parse()?, parts.len()))
}
