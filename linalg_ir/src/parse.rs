/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

/// Errors that can occur while parsing IR text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParserError {
    #[error("parse error: expected '{expected}' but got end of input")]
    UnexpectedEndOfInput { expected: &'static str },

    #[error("parse error: expected '{expected}' but got '{actual}'")]
    WrongToken {
        expected: &'static str,
        actual: String,
    },

    #[error("parse error: unknown type '{token}'")]
    UnknownType { token: String },

    #[error("parse error: unexpected trailing input '{rest}'")]
    TrailingInput { rest: String },
}

/// A lexeme splitter over a string, with a few helpers for consuming
/// expected tokens and producing useful errors.
///
/// Each delimiter is a lexeme on its own; text between delimiters is
/// trimmed and yielded as a single lexeme.
pub struct Parser<'a> {
    str: &'a str,
    delims: &'a [&'a str],
}

impl<'a> Parser<'a> {
    pub fn new(str: &'a str, delims: &'a [&'a str]) -> Self {
        Self { str, delims }
    }

    /// Peek the next lexeme without consuming it.
    pub fn peek(&self) -> Option<&'a str> {
        self.split().map(|(token, _)| token)
    }

    /// Consume the next lexeme, failing unless it is `expected`.
    pub fn expect(&mut self, expected: &'static str) -> Result<(), ParserError> {
        let token = self
            .peek()
            .ok_or(ParserError::UnexpectedEndOfInput { expected })?;
        if token != expected {
            return Err(ParserError::WrongToken {
                expected,
                actual: token.to_string(),
            });
        }
        let _ = self.next();
        Ok(())
    }

    /// Consume the next lexeme, failing at end of input.
    pub fn next_or_err(&mut self, expected: &'static str) -> Result<&'a str, ParserError> {
        self.next()
            .ok_or(ParserError::UnexpectedEndOfInput { expected })
    }

    /// True once only whitespace remains.
    pub fn is_empty(&self) -> bool {
        self.str.trim().is_empty()
    }

    fn split(&self) -> Option<(&'a str, &'a str)> {
        if self.is_empty() {
            return None;
        }

        match self
            .delims
            .iter()
            .enumerate()
            .flat_map(|(index, d)| self.str.find(d).map(|pos| (index, pos)))
            .min_by_key(|&(_, pos)| pos)
        {
            Some((index, pos)) if self.str[..pos].trim().is_empty() => {
                let delim = self.delims[index];
                Some((delim, &self.str[pos + delim.len()..]))
            }
            Some((_, pos)) => Some((self.str[..pos].trim(), &self.str[pos..])),
            None => Some((self.str.trim(), "")),
        }
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.split().map(|(token, rest)| {
            self.str = rest;
            token
        })
    }
}
